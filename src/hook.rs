//! Hook invocation contract
//!
//! Every hook reads one JSON object from stdin, prints a human-readable
//! report on stdout, and signals allow/block through its exit code.
//! Malformed input is never an error: the hook simply has nothing to do.

use serde::Deserialize;
use std::io::Read;

/// Exit code that tells the assistant to abort the triggering edit.
pub const EXIT_BLOCK: i32 = 2;

/// The `tool_input` record of a tool-use event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub file_path: Option<String>,
    /// Full file body (Write)
    #[serde(default)]
    pub content: Option<String>,
    /// Replacement text (Edit)
    #[serde(default)]
    pub new_string: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Tool-use payload delivered on stdin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: ToolInput,
}

impl HookInput {
    /// Parse a payload; anything that is not a JSON object yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str::<HookInput>(raw) {
            Ok(input) => Some(input),
            Err(err) => {
                tracing::debug!("ignoring malformed hook payload: {}", err);
                None
            }
        }
    }

    pub fn from_reader(mut reader: impl Read) -> Option<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw).ok()?;
        Self::parse(&raw)
    }

    /// The edited file path, when present and non-empty.
    pub fn file_path(&self) -> Option<&str> {
        self.tool_input
            .file_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
    }

    /// The new text of the edit, whichever field the tool used.
    pub fn edited_text(&self) -> &str {
        let ti = &self.tool_input;
        [&ti.content, &ti.new_string, &ti.body]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|text| !text.is_empty())
            .unwrap_or("")
    }
}

/// What a hook wants printed and how the process should exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub report: String,
    pub exit_code: i32,
}

impl HookOutcome {
    pub fn allow(report: String) -> Self {
        Self {
            report,
            exit_code: 0,
        }
    }

    pub fn block(report: String) -> Self {
        Self {
            report,
            exit_code: EXIT_BLOCK,
        }
    }

    pub fn silent() -> Self {
        Self::allow(String::new())
    }

    pub fn is_blocking(&self) -> bool {
        self.exit_code == EXIT_BLOCK
    }
}

/// Run a hook body at the outermost boundary: internal errors are reported on
/// stderr and turned into an allow, so a hook defect never blocks the caller.
pub fn guarded<F>(name: &str, body: F) -> HookOutcome
where
    F: FnOnce() -> anyhow::Result<HookOutcome>,
{
    match body() {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(hook = name, "hook failed: {:#}", err);
            eprintln!("Error in {} hook: {:#}", name, err);
            HookOutcome::silent()
        }
    }
}
