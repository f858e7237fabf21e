//! MCP server registry
//!
//! Servers come from the `mcpServers` tables of the user and project config
//! files. When none declare any, the tool permissions in
//! `.claude/settings.json` (`mcp__<server>__<tool>`) stand in.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::plugin::{from_record, to_record, ContextPlugin};
use crate::context::{Record, SectionData};
use crate::util::title_case;

/// Name fragment → description. Matched against the normalized server name;
/// the longest matching fragment wins.
const NAME_DESCRIPTIONS: &[(&str, &str)] = &[
    ("serena", "Semantic code agent - analysis, refactoring, symbol navigation"),
    ("context7", "Live framework documentation (Nuxt, Vue, React)"),
    ("perplexity copilot", "Live AI web search with persistent sessions"),
    ("task master", "Project and task management with progress tracking"),
    ("pareto planner", "80/20 planning for prioritization"),
    ("git master", "Advanced Git operations - branches, commits, history"),
    ("docker master", "Docker containers, images and registries"),
    ("eslint master", "JavaScript/TypeScript linting and autofix"),
    ("airtable", "Airtable API - bases, tables, records, search"),
    ("gemini", "Google AI assistant - code generation, sessions, multimodal"),
    ("gpt5", "OpenAI assistant - development, sessions, uploads"),
    ("firecrawl", "Structured web extraction, scraping, crawling"),
    ("cloudinary", "Media management - upload, optimization, transformations"),
    ("turso", "Turso SQLite database - queries, migrations"),
    ("docusync", "Automatic documentation sync"),
    ("railway", "Railway cloud deployment and infrastructure"),
    ("prisma", "Prisma ORM - models, migrations, admin"),
    ("postman", "API testing and Postman collections"),
    ("github actions", "GitHub Actions CI/CD - workflows, deployments"),
    ("monorepo", "Monorepo management - structure, dependencies"),
    ("terminal", "Terminal process observation and monitoring"),
    ("filesystem", "File system operations"),
    ("playwright", "E2E browser automation - capture, interaction, assertions"),
    ("browser automation", "Browser automation - control, scraping, tests"),
    ("code critique", "Code quality analysis - complexity, smells, metrics"),
    ("test", "Automated testing tools"),
    ("browser", "Browser automation and control"),
    ("automation", "Browser automation and control"),
    ("critique", "Code quality analysis and improvement"),
    ("quality", "Code quality analysis and improvement"),
];

/// Tool-name keywords → description, for servers only known from permissions.
const TOOL_DESCRIPTIONS: &[(&[&str], &str)] = &[
    (&["session", "conversation"], "Conversational assistant with sessions"),
    (&["search", "web", "fetch"], "Web search and extraction"),
    (&["build", "deploy", "container"], "Deployment and infrastructure tools"),
    (&["test", "lint", "analyze"], "Code quality and analysis tools"),
    (&["database", "db", "sql"], "Database management"),
];

struct ServerGroup {
    title: &'static str,
    exact: &'static [&'static str],
    contains: &'static [&'static str],
    excludes: &'static [&'static str],
}

/// Display groups in order; a server lands in the first group it matches.
const GROUPS: &[ServerGroup] = &[
    ServerGroup {
        title: "Core Development",
        exact: &["Serena", "Context7"],
        contains: &[],
        excludes: &[],
    },
    ServerGroup {
        title: "Project Management",
        exact: &[],
        contains: &["Task", "Pareto"],
        excludes: &[],
    },
    ServerGroup {
        title: "Infrastructure",
        exact: &["Git Master", "Docker Master", "Turso Cloud"],
        contains: &[],
        excludes: &[],
    },
    ServerGroup {
        title: "AI Assistants",
        exact: &[],
        contains: &["Copilot", "Gemini", "Gpt5"],
        excludes: &["Browser"],
    },
    ServerGroup {
        title: "Testing & Quality",
        exact: &[],
        contains: &["Playwright", "Code Critique", "Eslint"],
        excludes: &[],
    },
    ServerGroup {
        title: "Browser & Web",
        exact: &[],
        contains: &["Browser", "Firecrawl"],
        excludes: &[],
    },
    ServerGroup {
        title: "Cloud Services",
        exact: &[],
        contains: &["Airtable", "Railway", "Cloudinary", "Docusync"],
        excludes: &[],
    },
];

const OTHER_GROUP: &str = "Other Tools";

fn normalize(server: &str) -> String {
    server.to_lowercase().replace(['-', '_'], " ")
}

/// Display name: dashes become spaces, then title case.
pub(crate) fn display_name(server: &str) -> String {
    title_case(&server.replace('-', " "))
}

pub(crate) fn describe_by_name(server: &str) -> Option<&'static str> {
    let name = normalize(server);
    NAME_DESCRIPTIONS
        .iter()
        .filter(|(fragment, _)| name.contains(fragment))
        .max_by_key(|(fragment, _)| fragment.len())
        .map(|(_, description)| *description)
}

fn describe_by_tools(tools: &[String]) -> Option<&'static str> {
    let tools = tools.join(" ").to_lowercase();
    TOOL_DESCRIPTIONS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| tools.contains(kw)))
        .map(|(_, description)| *description)
}

fn group_of(server: &str) -> &'static str {
    GROUPS
        .iter()
        .find(|group| {
            let matched = group.exact.contains(&server)
                || group.contains.iter().any(|term| server.contains(term));
            matched && !group.excludes.iter().any(|term| server.contains(term))
        })
        .map(|group| group.title)
        .unwrap_or(OTHER_GROUP)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerStatus {
    command: String,
    connected: bool,
    config_source: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct McpFacts {
    mcp_servers: Vec<String>,
    mcp_servers_info: BTreeMap<String, String>,
    mcp_servers_status: BTreeMap<String, ServerStatus>,
    mcp_config_found: bool,
}

pub struct McpServersPlugin {
    root: PathBuf,
    config_files: Vec<PathBuf>,
}

impl McpServersPlugin {
    pub fn new(root: &Path, config_files: Vec<PathBuf>) -> Self {
        Self {
            root: root.to_path_buf(),
            config_files,
        }
    }

    fn read_json(path: &Path) -> Option<Value> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!("Skipping {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Raw server name → status, later files overriding earlier ones.
    fn configured_servers(&self) -> Vec<(String, ServerStatus)> {
        let mut servers: Vec<(String, ServerStatus)> = Vec::new();
        for path in &self.config_files {
            let Some(config) = Self::read_json(path) else {
                continue;
            };
            let Some(table) = config.get("mcpServers").and_then(Value::as_object) else {
                continue;
            };
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            for (name, entry) in table {
                let status = ServerStatus {
                    command: entry
                        .get("command")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    connected: true,
                    config_source: source.clone(),
                };
                match servers.iter_mut().find(|(existing, _)| existing == name) {
                    Some(slot) => slot.1 = status,
                    None => servers.push((name.clone(), status)),
                }
            }
        }
        servers
    }

    /// Servers named by `mcp__<server>__<tool>` permissions, with their tools.
    fn permitted_servers(&self) -> Option<BTreeMap<String, Vec<String>>> {
        let settings = Self::read_json(&self.root.join(".claude").join("settings.json"))?;
        let mut servers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let allowed = settings
            .pointer("/permissions/allow")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter(|entry| entry.starts_with("mcp__"));
        for entry in allowed {
            let parts: Vec<&str> = entry.split("__").collect();
            if parts.len() < 2 || parts[1].is_empty() {
                continue;
            }
            let tool = parts.get(2).copied().unwrap_or("general");
            servers
                .entry(parts[1].to_string())
                .or_default()
                .push(tool.to_string());
        }
        Some(servers)
    }
}

impl ContextPlugin for McpServersPlugin {
    fn name(&self) -> &'static str {
        "MCPServersPlugin"
    }

    fn priority(&self) -> i32 {
        55
    }

    fn discover(&self) -> anyhow::Result<Record> {
        let mut facts = McpFacts::default();
        let configured = self.configured_servers();

        if !configured.is_empty() {
            facts.mcp_config_found = true;
            for (server, status) in configured {
                let display = display_name(&server);
                if let Some(description) = describe_by_name(&server) {
                    facts
                        .mcp_servers_info
                        .insert(display.clone(), description.to_string());
                }
                facts.mcp_servers_status.insert(display.clone(), status);
                facts.mcp_servers.push(display);
            }
        } else if let Some(permitted) = self.permitted_servers() {
            facts.mcp_config_found = true;
            let mut names = BTreeSet::new();
            for (server, tools) in &permitted {
                let display = display_name(server);
                if let Some(description) =
                    describe_by_name(server).or_else(|| describe_by_tools(tools))
                {
                    facts
                        .mcp_servers_info
                        .insert(display.clone(), description.to_string());
                }
                names.insert(display);
            }
            facts.mcp_servers = names.into_iter().collect();
        }

        to_record(&facts)
    }

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>> {
        let facts: McpFacts = from_record(data)?;
        if !facts.mcp_config_found && facts.mcp_servers.is_empty() {
            return Ok(None);
        }

        let mut lines = vec!["## 🤖 MCP Servers\n".to_string()];
        if !facts.mcp_servers.is_empty() {
            lines.push(format!("**Available Servers**: {}", facts.mcp_servers.len()));
            lines.push(String::new());

            let server_line = |server: &str| {
                let connected = facts
                    .mcp_servers_status
                    .get(server)
                    .is_some_and(|status| status.connected);
                let icon = if connected { " ✓" } else { " ⚠️" };
                match facts.mcp_servers_info.get(server) {
                    Some(description) => format!("- **{}**: {}{}", server, description, icon),
                    None => format!("- **{}**{}", server, icon),
                }
            };

            let titles = GROUPS.iter().map(|group| group.title).chain([OTHER_GROUP]);
            for title in titles {
                let members: Vec<&String> = facts
                    .mcp_servers
                    .iter()
                    .filter(|server| group_of(server) == title)
                    .collect();
                if members.is_empty() {
                    continue;
                }
                lines.push(format!("### {}", title));
                for server in members {
                    lines.push(server_line(server));
                }
                if title != OTHER_GROUP {
                    lines.push(String::new());
                }
            }
        }

        Ok(Some(SectionData::new(
            "mcp_servers",
            "MCP Servers",
            lines.join("\n"),
            55,
        )))
    }

    fn cache_inputs(&self) -> Vec<PathBuf> {
        self.config_files.clone()
    }
}
