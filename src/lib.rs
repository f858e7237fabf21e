//! Hookwright library crate
//!
//! Tool-use hooks for web monorepos plus the plugin-driven CLAUDE.md
//! context updater. The binary is a thin dispatcher over these modules.

pub mod config;
pub mod context;
pub mod git;
pub mod hook;
pub mod hooks;
pub mod sections;
pub mod util;
