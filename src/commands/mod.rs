//! CLI command handlers

pub mod diagnostics;
pub mod lookup;
pub mod output;
pub mod search;
pub mod settings;
pub mod text;
