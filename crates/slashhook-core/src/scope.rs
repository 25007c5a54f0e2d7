//! Registration scopes.

use std::fmt;

/// Where a command is registered: application-wide or in a single guild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Every guild the application is installed in.
    Global,
    Guild(String),
}

impl Scope {
    pub fn guild(id: impl Into<String>) -> Self {
        Scope::Guild(id.into())
    }

    /// Path segment under `applications/{id}` for this scope's commands.
    pub fn commands_path(&self) -> String {
        match self {
            Scope::Global => "commands".to_string(),
            Scope::Guild(id) => format!("guilds/{}/commands", id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("GLOBAL"),
            Scope::Guild(id) => f.write_str(id),
        }
    }
}
