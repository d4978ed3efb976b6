// Data models shared by the routes, the mock engine and the wizard

pub mod wizard_state;

pub use wizard_state::{WizardStep, WizardTransitionError};

use serde::{Deserialize, Serialize};

/// Number of turns every generated debate carries
pub const DEBATE_TURNS: usize = 4;

/// Side of the debate a turn argues for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Pro,
    Con,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Pro => "pro",
            Role::Con => "con",
        }
    }
}

/// One statement in the pro/con debate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Structured critique of the user's reasoning.
///
/// Field names are snake_case on the wire (`missing_info`, `next_revision`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Structure {
    pub claim: String,
    pub reasons: Vec<String>,
    pub assumptions: Vec<String>,
    pub counterpoints: Vec<String>,
    pub missing_info: Vec<String>,
    pub next_revision: String,
}

/// Engine mode selector passed as `--mode`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Debate,
    Structure,
    Report,
    Full,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Debate => "debate",
            Mode::Structure => "structure",
            Mode::Report => "report",
            Mode::Full => "full",
        }
    }

    /// Field of the engine document holding this mode's result
    pub fn result_field(&self) -> &'static str {
        match self {
            Mode::Debate => "debate",
            Mode::Structure => "structure",
            Mode::Report => "report",
            Mode::Full => "report",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debate" => Ok(Mode::Debate),
            "structure" => Ok(Mode::Structure),
            "report" => Ok(Mode::Report),
            "full" => Ok(Mode::Full),
            other => Err(format!("Unknown mode: {}", other)),
        }
    }
}
