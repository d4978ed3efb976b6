// Engine command line construction

use serde_json::Value;

use crate::models::{Mode, Turn};

/// Everything one engine call needs, independent of how the engine is launched
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCall {
    pub mode: Mode,
    pub topic: String,
    pub round: u32,
    pub seed: i64,
    pub debate: Option<Vec<Turn>>,
    pub structure: Option<Value>,
    pub user_note: Option<String>,
}

impl EngineCall {
    pub fn new(mode: Mode, topic: impl Into<String>, round: u32, seed: i64) -> Self {
        Self {
            mode,
            topic: topic.into(),
            round,
            seed,
            debate: None,
            structure: None,
            user_note: None,
        }
    }

    pub fn with_debate(mut self, debate: Vec<Turn>) -> Self {
        self.debate = Some(debate);
        self
    }

    /// Only JSON objects are forwarded; anything else is dropped
    pub fn with_structure(mut self, structure: Option<Value>) -> Self {
        self.structure = structure.filter(Value::is_object);
        self
    }

    pub fn with_user_note(mut self, note: Option<String>) -> Self {
        self.user_note = note;
        self
    }
}

/// Build the full argv: `base` (program and leading args) followed by engine flags.
///
/// Payloads are passed as compact JSON, one argument each. The note is only
/// passed when non-empty.
pub fn build_engine_args(
    base: &[String],
    call: &EngineCall,
    mock: bool,
) -> Result<Vec<String>, serde_json::Error> {
    let mut args: Vec<String> = base.to_vec();
    args.extend([
        "--mode".to_string(),
        call.mode.as_str().to_string(),
        "--topic".to_string(),
        call.topic.clone(),
        "--round".to_string(),
        call.round.to_string(),
        "--seed".to_string(),
        call.seed.to_string(),
    ]);

    if let Some(ref debate) = call.debate {
        args.push("--debate-json".to_string());
        args.push(serde_json::to_string(debate)?);
    }

    if let Some(ref structure) = call.structure {
        args.push("--structure-json".to_string());
        args.push(serde_json::to_string(structure)?);
    }

    if let Some(note) = call.user_note.as_deref().filter(|n| !n.is_empty()) {
        args.push("--user-note".to_string());
        args.push(note.to_string());
    }

    if mock {
        args.push("--mock".to_string());
    }

    Ok(args)
}
