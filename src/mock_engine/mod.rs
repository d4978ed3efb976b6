//! Deterministic mock engine behind the `thinkgym-engine` binary
//!
//! The engine answers one request per process: it reads its arguments, writes
//! exactly one JSON document and exits. Success documents carry `ok: true`
//! plus the mode's result; failures carry `ok: false` and an `error` object
//! with an `http_hint` the server uses as the response status.

pub mod content;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::models::{Mode, Structure, Turn, DEBATE_TURNS};

pub use content::{normalize_sentences_3, REPORT_SECTIONS, REPORT_TITLE};

/// Errors reported inside the engine's JSON document
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Non-mock (LLM) mode is not implemented yet. Use --mock.")]
    NotImplemented,

    #[error("Unexpected engine error: {0}")]
    Internal(String),
}

impl EngineError {
    fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "INVALID_INPUT",
            EngineError::NotImplemented => "NOT_IMPLEMENTED",
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn http_hint(&self) -> u16 {
        match self {
            EngineError::InvalidInput(_) => 400,
            EngineError::NotImplemented => 501,
            EngineError::Internal(_) => 500,
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Internal(_) => 2,
            _ => 1,
        }
    }

    /// The `{ok: false, mode, error}` document written to stdout
    pub fn to_document(&self, mode: Mode) -> Value {
        let message = match self {
            // keep the hidden detail in the logs only
            EngineError::Internal(_) => "Unexpected server error".to_string(),
            other => other.to_string(),
        };
        json!({
            "ok": false,
            "mode": mode.as_str(),
            "error": {
                "code": self.code(),
                "message": message,
                "http_hint": self.http_hint(),
            }
        })
    }
}

/// Parsed engine arguments
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub mode: Mode,
    pub topic: String,
    pub round: i64,
    pub seed: i64,
    pub user_note: Option<String>,
    pub debate_json: Option<String>,
    pub structure_json: Option<String>,
    pub mock: bool,
}

impl EngineRequest {
    pub fn new(mode: Mode, topic: impl Into<String>) -> Self {
        Self {
            mode,
            topic: topic.into(),
            round: 1,
            seed: 42,
            user_note: None,
            debate_json: None,
            structure_json: None,
            mock: true,
        }
    }

    fn note(&self) -> &str {
        self.user_note.as_deref().map(str::trim).unwrap_or("")
    }

    fn rng(&self) -> StdRng {
        let seed = self.seed.wrapping_add(self.round.wrapping_mul(1000));
        StdRng::seed_from_u64(seed as u64)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Validate a `--debate-json` argument into exactly four non-empty turns
pub fn parse_debate(raw: Option<&str>) -> Result<Vec<Turn>, EngineError> {
    let raw = non_blank(raw)
        .ok_or_else(|| EngineError::invalid("debate_json is required for structure/report mode"))?;
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        EngineError::invalid(format!("debate_json must be valid JSON string ({})", e))
    })?;

    let turns = match value.as_array() {
        Some(turns) if turns.len() == DEBATE_TURNS => turns,
        _ => {
            return Err(EngineError::invalid(
                "debate must be a list of exactly 4 turns",
            ))
        }
    };

    turns
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            if turn.get("role").is_none() || turn.get("text").is_none() {
                return Err(EngineError::invalid(format!(
                    "debate[{}] must have role and text",
                    i
                )));
            }
            let turn: Turn = serde_json::from_value(turn.clone()).map_err(|_| {
                EngineError::invalid(format!("debate[{}].role must be 'pro' or 'con'", i))
            })?;
            if turn.text.trim().is_empty() {
                return Err(EngineError::invalid(format!(
                    "debate[{}].text must be a non-empty string",
                    i
                )));
            }
            Ok(turn)
        })
        .collect()
}

const STRUCTURE_KEYS: [&str; 6] = [
    "claim",
    "reasons",
    "assumptions",
    "counterpoints",
    "missing_info",
    "next_revision",
];

/// Validate a caller-supplied structure and normalize its `next_revision`
pub fn parse_structure(raw: &str) -> Result<Structure, EngineError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        EngineError::invalid(format!("structure_json must be valid JSON string ({})", e))
    })?;
    let object = value
        .as_object()
        .ok_or_else(|| EngineError::invalid("structure_json must decode to an object"))?;

    for key in STRUCTURE_KEYS {
        if !object.contains_key(key) {
            return Err(EngineError::invalid(format!("structure missing key: {}", key)));
        }
    }
    for key in ["reasons", "assumptions", "counterpoints", "missing_info"] {
        if !object[key].is_array() {
            return Err(EngineError::invalid(format!("structure.{} must be a list", key)));
        }
    }
    if !object["next_revision"].is_string() {
        return Err(EngineError::invalid("structure.next_revision must be a string"));
    }

    let list = |key: &str| -> Vec<String> {
        object[key]
            .as_array()
            .map(|items| items.iter().map(value_text).collect())
            .unwrap_or_default()
    };
    Ok(Structure {
        claim: value_text(&object["claim"]),
        reasons: list("reasons"),
        assumptions: list("assumptions"),
        counterpoints: list("counterpoints"),
        missing_info: list("missing_info"),
        next_revision: normalize_sentences_3(&value_text(&object["next_revision"])),
    })
}

/// Text of a caller-supplied value as it appears in a report: strings verbatim,
/// anything else as compact JSON
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::Internal(e.to_string()))
}

/// Run one engine request and build its success document
pub fn run_engine(request: &EngineRequest) -> Result<Value, EngineError> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(EngineError::invalid("topic is required"));
    }
    if request.round < 1 {
        return Err(EngineError::invalid("round must be >= 1"));
    }
    if !request.mock {
        return Err(EngineError::NotImplemented);
    }

    let mut rng = request.rng();
    let note = request.note();

    let mut doc = Map::new();
    doc.insert("ok".to_string(), Value::Bool(true));
    doc.insert("mode".to_string(), json!(request.mode.as_str()));
    doc.insert("topic".to_string(), json!(topic));
    doc.insert("round".to_string(), json!(request.round));
    let mut meta = json!({"mock": request.mock, "seed": request.seed});

    match request.mode {
        Mode::Debate => {
            let debate = content::mock_debate(topic, &mut rng);
            doc.insert("debate".to_string(), to_value(&debate)?);
        }
        Mode::Structure => {
            let _debate = parse_debate(request.debate_json.as_deref())?;
            let structure = content::mock_structure(topic, note, &mut rng);
            doc.insert("structure".to_string(), to_value(&structure)?);
        }
        Mode::Report => {
            let debate = parse_debate(request.debate_json.as_deref())?;
            let (structure, source) = match non_blank(request.structure_json.as_deref()) {
                Some(raw) => (parse_structure(raw)?, "input"),
                None => (content::mock_structure(topic, note, &mut rng), "generated"),
            };
            let report = content::mock_report(topic, &debate, note, &structure, &mut rng);
            doc.insert("report".to_string(), json!(report));
            meta["structure_source"] = json!(source);
        }
        Mode::Full => {
            let debate = content::mock_debate(topic, &mut rng);
            let structure = content::mock_structure(topic, note, &mut rng);
            let report = content::mock_report(topic, &debate, note, &structure, &mut rng);
            doc.insert("debate".to_string(), to_value(&debate)?);
            doc.insert("structure".to_string(), to_value(&structure)?);
            doc.insert("report".to_string(), json!(report));
        }
    }

    doc.insert("meta".to_string(), meta);
    log::debug!("engine {} finished for round {}", request.mode, request.round);
    Ok(Value::Object(doc))
}

/// Run a request and pair the document to print with the exit code to use
pub fn respond(request: &EngineRequest) -> (Value, i32) {
    match run_engine(request) {
        Ok(doc) => (doc, 0),
        Err(e) => {
            if let EngineError::Internal(detail) = &e {
                log::error!("Unexpected error: {}", detail);
            } else {
                log::debug!("Rejected request: {}", e);
            }
            (e.to_document(request.mode), e.exit_code())
        }
    }
}
