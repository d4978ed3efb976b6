//! Thinking-exercise routes
//!
//! Handles: POST /api/debate, POST /api/structure, POST /api/report
//!
//! All three share one shape: validate the body, build an engine call, run
//! it, and re-shape the success payload down to the fields of that route.

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::{
    get_debate, get_round, get_seed, get_structure, get_topic, get_user_note, parse_body,
    shape_success,
};
use crate::engine::{EngineCall, ResultEnvelope};
use crate::models::Mode;
use crate::server::error::ApiError;
use crate::server::ServerAppState;

/// POST /api/debate
pub async fn debate_handler(State(state): State<ServerAppState>, body: Bytes) -> Response {
    respond(handle(&state, &body, Mode::Debate).await)
}

/// POST /api/structure
pub async fn structure_handler(State(state): State<ServerAppState>, body: Bytes) -> Response {
    respond(handle(&state, &body, Mode::Structure).await)
}

/// POST /api/report
pub async fn report_handler(State(state): State<ServerAppState>, body: Bytes) -> Response {
    respond(handle(&state, &body, Mode::Report).await)
}

fn respond(result: Result<Value, ApiError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Validate the body into an engine call for `mode`. No process is started here.
pub fn build_call(body: &Value, mode: Mode) -> Result<EngineCall, ApiError> {
    let topic = get_topic(body)?;
    let round = get_round(body)?;
    let seed = get_seed(body)?;
    let user_note = get_user_note(body);

    let call = EngineCall::new(mode, topic, round, seed).with_user_note(user_note);

    match mode {
        Mode::Debate => Ok(call),
        Mode::Structure => Ok(call.with_debate(get_debate(body)?)),
        Mode::Report | Mode::Full => Ok(call
            .with_debate(get_debate(body)?)
            .with_structure(get_structure(body))),
    }
}

async fn handle(state: &ServerAppState, raw: &[u8], mode: Mode) -> Result<Value, ApiError> {
    let body = parse_body(raw)?;
    let call = build_call(&body, mode)?;

    log::info!(
        "POST /api/{} topic={:?} round={} seed={}",
        mode,
        call.topic,
        call.round,
        call.seed
    );

    match state.engine.run(&call).await {
        ResultEnvelope::Success { payload, .. } => Ok(shape_success(&payload, mode.result_field())),
        ResultEnvelope::Failure { error, exit_code } => {
            log::debug!(
                "Engine {} failed with {} (exit code {})",
                mode,
                error.code,
                exit_code
            );
            Err(ApiError::Engine(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn four_turns() -> Value {
        json!([
            {"role": "pro", "text": "a"},
            {"role": "con", "text": "b"},
            {"role": "pro", "text": "c"},
            {"role": "con", "text": "d"}
        ])
    }

    #[test]
    fn test_debate_call_ignores_debate_field() {
        let call = build_call(&json!({"topic": "t", "debate": "junk"}), Mode::Debate).unwrap();
        assert_eq!(call.debate, None);
        assert_eq!(call.round, 1);
        assert_eq!(call.seed, 42);
    }

    #[test]
    fn test_structure_call_requires_debate() {
        assert!(build_call(&json!({"topic": "t"}), Mode::Structure).is_err());
        let call = build_call(&json!({"topic": "t", "debate": four_turns()}), Mode::Structure)
            .unwrap();
        assert_eq!(call.debate.unwrap().len(), 4);
        assert_eq!(call.structure, None);
    }

    #[test]
    fn test_report_call_carries_structure() {
        let body = json!({
            "topic": "t", "round": 2, "seed": 9, "userNote": "note",
            "debate": four_turns(), "structure": {"claim": "c"}
        });
        let call = build_call(&body, Mode::Report).unwrap();
        assert_eq!(call.structure, Some(json!({"claim": "c"})));
        assert_eq!(call.user_note.as_deref(), Some("note"));
        assert_eq!((call.round, call.seed), (2, 9));
    }

    #[test]
    fn test_topic_checked_before_debate() {
        let err = build_call(&json!({"debate": []}), Mode::Report).unwrap_err();
        assert_eq!(err.into_info().message, "topic is required");
    }
}
