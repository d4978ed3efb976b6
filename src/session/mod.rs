//! Client-side wizard driving one thinking session through the HTTP API
//!
//! [`WizardSession`] owns the step/round state; it talks to the server through
//! the [`ThinkingApi`] trait so it can run against [`HttpThinkingApi`] or an
//! in-process double.

pub mod client;
pub mod wizard;

pub use client::HttpThinkingApi;
pub use wizard::{WizardSession, DEFAULT_SEED, TOPIC_PRESETS};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Structure, Turn, WizardStep};

/// Fallback shown when a failed response carries no message
pub const GENERIC_FAILURE: &str = "요청 처리에 실패했습니다.";

#[derive(Debug, Error)]
pub enum WizardError {
    /// Rejected locally, no request was sent
    #[error("{0}")]
    Local(String),

    /// The server answered with `ok: false` or a non-2xx status
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("응답 파싱에 실패했습니다.")]
    BadResponse,

    #[error("Request failed: {0}")]
    Transport(String),
}

/// The three server calls a wizard makes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAction {
    Debate,
    Structure,
    Report,
}

impl ApiAction {
    pub fn path(&self) -> &'static str {
        match self {
            ApiAction::Debate => "/api/debate",
            ApiAction::Structure => "/api/structure",
            ApiAction::Report => "/api/report",
        }
    }

    /// The step this action is issued from
    pub fn source_step(&self) -> WizardStep {
        match self {
            ApiAction::Debate => WizardStep::Topic,
            ApiAction::Structure => WizardStep::Notes,
            ApiAction::Report => WizardStep::Structure,
        }
    }

    /// Label shown on the primary button while this action runs
    pub fn loading_label(&self) -> &'static str {
        match self {
            ApiAction::Debate => "토론 생성 중...",
            ApiAction::Structure => "구조 분석 중...",
            ApiAction::Report => "리포트 생성 중...",
        }
    }
}

/// Request body shared by all three routes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingRequest {
    pub topic: String,
    pub round: u32,
    pub seed: i64,
    pub user_note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debate: Option<Vec<Turn>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
}

#[async_trait]
pub trait ThinkingApi: Send + Sync {
    async fn debate(&self, request: &ThinkingRequest) -> Result<Vec<Turn>, WizardError>;

    async fn structure(&self, request: &ThinkingRequest)
        -> Result<Option<Structure>, WizardError>;

    async fn report(&self, request: &ThinkingRequest) -> Result<String, WizardError>;
}
