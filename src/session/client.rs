// HTTP transport for the wizard

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::{ApiAction, ThinkingApi, ThinkingRequest, WizardError, GENERIC_FAILURE};
use crate::models::{Structure, Turn};
use crate::utils::is_truthy;

/// Client-side ceiling; longer than the server's engine timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Talks to a running ThinkGym server
pub struct HttpThinkingApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpThinkingApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, WizardError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WizardError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, action: ApiAction, request: &ThinkingRequest) -> Result<Value, WizardError> {
        let url = format!("{}{}", self.base_url, action.path());
        log::debug!("POST {} (round {})", url, request.round);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| WizardError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|_| WizardError::BadResponse)?;
        check_body(status.as_u16(), body)
    }
}

/// Apply the success rule: 2xx status and a truthy `ok`
fn check_body(status: u16, body: Value) -> Result<Value, WizardError> {
    if (200..300).contains(&status) && is_truthy(body.get("ok")) {
        return Ok(body);
    }
    let error = body.get("error");
    Err(WizardError::Api {
        status,
        code: error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string),
        message: error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or(GENERIC_FAILURE)
            .to_string(),
    })
}

/// Read `field` from a success body; absent or null fields fall back to the default
fn field_or_default<T: DeserializeOwned + Default>(
    body: &Value,
    field: &str,
) -> Result<T, WizardError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|_| WizardError::BadResponse),
    }
}

#[async_trait]
impl ThinkingApi for HttpThinkingApi {
    async fn debate(&self, request: &ThinkingRequest) -> Result<Vec<Turn>, WizardError> {
        let body = self.post(ApiAction::Debate, request).await?;
        field_or_default(&body, "debate")
    }

    async fn structure(
        &self,
        request: &ThinkingRequest,
    ) -> Result<Option<Structure>, WizardError> {
        let body = self.post(ApiAction::Structure, request).await?;
        field_or_default(&body, "structure")
    }

    async fn report(&self, request: &ThinkingRequest) -> Result<String, WizardError> {
        let body = self.post(ApiAction::Report, request).await?;
        field_or_default(&body, "report")
    }
}
