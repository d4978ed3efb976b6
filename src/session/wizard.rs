// Five-step wizard controller: topic, debate, notes, structure, report

use super::{ApiAction, ThinkingApi, ThinkingRequest, WizardError};
use crate::models::wizard_state::{next_step, previous_step, transition_step};
use crate::models::{Structure, Turn, WizardStep, DEBATE_TURNS};

pub const TOPIC_PRESETS: [&str; 5] = [
    "AI가 교사를 대체해야 하는가?",
    "대학 입시에서 면접 비중을 늘려야 하는가?",
    "청소년의 스마트폰 사용을 법으로 제한해야 하는가?",
    "원격근무를 기본 근무 형태로 전환해야 하는가?",
    "탄소세를 강하게 도입해야 하는가?",
];

pub const DEFAULT_SEED: i64 = 42;

/// State of one thinking session across rounds.
///
/// Every action takes `&mut self`, so at most one request is in flight.
pub struct WizardSession<A: ThinkingApi> {
    api: A,
    round: u32,
    step: WizardStep,
    seed: i64,
    topic: String,
    custom_topic: String,
    debate: Vec<Turn>,
    structure: Option<Structure>,
    report: String,
    user_note: String,
    error_message: String,
    last_action: Option<ApiAction>,
    loading: bool,
}

impl<A: ThinkingApi> WizardSession<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            round: 1,
            step: WizardStep::Topic,
            seed: DEFAULT_SEED,
            topic: TOPIC_PRESETS[0].to_string(),
            custom_topic: String::new(),
            debate: Vec::new(),
            structure: None,
            report: String::new(),
            user_note: String::new(),
            error_message: String::new(),
            last_action: None,
            loading: false,
        }
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn custom_topic(&self) -> &str {
        &self.custom_topic
    }

    pub fn debate(&self) -> &[Turn] {
        &self.debate
    }

    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    pub fn report(&self) -> &str {
        &self.report
    }

    pub fn user_note(&self) -> &str {
        &self.user_note
    }

    /// Last failure message, empty when the last action succeeded
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn last_action(&self) -> Option<ApiAction> {
        self.last_action
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Select one of the topic presets (or any other text)
    pub fn select_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    /// A non-empty custom topic overrides the selected preset
    pub fn set_custom_topic(&mut self, topic: impl Into<String>) {
        self.custom_topic = topic.into();
    }

    pub fn set_user_note(&mut self, note: impl Into<String>) {
        self.user_note = note.into();
    }

    pub fn primary_label(&self) -> &'static str {
        match (self.loading, self.last_action) {
            (true, Some(action)) => action.loading_label(),
            (true, None) => "처리 중...",
            (false, _) => self.step.primary_label(),
        }
    }

    pub fn secondary_label(&self) -> &'static str {
        self.step.secondary_label()
    }

    fn request(&self, topic: String) -> ThinkingRequest {
        ThinkingRequest {
            topic,
            round: self.round,
            seed: self.seed,
            user_note: self.user_note.clone(),
            debate: None,
            structure: None,
        }
    }

    fn fail(&mut self, error: WizardError) -> WizardError {
        log::warn!("Wizard action failed on {:?}: {}", self.step, error);
        self.error_message = error.to_string();
        error
    }

    fn move_to(&mut self, target: WizardStep) -> Result<(), WizardError> {
        self.step =
            transition_step(self.step, target).map_err(|e| WizardError::Local(e.to_string()))?;
        Ok(())
    }

    /// Primary button: run the current step's action and move forward
    pub async fn go_next(&mut self) -> Result<(), WizardError> {
        if self.loading {
            return Ok(());
        }
        match self.step {
            WizardStep::Topic => self.run_debate().await,
            WizardStep::Debate => {
                self.error_message.clear();
                self.move_to(WizardStep::Notes)
            }
            WizardStep::Notes => self.run_structure().await,
            WizardStep::Structure => self.run_report().await,
            WizardStep::Report => {
                self.start_next_round();
                Ok(())
            }
        }
    }

    /// Secondary button: one step back, or a full reset on the topic step
    pub fn go_back_or_reset(&mut self) {
        if self.loading {
            return;
        }
        match previous_step(self.step) {
            Some(step) => {
                self.error_message.clear();
                self.step = step;
            }
            None => self.reset(),
        }
    }

    /// Re-issue the last failed (or last) action with the current inputs.
    ///
    /// Only valid from the step the action was issued from; anywhere else
    /// nothing is sent.
    pub async fn retry(&mut self) -> Result<(), WizardError> {
        if self.loading {
            return Ok(());
        }
        if let Some(action) = self.last_action {
            if action.source_step() != self.step {
                return Err(self.fail(WizardError::Local(format!(
                    "{}단계에서는 다시 시도할 수 없습니다.",
                    self.step.number()
                ))));
            }
        }
        match self.last_action {
            Some(ApiAction::Debate) => self.run_debate().await,
            Some(ApiAction::Structure) => self.run_structure().await,
            Some(ApiAction::Report) => self.run_report().await,
            None => Ok(()),
        }
    }

    /// Back to round 1 with the first preset and nothing generated
    pub fn reset(&mut self) {
        self.round = 1;
        self.step = WizardStep::Topic;
        self.topic = TOPIC_PRESETS[0].to_string();
        self.custom_topic.clear();
        self.debate.clear();
        self.structure = None;
        self.report.clear();
        self.user_note.clear();
        self.error_message.clear();
        self.last_action = None;
    }

    fn start_next_round(&mut self) {
        let draft = self
            .structure
            .as_ref()
            .map(|s| s.next_revision.clone())
            .unwrap_or_default();
        self.round += 1;
        self.step = next_step(self.step);
        self.debate.clear();
        self.structure = None;
        self.report.clear();
        self.custom_topic.clear();
        self.user_note = draft;
        self.error_message.clear();
        log::info!("Starting round {}", self.round);
    }

    async fn run_debate(&mut self) -> Result<(), WizardError> {
        // Any non-empty custom text wins, even if it trims to nothing
        let chosen = if self.custom_topic.is_empty() {
            &self.topic
        } else {
            &self.custom_topic
        };
        let topic = chosen.trim().to_string();
        if topic.is_empty() {
            return Err(self.fail(WizardError::Local("질문을 입력해 주세요.".to_string())));
        }

        let request = self.request(topic.clone());
        self.begin(ApiAction::Debate);
        let result = self.api.debate(&request).await;
        self.loading = false;

        match result {
            Ok(debate) => {
                self.topic = topic;
                self.debate = debate;
                self.structure = None;
                self.report.clear();
                self.move_to(WizardStep::Debate)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn run_structure(&mut self) -> Result<(), WizardError> {
        if self.debate.len() != DEBATE_TURNS {
            return Err(self.fail(WizardError::Local(
                "토론 데이터가 없어 구조 분석을 진행할 수 없습니다.".to_string(),
            )));
        }

        let mut request = self.request(self.topic.clone());
        request.debate = Some(self.debate.clone());
        self.begin(ApiAction::Structure);
        let result = self.api.structure(&request).await;
        self.loading = false;

        match result {
            Ok(structure) => {
                self.structure = structure;
                self.move_to(WizardStep::Structure)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn run_report(&mut self) -> Result<(), WizardError> {
        if self.debate.len() != DEBATE_TURNS {
            return Err(self.fail(WizardError::Local(
                "토론 데이터가 없어 리포트를 생성할 수 없습니다.".to_string(),
            )));
        }

        let mut request = self.request(self.topic.clone());
        request.debate = Some(self.debate.clone());
        request.structure = self.structure.clone();
        self.begin(ApiAction::Report);
        let result = self.api.report(&request).await;
        self.loading = false;

        match result {
            Ok(report) => {
                self.report = report;
                self.move_to(WizardStep::Report)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn begin(&mut self, action: ApiAction) {
        self.loading = true;
        self.last_action = Some(action);
        self.error_message.clear();
    }
}
