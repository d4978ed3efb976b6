// Wizard step state machine with validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Topic,
    Debate,
    Notes,
    Structure,
    Report,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardTransitionError {
    #[error("Invalid wizard transition from {from:?} to {to:?}")]
    InvalidTransition { from: WizardStep, to: WizardStep },
}

impl WizardStep {
    /// All steps in wizard order
    pub fn all() -> &'static [WizardStep] {
        &[
            WizardStep::Topic,
            WizardStep::Debate,
            WizardStep::Notes,
            WizardStep::Structure,
            WizardStep::Report,
        ]
    }

    /// 1-based position shown in the stepper
    pub fn number(&self) -> u8 {
        match self {
            WizardStep::Topic => 1,
            WizardStep::Debate => 2,
            WizardStep::Notes => 3,
            WizardStep::Structure => 4,
            WizardStep::Report => 5,
        }
    }

    /// Label of the primary (forward) button on this step
    pub fn primary_label(&self) -> &'static str {
        match self {
            WizardStep::Topic => "토론 시작",
            WizardStep::Debate => "내 생각 정리하기",
            WizardStep::Notes => "구조 피드백 받기",
            WizardStep::Structure => "세션 리포트 생성",
            WizardStep::Report => "다음 라운드 시작",
        }
    }

    /// Label of the secondary button: reset on the first step, back otherwise
    pub fn secondary_label(&self) -> &'static str {
        match self {
            WizardStep::Topic => "초기화",
            _ => "뒤로",
        }
    }
}

/// Validates if the wizard can move from one step to another.
///
/// Forward moves go one step at a time, the report step wraps to a new round,
/// and any step can go back one step or restart at the topic.
pub fn can_transition(from: WizardStep, to: WizardStep) -> bool {
    if from == to {
        return true;
    }
    if to == WizardStep::Topic {
        return true;
    }
    next_step(from) == to || previous_step(from) == Some(to)
}

/// Validates and performs a step transition
pub fn transition_step(
    current: WizardStep,
    target: WizardStep,
) -> Result<WizardStep, WizardTransitionError> {
    if !can_transition(current, target) {
        return Err(WizardTransitionError::InvalidTransition {
            from: current,
            to: target,
        });
    }
    Ok(target)
}

/// Forward step; the report step starts the next round at the topic step
pub fn next_step(current: WizardStep) -> WizardStep {
    match current {
        WizardStep::Topic => WizardStep::Debate,
        WizardStep::Debate => WizardStep::Notes,
        WizardStep::Notes => WizardStep::Structure,
        WizardStep::Structure => WizardStep::Report,
        WizardStep::Report => WizardStep::Topic,
    }
}

/// Backward step, `None` on the first step
pub fn previous_step(current: WizardStep) -> Option<WizardStep> {
    match current {
        WizardStep::Topic => None,
        WizardStep::Debate => Some(WizardStep::Topic),
        WizardStep::Notes => Some(WizardStep::Debate),
        WizardStep::Structure => Some(WizardStep::Notes),
        WizardStep::Report => Some(WizardStep::Structure),
    }
}
