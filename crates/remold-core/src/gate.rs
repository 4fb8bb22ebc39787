//! Human checkpoint between a validated payload and any filesystem write.
//!
//! `PreviewReady -> Applying -> Applied`, or `PreviewReady -> Discarded`.
//! The gate blocks on a single decision with no retry loop.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::RefactorResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    PreviewReady,
    Applying,
    Applied,
    Discarded,
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PreviewReady => "preview-ready",
            Self::Applying => "applying",
            Self::Applied => "applied",
            Self::Discarded => "discarded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Halt at `PreviewReady`; the Materializer is never invoked.
    PreviewOnly,
    /// Apply, asking first when `confirm` is set.
    Apply { confirm: bool },
}

impl GateMode {
    pub fn from_flags(preview_only: bool, confirm: bool) -> Self {
        if preview_only {
            Self::PreviewOnly
        } else {
            Self::Apply { confirm }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// The wait was interrupted (EOF, read error, signal).
    Cancelled,
}

/// Source of the single accept/reject decision.
pub trait Confirm {
    fn ask(&mut self, result: &RefactorResult) -> Answer;
}

impl<F: FnMut() -> bool> Confirm for F {
    fn ask(&mut self, _result: &RefactorResult) -> Answer {
        if self() {
            Answer::Yes
        } else {
            Answer::No
        }
    }
}

/// Only an explicit `y` or `yes` (any case) is affirmative.
pub fn parse_answer(input: &str) -> Answer {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Answer::Yes,
        _ => Answer::No,
    }
}

#[derive(Debug)]
pub struct DecisionGate {
    mode: GateMode,
    state: GateState,
}

impl DecisionGate {
    /// Enter the gate after a successful validation.
    pub fn new(mode: GateMode) -> Self {
        Self {
            mode,
            state: GateState::PreviewReady,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn may_materialize(&self) -> bool {
        self.state == GateState::Applying
    }

    /// Make the one decision this gate allows. Later calls return the
    /// current state without asking again.
    pub fn decide(&mut self, result: &RefactorResult, confirm: &mut dyn Confirm) -> GateState {
        if self.state != GateState::PreviewReady {
            return self.state;
        }
        let next = match self.mode {
            GateMode::PreviewOnly => GateState::PreviewReady,
            GateMode::Apply { confirm: false } => GateState::Applying,
            GateMode::Apply { confirm: true } => match confirm.ask(result) {
                Answer::Yes => GateState::Applying,
                Answer::No => GateState::Discarded,
                Answer::Cancelled => {
                    tracing::info!("decision cancelled, discarding");
                    GateState::Discarded
                }
            },
        };
        if next != self.state {
            tracing::info!(from = %self.state, to = %next, "gate transition");
        }
        self.state = next;
        next
    }

    /// Mark materialization as finished.
    pub fn complete(&mut self) -> Result<(), CoreError> {
        if self.state != GateState::Applying {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: GateState::Applied,
            });
        }
        self.state = GateState::Applied;
        Ok(())
    }
}
