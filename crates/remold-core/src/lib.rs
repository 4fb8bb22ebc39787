//! Core types and pure stages of the remold pipeline: transcript
//! extraction, payload validation and the decision gate.

pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod model;
pub mod validate;

pub use error::{CoreError, ExtractionFailure, ValidationFailure, ValidationKind};
pub use extract::{extract, Extractor, RawPayload};
pub use gate::{Answer, Confirm, DecisionGate, GateMode, GateState};
pub use validate::{validate, Validator};
