use std::path::{Path, PathBuf};

use remold_core::config::{BackupPolicy, LayoutKind, RemoldConfig};
use remold_core::model::{AuditEntry, Initiator, RefactorResult, RunMode, RunSession, RunStatus, Stage};
use remold_core::{
    Confirm, DecisionGate, ExtractionFailure, Extractor, GateMode, GateState, RawPayload,
    ValidationFailure, Validator,
};
use remold_materialize::{
    log_stamp, materialize, source_digest, AuditLogger, Layout, LogFailure, LogHandle,
    MaterializationReport, MaterializeContext, MaterializeError,
};

use crate::agent::RefactorAgent;
use crate::error::AgentError;

/// How a pipeline run behaves, independent of its input.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub gate: GateMode,
    pub layout: Layout,
    pub backup_policy: BackupPolicy,
    /// `None` turns audit logging off.
    pub log_dir: Option<PathBuf>,
    pub initiator: Initiator,
    pub excerpt_len: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&RemoldConfig::default(), Initiator::Sdk)
    }
}

impl PipelineOptions {
    pub fn from_config(config: &RemoldConfig, initiator: Initiator) -> Self {
        let layout = match config.layout {
            LayoutKind::InPlace => Layout::InPlace,
            LayoutKind::TimestampedTree => Layout::TimestampedTree {
                base_dir: config.output_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
                label: config.tree_label.clone(),
            },
        };
        Self {
            gate: GateMode::from_flags(config.preview_only, config.confirm),
            layout,
            backup_policy: config.backup_policy,
            log_dir: Some(config.log_dir.clone()),
            initiator,
            excerpt_len: config.excerpt_len,
        }
    }
}

/// Why a transcript did not yield a usable result.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    Extraction(ExtractionFailure),
    Validation {
        payload: RawPayload,
        failure: ValidationFailure,
    },
}

impl ParseFailure {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Extraction(_) => Stage::Extraction,
            Self::Validation { .. } => Stage::Validation,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            Self::Extraction(f) => f.reason.clone(),
            Self::Validation { failure, .. } => failure.to_string(),
        }
    }

    pub fn raw_excerpt(&self) -> &str {
        match self {
            Self::Extraction(f) => &f.raw_excerpt,
            Self::Validation { failure, .. } => &failure.raw_excerpt,
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    AgentFailed(AgentError),
    ParseFailed(ParseFailure),
    /// Preview-only mode: validated, nothing written.
    Previewed(RefactorResult),
    /// Rejected or cancelled at the gate: nothing written.
    Discarded(RefactorResult),
    Applied {
        result: RefactorResult,
        report: MaterializationReport,
        log: Option<Result<LogHandle, LogFailure>>,
    },
    /// The output location itself could not be prepared.
    MaterializeFailed {
        result: RefactorResult,
        error: MaterializeError,
        log: Option<Result<LogHandle, LogFailure>>,
    },
}

/// A finished run: its session record and what happened.
#[derive(Debug)]
pub struct PipelineRun {
    pub session: RunSession,
    pub outcome: RunOutcome,
}

impl PipelineRun {
    pub fn is_success(&self) -> bool {
        match &self.outcome {
            RunOutcome::Previewed(_) | RunOutcome::Discarded(_) => true,
            RunOutcome::Applied { report, .. } => report.primary_written(),
            _ => false,
        }
    }
}

/// Extractor -> Validator -> Decision Gate -> Materializer -> Audit Logger,
/// sequentially, on the calling thread. Holds no state between runs.
pub struct RefactorPipeline {
    options: PipelineOptions,
    extractor: Extractor,
    validator: Validator,
}

impl RefactorPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        let extractor = Extractor::default().with_excerpt_len(options.excerpt_len);
        let validator = Validator::with_excerpt_len(options.excerpt_len);
        Self {
            options,
            extractor,
            validator,
        }
    }

    /// Replace the extraction strategy list.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Extract and validate only. No side effects.
    pub fn parse(&self, transcript: &str) -> Result<(RawPayload, RefactorResult), ParseFailure> {
        let payload = self
            .extractor
            .extract(transcript)
            .map_err(ParseFailure::Extraction)?;
        match self.validator.validate(&payload.text) {
            Ok(result) => Ok((payload, result)),
            Err(failure) => Err(ParseFailure::Validation { payload, failure }),
        }
    }

    /// Ask `agent` for a transcript, then [`RefactorPipeline::run`] it.
    pub fn run_with_agent(
        &self,
        agent: &dyn RefactorAgent,
        instruction: &str,
        input_path: &Path,
        original_source: &str,
        confirm: &mut dyn Confirm,
    ) -> PipelineRun {
        match agent.complete(original_source, instruction) {
            Ok(transcript) => self.run(input_path, original_source, &transcript, confirm),
            Err(e) => {
                let mut session = RunSession::start(input_path, self.run_mode());
                session.fail(Stage::Agent, e.to_string());
                tracing::warn!(run = %session.id.short(), error = %e, "agent failed");
                PipelineRun {
                    session,
                    outcome: RunOutcome::AgentFailed(e),
                }
            }
        }
    }

    pub fn run(
        &self,
        input_path: &Path,
        original_source: &str,
        transcript: &str,
        confirm: &mut dyn Confirm,
    ) -> PipelineRun {
        let mut session = RunSession::start(input_path, self.run_mode());
        tracing::info!(run = %session.id.short(), input = %input_path.display(), "run started");

        let result = match self.parse(transcript) {
            Ok((payload, result)) => {
                tracing::debug!(strategy = payload.strategy, "payload accepted");
                result
            }
            Err(failure) => {
                tracing::warn!(stage = ?failure.stage(), reason = %failure.reason(), "run aborted before any write");
                session.fail(failure.stage(), failure.reason());
                return PipelineRun {
                    session,
                    outcome: RunOutcome::ParseFailed(failure),
                };
            }
        };

        let mut gate = DecisionGate::new(self.options.gate);
        match gate.decide(&result, confirm) {
            GateState::PreviewReady => {
                session.finish(RunStatus::Previewed);
                return PipelineRun {
                    session,
                    outcome: RunOutcome::Previewed(result),
                };
            }
            GateState::Discarded => {
                session.finish(RunStatus::Discarded);
                return PipelineRun {
                    session,
                    outcome: RunOutcome::Discarded(result),
                };
            }
            GateState::Applying | GateState::Applied => {}
        }

        let ctx = MaterializeContext {
            target: input_path,
            original_source,
            layout: self.options.layout.clone(),
            backup_policy: self.options.backup_policy,
            started_at: session.started_at,
        };

        match materialize(&result, &ctx) {
            Ok(report) => {
                if let Err(e) = gate.complete() {
                    tracing::warn!(error = %e, "gate out of sync");
                }
                let log = self.audit(&session, &result, original_source, Some(&report));
                session.finish(RunStatus::Applied {
                    files_written: report.written_count(),
                    files_skipped: report.skipped_count(),
                });
                PipelineRun {
                    session,
                    outcome: RunOutcome::Applied {
                        result,
                        report,
                        log,
                    },
                }
            }
            Err(error) => {
                let log = self.audit(&session, &result, original_source, None);
                session.fail(Stage::Materialization, error.to_string());
                PipelineRun {
                    session,
                    outcome: RunOutcome::MaterializeFailed { result, error, log },
                }
            }
        }
    }

    fn run_mode(&self) -> RunMode {
        match self.options.gate {
            GateMode::PreviewOnly => RunMode::Preview,
            GateMode::Apply { .. } => RunMode::Apply,
        }
    }

    /// Best effort: a failure here is reported, never undone.
    fn audit(
        &self,
        session: &RunSession,
        result: &RefactorResult,
        original_source: &str,
        report: Option<&MaterializationReport>,
    ) -> Option<Result<LogHandle, LogFailure>> {
        let dir = self.options.log_dir.as_ref()?;
        let layout = self.options.layout.kind();
        let original_file = std::path::absolute(&session.input_path)
            .unwrap_or_else(|_| session.input_path.clone());

        let entry = AuditEntry {
            result: result.clone(),
            original_file: original_file.display().to_string(),
            refactor_timestamp: log_stamp(layout, session.started_at),
            initiator: self.options.initiator,
            run_id: session.id.clone(),
            layout,
            output_root: report.map(|r| r.root.display().to_string()),
            source_sha256: Some(source_digest(original_source)),
            files: report.map(|r| r.per_file_status.clone()).unwrap_or_default(),
        };

        let logged = AuditLogger::new(dir).log(&entry);
        if let Err(e) = &logged {
            tracing::warn!(error = %e, "audit log not written");
        }
        Some(logged)
    }
}
