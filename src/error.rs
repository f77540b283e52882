//! Typed error kinds for the optimization cycle.
//!
//! Recoverable kinds (`SourceUnavailable`, `StrategyApplicationFailure`,
//! `ReportingFailure`) are recorded and logged while the cycle continues.
//! Fatal kinds (`NoDataAvailable`, `EmptyInput`) end the current cycle and
//! surface to whoever triggered it.

use serde::Serialize;
use thiserror::Error;

use crate::controller::{Stage, StageTransition};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("no data available: all {attempted} configured sources failed")]
    NoDataAvailable { attempted: usize },

    #[error("analyzer received an empty collection")]
    EmptyInput,

    #[error("strategy {action} on {target} failed: {reason}")]
    StrategyApplicationFailure {
        target: String,
        action: String,
        reason: String,
    },

    #[error("reporting to '{sink}' failed: {reason}")]
    ReportingFailure { sink: String, reason: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl PipelineError {
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Short, stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::NoDataAvailable { .. } => "no_data_available",
            Self::EmptyInput => "empty_input",
            Self::StrategyApplicationFailure { .. } => "strategy_application_failure",
            Self::ReportingFailure { .. } => "reporting_failure",
            Self::Config { .. } => "config",
        }
    }

    /// Fatal kinds abort the running cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoDataAvailable { .. } | Self::EmptyInput | Self::Config { .. }
        )
    }
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = serializer.serialize_struct("PipelineError", 2)?;
        st.serialize_field("kind", self.kind())?;
        st.serialize_field("message", &self.to_string())?;
        st.end()
    }
}

/// A cycle that ended in the `Aborted` state.
#[derive(Error, Debug, Clone)]
#[error("cycle {cycle_id} aborted during {stage}: {error}")]
pub struct CycleAborted {
    pub cycle_id: String,
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
    /// Stage transitions up to and including the one into `Aborted`.
    pub transitions: Vec<StageTransition>,
}
