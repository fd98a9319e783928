use thiserror::Error;

use crate::clients::activity_source::SourceError;
use crate::clients::generative::GenerateError;
use crate::clients::store::StoreError;

/// Failure taxonomy for a single athlete's pipeline invocation.
///
/// Source, generation and store failures abort the invocation and are
/// surfaced to the operator; they never abort other athletes in the same
/// sweep. Notification failures are logged and swallowed before they can
/// reach this type.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("activity source failure: {0}")]
    Source(#[from] SourceError),

    #[error("generation failure after {attempts} attempts: {source}")]
    Generation {
        attempts: u32,
        #[source]
        source: GenerateError,
    },

    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),

    #[error("precondition violation: {0}")]
    Precondition(String),
}

impl PipelineError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}
