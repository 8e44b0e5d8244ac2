use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document is unreadable: {0}")]
    DocumentUnreadable(String),

    #[error("document text layer is protected")]
    DocumentProtected,

    #[error("extraction unavailable ({source_kind}): {message}")]
    ExtractionUnavailable {
        source_kind: &'static str,
        message: String,
    },

    #[error("no structure recognized")]
    StructureNotFound,

    #[error("failed to read document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn unavailable(source_kind: &'static str, err: impl std::fmt::Display) -> Self {
        PipelineError::ExtractionUnavailable {
            source_kind,
            message: err.to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::DocumentUnreadable(_) | PipelineError::Io { .. }
        )
    }
}

/// Why a draft never became a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteQuestion {
    MissingKeyEntry,
    MissingOption,
}
