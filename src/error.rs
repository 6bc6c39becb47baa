use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

/// Faults raised while re-serializing an already-validated program.
///
/// Upstream phases guarantee every reference is resolved and every operator
/// is registered, so any of these signals a compiler-internal defect, not a
/// user-facing syntax error. Rendering halts on the first fault; partial
/// output must be discarded by the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("missing {what} while printing {context}")]
    MissingReference {
        what: &'static str,
        context: &'static str,
    },

    #[error("no precedence registered for operator `{op}`")]
    UnknownOperator { op: String },

    #[error("unrecognized {family} variant `{kind}`")]
    UnknownVariant {
        family: &'static str,
        kind: String,
    },

    #[error("write to output sink failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e.to_string())
    }
}
