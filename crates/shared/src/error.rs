use thiserror::Error;

/// A payload that can carry a server-side failure inside an otherwise valid
/// response body.
pub trait ErrorSignal {
    /// Raw value of the payload's `error` field, if any.
    fn error_field(&self) -> Option<&str>;

    /// The application error message. Empty strings do not count as a signal.
    fn error_message(&self) -> Option<&str> {
        self.error_field().filter(|message| !message.is_empty())
    }
}

/// A payload parsed cleanly but lacks a field its renderer requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("payload is missing expected field `{field}`")]
pub struct MissingField {
    pub field: &'static str,
}

impl MissingField {
    pub fn new(field: &'static str) -> Self {
        Self { field }
    }
}

/// Unwraps an optional payload field or reports it as missing.
pub fn require<'a, T>(value: &'a Option<T>, field: &'static str) -> Result<&'a T, MissingField> {
    value.as_ref().ok_or(MissingField { field })
}
