use serde::Serialize;

use crate::document_store::StoreError;

// ============================================================================
// Record Store Errors
// ============================================================================
//
// Raw store errors never leave this layer; they are classified into one of
// four kinds at the point of the call.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Generic,
    AlreadyExists,
    NotFound,
    EmptyInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Generic => "generic",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::NotFound => "not_found",
            ErrorKind::EmptyInput => "empty_input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("required input is empty: {0}")]
    EmptyInput(String),

    #[error("record does not exist: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Generic(String),
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordError::EmptyInput(_) => ErrorKind::EmptyInput,
            RecordError::NotFound(_) => ErrorKind::NotFound,
            RecordError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            RecordError::Generic(_) => ErrorKind::Generic,
        }
    }

    /// Classify a store failure raised while working on `key`
    pub(crate) fn from_store(key: &str, err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { .. } => RecordError::AlreadyExists(key.to_string()),
            other => RecordError::Generic(format!("{}: {}", key, other)),
        }
    }
}

/// One rejected record of a batch write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    /// Position in the submitted batch
    pub index: usize,
    pub key: String,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip)]
    pub error: RecordError,
}

impl RecordFailure {
    pub fn new(index: usize, key: impl Into<String>, error: RecordError) -> Self {
        Self {
            index,
            key: key.into(),
            kind: error.kind(),
            message: error.to_string(),
            error,
        }
    }
}

/// Every failed record of a batch, in submission order
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} record(s) rejected: {}", .failures.len(), summarize(.failures))]
pub struct AggregateError {
    pub failures: Vec<RecordFailure>,
}

impl AggregateError {
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }
}

fn summarize(failures: &[RecordFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.index, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_already_exists_is_classified() {
        let err = RecordError::from_store(
            "k1",
            StoreError::AlreadyExists {
                collection: "notes".to_string(),
                key: "k1".to_string(),
            },
        );
        assert_eq!(err, RecordError::AlreadyExists("k1".to_string()));
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_other_store_errors_are_generic_and_keep_key() {
        let backend = StoreError::Backend("connection reset".to_string());
        let err = RecordError::from_store("k1", backend);
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(err.to_string().contains("k1"));
        assert!(err.to_string().contains("connection reset"));

        let cancelled = RecordError::from_store("k2", StoreError::Cancelled);
        assert_eq!(cancelled.kind(), ErrorKind::Generic);
    }

    #[test]
    fn test_aggregate_error_message_lists_failures() {
        let aggregate = AggregateError {
            failures: vec![
                RecordFailure::new(0, "a", RecordError::AlreadyExists("a".to_string())),
                RecordFailure::new(2, "c", RecordError::Generic("c: boom".to_string())),
            ],
        };

        let msg = aggregate.to_string();
        assert!(msg.starts_with("2 record(s) rejected"));
        assert!(msg.contains("[0] record already exists: a"));
        assert!(msg.contains("[2] c: boom"));
        assert_eq!(aggregate.count(ErrorKind::AlreadyExists), 1);
        assert_eq!(aggregate.count(ErrorKind::Generic), 1);
    }
}
