// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::commit::CommitError;
use crate::ledger::LedgerError;
use crate::recorder::PolicyError;
use crate::snapshot::SnapshotError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("storage backend '{0}' is not compiled into this build")]
    Unsupported(&'static str),
}

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Policy violation: {0}")]
    Policy(#[from] PolicyError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Commit rejected: {0}")]
    Commit(#[from] CommitError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal server error")]
    Internal,
}

impl StrataError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StrataError::Config(_) | StrataError::Storage(_) | StrataError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StrataError::Ledger(LedgerError::Integrity { .. }) => StatusCode::CONFLICT,
            StrataError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StrataError::Policy(_) => StatusCode::FORBIDDEN,
            StrataError::Snapshot(SnapshotError::NotFound(_)) => StatusCode::NOT_FOUND,
            StrataError::Snapshot(SnapshotError::Ambiguous { .. })
            | StrataError::Snapshot(SnapshotError::InvalidHash(_)) => StatusCode::BAD_REQUEST,
            StrataError::Snapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StrataError::Commit(CommitError::MissingReason) => StatusCode::BAD_REQUEST,
            StrataError::Commit(CommitError::NothingToCommit)
            | StrataError::Commit(CommitError::Ledger(LedgerError::Integrity { .. })) => {
                StatusCode::CONFLICT
            }
            StrataError::Commit(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StrataError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for StrataError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;

#[cfg(test)]
mod tests {
    use super::*;
    use strata_kernel::verify::FailureKind;

    fn integrity() -> LedgerError {
        LedgerError::Integrity {
            index: 3,
            kind: FailureKind::IndexMismatch,
        }
    }

    #[test]
    fn test_integrity_is_conflict_on_every_path() {
        assert_eq!(StrataError::Ledger(integrity()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            StrataError::Commit(CommitError::Ledger(integrity())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StrataError::Commit(CommitError::Ledger(LedgerError::Poisoned)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_commit_rejections() {
        assert_eq!(
            StrataError::Commit(CommitError::MissingReason).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StrataError::Commit(CommitError::NothingToCommit).status_code(),
            StatusCode::CONFLICT
        );
    }
}
