use log::error;
use rouille::Response;
use thiserror::Error;

use crate::storage::error::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(u64),

    #[error("Timed out")]
    Timeout,

    #[error("{0}")]
    Internal(String),
}

/// A duplicate track id maps to 409 rather than the generic 500 of other
/// storage failures; the batch is still rolled back as a whole.
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateTrack(id) => {
                ApiError::Conflict(format!("track {} already exists", id))
            }

            StorageError::EmptyFilter => ApiError::BadRequest(err.to_string()),

            StorageError::Database(_) | StorageError::Fs(_) | StorageError::Internal(_) => {
                error!("storage failure: {err}");
                ApiError::Internal("failed to access database".into())
            }
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Conflict(_) => 409,
            ApiError::MethodNotAllowed => 405,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::Timeout => 408,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        Response::text(self.to_string()).with_status_code(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(StorageError::DuplicateTrack(3)).status_code(),
            409
        );
        assert_eq!(ApiError::from(StorageError::EmptyFilter).status_code(), 400);
        assert_eq!(ApiError::Timeout.status_code(), 408);
        assert_eq!(
            ApiError::from(StorageError::Internal(anyhow::anyhow!("boom"))).status_code(),
            500
        );
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let err = ApiError::from(StorageError::Internal(anyhow::anyhow!("secret path")));

        assert!(!err.to_string().contains("secret"));
    }
}
