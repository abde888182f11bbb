use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::schemas::{BillId, ParticipantId};

/// Admission failures for participants, bills, splits and discounts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("participant name must not be empty")]
    EmptyName,

    #[error("bill total must be a positive amount, got {0}")]
    NonPositiveTotal(f64),

    #[error("split amount must be a positive amount, got {0}")]
    NonPositiveSplit(f64),

    #[error("split amount {amount} exceeds the remaining {remaining}")]
    SplitExceedsRemaining { amount: f64, remaining: f64 },

    #[error("split must name at least one participant")]
    NoParticipants,

    #[error("shares must contain at least one positive weight")]
    NoPositiveShare,

    #[error("share weight for participant {0} must be positive")]
    ZeroShare(ParticipantId),

    #[error("participant {0} is listed more than once")]
    RepeatedParticipant(ParticipantId),

    #[error("discount must be a positive amount, got {0}")]
    NonPositiveDiscount(f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),

    #[error("bill {0} not found")]
    BillNotFound(BillId),

    #[error("bill {bill} references unknown participant {participant}")]
    UnknownParticipant {
        bill: BillId,
        participant: ParticipantId,
    },

    #[error("duplicate participant id {0}")]
    DuplicateParticipant(ParticipantId),

    #[error("duplicate bill id {0}")]
    DuplicateBill(BillId),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors surfaced by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ParticipantNotFound(_) | LedgerError::BillNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            LedgerError::UnknownParticipant { .. } | LedgerError::Validation(_) => {
                ApiError::Validation(err.to_string())
            }
            LedgerError::DuplicateParticipant(_) | LedgerError::DuplicateBill(_) => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            ApiError::Internal(_) => "internal server error".to_string(),
            _ => self.to_string(),
        };
        HttpResponse::build(status).json(serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_statuses() {
        let cases = [
            (LedgerError::ParticipantNotFound(3), StatusCode::NOT_FOUND),
            (LedgerError::BillNotFound("b".into()), StatusCode::NOT_FOUND),
            (
                LedgerError::Validation(ValidationError::EmptyName),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (LedgerError::DuplicateBill("b".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn validation_message_is_transparent() {
        let err = ApiError::from(LedgerError::Validation(ValidationError::NoParticipants));
        assert_eq!(
            err.to_string(),
            "validation error: split must name at least one participant"
        );
    }
}
