use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use rent_payment_engine::PaymentEngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("The request was rejected. {0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentEngineError> for ServerError {
    fn from(e: PaymentEngineError) -> Self {
        match e {
            PaymentEngineError::RequestNotFound(_) | PaymentEngineError::TransactionNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentEngineError::RequestNotActive { .. }
            | PaymentEngineError::RequestExpired(_)
            | PaymentEngineError::PayloadMismatch(_)
            | PaymentEngineError::InvalidAmount(_)
            | PaymentEngineError::InvalidExpiry(_)
            | PaymentEngineError::InvalidPeriod(_, _)
            | PaymentEngineError::PayloadError(_)
            | PaymentEngineError::ProviderRejected(_)
            | PaymentEngineError::ProviderError(_)
            | PaymentEngineError::TransactionAlreadyExists(_) => Self::ValidationError(e.to_string()),
            PaymentEngineError::DatabaseError(_) | PaymentEngineError::TenantError(_) => {
                Self::BackendError(e.to_string())
            },
        }
    }
}
