use thiserror::Error;

use crate::client_cache::ConfigLookupError;
use crate::ingest::IngestError;
use crate::pricing::PricingError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("validation failure: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("client configuration unavailable: {0}")]
    ConfigurationFetch(String),
    #[error(transparent)]
    Computation(#[from] PricingError),
    #[error(transparent)]
    Ingestion(#[from] IngestError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("unprocessable: {message}")]
    Unprocessable { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::Unprocessable { .. } => {
                "The upload was understood but its contents could not be read."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Unprocessable { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Unprocessable { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Unprocessable { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ConfigLookupError> for ApplicationError {
    fn from(value: ConfigLookupError) -> Self {
        match value {
            ConfigLookupError::NotFound(client_id) => {
                Self::NotFound(format!("client `{client_id}` has no stored configuration"))
            }
            fetch @ ConfigLookupError::Fetch { .. } => Self::ConfigurationFetch(fetch.to_string()),
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::InvariantViolation(message))
            | ApplicationError::Validation(message) => {
                Self::BadRequest { message, correlation_id: unassigned }
            }
            ApplicationError::Ingestion(error @ IngestError::UnsupportedType(_)) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Ingestion(error @ IngestError::Parse { .. }) => {
                Self::Unprocessable { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::NotFound(message) => {
                Self::NotFound { message, correlation_id: unassigned }
            }
            ApplicationError::ConfigurationFetch(message)
            | ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned }
            }
            ApplicationError::Computation(error) => {
                Self::Internal { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned }
            }
        }
    }
}
