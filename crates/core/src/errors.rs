use chrono::NaiveDate;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("no pricing model is registered for `{model_key}`")]
    ModelNotFound { model_key: String },
    #[error("no cost-basis data is available for {date}")]
    CostBasisNotFound { date: NaiveDate },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => {
                "No pricing data exists for the requested item, region, or date."
            }
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message, .. }
            | Self::BadRequest { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::NotFound { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    /// Stable machine-readable class, used in error payloads and CLI output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::BadRequest { .. } => "bad_request",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Internal { .. } => "internal",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(
                error @ (DomainError::ModelNotFound { .. } | DomainError::CostBasisNotFound { .. }),
            ) => Self::NotFound {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(error @ DomainError::InvalidRequest(_)) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn unknown_model_maps_to_not_found_with_reason() {
        let interface = ApplicationError::from(DomainError::ModelNotFound {
            model_key: "DURIAN_Selangor".to_owned(),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::NotFound {
                ref correlation_id,
                ref message,
            } if correlation_id == "req-1" && message.contains("DURIAN_Selangor")
        ));
        assert_eq!(interface.error_class(), "not_found");
    }

    #[test]
    fn missing_cost_basis_maps_to_not_found() {
        let date = NaiveDate::from_ymd_opt(2031, 1, 1).expect("valid date");
        let interface = ApplicationError::from(DomainError::CostBasisNotFound { date })
            .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert!(interface.message().contains("2031-01-01"));
        assert_eq!(
            interface.user_message(),
            "No pricing data exists for the requested item, region, or date."
        );
    }

    #[test]
    fn invalid_request_maps_to_bad_request() {
        let interface = ApplicationError::from(DomainError::InvalidRequest(
            "manual override is missing `usd_lag_60`".to_owned(),
        ))
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("model artifact is corrupt".to_owned())
            .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
