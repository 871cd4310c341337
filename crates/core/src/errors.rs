use rust_decimal::Decimal;
use thiserror::Error;

/// Caller input errors raised while evaluating an estimate.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EstimateError {
    #[error("service `{0}` was not found in the catalog")]
    ServiceNotFound(String),
    #[error("`{selection}` is not an option for `{prompt}` in `{service}`")]
    InvalidSelection { service: String, prompt: String, selection: String },
    #[error("`{prompt}` in `{service}` needs a positive custom quantity{}", describe_quantity(.quantity))]
    InvalidQuantity { service: String, prompt: String, quantity: Option<Decimal> },
    #[error("amounts for `{0}` exceed the supported range")]
    AmountOutOfRange(String),
    #[error("`{service}` has {expected} questions but {actual} answers were given")]
    AnswerCountMismatch { service: String, expected: usize, actual: usize },
    #[error("service `{0}` was selected more than once")]
    DuplicateService(String),
    #[error("at least one service must be selected")]
    NoServicesSelected,
    #[error("estimator identity is required")]
    MissingEstimator,
}

fn describe_quantity(quantity: &Option<Decimal>) -> String {
    match quantity {
        Some(value) => format!(" (got {value})"),
        None => " (none given)".to_string(),
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Estimate(#[from] EstimateError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("document failure: {0}")]
    Document(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The estimate could not be computed. Check the answers and try again."
            }
            Self::NotFound { .. } => "The requested service does not exist in the catalog.",
            Self::ServiceUnavailable { .. } => {
                "The estimate could not be saved right now. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
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
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Estimate(error @ EstimateError::ServiceNotFound(_)) => {
                Self::NotFound { message: error.to_string(), correlation_id }
            }
            ApplicationError::Estimate(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Document(message) | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}
