pub mod audit;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::answer::{Answer, Selection};
pub use domain::customer::CustomerInfo;
pub use domain::estimate::{
    Breakdown, Estimate, EstimateRecord, EstimateRequest, ServiceAnswers, ServiceEstimate, Summary,
};
pub use domain::service::{AnswerOption, OptionFactor, Question, QuestionKind, ServiceDefinition};
pub use engine::catalog::{Catalog, CatalogError};
pub use engine::pricing::{DeterministicPricingEngine, PricingEngine, UnitsPolicy};
pub use engine::Estimator;
pub use errors::{ApplicationError, EstimateError, InterfaceError};
