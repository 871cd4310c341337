use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::config::CatalogConfig;
use crate::domain::service::{AnswerOption, OptionFactor, Question, ServiceDefinition};
use crate::errors::EstimateError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog contains no services")]
    Empty,
    #[error("service `{0}` is declared more than once")]
    DuplicateService(String),
    #[error("invalid service definition `{service}`: {reason}")]
    InvalidService { service: String, reason: String },
}

/// Read-only registry of service definitions in declaration order.
#[derive(Clone, Debug)]
pub struct Catalog {
    services: Vec<ServiceDefinition>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    services: Vec<ServiceDefinition>,
}

impl Catalog {
    pub fn new(services: Vec<ServiceDefinition>) -> Result<Self, CatalogError> {
        if services.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for service in &services {
            validate_service(service)?;
            if !seen.insert(service.name.as_str()) {
                return Err(CatalogError::DuplicateService(service.name.clone()));
            }
        }

        Ok(Self { services })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file = toml::from_str::<CatalogFile>(raw)?;
        Self::new(file.services)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    /// Catalog file from config when set, otherwise the built-in services.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        match &config.path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&ServiceDefinition, EstimateError> {
        self.services
            .iter()
            .find(|service| service.name == name)
            .ok_or_else(|| EstimateError::ServiceNotFound(name.to_string()))
    }

    /// Names whose normalized form contains the normalized term. An empty
    /// term matches everything.
    pub fn search(&self, term: &str) -> Vec<&str> {
        let needle = normalize(term.trim());
        self.services
            .iter()
            .filter(|service| normalize(&service.name).contains(&needle))
            .map(|service| service.name.as_str())
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|service| service.name.as_str()).collect()
    }

    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn builtin() -> Self {
        Self { services: builtin_services() }
    }
}

fn normalize(value: &str) -> String {
    value.replace('_', " ").to_lowercase()
}

fn validate_service(service: &ServiceDefinition) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidService {
        service: service.name.clone(),
        reason,
    };

    if service.name.trim().is_empty() {
        return Err(invalid("name must not be empty".to_string()));
    }
    if service.base_price.is_sign_negative() {
        return Err(invalid("base_price must not be negative".to_string()));
    }
    if service.price_per_unit.is_sign_negative() {
        return Err(invalid("price_per_unit must not be negative".to_string()));
    }

    let mut prompts = HashSet::new();
    for question in &service.questions {
        if !prompts.insert(question.prompt.as_str()) {
            return Err(invalid(format!("question `{}` appears more than once", question.prompt)));
        }
        if question.options.is_empty() {
            return Err(invalid(format!("question `{}` has no options", question.prompt)));
        }

        let mut labels = HashSet::new();
        for option in &question.options {
            if !labels.insert(option.label.as_str()) {
                return Err(invalid(format!(
                    "question `{}` repeats option `{}`",
                    question.prompt, option.label
                )));
            }
            if let OptionFactor::Factor(factor) = option.factor {
                if factor <= Decimal::ZERO {
                    return Err(invalid(format!(
                        "option `{}` of `{}` must have a positive factor",
                        option.label, question.prompt
                    )));
                }
            }
        }
    }

    Ok(())
}

fn factor(label: &str, tenths: i64) -> AnswerOption {
    AnswerOption::factor(label, Decimal::new(tenths, 1))
}

fn builtin_services() -> Vec<ServiceDefinition> {
    vec![
        ServiceDefinition {
            name: "drywall repair".to_string(),
            questions: vec![
                Question::new(
                    "How large is the damaged area?",
                    vec![
                        factor("Small patch (under 1 sq ft)", 10),
                        factor("Medium patch (1–4 sq ft)", 30),
                        factor("Large patch (4–10 sq ft)", 70),
                        AnswerOption::custom("Over 10 sq ft (custom)"),
                    ],
                ),
                Question::new(
                    "Is texture matching required?",
                    vec![factor("Yes", 15), factor("No", 10)],
                ),
                Question::new(
                    "Do you want us to paint the patched area?",
                    vec![factor("Yes, match existing color", 20), factor("No", 10)],
                ),
                Question::new(
                    "Is the damage on a ceiling?",
                    vec![factor("Yes", 13), factor("No", 10)],
                ),
            ],
            base_price: Decimal::new(8500, 2),
            price_per_unit: Decimal::new(2500, 2),
            unit: "sq ft".to_string(),
            custom_size_prompt: "Enter the area in square feet:".to_string(),
        },
        ServiceDefinition {
            name: "interior painting".to_string(),
            questions: vec![
                Question::new(
                    "What is the total wall area to paint?",
                    vec![
                        factor("One wall (under 100 sq ft)", 10),
                        factor("One room (100–300 sq ft)", 30),
                        factor("Whole floor (300–600 sq ft)", 60),
                        AnswerOption::custom("Custom size"),
                    ],
                ),
                Question::new(
                    "Number of colors?",
                    vec![
                        factor("1 color", 10),
                        factor("2 colors", 13),
                        factor("3+ colors", 16),
                    ],
                ),
                Question::new("Ceiling painting?", vec![factor("Yes", 14), factor("No", 10)]),
                Question::new(
                    "Prep work needed (holes, cracks)?",
                    vec![factor("Light", 11), factor("Moderate", 14), factor("Heavy", 18)],
                ),
            ],
            base_price: Decimal::new(15000, 2),
            price_per_unit: Decimal::new(250, 2),
            unit: "sq ft".to_string(),
            custom_size_prompt: "Enter total wall area in sq ft:".to_string(),
        },
        ServiceDefinition {
            name: "flooring installation".to_string(),
            questions: vec![
                Question::new(
                    "Flooring type?",
                    vec![
                        factor("Laminate", 10),
                        factor("Vinyl plank", 12),
                        factor("Hardwood", 25),
                        factor("Tile", 30),
                    ],
                ),
                Question::new(
                    "Area to cover?",
                    vec![
                        factor("Small room (<100 sq ft)", 10),
                        factor("Medium (100–300 sq ft)", 30),
                        factor("Large (300+ sq ft)", 60),
                        AnswerOption::custom("Custom"),
                    ],
                ),
                Question::new(
                    "Subfloor prep needed?",
                    vec![
                        factor("No", 10),
                        factor("Leveling", 15),
                        factor("Remove old floor", 20),
                    ],
                ),
            ],
            base_price: Decimal::new(20000, 2),
            price_per_unit: Decimal::new(450, 2),
            unit: "sq ft".to_string(),
            custom_size_prompt: "Enter area in sq ft:".to_string(),
        },
    ]
}
