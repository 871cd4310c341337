use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Caller-supplied answer to one question, in question order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// Pick an offered option by its exact label.
    Option { label: String },
    /// Take the custom branch of a quantity question.
    Custom { quantity: Decimal },
}

impl Answer {
    pub fn option(label: impl Into<String>) -> Self {
        Self::Option { label: label.into() }
    }

    pub fn custom(quantity: Decimal) -> Self {
        Self::Custom { quantity }
    }
}

/// An answer after it has been checked against its question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// Index of the chosen option on a factor question.
    FactorChoice { option_index: usize, factor: Decimal },
    /// Unit count from a quantity question, either the option's own value
    /// or a custom quantity.
    QuantityChoice { value: Decimal, custom: bool },
}
