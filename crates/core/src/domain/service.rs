use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pricing weight carried by a single answer option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionFactor {
    /// Multiplies labor on factor questions, or sets the unit count on
    /// quantity questions.
    Factor(Decimal),
    /// The caller must supply a numeric quantity instead.
    Custom,
}

impl OptionFactor {
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom)
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Self::Factor(value) => Some(*value),
            Self::Custom => None,
        }
    }
}

/// One selectable answer. On the wire a missing `factor` marks the custom branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AnswerOptionRepr", into = "AnswerOptionRepr")]
pub struct AnswerOption {
    pub label: String,
    pub factor: OptionFactor,
}

impl AnswerOption {
    pub fn factor(label: impl Into<String>, factor: Decimal) -> Self {
        Self { label: label.into(), factor: OptionFactor::Factor(factor) }
    }

    pub fn custom(label: impl Into<String>) -> Self {
        Self { label: label.into(), factor: OptionFactor::Custom }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct AnswerOptionRepr {
    label: String,
    #[serde(default)]
    factor: Option<Decimal>,
}

impl From<AnswerOptionRepr> for AnswerOption {
    fn from(repr: AnswerOptionRepr) -> Self {
        let factor = match repr.factor {
            Some(value) => OptionFactor::Factor(value),
            None => OptionFactor::Custom,
        };
        Self { label: repr.label, factor }
    }
}

impl From<AnswerOption> for AnswerOptionRepr {
    fn from(option: AnswerOption) -> Self {
        Self { label: option.label, factor: option.factor.value() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Every option carries a factor; the answer scales labor.
    Factor,
    /// At least one option is custom; the answer sets the unit count.
    Quantity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn new(prompt: impl Into<String>, options: Vec<AnswerOption>) -> Self {
        Self { prompt: prompt.into(), options }
    }

    pub fn kind(&self) -> QuestionKind {
        if self.options.iter().any(|option| option.factor.is_custom()) {
            QuestionKind::Quantity
        } else {
            QuestionKind::Factor
        }
    }

    pub fn find_option(&self, label: &str) -> Option<(usize, &AnswerOption)> {
        self.options.iter().enumerate().find(|(_, option)| option.label == label)
    }

    /// First option that does not require custom input.
    pub fn default_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|option| !option.factor.is_custom())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub questions: Vec<Question>,
    pub base_price: Decimal,
    pub price_per_unit: Decimal,
    pub unit: String,
    pub custom_size_prompt: String,
}

impl ServiceDefinition {
    /// Title-cased name with underscores shown as spaces.
    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }

    pub fn has_quantity_question(&self) -> bool {
        self.questions.iter().any(|question| question.kind() == QuestionKind::Quantity)
    }
}

pub fn display_name(name: &str) -> String {
    name.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
