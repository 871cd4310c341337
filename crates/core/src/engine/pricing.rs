use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::answer::{Answer, Selection};
use crate::domain::estimate::{Breakdown, ServiceEstimate, Summary};
use crate::domain::service::{OptionFactor, Question, QuestionKind, ServiceDefinition};
use crate::engine::rounding;
use crate::errors::EstimateError;

/// How `units` is resolved when a service has more than one quantity question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitsPolicy {
    /// Each quantity answer overwrites the previous one.
    LastWins,
    /// Quantity answers accumulate.
    Sum,
}

pub const DEFAULT_UNITS_POLICY: UnitsPolicy = UnitsPolicy::LastWins;

impl Default for UnitsPolicy {
    fn default() -> Self {
        DEFAULT_UNITS_POLICY
    }
}

/// A question answer after validation, with the text recorded for export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAnswer {
    pub prompt: String,
    pub text: String,
    pub selection: Selection,
}

pub trait PricingEngine: Send + Sync {
    fn evaluate(
        &self,
        service: &ServiceDefinition,
        answers: &[Answer],
    ) -> Result<ServiceEstimate, EstimateError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingEngine {
    units_policy: UnitsPolicy,
}

impl DeterministicPricingEngine {
    pub fn new(units_policy: UnitsPolicy) -> Self {
        Self { units_policy }
    }

    pub fn units_policy(&self) -> UnitsPolicy {
        self.units_policy
    }
}

impl PricingEngine for DeterministicPricingEngine {
    fn evaluate(
        &self,
        service: &ServiceDefinition,
        answers: &[Answer],
    ) -> Result<ServiceEstimate, EstimateError> {
        let resolved = resolve_answers(service, answers)?;
        let selections = resolved.iter().map(|answer| answer.selection).collect::<Vec<_>>();
        let breakdown = compute_breakdown(service, &selections, self.units_policy)?;

        Ok(ServiceEstimate {
            answers: resolved.into_iter().map(|answer| (answer.prompt, answer.text)).collect(),
            breakdown,
        })
    }
}

/// Checks one answer per question, in order, and resolves each into a
/// [`Selection`]. Fails on the first invalid answer.
pub fn resolve_answers(
    service: &ServiceDefinition,
    answers: &[Answer],
) -> Result<Vec<ResolvedAnswer>, EstimateError> {
    if answers.len() != service.questions.len() {
        return Err(EstimateError::AnswerCountMismatch {
            service: service.name.clone(),
            expected: service.questions.len(),
            actual: answers.len(),
        });
    }

    service
        .questions
        .iter()
        .zip(answers)
        .map(|(question, answer)| resolve_answer(service, question, answer))
        .collect()
}

fn resolve_answer(
    service: &ServiceDefinition,
    question: &Question,
    answer: &Answer,
) -> Result<ResolvedAnswer, EstimateError> {
    let invalid_selection = |selection: String| EstimateError::InvalidSelection {
        service: service.name.clone(),
        prompt: question.prompt.clone(),
        selection,
    };
    let invalid_quantity = |quantity: Option<Decimal>| EstimateError::InvalidQuantity {
        service: service.name.clone(),
        prompt: question.prompt.clone(),
        quantity,
    };

    match (question.kind(), answer) {
        (QuestionKind::Factor, Answer::Option { label }) => {
            let (option_index, option) =
                question.find_option(label).ok_or_else(|| invalid_selection(label.clone()))?;
            let factor = option.factor.value().ok_or_else(|| invalid_selection(label.clone()))?;
            Ok(ResolvedAnswer {
                prompt: question.prompt.clone(),
                text: option.label.clone(),
                selection: Selection::FactorChoice { option_index, factor },
            })
        }
        (QuestionKind::Factor, Answer::Custom { quantity }) => {
            Err(invalid_selection(format!("custom quantity {quantity}")))
        }
        (QuestionKind::Quantity, Answer::Option { label }) => {
            let (_, option) =
                question.find_option(label).ok_or_else(|| invalid_selection(label.clone()))?;
            match option.factor {
                OptionFactor::Factor(value) => Ok(ResolvedAnswer {
                    prompt: question.prompt.clone(),
                    text: option.label.clone(),
                    selection: Selection::QuantityChoice { value, custom: false },
                }),
                // The custom branch needs a number, not just its label.
                OptionFactor::Custom => Err(invalid_quantity(None)),
            }
        }
        (QuestionKind::Quantity, Answer::Custom { quantity }) => {
            if *quantity <= Decimal::ZERO {
                return Err(invalid_quantity(Some(*quantity)));
            }
            Ok(ResolvedAnswer {
                prompt: question.prompt.clone(),
                text: format!("{} {} (custom)", quantity.normalize(), service.unit),
                selection: Selection::QuantityChoice { value: *quantity, custom: true },
            })
        }
    }
}

/// Turns validated selections into a rounded [`Breakdown`]. Arithmetic that
/// leaves the `Decimal` range fails with [`EstimateError::AmountOutOfRange`].
pub fn compute_breakdown(
    service: &ServiceDefinition,
    selections: &[Selection],
    units_policy: UnitsPolicy,
) -> Result<Breakdown, EstimateError> {
    let out_of_range = || EstimateError::AmountOutOfRange(service.name.clone());
    let mut multiplier = Decimal::ONE;
    let mut units = Decimal::ZERO;

    for selection in selections {
        match *selection {
            Selection::FactorChoice { factor, .. } => {
                multiplier = multiplier.checked_mul(factor).ok_or_else(out_of_range)?;
            }
            Selection::QuantityChoice { value, .. } => match units_policy {
                UnitsPolicy::LastWins => units = value,
                UnitsPolicy::Sum => units = units.checked_add(value).ok_or_else(out_of_range)?,
            },
        }
    }

    let has_units = units > Decimal::ZERO;
    let labor_cost =
        rounding::money(service.base_price.checked_mul(multiplier).ok_or_else(out_of_range)?);
    let material_cost = if has_units {
        rounding::money(units.checked_mul(service.price_per_unit).ok_or_else(out_of_range)?)
    } else {
        rounding::money(Decimal::ZERO)
    };

    Ok(Breakdown {
        base_price: service.base_price,
        multiplier: rounding::multiplier(multiplier),
        labor_cost,
        units: rounding::units(units),
        unit: has_units.then(|| service.unit.clone()),
        material_cost,
        total: labor_cost.checked_add(material_cost).ok_or_else(out_of_range)?,
    })
}

/// Sums labor and material across breakdowns. Empty input yields zeros.
pub fn aggregate<'a, I>(breakdowns: I) -> Result<Summary, EstimateError>
where
    I: IntoIterator<Item = &'a Breakdown>,
{
    let out_of_range = || EstimateError::AmountOutOfRange(SUMMARY_SCOPE.to_string());
    let mut total_labor = Decimal::ZERO;
    let mut total_material = Decimal::ZERO;
    for breakdown in breakdowns {
        total_labor = total_labor.checked_add(breakdown.labor_cost).ok_or_else(out_of_range)?;
        total_material =
            total_material.checked_add(breakdown.material_cost).ok_or_else(out_of_range)?;
    }

    let total_labor = rounding::money(total_labor);
    let total_material = rounding::money(total_material);
    let grand_total = total_labor.checked_add(total_material).ok_or_else(out_of_range)?;
    Ok(Summary { total_labor, total_material, grand_total })
}

const SUMMARY_SCOPE: &str = "estimate summary";

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        aggregate, compute_breakdown, resolve_answers, DeterministicPricingEngine, PricingEngine,
        UnitsPolicy, DEFAULT_UNITS_POLICY,
    };
    use crate::domain::answer::{Answer, Selection};
    use crate::domain::estimate::Breakdown;
    use crate::domain::service::{AnswerOption, Question, QuestionKind, ServiceDefinition};
    use crate::engine::catalog::Catalog;
    use crate::errors::EstimateError;

    fn drywall() -> ServiceDefinition {
        Catalog::builtin().lookup("drywall repair").expect("drywall").clone()
    }

    fn money(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn drywall_medium_patch_with_texture() {
        let result = DeterministicPricingEngine::default()
            .evaluate(
                &drywall(),
                &[
                    Answer::option("Medium patch (1–4 sq ft)"),
                    Answer::option("Yes"),
                    Answer::option("No"),
                    Answer::option("No"),
                ],
            )
            .expect("valid answers");

        let breakdown = &result.breakdown;
        assert_eq!(breakdown.multiplier, Decimal::new(15, 1));
        assert_eq!(breakdown.units, Decimal::new(30, 1));
        assert_eq!(breakdown.unit.as_deref(), Some("sq ft"));
        assert_eq!(breakdown.labor_cost, money(12750));
        assert_eq!(breakdown.material_cost, money(7500));
        assert_eq!(breakdown.total, money(20250));
        assert_eq!(breakdown.total.to_string(), "202.50");
        assert_eq!(
            result.answers[0],
            ("How large is the damaged area?".to_string(), "Medium patch (1–4 sq ft)".to_string())
        );
    }

    #[test]
    fn custom_area_sets_units_and_records_descriptive_answer() {
        let result = DeterministicPricingEngine::default()
            .evaluate(
                &drywall(),
                &[
                    Answer::custom(Decimal::new(125, 1)),
                    Answer::option("No"),
                    Answer::option("Yes, match existing color"),
                    Answer::option("Yes"),
                ],
            )
            .expect("valid answers");

        let breakdown = &result.breakdown;
        // 2.0 * 1.3
        assert_eq!(breakdown.multiplier, Decimal::new(26, 1));
        assert_eq!(breakdown.labor_cost, money(22100));
        assert_eq!(breakdown.units, Decimal::new(125, 1));
        assert_eq!(breakdown.material_cost, money(31250));
        assert_eq!(breakdown.total, money(53350));
        assert_eq!(result.answers[0].1, "12.5 sq ft (custom)");
    }

    #[test]
    fn default_answers_keep_multiplier_at_or_above_each_factor_used() {
        for service in Catalog::builtin().services() {
            let answers = service
                .questions
                .iter()
                .map(|question| {
                    Answer::option(question.default_option().expect("default option").label.clone())
                })
                .collect::<Vec<_>>();

            let resolved = resolve_answers(service, &answers).expect("defaults resolve");
            let result =
                DeterministicPricingEngine::default().evaluate(service, &answers).expect("valid");

            for answer in &resolved {
                if let Selection::FactorChoice { factor, .. } = answer.selection {
                    assert!(result.breakdown.multiplier >= factor, "{}", service.name);
                }
            }
            if result.breakdown.units == Decimal::ZERO {
                assert_eq!(result.breakdown.total, result.breakdown.labor_cost);
            }
        }
    }

    #[test]
    fn service_without_quantity_question_prices_labor_only() {
        let service = ServiceDefinition {
            name: "fixture swap".to_string(),
            questions: vec![Question::new(
                "How many fixtures?",
                vec![
                    AnswerOption::factor("One", Decimal::ONE),
                    AnswerOption::factor("Several", Decimal::new(25, 1)),
                ],
            )],
            base_price: money(9999),
            price_per_unit: money(1000),
            unit: "each".to_string(),
            custom_size_prompt: String::new(),
        };

        let result = DeterministicPricingEngine::default()
            .evaluate(&service, &[Answer::option("Several")])
            .expect("valid");

        assert_eq!(result.breakdown.units, Decimal::ZERO);
        assert_eq!(result.breakdown.unit, None);
        assert_eq!(result.breakdown.material_cost, money(0));
        // 99.99 * 2.5 = 249.975
        assert_eq!(result.breakdown.labor_cost, money(24998));
        assert_eq!(result.breakdown.total, result.breakdown.labor_cost);
    }

    #[test]
    fn unknown_label_is_invalid_selection() {
        let error = DeterministicPricingEngine::default()
            .evaluate(
                &drywall(),
                &[
                    Answer::option("Small patch (under 1 sq ft)"),
                    Answer::option("Maybe"),
                    Answer::option("No"),
                    Answer::option("No"),
                ],
            )
            .expect_err("unknown label");

        assert_eq!(
            error,
            EstimateError::InvalidSelection {
                service: "drywall repair".to_string(),
                prompt: "Is texture matching required?".to_string(),
                selection: "Maybe".to_string(),
            }
        );
    }

    #[test]
    fn custom_answer_on_factor_question_is_invalid_selection() {
        let error = resolve_answers(
            &drywall(),
            &[
                Answer::option("Small patch (under 1 sq ft)"),
                Answer::custom(Decimal::TWO),
                Answer::option("No"),
                Answer::option("No"),
            ],
        )
        .expect_err("custom on factor question");

        assert!(matches!(error, EstimateError::InvalidSelection { .. }));
    }

    #[test]
    fn zero_negative_or_missing_custom_quantity_is_invalid_quantity() {
        for first in [
            Answer::custom(Decimal::ZERO),
            Answer::custom(Decimal::new(-5, 0)),
            Answer::option("Over 10 sq ft (custom)"),
        ] {
            let error = resolve_answers(
                &drywall(),
                &[first, Answer::option("No"), Answer::option("No"), Answer::option("No")],
            )
            .expect_err("invalid quantity");

            assert!(
                matches!(
                    error,
                    EstimateError::InvalidQuantity { ref prompt, .. }
                        if prompt == "How large is the damaged area?"
                ),
                "unexpected error: {error:?}"
            );
        }
    }

    #[test]
    fn largest_custom_quantity_is_out_of_range_under_every_policy() {
        let huge: Decimal = "79228162514264337593543950335".parse().expect("decimal max");
        assert_eq!(huge, Decimal::MAX);

        for policy in [UnitsPolicy::LastWins, UnitsPolicy::Sum] {
            let error = DeterministicPricingEngine::new(policy)
                .evaluate(
                    &drywall(),
                    &[
                        Answer::custom(huge),
                        Answer::option("No"),
                        Answer::option("No"),
                        Answer::option("No"),
                    ],
                )
                .expect_err("material cost overflows");

            assert_eq!(error, EstimateError::AmountOutOfRange("drywall repair".to_string()));
        }
    }

    #[test]
    fn aggregate_rejects_totals_beyond_decimal_range() {
        let breakdown = Breakdown {
            base_price: Decimal::ONE,
            multiplier: Decimal::ONE,
            labor_cost: Decimal::MAX,
            units: Decimal::ZERO,
            unit: None,
            material_cost: Decimal::ZERO,
            total: Decimal::MAX,
        };

        let error = aggregate([&breakdown, &breakdown]).expect_err("labor sum overflows");
        assert_eq!(error, EstimateError::AmountOutOfRange("estimate summary".to_string()));
    }

    #[test]
    fn answer_count_must_match_question_count() {
        let error = resolve_answers(&drywall(), &[Answer::option("Small patch (under 1 sq ft)")])
            .expect_err("too few answers");

        assert_eq!(
            error,
            EstimateError::AnswerCountMismatch {
                service: "drywall repair".to_string(),
                expected: 4,
                actual: 1,
            }
        );
    }

    #[test]
    fn last_quantity_question_wins_by_default() {
        let service = ServiceDefinition {
            name: "patio".to_string(),
            questions: vec![
                Question::new(
                    "Slab area?",
                    vec![
                        AnswerOption::factor("Small", Decimal::TEN),
                        AnswerOption::custom("Custom"),
                    ],
                ),
                Question::new(
                    "Walkway area?",
                    vec![
                        AnswerOption::factor("Short", Decimal::TWO),
                        AnswerOption::custom("Custom"),
                    ],
                ),
            ],
            base_price: money(10000),
            price_per_unit: money(500),
            unit: "sq ft".to_string(),
            custom_size_prompt: "Enter area:".to_string(),
        };
        assert!(service.questions.iter().all(|question| question.kind() == QuestionKind::Quantity));

        let selections = [
            Selection::QuantityChoice { value: Decimal::TEN, custom: false },
            Selection::QuantityChoice { value: Decimal::TWO, custom: false },
        ];

        assert_eq!(DEFAULT_UNITS_POLICY, UnitsPolicy::LastWins);
        let last_wins =
            compute_breakdown(&service, &selections, DEFAULT_UNITS_POLICY).expect("in range");
        assert_eq!(last_wins.units, Decimal::TWO);
        assert_eq!(last_wins.material_cost, money(1000));

        let summed =
            compute_breakdown(&service, &selections, UnitsPolicy::Sum).expect("in range");
        assert_eq!(summed.units, Decimal::from(12));
        assert_eq!(summed.material_cost, money(6000));
    }

    #[test]
    fn aggregate_sums_independently_and_ignores_order() {
        let engine = DeterministicPricingEngine::default();
        let catalog = Catalog::builtin();
        let drywall = engine
            .evaluate(
                catalog.lookup("drywall repair").expect("drywall"),
                &[
                    Answer::option("Medium patch (1–4 sq ft)"),
                    Answer::option("Yes"),
                    Answer::option("No"),
                    Answer::option("No"),
                ],
            )
            .expect("drywall valid")
            .breakdown;
        let painting = engine
            .evaluate(
                catalog.lookup("interior painting").expect("painting"),
                &[
                    Answer::custom(Decimal::from(450)),
                    Answer::option("2 colors"),
                    Answer::option("Yes"),
                    Answer::option("Heavy"),
                ],
            )
            .expect("painting valid")
            .breakdown;

        // 150 * 1.3 * 1.4 * 1.8 = 491.40 labor, 450 * 2.50 = 1125.00 material
        assert_eq!(painting.multiplier, Decimal::new(3276, 3));
        assert_eq!(painting.labor_cost, money(49140));
        assert_eq!(painting.material_cost, money(112500));

        let forward = aggregate([&drywall, &painting]).expect("in range");
        let backward = aggregate([&painting, &drywall]).expect("in range");

        assert_eq!(forward, backward);
        assert_eq!(forward.total_labor, drywall.labor_cost + painting.labor_cost);
        assert_eq!(forward.total_material, drywall.material_cost + painting.material_cost);
        assert_eq!(forward.grand_total, drywall.total + painting.total);
        assert_eq!(forward.grand_total, money(181890));
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        let none: Vec<Breakdown> = Vec::new();
        let summary = aggregate(&none).expect("empty sum");
        assert_eq!(summary.grand_total, Decimal::ZERO);
        assert_eq!(summary.total_labor.to_string(), "0.00");
    }
}
