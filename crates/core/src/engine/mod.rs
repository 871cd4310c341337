pub mod catalog;
pub mod pricing;
pub mod rounding;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::answer::Answer;
use crate::domain::estimate::{Estimate, EstimateRequest, ServiceEstimate};
use crate::errors::EstimateError;

use self::{
    catalog::Catalog,
    pricing::{aggregate, DeterministicPricingEngine, PricingEngine},
};

/// Evaluates complete estimate submissions against a shared, read-only catalog.
pub struct Estimator<P = DeterministicPricingEngine> {
    catalog: Arc<Catalog>,
    pricing_engine: P,
}

impl Estimator<DeterministicPricingEngine> {
    pub fn with_catalog(catalog: Arc<Catalog>) -> Self {
        Self::new(catalog, DeterministicPricingEngine::default())
    }
}

impl<P> Estimator<P> {
    pub fn new(catalog: Arc<Catalog>, pricing_engine: P) -> Self {
        Self { catalog, pricing_engine }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl<P: PricingEngine> Estimator<P> {
    pub fn evaluate_service(
        &self,
        service: &str,
        answers: &[Answer],
    ) -> Result<ServiceEstimate, EstimateError> {
        let definition = self.catalog.lookup(service)?;
        self.pricing_engine.evaluate(definition, answers)
    }

    pub fn estimate(&self, request: EstimateRequest) -> Result<Estimate, EstimateError> {
        self.estimate_at(request, Utc::now())
    }

    /// Evaluates every selected service in request order, then aggregates.
    /// No partial estimate is returned when any service fails.
    pub fn estimate_at(
        &self,
        request: EstimateRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<Estimate, EstimateError> {
        let estimator = request.estimator.trim();
        if estimator.is_empty() {
            return Err(EstimateError::MissingEstimator);
        }
        if request.services.is_empty() {
            return Err(EstimateError::NoServicesSelected);
        }

        let mut seen = HashSet::new();
        let mut services = Vec::with_capacity(request.services.len());
        for selected in &request.services {
            if !seen.insert(selected.service.as_str()) {
                return Err(EstimateError::DuplicateService(selected.service.clone()));
            }
            let evaluated = self.evaluate_service(&selected.service, &selected.answers)?;
            services.push((selected.service.clone(), evaluated));
        }

        let summary = aggregate(services.iter().map(|(_, service)| &service.breakdown))?;

        Ok(Estimate {
            customer: request.customer.normalized(),
            timestamp,
            estimator: estimator.to_string(),
            services,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::Estimator;
    use crate::domain::answer::Answer;
    use crate::domain::customer::CustomerInfo;
    use crate::domain::estimate::{Estimate, EstimateRequest, ServiceAnswers, ServiceEstimate};
    use crate::domain::service::ServiceDefinition;
    use crate::engine::catalog::Catalog;
    use crate::engine::pricing::{DeterministicPricingEngine, PricingEngine, UnitsPolicy};
    use crate::errors::EstimateError;

    fn drywall_answers() -> ServiceAnswers {
        ServiceAnswers {
            service: "drywall repair".to_string(),
            answers: vec![
                Answer::option("Medium patch (1–4 sq ft)"),
                Answer::option("Yes"),
                Answer::option("No"),
                Answer::option("No"),
            ],
        }
    }

    fn flooring_answers() -> ServiceAnswers {
        ServiceAnswers {
            service: "flooring installation".to_string(),
            answers: vec![
                Answer::option("Hardwood"),
                Answer::custom(Decimal::from(220)),
                Answer::option("Leveling"),
            ],
        }
    }

    fn request(services: Vec<ServiceAnswers>) -> EstimateRequest {
        EstimateRequest {
            estimator: " jane ".to_string(),
            customer: CustomerInfo {
                name: Some("Sam Ortiz".to_string()),
                phone: Some(" ".to_string()),
                ..CustomerInfo::default()
            },
            services,
        }
    }

    fn estimator() -> Estimator {
        Estimator::with_catalog(Arc::new(Catalog::builtin()))
    }

    #[test]
    fn estimate_aggregates_independent_services_exactly() {
        let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).single().expect("timestamp");
        let estimate = estimator()
            .estimate_at(request(vec![drywall_answers(), flooring_answers()]), timestamp)
            .expect("valid request");

        assert_eq!(estimate.estimator, "jane");
        assert_eq!(estimate.timestamp, timestamp);
        assert_eq!(estimate.customer.phone, None);
        assert_eq!(
            estimate.service_names().collect::<Vec<_>>(),
            vec!["drywall repair", "flooring installation"]
        );

        let flooring = estimate.service("flooring installation").expect("flooring");
        // 200 * 2.5 * 1.5 = 750.00 labor, 220 * 4.50 = 990.00 material
        assert_eq!(flooring.breakdown.labor_cost, Decimal::new(75000, 2));
        assert_eq!(flooring.breakdown.material_cost, Decimal::new(99000, 2));
        assert_eq!(flooring.answers[1].1, "220 sq ft (custom)");

        let totals: Decimal =
            estimate.services.iter().map(|(_, service)| service.breakdown.total).sum();
        assert_eq!(estimate.summary.grand_total, totals);
        assert_eq!(estimate.summary.grand_total, Decimal::new(194250, 2));
    }

    #[test]
    fn reordering_services_keeps_grand_total() {
        let forward = estimator()
            .estimate(request(vec![drywall_answers(), flooring_answers()]))
            .expect("forward");
        let backward = estimator()
            .estimate(request(vec![flooring_answers(), drywall_answers()]))
            .expect("backward");

        assert_eq!(forward.summary, backward.summary);
        assert_eq!(forward.to_record().services, "drywall repair, flooring installation");
        assert_eq!(backward.to_record().services, "flooring installation, drywall repair");
    }

    #[test]
    fn unknown_service_is_not_found_without_partial_result() {
        let mut services = vec![drywall_answers()];
        services.push(ServiceAnswers { service: "roof repair".to_string(), answers: Vec::new() });

        let error = estimator().estimate(request(services)).expect_err("unknown service");
        assert_eq!(error, EstimateError::ServiceNotFound("roof repair".to_string()));
    }

    #[test]
    fn request_shape_errors() {
        let error = estimator().estimate(request(Vec::new())).expect_err("no services");
        assert_eq!(error, EstimateError::NoServicesSelected);

        let error = estimator()
            .estimate(request(vec![drywall_answers(), drywall_answers()]))
            .expect_err("duplicate");
        assert_eq!(error, EstimateError::DuplicateService("drywall repair".to_string()));

        let mut anonymous = request(vec![drywall_answers()]);
        anonymous.estimator = "  ".to_string();
        let error = estimator().estimate(anonymous).expect_err("no estimator");
        assert_eq!(error, EstimateError::MissingEstimator);
    }

    #[test]
    fn estimate_snapshot_round_trips() {
        let estimate = estimator()
            .estimate(request(vec![drywall_answers(), flooring_answers()]))
            .expect("valid");

        let json = estimate.to_snapshot_json().expect("export");
        let restored = Estimate::from_snapshot_json(&json).expect("re-read");

        assert_eq!(restored.summary, estimate.summary);
        for ((name, original), (restored_name, restored)) in
            estimate.services.iter().zip(&restored.services)
        {
            assert_eq!(name, restored_name);
            assert_eq!(original.breakdown.labor_cost, restored.breakdown.labor_cost);
            assert_eq!(original.breakdown.material_cost, restored.breakdown.material_cost);
            assert_eq!(original.breakdown.total, restored.breakdown.total);
        }
    }

    #[test]
    fn estimator_accepts_alternate_pricing_engines() {
        struct FlatPricingEngine;

        impl PricingEngine for FlatPricingEngine {
            fn evaluate(
                &self,
                service: &ServiceDefinition,
                answers: &[Answer],
            ) -> Result<ServiceEstimate, EstimateError> {
                DeterministicPricingEngine::new(UnitsPolicy::Sum).evaluate(service, answers)
            }
        }

        let estimator = Estimator::new(Arc::new(Catalog::builtin()), FlatPricingEngine);
        let result = estimator
            .evaluate_service("drywall repair", &drywall_answers().answers)
            .expect("valid");
        assert_eq!(result.breakdown.total, Decimal::new(20250, 2));
    }
}
