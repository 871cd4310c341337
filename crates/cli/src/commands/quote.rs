use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use estimator_core::config::DatabaseConfig;
use estimator_core::domain::estimate::{Estimate, EstimateRequest};
use estimator_core::engine::catalog::Catalog;
use estimator_core::engine::pricing::DeterministicPricingEngine;
use estimator_core::engine::Estimator;
use estimator_core::errors::EstimateError;
use estimator_db::{
    connect_with_config, migrations, EstimateRecordRepository, SqlEstimateRecordRepository,
};
use serde_json::{json, Value};

use crate::commands::{
    block_on, load_config, CommandResult, EXIT_CATALOG, EXIT_INVALID_REQUEST, EXIT_PERSISTENCE,
    EXIT_REJECTED,
};

pub fn run(request_path: &Path, save: bool) -> CommandResult {
    let config = match load_config("quote") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let catalog = match Catalog::from_config(&config.catalog) {
        Ok(catalog) => Arc::new(catalog),
        Err(error) => {
            return CommandResult::failure("quote", "catalog", error.to_string(), EXIT_CATALOG)
        }
    };

    let request = match read_request(request_path) {
        Ok(request) => request,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "invalid_request",
                format!("{error:#}"),
                EXIT_INVALID_REQUEST,
            )
        }
    };

    let estimator =
        Estimator::new(catalog, DeterministicPricingEngine::new(config.catalog.units_policy));
    let estimate = match estimator.estimate(request) {
        Ok(estimate) => estimate,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                rejection_class(&error),
                error.to_string(),
                EXIT_REJECTED,
            )
        }
    };

    let summary = format!(
        "estimated {} for {} service(s)",
        estimate.summary.grand_total,
        estimate.services.len()
    );

    if !save {
        return CommandResult::success_with_data(
            "quote",
            summary,
            Some(json!({ "file_name": estimate.snapshot_file_name(), "estimate": estimate })),
        );
    }

    match block_on("quote", save_record(&config.database, &estimate)) {
        Ok(Ok(record_id)) => CommandResult::success_with_data(
            "quote",
            format!("{summary}; saved as record {record_id}"),
            Some(payload(&estimate, json!({ "persisted": true, "record_id": record_id }))),
        ),
        // The estimate is still printed when the save fails.
        Ok(Err(message)) => CommandResult::failure_with_data(
            "quote",
            "persistence",
            format!("{summary}; record could not be saved: {message}"),
            EXIT_PERSISTENCE,
            Some(payload(&estimate, json!({ "persisted": false, "error": message }))),
        ),
        Err(failure) => failure,
    }
}

fn read_request(path: &Path) -> anyhow::Result<EstimateRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read request file `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| {
        format!("request file `{}` is not a valid estimate request", path.display())
    })
}

async fn save_record(database: &DatabaseConfig, estimate: &Estimate) -> Result<i64, String> {
    let pool = connect_with_config(database).await.map_err(|error| error.to_string())?;
    migrations::run_pending(&pool).await.map_err(|error| error.to_string())?;
    let result = SqlEstimateRecordRepository::new(pool.clone())
        .append(estimate.to_record())
        .await
        .map_err(|error| error.to_string());
    pool.close().await;
    result
}

fn payload(estimate: &Estimate, persistence: Value) -> Value {
    json!({
        "file_name": estimate.snapshot_file_name(),
        "estimate": estimate,
        "persistence": persistence,
    })
}

fn rejection_class(error: &EstimateError) -> &'static str {
    match error {
        EstimateError::ServiceNotFound(_) => "not_found",
        EstimateError::InvalidSelection { .. } => "invalid_selection",
        EstimateError::InvalidQuantity { .. } | EstimateError::AmountOutOfRange(_) => {
            "invalid_quantity"
        }
        EstimateError::AnswerCountMismatch { .. }
        | EstimateError::DuplicateService(_)
        | EstimateError::NoServicesSelected
        | EstimateError::MissingEstimator => "invalid_request",
    }
}
