use estimator_db::{
    connect_with_config, migrations, EstimateRecordRepository, SqlEstimateRecordRepository,
};
use serde_json::{json, Value};

use crate::commands::{
    block_on, load_config, CommandResult, EXIT_DB_CONNECTIVITY, EXIT_MIGRATION, EXIT_PERSISTENCE,
};

pub const DEFAULT_LIMIT: u32 = 20;

pub fn run(limit: u32) -> CommandResult {
    let config = match load_config("records") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let result = block_on("records", async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let records = SqlEstimateRecordRepository::new(pool.clone())
            .list_recent(limit.max(1))
            .await
            .map_err(|error| ("persistence", error.to_string(), EXIT_PERSISTENCE))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(records)
    });

    match result {
        Ok(Ok(records)) => {
            let rows: Vec<Value> = records
                .iter()
                .map(|stored| json!({ "id": stored.id, "cells": stored.record.cells() }))
                .collect();
            CommandResult::success_with_data(
                "records",
                format!("{} estimate records", rows.len()),
                Some(Value::Array(rows)),
            )
        }
        Ok(Err((error_class, message, exit_code))) => {
            CommandResult::failure("records", error_class, message, exit_code)
        }
        Err(failure) => failure,
    }
}
