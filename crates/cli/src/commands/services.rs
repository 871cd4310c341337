use estimator_core::engine::catalog::Catalog;
use serde::Serialize;

use crate::commands::{load_config, CommandResult, EXIT_CATALOG};

#[derive(Debug, Serialize)]
struct ServiceEntry {
    name: String,
    display_name: String,
    questions: Vec<String>,
    unit: String,
}

pub fn run(search: Option<&str>) -> CommandResult {
    let config = match load_config("services") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let catalog = match Catalog::from_config(&config.catalog) {
        Ok(catalog) => catalog,
        Err(error) => {
            return CommandResult::failure("services", "catalog", error.to_string(), EXIT_CATALOG)
        }
    };

    let entries: Vec<ServiceEntry> = catalog
        .search(search.unwrap_or_default())
        .into_iter()
        .filter_map(|name| catalog.lookup(name).ok())
        .map(|service| ServiceEntry {
            name: service.name.clone(),
            display_name: service.display_name(),
            questions: service.questions.iter().map(|question| question.prompt.clone()).collect(),
            unit: service.unit.clone(),
        })
        .collect();

    let message = match search {
        Some(term) => format!("{} of {} services match `{term}`", entries.len(), catalog.len()),
        None => format!("{} services in catalog", entries.len()),
    };

    CommandResult::success_with_data("services", message, serde_json::to_value(entries).ok())
}
