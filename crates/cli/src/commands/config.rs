use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use estimator_core::config::{AppConfig, DEFAULT_CONFIG_PATHS};
use toml::Value;

use crate::commands::{load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_keys, value) in effective_values(&config) {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    CommandResult::success("config", lines.join("\n"))
}

type EffectiveValue = (&'static str, &'static [&'static str], String);

fn entry(
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
) -> EffectiveValue {
    (key_path, env_keys, value)
}

fn effective_values(config: &AppConfig) -> Vec<EffectiveValue> {
    vec![
        entry("database.url", &["ESTIMATOR_DATABASE_URL"], config.database.url.clone()),
        entry(
            "database.max_connections",
            &["ESTIMATOR_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        entry(
            "database.timeout_secs",
            &["ESTIMATOR_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        entry(
            "server.bind_address",
            &["ESTIMATOR_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        entry("server.port", &["ESTIMATOR_SERVER_PORT"], config.server.port.to_string()),
        entry(
            "server.graceful_shutdown_secs",
            &["ESTIMATOR_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        entry(
            "catalog.path",
            &["ESTIMATOR_CATALOG_PATH"],
            config
                .catalog
                .path
                .as_ref()
                .map_or_else(|| "<builtin>".to_string(), |path| path.display().to_string()),
        ),
        entry(
            "catalog.units_policy",
            &["ESTIMATOR_CATALOG_UNITS_POLICY"],
            format!("{:?}", config.catalog.units_policy),
        ),
        entry(
            "document.pdf_enabled",
            &["ESTIMATOR_DOCUMENT_PDF_ENABLED"],
            config.document.pdf_enabled.to_string(),
        ),
        entry(
            "document.company_name",
            &["ESTIMATOR_DOCUMENT_COMPANY_NAME"],
            config.document.company_name.clone(),
        ),
        entry(
            "logging.level",
            &["ESTIMATOR_LOGGING_LEVEL", "ESTIMATOR_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        entry(
            "logging.format",
            &["ESTIMATOR_LOGGING_FORMAT", "ESTIMATOR_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn file_source_is_reported_for_nested_keys() {
        let doc = "[catalog]\nunits_policy = \"sum\"\n".parse::<Value>().expect("toml");

        assert!(contains_path(&doc, "catalog.units_policy"));
        assert!(!contains_path(&doc, "catalog.path"));
        assert_eq!(
            field_source(
                "catalog.units_policy",
                &["ESTIMATOR_TEST_UNSET_KEY"],
                Some(&doc),
                Some("estimator.toml".as_ref()),
            ),
            "file (estimator.toml)"
        );
        assert_eq!(field_source("catalog.path", &[], Some(&doc), None), "default");
    }
}
