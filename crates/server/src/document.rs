//! Estimate documents.
//!
//! Estimates are rendered to HTML with an embedded Tera template and converted
//! to PDF with wkhtmltopdf when it is installed and enabled. Any conversion
//! failure falls back to the HTML rendering.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use estimator_core::config::DocumentConfig;
use estimator_core::domain::estimate::Estimate;
use estimator_core::domain::service::display_name;
use estimator_core::engine::rounding;
use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

const TEMPLATE_NAME: &str = "estimate.html";

pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
    tera.register_filter("display_name", tera_display_name_filter);
}

/// Formats a decimal (string or number) with two places: `amount | money`.
fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(raw) => Decimal::from_str(raw)
            .map_err(|error| tera::Error::msg(format!("money filter got `{raw}`: {error}")))?,
        tera::Value::Number(number) => Decimal::from_str(&number.to_string())
            .map_err(|error| tera::Error::msg(format!("money filter got `{number}`: {error}")))?,
        tera::Value::Null => Decimal::ZERO,
        other => return Err(tera::Error::msg(format!("money filter cannot format `{other}`"))),
    };
    Ok(tera::Value::String(rounding::money(amount).to_string()))
}

fn tera_display_name_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let name = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("display_name filter expects a string input"))?;
    Ok(tera::Value::String(display_name(name)))
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders estimates for download.
#[derive(Clone, Debug)]
pub struct DocumentRenderer {
    tera: Tera,
    company_name: String,
    wkhtmltopdf_path: Option<PathBuf>,
}

impl DocumentRenderer {
    pub fn new(config: &DocumentConfig) -> Result<Self, DocumentError> {
        let wkhtmltopdf_path =
            if config.pdf_enabled { which::which("wkhtmltopdf").ok() } else { None };

        match &wkhtmltopdf_path {
            Some(path) => info!(
                event_name = "system.document.pdf_available",
                path = %path.display(),
                "wkhtmltopdf found"
            ),
            None if config.pdf_enabled => warn!(
                event_name = "system.document.pdf_unavailable",
                "wkhtmltopdf not found in PATH - estimate documents will be served as HTML"
            ),
            None => info!(
                event_name = "system.document.pdf_disabled",
                "PDF conversion disabled by configuration"
            ),
        }

        Self::with_converter(config.company_name.clone(), wkhtmltopdf_path)
    }

    pub fn with_converter(
        company_name: impl Into<String>,
        wkhtmltopdf_path: Option<PathBuf>,
    ) -> Result<Self, DocumentError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_template(TEMPLATE_NAME, include_str!("../templates/estimate.html.tera"))
            .map_err(|error| DocumentError::Template(error.to_string()))?;

        Ok(Self { tera, company_name: company_name.into(), wkhtmltopdf_path })
    }

    pub fn pdf_available(&self) -> bool {
        self.wkhtmltopdf_path.is_some()
    }

    pub fn render_html(&self, estimate: &Estimate) -> Result<String, DocumentError> {
        let view = DocumentView::from_estimate(estimate, &self.company_name);
        let context = Context::from_serialize(&view)
            .map_err(|error| DocumentError::Template(error.to_string()))?;

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|error| DocumentError::Template(error.to_string()))
    }

    /// PDF bytes when a converter is configured, HTML otherwise.
    pub async fn render(&self, estimate: &Estimate) -> Result<RenderedDocument, DocumentError> {
        let html = self.render_html(estimate)?;
        let file_stem = estimate.snapshot_file_name().trim_end_matches(".json").to_string();

        if let Some(wkhtmltopdf) = &self.wkhtmltopdf_path {
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(bytes) => {
                    return Ok(RenderedDocument::Pdf {
                        file_name: format!("{file_stem}.pdf"),
                        bytes,
                    })
                }
                Err(error) => {
                    warn!(
                        event_name = "document.pdf_fallback",
                        error = %error,
                        "PDF conversion failed, falling back to HTML"
                    );
                }
            }
        }

        Ok(RenderedDocument::Html { file_name: format!("{file_stem}.html"), html })
    }
}

async fn convert_html_to_pdf(
    html: &str,
    wkhtmltopdf_path: &Path,
) -> Result<Vec<u8>, DocumentError> {
    let temp_dir = std::env::temp_dir();
    let html_path = temp_dir.join(format!("estimate_{}.html", uuid::Uuid::new_v4()));
    let pdf_path = temp_dir.join(format!("estimate_{}.pdf", uuid::Uuid::new_v4()));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .args(["--page-size", "A4", "--encoding", "utf-8", "--quiet"])
        .args(["--margin-top", "10mm", "--margin-bottom", "10mm"])
        .args(["--margin-left", "10mm", "--margin-right", "10mm"])
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let result = match output {
        Ok(output) if output.status.success() => {
            tokio::fs::read(&pdf_path).await.map_err(Into::into)
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(event_name = "document.pdf_failed", stderr = %stderr, "wkhtmltopdf failed");
            Err(DocumentError::Conversion(stderr))
        }
        Err(error) => Err(DocumentError::Io(error)),
    };

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    if let Ok(bytes) = &result {
        info!(event_name = "document.pdf_generated", size = bytes.len(), "PDF generated");
    }
    result
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedDocument {
    Pdf { file_name: String, bytes: Vec<u8> },
    Html { file_name: String, html: String },
}

impl RenderedDocument {
    pub fn file_name(&self) -> &str {
        match self {
            Self::Pdf { file_name, .. } | Self::Html { file_name, .. } => file_name,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf { .. } => "application/pdf",
            Self::Html { .. } => "text/html; charset=utf-8",
        }
    }
}

impl IntoResponse for RenderedDocument {
    fn into_response(self) -> Response {
        let content_type = self.content_type();
        let disposition = format!("attachment; filename=\"{}\"", self.file_name());
        let body = match self {
            Self::Pdf { bytes, .. } => Body::from(bytes),
            Self::Html { html, .. } => Body::from(html),
        };

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
struct DocumentView {
    company_name: String,
    estimator: String,
    date: String,
    customer: Vec<CustomerFieldView>,
    services: Vec<ServiceView>,
    grand_total: Decimal,
}

#[derive(Debug, Serialize)]
struct CustomerFieldView {
    label: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct ServiceView {
    name: String,
    total: Decimal,
    answers: Vec<AnswerView>,
    base_price: Decimal,
    multiplier: Decimal,
    show_multiplier: bool,
    labor_cost: Decimal,
    material_cost: Decimal,
    show_materials: bool,
}

#[derive(Debug, Serialize)]
struct AnswerView {
    question: String,
    choice: String,
}

impl DocumentView {
    fn from_estimate(estimate: &Estimate, company_name: &str) -> Self {
        let customer = estimate
            .customer
            .fields()
            .into_iter()
            .filter_map(|(label, value)| {
                value.map(|value| CustomerFieldView { label, value: value.to_string() })
            })
            .collect();

        let services = estimate
            .services
            .iter()
            .map(|(name, service)| {
                let breakdown = &service.breakdown;
                ServiceView {
                    name: name.clone(),
                    total: breakdown.total,
                    answers: service
                        .answers
                        .iter()
                        .map(|(question, choice)| AnswerView {
                            question: question.clone(),
                            choice: choice.clone(),
                        })
                        .collect(),
                    base_price: breakdown.base_price,
                    multiplier: breakdown.multiplier.normalize(),
                    show_multiplier: breakdown.multiplier > Decimal::ONE,
                    labor_cost: breakdown.labor_cost,
                    material_cost: breakdown.material_cost,
                    show_materials: breakdown.material_cost > Decimal::ZERO,
                }
            })
            .collect();

        Self {
            company_name: company_name.to_string(),
            estimator: estimate.estimator.clone(),
            date: estimate.timestamp.format("%Y-%m-%d %I:%M %p").to_string(),
            customer,
            services,
            grand_total: estimate.summary.grand_total,
        }
    }
}
