use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::answer::Answer;
use crate::domain::customer::CustomerInfo;

/// Cost detail for one evaluated service. Values are already rounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub base_price: Decimal,
    pub multiplier: Decimal,
    pub labor_cost: Decimal,
    pub units: Decimal,
    pub unit: Option<String>,
    pub material_cost: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_labor: Decimal,
    pub total_material: Decimal,
    pub grand_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEstimate {
    /// Question prompt mapped to the recorded answer text, in question order.
    #[serde(with = "crate::domain::ordered_map")]
    pub answers: Vec<(String, String)>,
    pub breakdown: Breakdown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub customer: CustomerInfo,
    pub timestamp: DateTime<Utc>,
    pub estimator: String,
    /// Service name mapped to its answers and breakdown, in selection order.
    #[serde(with = "crate::domain::ordered_map")]
    pub services: Vec<(String, ServiceEstimate)>,
    pub summary: Summary,
}

impl Estimate {
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|(name, _)| name.as_str())
    }

    pub fn service(&self, name: &str) -> Option<&ServiceEstimate> {
        self.services.iter().find(|(service, _)| service == name).map(|(_, estimate)| estimate)
    }

    /// Flattened, append-only persistence row.
    pub fn to_record(&self) -> EstimateRecord {
        EstimateRecord {
            timestamp: self.timestamp,
            estimator: self.estimator.clone(),
            customer_name: self.customer.name.clone(),
            customer_email: self.customer.email.clone(),
            customer_phone: self.customer.phone.clone(),
            services: self.service_names().collect::<Vec<_>>().join(", "),
            grand_total: self.summary.grand_total,
            total_labor: self.summary.total_labor,
            total_material: self.summary.total_material,
        }
    }

    pub fn to_snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_snapshot_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn snapshot_file_name(&self) -> String {
        format!("estimate_{}.json", self.timestamp.format("%Y%m%d_%H%M%S"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub timestamp: DateTime<Utc>,
    pub estimator: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Comma-joined service names in selection order.
    pub services: String,
    pub grand_total: Decimal,
    pub total_labor: Decimal,
    pub total_material: Decimal,
}

impl EstimateRecord {
    /// Row cells in column order, missing values as empty strings.
    pub fn cells(&self) -> [String; 9] {
        [
            self.timestamp.to_rfc3339(),
            self.estimator.clone(),
            self.customer_name.clone().unwrap_or_default(),
            self.customer_email.clone().unwrap_or_default(),
            self.customer_phone.clone().unwrap_or_default(),
            self.services.clone(),
            self.grand_total.to_string(),
            self.total_labor.to_string(),
            self.total_material.to_string(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAnswers {
    pub service: String,
    pub answers: Vec<Answer>,
}

/// One submission: who is estimating, for whom, and the answered services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub estimator: String,
    #[serde(default)]
    pub customer: CustomerInfo,
    pub services: Vec<ServiceAnswers>,
}
