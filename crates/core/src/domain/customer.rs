use serde::{Deserialize, Serialize};

/// Optional contact details attached to an estimate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl CustomerInfo {
    /// Trims every field and turns blank values into `None`.
    pub fn normalized(self) -> Self {
        Self {
            name: non_blank(self.name),
            phone: non_blank(self.phone),
            email: non_blank(self.email),
            address: non_blank(self.address),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_none())
    }

    /// Labelled fields in display order.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("name", self.name.as_deref()),
            ("phone", self.phone.as_deref()),
            ("email", self.email.as_deref()),
            ("address", self.address.as_deref()),
        ]
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::CustomerInfo;

    #[test]
    fn blank_fields_normalize_to_none() {
        let customer = CustomerInfo {
            name: Some("  Dana Reyes ".to_string()),
            phone: Some("   ".to_string()),
            email: Some(String::new()),
            address: None,
        }
        .normalized();

        assert_eq!(customer.name.as_deref(), Some("Dana Reyes"));
        assert!(customer.phone.is_none());
        assert!(customer.email.is_none());
        assert!(!customer.is_empty());
        assert!(CustomerInfo::default().is_empty());
    }
}
