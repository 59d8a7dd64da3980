//! Tracked products and the tracking request payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    pub desired_price: f64,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Where a product's last observed price stands against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStatus {
    /// Not checked yet
    Pending,
    Monitoring,
    TargetReached,
}

impl PriceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PriceStatus::Pending => "PENDING",
            PriceStatus::Monitoring => "MONITORING",
            PriceStatus::TargetReached => "TARGET REACHED",
        }
    }
}

impl fmt::Display for PriceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Product {
    /// A missing or zero current price counts as not yet checked.
    pub fn price_status(&self) -> PriceStatus {
        match self.current_price {
            None => PriceStatus::Pending,
            Some(price) if price == 0.0 => PriceStatus::Pending,
            Some(price) if price <= self.desired_price => PriceStatus::TargetReached,
            Some(_) => PriceStatus::Monitoring,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed Product")
    }
}

/// `POST /track` body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub url: String,
    pub desired_price: f64,
    pub user_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackResponse {
    #[serde(default)]
    pub message: Option<String>,
}
