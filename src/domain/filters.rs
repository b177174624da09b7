//! Structured search filters extracted from free text.
//!
//! Every field is optional: absence means "no constraint", never "false".
//! The filter extractor parses these straight from LLM output, so unknown
//! fields are ignored and a failed parse falls back to `Default`.

use serde::{Deserialize, Serialize};

use super::product::{Brand, PriceRange};

/// Search constraints derived from a user query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub brands: Option<Vec<Brand>>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub price_range: Option<PriceRange>,

    #[serde(default)]
    pub min_ram: Option<u32>,
    #[serde(default)]
    pub min_storage: Option<u32>,
    #[serde(default)]
    pub min_battery: Option<u32>,

    #[serde(default)]
    pub five_g: Option<bool>,
    #[serde(default)]
    pub nfc: Option<bool>,
    #[serde(default)]
    pub wireless_charging: Option<bool>,

    #[serde(default)]
    pub camera_focus: Option<bool>,
    #[serde(default)]
    pub battery_focus: Option<bool>,
    #[serde(default)]
    pub performance_focus: Option<bool>,
    #[serde(default)]
    pub compact_size: Option<bool>,

    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SearchFilters {
    /// True when no constraint, focus, or keyword is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
