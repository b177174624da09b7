//! Catalog product model.
//!
//! Products are created by catalog seeding and read-only everywhere else.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mobile phone brands carried by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Brand {
    Samsung,
    Apple,
    Xiaomi,
    OnePlus,
    Google,
    Oppo,
    Vivo,
    Realme,
    Motorola,
    Nokia,
    #[serde(rename = "iQOO")]
    Iqoo,
    Nothing,
    Poco,
}

impl Brand {
    /// Catalog string form (matches the seeded data).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Samsung => "Samsung",
            Self::Apple => "Apple",
            Self::Xiaomi => "Xiaomi",
            Self::OnePlus => "OnePlus",
            Self::Google => "Google",
            Self::Oppo => "Oppo",
            Self::Vivo => "Vivo",
            Self::Realme => "Realme",
            Self::Motorola => "Motorola",
            Self::Nokia => "Nokia",
            Self::Iqoo => "iQOO",
            Self::Nothing => "Nothing",
            Self::Poco => "Poco",
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Brand {
    type Err = UnknownBrand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Samsung" => Ok(Self::Samsung),
            "Apple" => Ok(Self::Apple),
            "Xiaomi" => Ok(Self::Xiaomi),
            "OnePlus" => Ok(Self::OnePlus),
            "Google" => Ok(Self::Google),
            "Oppo" => Ok(Self::Oppo),
            "Vivo" => Ok(Self::Vivo),
            "Realme" => Ok(Self::Realme),
            "Motorola" => Ok(Self::Motorola),
            "Nokia" => Ok(Self::Nokia),
            "iQOO" => Ok(Self::Iqoo),
            "Nothing" => Ok(Self::Nothing),
            "Poco" => Ok(Self::Poco),
            other => Err(UnknownBrand(other.to_string())),
        }
    }
}

/// Error for brand strings not in the catalog.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown brand: {0}")]
pub struct UnknownBrand(pub String);

/// Price segment tags used by filters and the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceRange {
    /// Under 15,000
    Budget,
    /// 15,000 - 30,000
    MidRange,
    /// 30,000 - 60,000
    Premium,
    /// Over 60,000
    Flagship,
}

impl PriceRange {
    /// Segment a price into its range tag.
    pub fn classify(price: f64) -> Self {
        if price < 15_000.0 {
            Self::Budget
        } else if price < 30_000.0 {
            Self::MidRange
        } else if price < 60_000.0 {
            Self::Premium
        } else {
            Self::Flagship
        }
    }

    /// Storage string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::MidRange => "mid_range",
            Self::Premium => "premium",
            Self::Flagship => "flagship",
        }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceRange {
    type Err = UnknownPriceRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "budget" => Ok(Self::Budget),
            "mid_range" => Ok(Self::MidRange),
            "premium" => Ok(Self::Premium),
            "flagship" => Ok(Self::Flagship),
            other => Err(UnknownPriceRange(other.to_string())),
        }
    }
}

/// Error for price-range strings not in the fixed set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown price range: {0}")]
pub struct UnknownPriceRange(pub String);

/// A catalog row. Seeded once, never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub brand: Brand,
    pub price: f64,
    pub price_range: PriceRange,

    // Display
    pub display_size: f64,
    pub display_type: String,
    pub refresh_rate: u32,
    pub resolution: String,

    // Performance
    pub processor: String,
    /// GB
    pub ram: u32,
    /// GB
    pub storage: u32,

    // Camera
    pub rear_camera: String,
    pub front_camera: String,
    #[serde(default)]
    pub has_ois: bool,
    #[serde(default)]
    pub has_eis: bool,

    // Battery
    /// mAh
    pub battery_capacity: u32,
    /// Watts
    pub fast_charging: Option<u32>,
    #[serde(default)]
    pub wireless_charging: bool,

    // Features
    pub os: String,
    #[serde(default)]
    pub five_g: bool,
    #[serde(default)]
    pub nfc: bool,
    pub ip_rating: Option<String>,

    // Dimensions
    /// grams
    pub weight: u32,
    /// mm
    pub thickness: f64,

    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,

    pub launch_date: Option<DateTime<Utc>>,
    #[serde(default = "default_availability")]
    pub availability: bool,
}

fn default_availability() -> bool {
    true
}

impl Product {
    /// Lowercase blob used for keyword scoring: name, brand, processor,
    /// highlights, and pros.
    pub fn searchable_text(&self) -> String {
        let mut text = String::new();
        text.push_str(&self.name.to_lowercase());
        text.push(' ');
        text.push_str(&self.brand.as_str().to_lowercase());
        text.push(' ');
        text.push_str(&self.processor.to_lowercase());
        for chunk in self.highlights.iter().chain(self.pros.iter()) {
            text.push(' ');
            text.push_str(&chunk.to_lowercase());
        }
        text
    }
}

/// Compact product projection returned to chat clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCard {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub price: f64,

    /// Label -> value spec lines, in display order.
    pub key_specs: BTreeMap<String, String>,
    pub highlights: Vec<String>,

    /// Keyword relevance score, when keyword re-ranking ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,
}

impl ProductCard {
    /// Build a card from a catalog row.
    pub fn from_product(product: &Product) -> Self {
        let mut key_specs = BTreeMap::new();
        key_specs.insert(
            "Display".to_string(),
            format!("{}\" {}", product.display_size, product.display_type),
        );
        key_specs.insert("Processor".to_string(), product.processor.clone());
        key_specs.insert("RAM".to_string(), format!("{}GB", product.ram));
        key_specs.insert("Camera".to_string(), product.rear_camera.clone());
        key_specs.insert(
            "Battery".to_string(),
            format!("{}mAh", product.battery_capacity),
        );

        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand.to_string(),
            price: product.price,
            key_specs,
            highlights: product.highlights.iter().take(3).cloned().collect(),
            match_score: None,
        }
    }
}
