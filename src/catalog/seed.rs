//! Catalog seeding.
//!
//! Loads product rows from a JSON file (an array of `Product` objects) and
//! inserts them into the store. Seeding is skipped when the catalog is
//! already populated unless a reset is requested.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::{Brand, PriceRange, Product};

use super::store::CatalogStore;

/// Seed the catalog from a JSON file.
///
/// Returns the number of products inserted (0 when skipped).
pub fn seed_from_file(store: &CatalogStore, path: &Path, reset: bool) -> Result<usize> {
    let existing = store.count_products()?;
    if existing > 0 && !reset {
        info!(existing, "catalog already populated, skipping seed");
        return Ok(0);
    }

    if reset {
        store.clear_products()?;
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;

    let products: Vec<Product> =
        serde_json::from_str(&content).context("Failed to parse seed file JSON")?;

    for product in &products {
        store
            .insert_product(product)
            .with_context(|| format!("Failed to insert product {}", product.id))?;
    }

    info!(count = products.len(), "catalog seeded");
    Ok(products.len())
}

/// A complete demo row with sensible defaults, varied by the arguments.
/// Used by the demo seed and throughout the test suites.
pub fn demo_product(id: i64, name: &str, brand: Brand, price: f64) -> Product {
    Product {
        id,
        name: name.to_string(),
        brand,
        price,
        price_range: PriceRange::classify(price),
        display_size: 6.5,
        display_type: "AMOLED".to_string(),
        refresh_rate: 120,
        resolution: "1080x2400".to_string(),
        processor: "Snapdragon 7 Gen 3".to_string(),
        ram: 8,
        storage: 128,
        rear_camera: "50MP + 8MP".to_string(),
        front_camera: "16MP".to_string(),
        has_ois: false,
        has_eis: true,
        battery_capacity: 5000,
        fast_charging: Some(67),
        wireless_charging: false,
        os: "Android 14".to_string(),
        five_g: true,
        nfc: true,
        ip_rating: Some("IP54".to_string()),
        weight: 190,
        thickness: 8.0,
        highlights: vec![],
        pros: vec![],
        cons: vec![],
        launch_date: None,
        availability: true,
    }
}

/// Insert a small built-in catalog so a fresh install can answer queries
/// without a seed file.
pub fn seed_demo(store: &CatalogStore) -> Result<usize> {
    let existing = store.count_products()?;
    if existing > 0 {
        info!(existing, "catalog already populated, skipping demo seed");
        return Ok(0);
    }

    let mut products = Vec::new();

    let mut phone = demo_product(1, "Galaxy S24", Brand::Samsung, 74_999.0);
    phone.has_ois = true;
    phone.wireless_charging = true;
    phone.ip_rating = Some("IP68".to_string());
    phone.highlights = vec!["Flagship camera".to_string(), "Compact design".to_string()];
    phone.pros = vec!["Excellent display".to_string(), "Strong camera".to_string()];
    phone.weight = 167;
    phone.display_size = 6.2;
    products.push(phone);

    let mut phone = demo_product(2, "iPhone 15", Brand::Apple, 79_900.0);
    phone.processor = "A16 Bionic".to_string();
    phone.os = "iOS 17".to_string();
    phone.has_ois = true;
    phone.wireless_charging = true;
    phone.ram = 6;
    phone.battery_capacity = 3349;
    phone.weight = 171;
    phone.display_size = 6.1;
    phone.highlights = vec!["Dynamic Island".to_string(), "48MP main camera".to_string()];
    phone.pros = vec!["Great video recording".to_string()];
    products.push(phone);

    let mut phone = demo_product(3, "Redmi Note 13 Pro", Brand::Xiaomi, 24_999.0);
    phone.highlights = vec!["200MP camera".to_string(), "Fast charging".to_string()];
    phone.pros = vec!["Great value".to_string(), "Big battery".to_string()];
    phone.battery_capacity = 5100;
    products.push(phone);

    let mut phone = demo_product(4, "OnePlus 12R", Brand::OnePlus, 39_999.0);
    phone.processor = "Snapdragon 8 Gen 2".to_string();
    phone.ram = 12;
    phone.battery_capacity = 5500;
    phone.highlights = vec!["Flagship performance".to_string()];
    phone.pros = vec!["Smooth gaming".to_string(), "Fast charging".to_string()];
    products.push(phone);

    let mut phone = demo_product(5, "Pixel 8a", Brand::Google, 52_999.0);
    phone.processor = "Tensor G3".to_string();
    phone.has_ois = true;
    phone.highlights = vec!["Best-in-class camera".to_string()];
    phone.pros = vec!["Clean software".to_string(), "Long updates".to_string()];
    phone.display_size = 6.1;
    phone.weight = 188;
    products.push(phone);

    for product in &products {
        store
            .insert_product(product)
            .with_context(|| format!("Failed to insert product {}", product.id))?;
    }

    info!(count = products.len(), "demo catalog seeded");
    Ok(products.len())
}
