//! Deterministic product retrieval and ranking.
//!
//! Translates a `SearchFilters` object into one catalog query (constraints
//! AND-combined, exactly one ordering rule, a row cap), then optionally
//! re-ranks the capped set by keyword score.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::warn;

use crate::domain::{Product, SearchFilters};

use super::store::{CatalogStore, ProductOrder, ProductQuery, StoreError};

/// Score added when a keyword appears anywhere in the searchable blob.
const KEYWORD_HIT_SCORE: f32 = 1.0;
/// Bonus when the keyword also matches the product name or brand.
const NAME_BRAND_BONUS: f32 = 0.5;

/// Retrieval failures. Arity violations are precise rejections, not bugs.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("at least two products are required for comparison")]
    NeedAtLeastTwo,

    #[error("at most three products can be compared")]
    TooMany,

    #[error("one or more products not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Filtered, ranked, size-bounded catalog retrieval.
pub struct RetrievalEngine {
    store: Arc<CatalogStore>,
}

impl RetrievalEngine {
    pub fn new(store: Arc<CatalogStore>) -> Self {
        Self { store }
    }

    /// Search the catalog. Deterministic: fixed catalog + fixed filters
    /// always produce the same ordered list.
    pub fn search(
        &self,
        filters: &SearchFilters,
        limit: usize,
        session_id: Option<&str>,
    ) -> Result<Vec<Product>, RetrievalError> {
        let started = Instant::now();

        let query = build_query(filters, limit);
        let fetched = self.store.query_products(&query)?;

        let results = if filters.keywords.is_empty() {
            fetched
        } else {
            let mut ranked = rank_by_keywords(fetched, &filters.keywords);
            ranked.truncate(limit);
            ranked
        };

        // Analytics write must never fail the search
        if let Some(session_id) = session_id {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            if let Err(e) = self.store.record_search_event(
                session_id,
                &format!("{filters:?}"),
                "search",
                results.len(),
                elapsed_ms,
            ) {
                warn!(error = %e, "failed to record search event");
            }
        }

        Ok(results)
    }

    /// Resolve 2-3 products for comparison.
    pub fn compare(
        &self,
        ids: &[i64],
        session_id: Option<&str>,
    ) -> Result<Vec<Product>, RetrievalError> {
        if ids.len() < 2 {
            return Err(RetrievalError::NeedAtLeastTwo);
        }
        if ids.len() > 3 {
            return Err(RetrievalError::TooMany);
        }

        let products = self.store.get_by_ids(ids)?;
        if products.len() < 2 {
            return Err(RetrievalError::NotFound);
        }

        if let Some(session_id) = session_id {
            if let Err(e) = self.store.record_comparison(session_id, ids) {
                warn!(error = %e, "failed to record comparison event");
            }
        }

        Ok(products)
    }

    /// Fetch one product by id.
    pub fn product(&self, id: i64) -> Result<Option<Product>, RetrievalError> {
        Ok(self.store.get_by_id(id)?)
    }
}

/// Map filters onto one catalog query. The first matching focus flag picks
/// the ordering rule; price ascending is the default.
fn build_query(filters: &SearchFilters, limit: usize) -> ProductQuery {
    let order = if filters.camera_focus == Some(true) {
        ProductOrder::CameraFirst
    } else if filters.battery_focus == Some(true) {
        ProductOrder::BatteryDesc
    } else if filters.performance_focus == Some(true) {
        ProductOrder::RamDesc
    } else if filters.compact_size == Some(true) {
        ProductOrder::Compact
    } else {
        ProductOrder::PriceAsc
    };

    ProductQuery {
        available_only: true,
        brands: filters.brands.clone(),
        min_price: filters.min_price,
        max_price: filters.max_price,
        price_range: filters.price_range,
        min_ram: filters.min_ram,
        min_storage: filters.min_storage,
        min_battery: filters.min_battery,
        five_g: filters.five_g,
        nfc: filters.nfc,
        wireless_charging: filters.wireless_charging,
        order,
        limit,
    }
}

/// Score products against keywords and keep only scoring rows, best first.
/// The sort is stable, so ties keep their prior relative order.
fn rank_by_keywords(products: Vec<Product>, keywords: &[String]) -> Vec<Product> {
    let mut scored: Vec<(Product, f32)> = products
        .into_iter()
        .filter_map(|product| {
            let score = keyword_score(&product, keywords);
            (score > 0.0).then_some((product, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(product, _)| product).collect()
}

/// Relevance score: 1.0 per keyword present in the searchable blob, plus
/// 0.5 each when it also matches the name or the brand.
fn keyword_score(product: &Product, keywords: &[String]) -> f32 {
    let searchable = product.searchable_text();
    let name_lower = product.name.to_lowercase();
    let brand_lower = product.brand.as_str().to_lowercase();

    let mut score = 0.0;
    for keyword in keywords {
        let keyword_lower = keyword.to_lowercase();
        if searchable.contains(&keyword_lower) {
            score += KEYWORD_HIT_SCORE;

            if name_lower.contains(&keyword_lower) {
                score += NAME_BRAND_BONUS;
            }
            if brand_lower.contains(&keyword_lower) {
                score += NAME_BRAND_BONUS;
            }
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use crate::catalog::seed::demo_product;
    use crate::domain::Brand;

    use super::*;

    fn engine_with(products: Vec<Product>) -> RetrievalEngine {
        let store = CatalogStore::open_in_memory().unwrap();
        for product in &products {
            store.insert_product(product).unwrap();
        }
        RetrievalEngine::new(Arc::new(store))
    }

    #[test]
    fn test_empty_filters_price_ascending() {
        let engine = engine_with(vec![
            demo_product(1, "Pricey", Brand::Apple, 90_000.0),
            demo_product(2, "Cheap", Brand::Realme, 10_000.0),
        ]);

        let results = engine.search(&SearchFilters::default(), 10, None).unwrap();
        let names: Vec<_> = results.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cheap", "Pricey"]);
    }

    #[test]
    fn test_battery_focus_ordering() {
        let mut small = demo_product(1, "Small", Brand::Samsung, 20_000.0);
        small.battery_capacity = 4000;
        let mut big = demo_product(2, "Big", Brand::Samsung, 25_000.0);
        big.battery_capacity = 6000;

        let engine = engine_with(vec![small, big]);

        let filters = SearchFilters {
            battery_focus: Some(true),
            ..Default::default()
        };

        let results = engine.search(&filters, 10, None).unwrap();
        assert_eq!(results[0].name, "Big");
    }

    #[test]
    fn test_camera_focus_outranks_battery_focus() {
        let mut ois = demo_product(1, "WithOis", Brand::Google, 30_000.0);
        ois.has_ois = true;
        ois.battery_capacity = 4000;
        let mut big_battery = demo_product(2, "BigBattery", Brand::Google, 28_000.0);
        big_battery.battery_capacity = 6000;

        let engine = engine_with(vec![ois, big_battery]);

        // Both flags set: camera focus wins the ordering choice
        let filters = SearchFilters {
            camera_focus: Some(true),
            battery_focus: Some(true),
            ..Default::default()
        };

        let results = engine.search(&filters, 10, None).unwrap();
        assert_eq!(results[0].name, "WithOis");
    }

    #[test]
    fn test_keyword_name_match_beats_pros_match() {
        let mut in_name = demo_product(1, "Gaming Phone X", Brand::Iqoo, 30_000.0);
        in_name.pros = vec!["Solid build".to_string()];
        let mut in_pros = demo_product(2, "Neo 9", Brand::Iqoo, 25_000.0);
        in_pros.pros = vec!["Great for gaming".to_string()];
        let neither = demo_product(3, "Plain", Brand::Nokia, 15_000.0);

        let engine = engine_with(vec![in_name, in_pros, neither]);

        let filters = SearchFilters {
            keywords: vec!["gaming".to_string()],
            ..Default::default()
        };

        let results = engine.search(&filters, 10, None).unwrap();
        let names: Vec<_> = results.iter().map(|p| p.name.as_str()).collect();

        // Name match scores 1.5, pros-only match scores 1.0, no match drops
        assert_eq!(names, vec!["Gaming Phone X", "Neo 9"]);
    }

    #[test]
    fn test_keywords_matching_nothing_is_empty_not_error() {
        let engine = engine_with(vec![demo_product(1, "Plain", Brand::Nokia, 15_000.0)]);

        let filters = SearchFilters {
            keywords: vec!["submarine".to_string()],
            ..Default::default()
        };

        let results = engine.search(&filters, 10, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_is_deterministic() {
        let engine = engine_with(vec![
            demo_product(1, "A", Brand::Samsung, 20_000.0),
            demo_product(2, "B", Brand::Samsung, 20_000.0),
            demo_product(3, "C", Brand::Samsung, 20_000.0),
        ]);

        let filters = SearchFilters {
            brands: Some(vec![Brand::Samsung]),
            ..Default::default()
        };

        let first = engine.search(&filters, 10, None).unwrap();
        for _ in 0..5 {
            let again = engine.search(&filters, 10, None).unwrap();
            let ids: Vec<_> = again.iter().map(|p| p.id).collect();
            let first_ids: Vec<_> = first.iter().map(|p| p.id).collect();
            assert_eq!(ids, first_ids);
        }
    }

    #[test]
    fn test_compare_arity() {
        let engine = engine_with(vec![
            demo_product(1, "A", Brand::Samsung, 20_000.0),
            demo_product(2, "B", Brand::Apple, 21_000.0),
            demo_product(3, "C", Brand::Google, 22_000.0),
            demo_product(4, "D", Brand::Xiaomi, 23_000.0),
        ]);

        assert!(matches!(
            engine.compare(&[], None),
            Err(RetrievalError::NeedAtLeastTwo)
        ));
        assert!(matches!(
            engine.compare(&[1], None),
            Err(RetrievalError::NeedAtLeastTwo)
        ));
        assert!(matches!(
            engine.compare(&[1, 2, 3, 4], None),
            Err(RetrievalError::TooMany)
        ));

        let products = engine.compare(&[1, 2], None).unwrap();
        assert_eq!(products.len(), 2);
    }

    #[test]
    fn test_compare_unresolved_is_not_found() {
        let engine = engine_with(vec![demo_product(1, "A", Brand::Samsung, 20_000.0)]);

        assert!(matches!(
            engine.compare(&[1, 999], None),
            Err(RetrievalError::NotFound)
        ));
    }

    #[test]
    fn test_min_ram_and_max_price_end_to_end() {
        let mut fits = demo_product(1, "Fits", Brand::OnePlus, 25_000.0);
        fits.ram = 8;
        let mut too_pricey = demo_product(2, "TooPricey", Brand::OnePlus, 50_000.0);
        too_pricey.ram = 12;

        let engine = engine_with(vec![fits, too_pricey]);

        let filters = SearchFilters {
            max_price: Some(30_000.0),
            min_ram: Some(8),
            ..Default::default()
        };

        let results = engine.search(&filters, 10, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Fits");
    }
}
