//! SQLite-backed product catalog and analytics tables.
//!
//! The store is the retrieval engine's storage collaborator: it answers
//! parameter-bound catalog queries and accepts fire-and-forget analytics
//! rows. Highlight/pros/cons lists are stored as JSON text columns.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Connection;
use thiserror::Error;

use crate::domain::{Brand, PriceRange, Product};

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to open catalog at {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("malformed catalog row {id}: {reason}")]
    MalformedRow { id: i64, reason: String },
}

/// Ordering rules the engine can ask for. Every rule ends on `id ASC` so
/// the row order is total and repeat queries return identical lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductOrder {
    /// Optical stabilization first, then electronic
    CameraFirst,
    /// Largest battery first
    BatteryDesc,
    /// Most RAM first
    RamDesc,
    /// Lightest and smallest first
    Compact,
    /// Cheapest first
    #[default]
    PriceAsc,
}

impl ProductOrder {
    fn sql(&self) -> &'static str {
        match self {
            Self::CameraFirst => "has_ois DESC, has_eis DESC, id ASC",
            Self::BatteryDesc => "battery_capacity DESC, id ASC",
            Self::RamDesc => "ram DESC, id ASC",
            Self::Compact => "weight ASC, display_size ASC, id ASC",
            Self::PriceAsc => "price ASC, id ASC",
        }
    }
}

/// A catalog query: AND-combined constraints, one ordering, a row cap.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub available_only: bool,
    pub brands: Option<Vec<Brand>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub price_range: Option<PriceRange>,
    pub min_ram: Option<u32>,
    pub min_storage: Option<u32>,
    pub min_battery: Option<u32>,
    pub five_g: Option<bool>,
    pub nfc: Option<bool>,
    pub wireless_charging: Option<bool>,
    pub order: ProductOrder,
    pub limit: usize,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            available_only: true,
            brands: None,
            min_price: None,
            max_price: None,
            price_range: None,
            min_ram: None,
            min_storage: None,
            min_battery: None,
            five_g: None,
            nfc: None,
            wireless_charging: None,
            order: ProductOrder::default(),
            limit: 10,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, brand, price, price_range, display_size, display_type, \
     refresh_rate, resolution, processor, ram, storage, rear_camera, front_camera, has_ois, \
     has_eis, battery_capacity, fast_charging, wireless_charging, os, five_g, nfc, ip_rating, \
     weight, thickness, highlights, pros, cons, launch_date, availability";

/// Catalog storage. `rusqlite` connections are not `Sync`, so the single
/// connection sits behind a mutex; every operation is one short statement.
pub struct CatalogStore {
    conn: Mutex<Connection>,
}

impl CatalogStore {
    /// Open (or create) the catalog database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                brand TEXT NOT NULL,
                price REAL NOT NULL,
                price_range TEXT NOT NULL,
                display_size REAL NOT NULL,
                display_type TEXT NOT NULL,
                refresh_rate INTEGER NOT NULL,
                resolution TEXT NOT NULL,
                processor TEXT NOT NULL,
                ram INTEGER NOT NULL,
                storage INTEGER NOT NULL,
                rear_camera TEXT NOT NULL,
                front_camera TEXT NOT NULL,
                has_ois INTEGER NOT NULL DEFAULT 0,
                has_eis INTEGER NOT NULL DEFAULT 0,
                battery_capacity INTEGER NOT NULL,
                fast_charging INTEGER,
                wireless_charging INTEGER NOT NULL DEFAULT 0,
                os TEXT NOT NULL,
                five_g INTEGER NOT NULL DEFAULT 0,
                nfc INTEGER NOT NULL DEFAULT 0,
                ip_rating TEXT,
                weight INTEGER NOT NULL,
                thickness REAL NOT NULL,
                highlights TEXT NOT NULL DEFAULT '[]',
                pros TEXT NOT NULL DEFAULT '[]',
                cons TEXT NOT NULL DEFAULT '[]',
                launch_date TEXT,
                availability INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand);
            CREATE INDEX IF NOT EXISTS idx_products_price ON products(price);

            CREATE TABLE IF NOT EXISTS search_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                query TEXT NOT NULL,
                intent TEXT NOT NULL,
                results_count INTEGER NOT NULL,
                response_time_ms REAL NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS comparison_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                product_ids TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS safety_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT,
                query TEXT NOT NULL,
                incident_type TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
    }

    /// Run a constrained, ordered, capped catalog query.
    pub fn query_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if query.available_only {
            clauses.push("availability = 1".to_string());
        }

        if let Some(brands) = &query.brands {
            if !brands.is_empty() {
                let placeholders = vec!["?"; brands.len()].join(", ");
                clauses.push(format!("brand IN ({placeholders})"));
                for brand in brands {
                    params.push(Value::Text(brand.as_str().to_string()));
                }
            }
        }

        if let Some(min_price) = query.min_price {
            clauses.push("price >= ?".to_string());
            params.push(Value::Real(min_price));
        }

        if let Some(max_price) = query.max_price {
            clauses.push("price <= ?".to_string());
            params.push(Value::Real(max_price));
        }

        if let Some(price_range) = query.price_range {
            clauses.push("price_range = ?".to_string());
            params.push(Value::Text(price_range.as_str().to_string()));
        }

        if let Some(min_ram) = query.min_ram {
            clauses.push("ram >= ?".to_string());
            params.push(Value::Integer(min_ram as i64));
        }

        if let Some(min_storage) = query.min_storage {
            clauses.push("storage >= ?".to_string());
            params.push(Value::Integer(min_storage as i64));
        }

        if let Some(min_battery) = query.min_battery {
            clauses.push("battery_capacity >= ?".to_string());
            params.push(Value::Integer(min_battery as i64));
        }

        if let Some(five_g) = query.five_g {
            clauses.push("five_g = ?".to_string());
            params.push(Value::Integer(five_g as i64));
        }

        if let Some(nfc) = query.nfc {
            clauses.push("nfc = ?".to_string());
            params.push(Value::Integer(nfc as i64));
        }

        if let Some(wireless) = query.wireless_charging {
            clauses.push("wireless_charging = ?".to_string());
            params.push(Value::Integer(wireless as i64));
        }

        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(query.order.sql());
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(query.limit as i64));

        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), row_to_product)?;

        rows.collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
    }

    /// Fetch one product by id.
    pub fn get_by_id(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let conn = self.lock_conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))?;

        let mut rows = stmt.query_map([id], row_to_product)?;
        match rows.next() {
            Some(row) => Ok(Some(row??)),
            None => Ok(None),
        }
    }

    /// Fetch several products by id; missing ids are simply absent from
    /// the result. Rows come back in id order.
    pub fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ({placeholders}) ORDER BY id ASC"
        );

        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(ids.iter().map(|id| Value::Integer(*id))),
            row_to_product,
        )?;

        rows.collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
    }

    /// Insert (or replace) one catalog row.
    pub fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let highlights = serde_json::to_string(&product.highlights)
            .map_err(|e| malformed(product.id, &e.to_string()))?;
        let pros = serde_json::to_string(&product.pros)
            .map_err(|e| malformed(product.id, &e.to_string()))?;
        let cons = serde_json::to_string(&product.cons)
            .map_err(|e| malformed(product.id, &e.to_string()))?;

        let conn = self.lock_conn();
        conn.execute(
            "INSERT OR REPLACE INTO products (
                id, name, brand, price, price_range, display_size, display_type,
                refresh_rate, resolution, processor, ram, storage, rear_camera,
                front_camera, has_ois, has_eis, battery_capacity, fast_charging,
                wireless_charging, os, five_g, nfc, ip_rating, weight, thickness,
                highlights, pros, cons, launch_date, availability
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26,
                      ?27, ?28, ?29, ?30)",
            rusqlite::params![
                product.id,
                product.name,
                product.brand.as_str(),
                product.price,
                product.price_range.as_str(),
                product.display_size,
                product.display_type,
                product.refresh_rate,
                product.resolution,
                product.processor,
                product.ram,
                product.storage,
                product.rear_camera,
                product.front_camera,
                product.has_ois,
                product.has_eis,
                product.battery_capacity,
                product.fast_charging,
                product.wireless_charging,
                product.os,
                product.five_g,
                product.nfc,
                product.ip_rating,
                product.weight,
                product.thickness,
                highlights,
                pros,
                cons,
                product.launch_date.map(|d| d.to_rfc3339()),
                product.availability,
            ],
        )?;

        Ok(())
    }

    pub fn count_products(&self) -> Result<u64, StoreError> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete every catalog row (used by `seed --reset`).
    pub fn clear_products(&self) -> Result<(), StoreError> {
        let conn = self.lock_conn();
        conn.execute("DELETE FROM products", [])?;
        Ok(())
    }

    /// Analytics: one search. Callers log and swallow failures.
    pub fn record_search_event(
        &self,
        session_id: &str,
        query: &str,
        intent: &str,
        results_count: usize,
        response_time_ms: f64,
    ) -> Result<(), StoreError> {
        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO search_events (session_id, query, intent, results_count, response_time_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                session_id,
                query,
                intent,
                results_count as i64,
                response_time_ms,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Analytics: one comparison. Callers log and swallow failures.
    pub fn record_comparison(&self, session_id: &str, product_ids: &[i64]) -> Result<(), StoreError> {
        let ids_json = serde_json::to_string(product_ids).unwrap_or_else(|_| "[]".to_string());

        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO comparison_events (session_id, product_ids, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![session_id, ids_json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Analytics: one blocked query. Callers log and swallow failures.
    pub fn record_safety_event(
        &self,
        session_id: Option<&str>,
        query: &str,
        incident_type: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO safety_events (session_id, query, incident_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![session_id, query, incident_type, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn malformed(id: i64, reason: &str) -> StoreError {
    StoreError::MalformedRow {
        id,
        reason: reason.to_string(),
    }
}

/// Map one SQLite row to a `Product`. Returns a nested result so rusqlite
/// errors and domain decode errors stay distinguishable.
fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Product, StoreError>> {
    let id: i64 = row.get(0)?;

    let brand_text: String = row.get(2)?;
    let price_range_text: String = row.get(4)?;
    let highlights_text: String = row.get(25)?;
    let pros_text: String = row.get(26)?;
    let cons_text: String = row.get(27)?;
    let launch_date_text: Option<String> = row.get(28)?;

    let decoded = (|| {
        let brand = Brand::from_str(&brand_text).map_err(|e| malformed(id, &e.to_string()))?;
        let price_range = PriceRange::from_str(&price_range_text)
            .map_err(|e| malformed(id, &e.to_string()))?;

        let highlights: Vec<String> = serde_json::from_str(&highlights_text)
            .map_err(|e| malformed(id, &e.to_string()))?;
        let pros: Vec<String> =
            serde_json::from_str(&pros_text).map_err(|e| malformed(id, &e.to_string()))?;
        let cons: Vec<String> =
            serde_json::from_str(&cons_text).map_err(|e| malformed(id, &e.to_string()))?;

        let launch_date = match launch_date_text {
            Some(text) => Some(
                DateTime::parse_from_rfc3339(&text)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| malformed(id, &e.to_string()))?,
            ),
            None => None,
        };

        Ok::<_, StoreError>((brand, price_range, highlights, pros, cons, launch_date))
    })();

    let (brand, price_range, highlights, pros, cons, launch_date) = match decoded {
        Ok(parts) => parts,
        Err(e) => return Ok(Err(e)),
    };

    Ok(Ok(Product {
        id,
        name: row.get(1)?,
        brand,
        price: row.get(3)?,
        price_range,
        display_size: row.get(5)?,
        display_type: row.get(6)?,
        refresh_rate: row.get(7)?,
        resolution: row.get(8)?,
        processor: row.get(9)?,
        ram: row.get(10)?,
        storage: row.get(11)?,
        rear_camera: row.get(12)?,
        front_camera: row.get(13)?,
        has_ois: row.get(14)?,
        has_eis: row.get(15)?,
        battery_capacity: row.get(16)?,
        fast_charging: row.get(17)?,
        wireless_charging: row.get(18)?,
        os: row.get(19)?,
        five_g: row.get(20)?,
        nfc: row.get(21)?,
        ip_rating: row.get(22)?,
        weight: row.get(23)?,
        thickness: row.get(24)?,
        highlights,
        pros,
        cons,
        launch_date,
        availability: row.get(29)?,
    }))
}
