//! Command-line interface for shopscout.
//!
//! Provides commands for one-shot chat, direct catalog search and
//! comparison, seeding the catalog, and inspecting configuration/health.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::catalog::{seed, CatalogStore, RetrievalEngine};
use crate::config::Settings;
use crate::core::{BreakerMap, ChatPipeline, Orchestrator, SafetyGate};
use crate::domain::{Brand, ChatRequest, Product, SearchFilters};

/// shopscout - AI shopping assistant for mobile phones
#[derive(Parser, Debug)]
#[command(name = "shopscout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a shopping question
    Chat {
        /// The question to ask
        message: String,

        /// Session ID for conversation continuity
        #[arg(short, long)]
        session: Option<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the catalog directly (no LLM involved)
    Search {
        /// Restrict to brands (repeatable)
        #[arg(short, long)]
        brand: Vec<String>,

        /// Minimum price
        #[arg(long)]
        min_price: Option<f64>,

        /// Maximum price
        #[arg(long)]
        max_price: Option<f64>,

        /// Minimum RAM in GB
        #[arg(long)]
        min_ram: Option<u32>,

        /// Minimum battery capacity in mAh
        #[arg(long)]
        min_battery: Option<u32>,

        /// Keywords to re-rank by (repeatable)
        #[arg(short, long)]
        keyword: Vec<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Compare 2-3 products by ID
    Compare {
        /// Product IDs
        ids: Vec<i64>,
    },

    /// Show details of one product
    Show {
        /// Product ID
        id: i64,
    },

    /// Seed the catalog
    Seed {
        /// JSON file with an array of products (built-in demo set if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Wipe the catalog before seeding
        #[arg(long)]
        reset: bool,
    },

    /// Check catalog and provider configuration health
    Doctor,

    /// Show resolved configuration (secrets masked)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load()?;

        match self.command {
            Commands::Chat {
                message,
                session,
                json,
            } => chat(&settings, &message, session, json).await,
            Commands::Search {
                brand,
                min_price,
                max_price,
                min_ram,
                min_battery,
                keyword,
                limit,
            } => search(
                &settings, brand, min_price, max_price, min_ram, min_battery, keyword, limit,
            ),
            Commands::Compare { ids } => compare(&settings, &ids),
            Commands::Show { id } => show(&settings, id),
            Commands::Seed { file, reset } => run_seed(&settings, file, reset),
            Commands::Doctor => doctor(&settings),
            Commands::Config => show_config(&settings),
        }
    }
}

fn open_store(settings: &Settings) -> Result<Arc<CatalogStore>> {
    let store = CatalogStore::open(&settings.catalog_db)
        .with_context(|| format!("Failed to open catalog: {}", settings.catalog_db.display()))?;
    Ok(Arc::new(store))
}

/// Wire the injected services into a chat pipeline.
fn build_pipeline(settings: &Settings, store: Arc<CatalogStore>) -> ChatPipeline {
    let breakers = Arc::new(BreakerMap::new(
        settings.configured_provider_kinds(),
        settings.breaker.failure_threshold,
        settings.breaker.timeout,
    ));

    let orchestrator = Orchestrator::new(
        settings.build_provider_stack(),
        breakers,
        settings.retry.clone(),
        settings.call_timeout,
    );

    ChatPipeline::new(
        SafetyGate::new(settings.safety.clone()),
        orchestrator,
        RetrievalEngine::new(Arc::clone(&store)),
        store,
        settings.search.max_results,
        settings.search.context_size,
    )
}

async fn chat(
    settings: &Settings,
    message: &str,
    session: Option<String>,
    json: bool,
) -> Result<()> {
    let store = open_store(settings)?;
    let pipeline = build_pipeline(settings, store);

    let mut request = ChatRequest::new(message);
    if let Some(session) = session {
        request = request.with_session(session);
    }

    let response = pipeline.handle_chat(&request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}\n", response.message);

    if !response.products.is_empty() {
        println!("Matching phones:");
        for card in &response.products {
            println!(
                "  [{}] {} ({}) - ₹{:.0}",
                card.id, card.name, card.brand, card.price
            );
        }
        println!();
    }

    if !response.suggestions.is_empty() {
        println!("You could also ask:");
        for suggestion in &response.suggestions {
            println!("  - {}", suggestion);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn search(
    settings: &Settings,
    brand: Vec<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    min_ram: Option<u32>,
    min_battery: Option<u32>,
    keyword: Vec<String>,
    limit: usize,
) -> Result<()> {
    let brands = if brand.is_empty() {
        None
    } else {
        Some(
            brand
                .iter()
                .map(|b| {
                    b.parse::<Brand>()
                        .with_context(|| format!("Unknown brand: {b}"))
                })
                .collect::<Result<Vec<_>>>()?,
        )
    };

    let filters = SearchFilters {
        brands,
        min_price,
        max_price,
        min_ram,
        min_battery,
        keywords: keyword,
        ..Default::default()
    };

    let store = open_store(settings)?;
    let engine = RetrievalEngine::new(store);
    let products = engine.search(&filters, limit, None)?;

    if products.is_empty() {
        println!("No phones matched.");
        return Ok(());
    }

    for product in &products {
        print_summary_line(product);
    }

    Ok(())
}

fn compare(settings: &Settings, ids: &[i64]) -> Result<()> {
    let store = open_store(settings)?;
    let engine = RetrievalEngine::new(store);
    let products = engine.compare(ids, None)?;

    for product in &products {
        println!("=== {} ({}) ===", product.name, product.brand);
        println!(
            "  Price:    ₹{:.0} ({})",
            product.price, product.price_range
        );
        println!(
            "  Display:  {}\" {} @ {}Hz",
            product.display_size, product.display_type, product.refresh_rate
        );
        println!("  Chip:     {}", product.processor);
        println!("  RAM/Rom:  {}GB / {}GB", product.ram, product.storage);
        println!(
            "  Camera:   {} (OIS: {}, EIS: {})",
            product.rear_camera, product.has_ois, product.has_eis
        );
        println!(
            "  Battery:  {}mAh{}",
            product.battery_capacity,
            product
                .fast_charging
                .map(|w| format!(", {w}W charging"))
                .unwrap_or_default()
        );
        println!();
    }

    Ok(())
}

fn show(settings: &Settings, id: i64) -> Result<()> {
    let store = open_store(settings)?;
    let engine = RetrievalEngine::new(store);

    let product = engine
        .product(id)?
        .with_context(|| format!("Product {id} not found"))?;

    println!("{} ({})", product.name, product.brand);
    println!("Price: ₹{:.0} ({})", product.price, product.price_range);
    println!(
        "Display: {}\" {} @ {}Hz, {}",
        product.display_size, product.display_type, product.refresh_rate, product.resolution
    );
    println!("Processor: {}", product.processor);
    println!("RAM/Storage: {}GB / {}GB", product.ram, product.storage);
    println!("Rear camera: {}", product.rear_camera);
    println!("Front camera: {}", product.front_camera);
    println!("Battery: {}mAh", product.battery_capacity);
    println!("OS: {}", product.os);
    println!(
        "Features: 5G={}, NFC={}, wireless charging={}",
        product.five_g, product.nfc, product.wireless_charging
    );

    if !product.highlights.is_empty() {
        println!("Highlights: {}", product.highlights.join(", "));
    }
    if !product.pros.is_empty() {
        println!("Pros: {}", product.pros.join(", "));
    }
    if !product.cons.is_empty() {
        println!("Cons: {}", product.cons.join(", "));
    }

    Ok(())
}

fn run_seed(settings: &Settings, file: Option<PathBuf>, reset: bool) -> Result<()> {
    let store = open_store(settings)?;

    let inserted = match file {
        Some(path) => seed::seed_from_file(&store, &path, reset)?,
        None => {
            if reset {
                store.clear_products()?;
            }
            seed::seed_demo(&store)?
        }
    };

    if inserted == 0 {
        println!("Catalog already populated; nothing inserted (use --reset to reseed).");
    } else {
        println!(
            "Seeded {inserted} products into {}",
            settings.catalog_db.display()
        );
    }

    Ok(())
}

fn doctor(settings: &Settings) -> Result<()> {
    println!("shopscout doctor\n");

    match CatalogStore::open(&settings.catalog_db) {
        Ok(store) => {
            let count = store.count_products()?;
            println!(
                "catalog:   ok ({} products, {})",
                count,
                settings.catalog_db.display()
            );
            if count == 0 {
                println!("           hint: run `shopscout seed` to load the demo catalog");
            }
        }
        Err(e) => println!("catalog:   FAILED ({e})"),
    }

    let kinds = settings.configured_provider_kinds();
    for kind in &kinds {
        println!("provider:  {kind} configured");
    }
    if kinds.len() == 1 {
        println!("           hint: no API keys set; responses will come from the mock provider");
    }

    Ok(())
}

fn show_config(settings: &Settings) -> Result<()> {
    println!("Resolved configuration:\n");

    match &settings.config_file {
        Some(path) => println!("config file:       {}", path.display()),
        None => println!("config file:       (none found)"),
    }

    println!("catalog db:        {}", settings.catalog_db.display());
    println!(
        "google api key:    {}",
        mask(&settings.providers.google_api_key)
    );
    println!("gemini model:      {}", settings.providers.gemini_model);
    println!(
        "openai api key:    {}",
        mask(&settings.providers.openai_api_key)
    );
    println!("openai model:      {}", settings.providers.openai_model);
    println!(
        "anthropic api key: {}",
        mask(&settings.providers.anthropic_api_key)
    );
    println!("anthropic model:   {}", settings.providers.anthropic_model);
    println!("call timeout:      {:?}", settings.call_timeout);
    println!("retry attempts:    {}", settings.retry.max_attempts);
    println!("breaker threshold: {}", settings.breaker.failure_threshold);
    println!("breaker cooldown:  {:?}", settings.breaker.timeout);
    println!("safety enabled:    {}", settings.safety.enabled);
    println!("max query length:  {}", settings.safety.max_query_length);
    println!("max results:       {}", settings.search.max_results);

    Ok(())
}

fn mask(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "configured (hidden)"
    } else {
        "not set"
    }
}

fn print_summary_line(product: &Product) {
    println!(
        "[{}] {} ({}) - ₹{:.0} | {}GB RAM, {}mAh, {}",
        product.id,
        product.name,
        product.brand,
        product.price,
        product.ram,
        product.battery_capacity,
        product.processor,
    );
}
