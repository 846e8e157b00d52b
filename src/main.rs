use bizrec_api::{ApiState, RestApi};
use bizrec_core::{FeatureCatalog, FeatureIndexBuilder, IndexConfig, IndexHandle, IndexMode};
use bizrec_service::{
    spawn_consumer, EventQueue, IngestionPipeline, PreferenceUpdatePipeline,
    RecommendationService, ServiceConfig,
};
use bizrec_storage::{CatalogPersistence, MemoryCacheStore, MemoryStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Business recommendation server
#[derive(Parser, Debug)]
#[command(name = "bizrec")]
#[command(about = "Business recommendations over a TF-IDF similarity index", long_about = None)]
struct Args {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// HTTP API port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seconds a cached response stays valid
    #[arg(long, default_value_t = 3600)]
    cache_ttl: u64,

    /// Index structures to build: matrix, query-vector or both
    #[arg(long, default_value = "both")]
    index_mode: IndexMode,

    /// Results per structured query
    #[arg(long, default_value_t = bizrec_core::STRUCTURED_TOP_K)]
    structured_top_k: usize,

    /// Results per free-text query
    #[arg(long, default_value_t = bizrec_core::FREE_TEXT_TOP_K)]
    free_text_top_k: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting bizrec v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", args.data_dir);
    info!("HTTP API port: {}", args.http_port);

    let persistence = CatalogPersistence::new(&args.data_dir);
    let catalog = persistence.load()?.unwrap_or_else(FeatureCatalog::new);
    info!("Catalog loaded: {} businesses", catalog.len());

    let store = Arc::new(MemoryStore::new());
    for record in catalog.records() {
        store.upsert_business(record.fields());
    }
    let cache = Arc::new(MemoryCacheStore::new());
    let index = Arc::new(IndexHandle::new());

    let builder = FeatureIndexBuilder::new(IndexConfig { mode: args.index_mode });
    let ingestion = Arc::new(
        IngestionPipeline::new(catalog, builder, index.clone()).with_persistence(persistence),
    );
    ingestion.publish_current();

    let service = Arc::new(RecommendationService::new(
        index,
        cache.clone(),
        store.clone(),
        ServiceConfig {
            structured_top_k: args.structured_top_k,
            free_text_top_k: args.free_text_top_k,
            cache_ttl: Duration::from_secs(args.cache_ttl),
        },
    ));
    let preferences = Arc::new(PreferenceUpdatePipeline::new(store, service.clone()));

    let business_events = Arc::new(EventQueue::new());
    let preference_events = Arc::new(EventQueue::new());
    let ingestion_consumer = spawn_consumer(business_events.clone(), ingestion)?;
    let preference_consumer = spawn_consumer(preference_events.clone(), preferences)?;

    let state = ApiState {
        service,
        business_events,
        preference_events,
        ingestion_status: ingestion_consumer.status().clone(),
        preference_status: preference_consumer.status().clone(),
    };

    let purge_cache = cache.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let purged = purge_cache.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired cache entries", purged);
            }
        }
    });

    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, http_port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("bizrec started successfully");
    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    tokio::task::spawn_blocking(move || {
        ingestion_consumer.shutdown();
        preference_consumer.shutdown();
    })
    .await?;
    Ok(())
}
