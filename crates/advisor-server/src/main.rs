//! btc-advisor HTTP Server
//!
//! Axum-based server exposing live market data, recommendations and the
//! simulated wallet as a REST API. Market data is polled in the background
//! and served from cache.

mod config;
mod handlers;
mod state;

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btc_advisor::{
    CannedChatbot, FileWalletStore, HttpMarketSource, MarketDataSource, MarketPoller,
    MockMarketSource, SignalSynthesizer, WalletLedger,
    signal::{RandomSignal, SignalStrategy},
};

use crate::config::ServerConfig;
use crate::handlers::{
    buy, chat, health_check, market, price_history, recommendations, reset_wallet, sell, signal,
    wallet,
};
use crate::state::AppState;

/// Build the application router. Unmatched paths fall through to `static_dir`.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        // Health
        .route("/health", get(health_check))
        // Market data
        .route("/api/market", get(market))
        .route("/api/market/history", get(price_history))
        .route("/api/recommendations", get(recommendations))
        .route("/api/signal", get(signal))
        // Simulated wallet
        .route("/api/wallet", get(wallet))
        .route("/api/wallet/buy", post(buy))
        .route("/api/wallet/sell", post(sell))
        .route("/api/wallet/reset", post(reset_wallet))
        // Chat
        .route("/api/chat", post(chat));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();

    // Market data source
    let source: Arc<dyn MarketDataSource> = if config.use_mock_market {
        tracing::warn!("⚠ Using mock market data - prices are static");
        Arc::new(MockMarketSource::new())
    } else {
        tracing::info!("✓ Price API: {}", config.market.price_api_url);
        tracing::info!("✓ Sentiment API: {}", config.market.sentiment_api_url);
        Arc::new(HttpMarketSource::new(config.market.clone())?)
    };

    // Background polling
    let poller = MarketPoller::new(source.clone(), config.poller);
    let poller_handle = poller.start();

    // Simulated wallet
    let store = Arc::new(FileWalletStore::new(&config.wallet_path));
    let ledger = WalletLedger::open(store)?;
    tracing::info!(
        "✓ Wallet loaded from {} ({} transactions)",
        config.wallet_path.display(),
        ledger.state().transactions.len()
    );

    // Demo signal
    let signal: Arc<dyn SignalStrategy> = match config.demo_signal_seed {
        Some(seed) => Arc::new(RandomSignal::seeded(seed)),
        None => Arc::new(RandomSignal::new()),
    };

    // Build application state
    let state = AppState {
        source,
        cache: poller.cache(),
        ledger: Arc::new(Mutex::new(ledger)),
        signal,
        synthesizer: SignalSynthesizer::new(),
        chatbot: Arc::new(CannedChatbot::new()),
    };

    let static_dir = config.static_dir.is_dir().then_some(config.static_dir.as_path());
    let app = build_router(state, static_dir);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 btc-advisor server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  GET  /api/market            - Price, sentiment, technicals");
    tracing::info!("  GET  /api/market/history    - Price history (?days=7)");
    tracing::info!("  GET  /api/recommendations   - Recommendations (?risk_profile=moderate)");
    tracing::info!("  GET  /api/signal            - Demo market signal");
    tracing::info!("  GET  /api/wallet            - Simulated wallet");
    tracing::info!("  POST /api/wallet/buy        - Simulated buy");
    tracing::info!("  POST /api/wallet/sell       - Simulated sell");
    tracing::info!("  POST /api/wallet/reset      - Reset wallet");
    tracing::info!("  POST /api/chat              - Chat assistant");
    tracing::info!("");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown requested");
        })
        .await?;

    poller_handle.stop().await;

    Ok(())
}
