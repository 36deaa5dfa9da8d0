//! HTTP Handlers

use std::fmt::Display;
use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use btc_advisor::{
    AdvisorError, ChatMessage, ErrorClass, MarketInputs, MarketSnapshot, PricePoint,
    Recommendation, RiskProfile, SentimentIndex, TechnicalScore, Transaction, WalletLedger,
    WalletState, signal::MarketSignal,
};

use crate::state::AppState;

pub const DEFAULT_HISTORY_DAYS: u32 = 7;
pub const MAX_HISTORY_DAYS: u32 = 365;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub market_source: String,
    pub signal_strategy: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct MarketResponse {
    pub snapshot: MarketSnapshot,
    pub sentiment: SentimentIndex,
    pub technical: TechnicalScore,
    /// Inline message when the last refresh failed
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationsQuery {
    #[serde(default)]
    pub risk_profile: RiskProfile,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
    pub narrative: String,
    pub risk_profile: RiskProfile,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub wallet: WalletState,
    /// `None` until a price is known
    pub portfolio_value_usd: Option<Decimal>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub usd_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SellRequest {
    pub btc_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub transaction: Transaction,
    pub wallet: WalletState,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// `None` for blank input
    pub reply: Option<ChatMessage>,
}

// ============================================================================
// Error Mapping
// ============================================================================

fn error_code(err: &AdvisorError) -> &'static str {
    match err {
        AdvisorError::Network(_) => "NETWORK_ERROR",
        AdvisorError::UpstreamStatus { .. } => "UPSTREAM_ERROR",
        AdvisorError::Parse(_) => "PARSE_ERROR",
        AdvisorError::InvalidAmount(_) => "INVALID_AMOUNT",
        AdvisorError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
        AdvisorError::InsufficientHoldings { .. } => "INSUFFICIENT_HOLDINGS",
        AdvisorError::PriceUnavailable(_) => "PRICE_UNAVAILABLE",
        AdvisorError::Storage(_) | AdvisorError::Serialization(_) => "STORAGE_ERROR",
        AdvisorError::Config(_) => "CONFIG_ERROR",
    }
}

fn api_error(err: &AdvisorError) -> ApiError {
    let status = match err.class() {
        ErrorClass::ValidationFailure => StatusCode::BAD_REQUEST,
        ErrorClass::NetworkFailure | ErrorClass::ParseFailure => StatusCode::BAD_GATEWAY,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: error_code(err).into(),
        }),
    )
}

/// Malformed query string or body that never reached a handler
fn invalid_request(rejection: &impl Display) -> ApiError {
    tracing::debug!("Request rejected: {}", rejection);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: rejection.to_string(),
            code: "INVALID_REQUEST".into(),
        }),
    )
}

/// Non-numeric or missing trade amount
fn invalid_amount(rejection: &JsonRejection) -> ApiError {
    api_error(&AdvisorError::InvalidAmount(rejection.body_text()))
}

/// Run a ledger operation off the async workers; the store does blocking file I/O.
async fn with_ledger<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut WalletLedger) -> btc_advisor::Result<T> + Send + 'static,
{
    let mut ledger = Arc::clone(&state.ledger).lock_owned().await;
    tokio::task::spawn_blocking(move || op(&mut ledger))
        .await
        .map_err(|e| {
            tracing::error!("Ledger task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "An unexpected error occurred.".into(),
                    code: "INTERNAL_ERROR".into(),
                }),
            )
        })?
        .map_err(|e| api_error(&e))
}

async fn current_price(state: &AppState) -> Option<Decimal> {
    state
        .cache
        .read()
        .await
        .snapshot
        .as_ref()
        .filter(|s| s.is_valid())
        .map(|s| s.price)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        market_source: state.source.name().into(),
        signal_strategy: state.signal.name().into(),
    })
}

/// Latest cached market data
pub async fn market(State(state): State<AppState>) -> Json<MarketResponse> {
    let cache = state.cache.read().await;
    let snapshot = cache.snapshot_or_fallback();
    let technical = cache
        .technical
        .clone()
        .unwrap_or_else(|| TechnicalScore::from_snapshot(&snapshot));

    Json(MarketResponse {
        sentiment: cache.sentiment_or_fallback(),
        technical,
        snapshot,
        error: cache.last_error.clone(),
        updated_at: cache.updated_at,
    })
}

/// Price history for the chart
pub async fn price_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Vec<PricePoint>> {
    let Query(query) = query.map_err(|e| invalid_request(&e))?;
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("days must be between 1 and {MAX_HISTORY_DAYS}"),
                code: "INVALID_DAYS".into(),
            }),
        ));
    }

    let points = state
        .source
        .price_history(days)
        .await
        .map_err(|e| api_error(&e))?;
    Ok(Json(points))
}

/// Recommendations and narrative for the current market
pub async fn recommendations(
    State(state): State<AppState>,
    query: Result<Query<RecommendationsQuery>, QueryRejection>,
) -> ApiResult<RecommendationsResponse> {
    let Query(query) = query.map_err(|e| invalid_request(&e))?;
    let cache = state.cache.read().await;
    let inputs = MarketInputs {
        snapshot: cache.snapshot.as_ref(),
        sentiment: cache.sentiment.as_ref(),
        technical: cache.technical.as_ref(),
    };
    let synthesis = state.synthesizer.synthesize(inputs, query.risk_profile);

    Ok(Json(RecommendationsResponse {
        recommendations: synthesis.recommendations,
        narrative: synthesis.narrative,
        risk_profile: query.risk_profile,
    }))
}

/// Headline demo signal
pub async fn signal(State(state): State<AppState>) -> Json<MarketSignal> {
    Json(state.signal.next_signal())
}

/// Wallet balances and history
pub async fn wallet(State(state): State<AppState>) -> Json<WalletResponse> {
    let price = current_price(&state).await;
    let ledger = state.ledger.lock().await;

    Json(WalletResponse {
        wallet: ledger.state().clone(),
        portfolio_value_usd: price.map(|p| ledger.portfolio_value(p)),
        price,
    })
}

/// Simulated buy at the cached price
pub async fn buy(
    State(state): State<AppState>,
    payload: Result<Json<BuyRequest>, JsonRejection>,
) -> ApiResult<TradeResponse> {
    let Json(payload) = payload.map_err(|e| invalid_amount(&e))?;
    let price = current_price(&state).await.ok_or_else(|| {
        api_error(&AdvisorError::PriceUnavailable("no market snapshot yet".into()))
    })?;

    let trade = with_ledger(&state, move |ledger| {
        let transaction = ledger.buy(payload.usd_amount, price)?;
        Ok(TradeResponse {
            transaction,
            wallet: ledger.state().clone(),
        })
    })
    .await?;
    Ok(Json(trade))
}

/// Simulated sell at the cached price
pub async fn sell(
    State(state): State<AppState>,
    payload: Result<Json<SellRequest>, JsonRejection>,
) -> ApiResult<TradeResponse> {
    let Json(payload) = payload.map_err(|e| invalid_amount(&e))?;
    let price = current_price(&state).await.ok_or_else(|| {
        api_error(&AdvisorError::PriceUnavailable("no market snapshot yet".into()))
    })?;

    let trade = with_ledger(&state, move |ledger| {
        let transaction = ledger.sell(payload.btc_amount, price)?;
        Ok(TradeResponse {
            transaction,
            wallet: ledger.state().clone(),
        })
    })
    .await?;
    Ok(Json(trade))
}

/// Restore the default wallet
pub async fn reset_wallet(State(state): State<AppState>) -> ApiResult<WalletState> {
    let wallet = with_ledger(&state, |ledger| ledger.reset().cloned()).await?;
    Ok(Json(wallet))
}

/// Canned chatbot reply
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let Json(payload) = payload.map_err(|e| invalid_request(&e))?;
    Ok(Json(ChatResponse {
        reply: state.chatbot.reply(&payload.message),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use btc_advisor::{
        CannedChatbot, MarketPoller, MemoryWalletStore, MockMarketSource, PollerConfig,
        SignalSynthesizer, WalletLedger,
        signal::{FixedSignal, SignalAction},
    };

    use super::*;

    async fn test_app(source: Arc<MockMarketSource>, warm: bool) -> Router {
        let poller = MarketPoller::new(source.clone(), PollerConfig::default());
        if warm {
            poller.refresh_market().await;
            poller.refresh_sentiment().await;
        }

        let ledger = WalletLedger::open(Arc::new(MemoryWalletStore::new())).unwrap();
        let state = AppState {
            source,
            cache: poller.cache(),
            ledger: Arc::new(Mutex::new(ledger)),
            signal: Arc::new(FixedSignal::new(SignalAction::Buy, 80)),
            synthesizer: SignalSynthesizer::new(),
            chatbot: Arc::new(CannedChatbot::seeded(1)),
        };
        crate::build_router(state, None)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn sixty_k() -> Arc<MockMarketSource> {
        Arc::new(
            MockMarketSource::new()
                .with_snapshot(MarketSnapshot::new(dec!(60000), dec!(1.5)))
                .with_sentiment(SentimentIndex::new(20)),
        )
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(sixty_k(), false).await;
        let (status, body) = send(app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["market_source"], "mock");
        assert_eq!(body["signal_strategy"], "fixed");
    }

    #[tokio::test]
    async fn test_market_serves_cache() {
        let app = test_app(sixty_k(), true).await;
        let (status, body) = send(app, "GET", "/api/market", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sentiment"]["value"], 20);
        assert!(body["error"].is_null());
        let snapshot: MarketSnapshot = serde_json::from_value(body["snapshot"].clone()).unwrap();
        assert_eq!(snapshot.price, dec!(60000));
    }

    #[tokio::test]
    async fn test_market_reports_inline_error() {
        let source = sixty_k();
        source.set_failing(true);
        let app = test_app(source, true).await;

        let (status, body) = send(app, "GET", "/api/market", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].is_string());
        let snapshot: MarketSnapshot = serde_json::from_value(body["snapshot"].clone()).unwrap();
        assert_eq!(snapshot.price, MarketSnapshot::fallback().price);
    }

    #[tokio::test]
    async fn test_history_bounds() {
        let app = test_app(sixty_k(), false).await;
        let (status, body) = send(app.clone(), "GET", "/api/market/history?days=3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(4));

        let (status, body) = send(app, "GET", "/api/market/history?days=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_DAYS");
    }

    #[tokio::test]
    async fn test_recommendations_for_extreme_fear() {
        let app = test_app(sixty_k(), true).await;
        let (status, body) = send(
            app,
            "GET",
            "/api/recommendations?risk_profile=conservative",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["risk_profile"], "conservative");
        let recs = body["recommendations"].as_array().unwrap();
        assert!(recs.iter().any(|r| r["category"] == "buy" && r["confidence"] == 75));
        assert!(
            body["narrative"]
                .as_str()
                .unwrap()
                .contains("conservative risk profile")
        );
    }

    #[tokio::test]
    async fn test_recommendations_without_data_fall_back() {
        let app = test_app(sixty_k(), false).await;
        let (status, body) = send(app, "GET", "/api/recommendations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendations"], json!([]));
        assert_eq!(body["narrative"], btc_advisor::signal::FALLBACK_NARRATIVE);
        assert_eq!(body["risk_profile"], "moderate");
    }

    #[tokio::test]
    async fn test_unknown_risk_profile_rejected() {
        let app = test_app(sixty_k(), true).await;
        let (status, body) =
            send(app, "GET", "/api/recommendations?risk_profile=yolo", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_signal() {
        let app = test_app(sixty_k(), false).await;
        let (status, body) = send(app, "GET", "/api/signal", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "BUY");
        assert_eq!(body["confidence"], 80);
    }

    #[tokio::test]
    async fn test_buy_at_cached_price() {
        let app = test_app(sixty_k(), true).await;
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/wallet/buy",
            Some(json!({ "usd_amount": 6000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let wallet: WalletState = serde_json::from_value(body["wallet"].clone()).unwrap();
        assert_eq!(wallet.usd_balance, dec!(4000));
        assert_eq!(wallet.btc_balance, dec!(0.6));
        let tx: Transaction = serde_json::from_value(body["transaction"].clone()).unwrap();
        assert_eq!(tx.btc_amount, dec!(0.1));

        let (_, body) = send(app, "GET", "/api/wallet", None).await;
        let value: Decimal =
            serde_json::from_value(body["portfolio_value_usd"].clone()).unwrap();
        assert_eq!(value, dec!(40000));
    }

    #[tokio::test]
    async fn test_sell_more_than_held() {
        let app = test_app(sixty_k(), true).await;
        let (status, body) = send(
            app,
            "POST",
            "/api/wallet/sell",
            Some(json!({ "btc_amount": "0.75" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INSUFFICIENT_HOLDINGS");
    }

    #[tokio::test]
    async fn test_non_numeric_amounts_are_validation_errors() {
        let app = test_app(sixty_k(), true).await;

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/wallet/buy",
            Some(json!({ "usd_amount": "abc" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_AMOUNT");
        assert!(body["error"].is_string());

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/wallet/sell",
            Some(json!({ "btc_amount": "ten" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_AMOUNT");

        let (_, body) = send(app, "GET", "/api/wallet", None).await;
        let wallet: WalletState = serde_json::from_value(body["wallet"].clone()).unwrap();
        assert_eq!(wallet, WalletState::default());
    }

    #[tokio::test]
    async fn test_malformed_query_is_json_error() {
        let app = test_app(sixty_k(), false).await;
        let (status, body) = send(app, "GET", "/api/market/history?days=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_trade_without_price_rejected() {
        let app = test_app(sixty_k(), false).await;
        let (status, body) = send(
            app,
            "POST",
            "/api/wallet/buy",
            Some(json!({ "usd_amount": 100 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "PRICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_reset_wallet() {
        let app = test_app(sixty_k(), true).await;
        send(
            app.clone(),
            "POST",
            "/api/wallet/buy",
            Some(json!({ "usd_amount": 500 })),
        )
        .await;

        let (status, body) = send(app, "POST", "/api/wallet/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        let wallet: WalletState = serde_json::from_value(body).unwrap();
        assert_eq!(wallet, WalletState::default());
    }

    #[tokio::test]
    async fn test_chat() {
        let app = test_app(sixty_k(), false).await;
        let (_, body) = send(app.clone(), "POST", "/api/chat", Some(json!({ "message": "hi" }))).await;
        assert_eq!(body["reply"]["sender"], "bot");

        let (_, body) = send(app, "POST", "/api/chat", Some(json!({ "message": "  " }))).await;
        assert!(body["reply"].is_null());
    }
}
