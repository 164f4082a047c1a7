//! AdBounty HTTP API
//!
//! Routes map one-to-one onto [`BountyLedger`] operations. Successful responses
//! carry `"status": "success"`; failures carry `{"detail": "..."}` with:
//!
//! - 404 for an unknown bounty or user
//! - 400 for malformed input
//! - 409 for a rejected status transition (e.g. confirming twice)
//! - 500 for storage faults

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::error::LedgerError;
use crate::ledger::BountyLedger;
use crate::models::{ChannelId, NewBounty, UserId};

const SERVICE_NAME: &str = "AdBounty API";
const SERVICE_DESCRIPTION: &str = "Telegram Mini App for Ad Marketplace with TON Escrow";

pub struct AppState {
    pub ledger: Arc<BountyLedger>,
    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(ledger: Arc<BountyLedger>) -> Self {
        Self {
            ledger,
            started_at: std::time::Instant::now(),
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/auth/telegram", post(auth_handler))
        .route("/users/:user_id/wallet", post(wallet_handler))
        .route("/channels/verified", get(verified_channels_handler))
        .route("/channels/verify", post(verify_channel_handler))
        .route("/bounties/create", post(create_bounty_handler))
        .route("/bounties/user/:user_id", get(user_bounties_handler))
        .route("/bounties/:bounty_id", get(get_bounty_handler))
        .route("/bounties/:bounty_id/bid", post(bid_handler))
        .route("/bounties/:bounty_id/confirm-views", post(confirm_views_handler))
        .route("/deals/user/:user_id", get(user_deals_handler))
        .route("/transactions/:user_id", get(transactions_handler))
        .route("/bot/post-ad", post(post_ad_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError(LedgerError::Validation(r.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        ApiError(LedgerError::Validation(r.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self {
        ApiError(LedgerError::Validation(r.body_text()))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            LedgerError::BountyNotFound(_) | LedgerError::UserNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::AlreadyConfirmed(_) | LedgerError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self.0);
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

// ============================================================================
// SERVICE
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub uptime_secs: u64,
    pub version: String,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": SERVICE_DESCRIPTION,
        "endpoints": {
            "health": "/health",
            "auth": "/auth/telegram",
            "channels": "/channels/verified",
            "bounties": "/bounties/create",
            "transactions": "/transactions/{user_id}"
        }
    }))
}

// ============================================================================
// USERS & CHANNELS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub telegram_id: UserId,
    pub username: String,
}

async fn auth_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AuthQuery>, QueryRejection>,
) -> ApiResult {
    let Query(q) = query?;
    let outcome = state.ledger.authenticate(q.telegram_id, &q.username)?;
    let message = if outcome.created {
        "User authenticated"
    } else {
        "User already exists"
    };
    Ok(Json(json!({
        "status": "success",
        "message": message,
        "user": outcome.user,
    })))
}

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    pub wallet_address: String,
}

async fn wallet_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
    query: Result<Query<WalletQuery>, QueryRejection>,
) -> ApiResult {
    let Path(user_id) = path?;
    let Query(q) = query?;
    if q.wallet_address.trim().is_empty() {
        let err = LedgerError::Validation("wallet_address must not be empty".to_string());
        return Err(err.into());
    }
    let user = state.ledger.update_wallet(user_id, q.wallet_address.trim())?;
    Ok(Json(json!({
        "status": "success",
        "message": "Wallet updated",
        "user": user,
    })))
}

async fn verified_channels_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let channels = state.ledger.list_verified_channels()?;
    Ok(Json(json!({
        "status": "success",
        "count": channels.len(),
        "channels": channels,
    })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyChannelQuery {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub owner_id: UserId,
    pub subscribers: i64,
    pub niche: String,
}

async fn verify_channel_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<VerifyChannelQuery>, QueryRejection>,
) -> ApiResult {
    let Query(q) = query?;
    let channel = state.ledger.verify_channel(
        q.channel_id,
        &q.channel_name,
        q.owner_id,
        q.subscribers,
        &q.niche,
    )?;
    Ok(Json(json!({
        "status": "success",
        "message": "Channel verified",
        "channel": channel,
    })))
}

// ============================================================================
// BOUNTIES
// ============================================================================

async fn create_bounty_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewBounty>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let bounty = state.ledger.create_bounty(req)?;
    Ok(Json(json!({
        "status": "success",
        "message": "Bounty created",
        "bounty": bounty,
    })))
}

async fn get_bounty_handler(
    State(state): State<Arc<AppState>>,
    Path(bounty_id): Path<String>,
) -> ApiResult {
    let bounty = state.ledger.get_bounty(&bounty_id)?;
    Ok(Json(json!({
        "status": "success",
        "bounty": bounty,
    })))
}

async fn user_bounties_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
) -> ApiResult {
    let Path(user_id) = path?;
    let bounties = state.ledger.list_bounties_for_advertiser(user_id)?;
    Ok(Json(json!({
        "status": "success",
        "count": bounties.len(),
        "bounties": bounties,
    })))
}

/// `bounty_id` in the body is accepted for compatibility; the path wins
#[derive(Debug, Deserialize)]
pub struct BidRequest {
    #[serde(default)]
    pub bounty_id: Option<String>,
    pub channel_owner_id: UserId,
    pub channel_id: ChannelId,
}

async fn bid_handler(
    State(state): State<Arc<AppState>>,
    Path(bounty_id): Path<String>,
    body: Result<Json<BidRequest>, JsonRejection>,
) -> ApiResult {
    // unknown bounty must be a 404 even when the body is malformed
    state.ledger.get_bounty(&bounty_id)?;
    let Json(req) = body?;
    if let Some(body_id) = req.bounty_id.as_deref().filter(|id| *id != bounty_id) {
        warn!("Bid body names bounty {} but path names {}", body_id, bounty_id);
    }
    let bid = state
        .ledger
        .place_bid(&bounty_id, req.channel_owner_id, req.channel_id)?;
    Ok(Json(json!({
        "status": "success",
        "message": "Bid placed",
        "bid": bid,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmViewsRequest {
    #[serde(default)]
    pub bounty_id: Option<String>,
    pub channel_owner_id: UserId,
    #[serde(default)]
    pub proof_url: Option<String>,
}

async fn confirm_views_handler(
    State(state): State<Arc<AppState>>,
    Path(bounty_id): Path<String>,
    body: Result<Json<ConfirmViewsRequest>, JsonRejection>,
) -> ApiResult {
    state.ledger.get_bounty(&bounty_id)?;
    let Json(req) = body?;
    let (bounty, transaction) = state.ledger.confirm_views(
        &bounty_id,
        req.channel_owner_id,
        req.proof_url.as_deref(),
    )?;
    Ok(Json(json!({
        "status": "success",
        "message": "Views confirmed, payout released",
        "bounty": bounty,
        "transaction": transaction,
    })))
}

async fn user_deals_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
) -> ApiResult {
    let Path(user_id) = path?;
    let deals = state.ledger.list_deals_for_owner(user_id)?;
    Ok(Json(json!({
        "status": "success",
        "count": deals.len(),
        "deals": deals,
    })))
}

// ============================================================================
// LEDGER & BOT
// ============================================================================

async fn transactions_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
) -> ApiResult {
    let Path(user_id) = path?;
    let transactions = state.ledger.list_transactions_for_user(user_id)?;
    Ok(Json(json!({
        "status": "success",
        "count": transactions.len(),
        "transactions": transactions,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PostAdQuery {
    pub bounty_id: String,
    pub channel_id: ChannelId,
}

async fn post_ad_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PostAdQuery>, QueryRejection>,
) -> ApiResult {
    let Query(q) = query?;
    state.ledger.mark_posted(&q.bounty_id, q.channel_id)?;
    Ok(Json(json!({
        "status": "success",
        "message": "Ad posted to channel",
        "bounty_id": q.bounty_id,
        "channel_id": q.channel_id,
    })))
}

/// Run the server until Ctrl-C
pub async fn run_server(addr: &str, ledger: Arc<BountyLedger>) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(ledger));
    let app = create_router(state);

    info!("Starting AdBounty server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use reqwest::Client;

    async fn spawn_app() -> String {
        let ledger = Arc::new(BountyLedger::new(Box::new(MemoryStorage::new())));
        let app = create_router(Arc::new(AppState::new(ledger)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn create_bounty(client: &Client, base: &str, amount: f64) -> String {
        let resp: Value = client
            .post(format!("{}/bounties/create", base))
            .json(&json!({
                "advertiser_id": 123456789,
                "ton_amount": amount,
                "ad_text": "Test ad",
                "ad_link": "https://test.com",
                "target_channels": [-1001234567890i64],
                "deadline_days": 7
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        resp["bounty"]["bounty_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let base = spawn_app().await;
        let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: HealthResponse = resp.json().await.unwrap();
        assert_eq!(body.status, "healthy");
        assert_eq!(body.service, "AdBounty API");
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let base = spawn_app().await;
        let body: Value = reqwest::get(&base).await.unwrap().json().await.unwrap();
        assert_eq!(body["name"], "AdBounty API");
        assert_eq!(body["endpoints"]["health"], "/health");
    }

    #[tokio::test]
    async fn test_telegram_auth_new_and_existing() {
        let base = spawn_app().await;
        let client = Client::new();
        let url = format!("{}/auth/telegram", base);

        let resp = client
            .post(&url)
            .query(&[("telegram_id", "987654321"), ("username", "existinguser")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "User authenticated");
        assert_eq!(body["user"]["telegram_id"], 987654321);
        assert_eq!(body["user"]["username"], "existinguser");

        let body: Value = client
            .post(&url)
            .query(&[("telegram_id", "987654321"), ("username", "other")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["message"], "User already exists");
        assert_eq!(body["user"]["username"], "existinguser");
    }

    #[tokio::test]
    async fn test_malformed_input_is_400() {
        let base = spawn_app().await;
        let client = Client::new();

        let resp = client
            .post(format!("{}/auth/telegram", base))
            .query(&[("telegram_id", "not-a-number"), ("username", "x")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert!(body["detail"].is_string());

        let resp = client
            .post(format!("{}/bounties/create", base))
            .json(&json!({ "advertiser_id": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let resp = client
            .get(format!("{}/transactions/abc", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_wallet_update() {
        let base = spawn_app().await;
        let client = Client::new();
        let resp = client
            .post(format!("{}/users/5/wallet", base))
            .query(&[("wallet_address", "EQDk2ImpM")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);

        client
            .post(format!("{}/auth/telegram", base))
            .query(&[("telegram_id", "5"), ("username", "bob")])
            .send()
            .await
            .unwrap();
        let body: Value = client
            .post(format!("{}/users/5/wallet", base))
            .query(&[("wallet_address", "EQDk2ImpM")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["user"]["wallet_address"], "EQDk2ImpM");
    }

    #[tokio::test]
    async fn test_verify_and_list_channels() {
        let base = spawn_app().await;
        let client = Client::new();
        let resp = client
            .post(format!("{}/channels/verify", base))
            .query(&[
                ("channel_id", "-1001234567890"),
                ("channel_name", "Tech News"),
                ("owner_id", "123456789"),
                ("subscribers", "50000"),
                ("niche", "technology"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["channel"]["verified"], true);

        let body: Value = reqwest::get(format!("{}/channels/verified", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["channels"][0]["channel_name"], "Tech News");
    }

    #[tokio::test]
    async fn test_bounty_create_and_get() {
        let base = spawn_app().await;
        let client = Client::new();
        let bounty_id = create_bounty(&client, &base, 10.5).await;
        assert_eq!(bounty_id, "bounty_1");

        let body: Value = reqwest::get(format!("{}/bounties/{}", base, bounty_id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["bounty"]["ton_amount"], 10.5);
        assert_eq!(body["bounty"]["status"], "pending");

        let resp = reqwest::get(format!("{}/bounties/nonexistent_bounty", base))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["detail"], "Bounty not found");

        let body: Value = reqwest::get(format!("{}/bounties/user/123456789", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_bid_on_missing_bounty_is_404() {
        let base = spawn_app().await;
        let resp = Client::new()
            .post(format!("{}/bounties/nonexistent/bid", base))
            .json(&json!({
                "bounty_id": "nonexistent",
                "channel_owner_id": 987654321,
                "channel_id": -1001234567890i64
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_full_lifecycle_over_http() {
        let base = spawn_app().await;
        let client = Client::new();
        let bounty_id = create_bounty(&client, &base, 10.0).await;

        let body: Value = client
            .post(format!("{}/bounties/{}/bid", base, bounty_id))
            .json(&json!({
                "bounty_id": bounty_id,
                "channel_owner_id": 987654321,
                "channel_id": -1001234567890i64
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["bid"]["bid_id"], "bid_1");
        assert_eq!(body["bid"]["status"], "pending");

        let body: Value = reqwest::get(format!("{}/deals/user/987654321", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["deals"][0]["amount"], 10.0);

        let resp = client
            .post(format!("{}/bot/post-ad", base))
            .query(&[("bounty_id", bounty_id.as_str()), ("channel_id", "-1001234567890")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            reqwest::get(format!("{}/bounties/{}", base, bounty_id))
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()["bounty"]["status"],
            "posted"
        );

        let confirm = json!({ "bounty_id": bounty_id, "channel_owner_id": 987654321 });
        let body: Value = client
            .post(format!("{}/bounties/{}/confirm-views", base, bounty_id))
            .json(&confirm)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["bounty"]["status"], "confirmed");
        assert_eq!(body["transaction"]["amount"], 10.0);
        assert_eq!(body["transaction"]["tx_type"], "payout");

        let resp = client
            .post(format!("{}/bounties/{}/confirm-views", base, bounty_id))
            .json(&confirm)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);

        let body: Value = reqwest::get(format!("{}/transactions/123456789", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["transactions"][0]["to_user"], 987654321);
    }

    #[tokio::test]
    async fn test_post_ad_missing_bounty_is_404() {
        let base = spawn_app().await;
        let resp = Client::new()
            .post(format!("{}/bot/post-ad", base))
            .query(&[("bounty_id", "bounty_42"), ("channel_id", "-1")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }
}
