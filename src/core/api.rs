//! HTTP + WebSocket API for Sweetspot
//!
//! Endpoints:
//! - POST /session/new - Create and start a session
//! - GET /session/{id} - Get session view
//! - POST /session/{id}/adjust - Nudge the temperature up or down
//! - POST /session/{id}/advance - Advance a number of fixed ticks
//! - GET /ledger/stats - Ledger statistics
//! - POST /ledger/liquidate - Sell all trays
//! - WS /ws/{id} - Live updates
//! - GET /health - Health check

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::core::{FeedbackEngine, FeedbackSignal, Ledger, Session};
use crate::error::ConfigError;
use crate::types::{
    Direction, GameConfig, LedgerStats, Liquidation, Outcome, Recorded, SessionStatus, TickOutput,
};

/// Hosted session
#[derive(Debug)]
pub struct SessionEntry {
    pub session: Session,
    pub feedback: FeedbackEngine,
    /// Ledger result, set once when the session ends
    pub recorded: Option<Outcome>,
    /// When the outcome was recorded; the ticker evicts the entry after
    /// the finished-session TTL
    pub finished_at: Option<Instant>,
    pub update_tx: broadcast::Sender<SessionUpdate>,
}

/// Live update message
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    #[serde(flatten)]
    pub tick: TickOutput,
    pub score: u32,
    pub feedback: FeedbackSignal,
}

/// How long a finished session stays viewable before the ticker drops it
pub const FINISHED_SESSION_TTL: Duration = Duration::from_secs(60);

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, SessionEntry>>,
    pub ledger: RwLock<Ledger>,
    pub config: GameConfig,
    pub finished_ttl: Duration,
    next_id: AtomicU64,
}

impl AppState {
    /// State for a validated config; every hosted session shares it
    pub fn new(config: GameConfig, ledger: Ledger) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            ledger: RwLock::new(ledger),
            config,
            finished_ttl: FINISHED_SESSION_TTL,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn with_finished_ttl(mut self, ttl: Duration) -> Self {
        self.finished_ttl = ttl;
        self
    }
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    /// Seed for a reproducible session
    pub seed: Option<u64>,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
}

/// Session view
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub status: SessionStatus,
    pub value: f64,
    pub target_min: f64,
    pub target_max: f64,
    pub in_window: bool,
    pub elapsed_ms: u64,
    pub time_remaining_ms: u64,
    pub score: u32,
    pub feedback: FeedbackSignal,
    pub failure_progress: f64,
    pub failure_warning: bool,
    pub failure_reason: Option<String>,
    /// Share of retained history spent inside the window
    pub recent_in_window_ratio: f64,
    pub outcome: Option<Outcome>,
}

/// Adjust request
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub direction: Direction,
}

/// Adjust response
#[derive(Debug, Serialize)]
pub struct AdjustResponse {
    /// False when the session is no longer running
    pub applied: bool,
    pub value: f64,
    pub in_window: bool,
}

/// Advance request
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub ticks: u32,
}

/// Advance response
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    pub ticks_run: u32,
    #[serde(flatten)]
    pub view: SessionView,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

/// Create the API router with fresh state
pub fn create_router(config: GameConfig, ledger: Ledger) -> Result<Router, ConfigError> {
    Ok(router(Arc::new(AppState::new(config, ledger)?)))
}

/// Router over existing state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session))
        .route("/session/:id/adjust", post(adjust_session))
        .route("/session/:id/advance", post(advance_session))
        .route("/ledger/stats", get(ledger_stats))
        .route("/ledger/liquidate", post(ledger_liquidate))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    let active = sessions
        .values()
        .filter(|entry| entry.session.status() == SessionStatus::Running)
        .count();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: active,
    })
}

/// Create and start a session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> Result<Json<NewSessionResponse>, StatusCode> {
    let session_id = generate_session_id(&state.next_id);
    let (tx, _) = broadcast::channel(100);

    let mut session = match req.seed {
        Some(seed) => Session::seeded(state.config.clone(), seed),
        None => Session::from_entropy(state.config.clone()),
    };
    session.start();

    let entry = SessionEntry {
        session,
        feedback: FeedbackEngine::new(state.config.feedback_delay()),
        recorded: None,
        finished_at: None,
        update_tx: tx,
    };

    let mut sessions = state.sessions.write().await;
    sessions.insert(session_id.clone(), entry);
    info!(session_id = %session_id, seed = ?req.seed, "Session created");

    Ok(Json(NewSessionResponse {
        session_id: session_id.clone(),
        websocket_url: format!("/ws/{}", session_id),
    }))
}

/// Get session view
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, StatusCode> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(view(&id, entry)))
}

/// Nudge the temperature
async fn adjust_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<AdjustResponse>, StatusCode> {
    let mut sessions = state.sessions.write().await;
    let entry = sessions.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let applied = entry.session.adjust(req.direction);
    debug!(session_id = %id, direction = ?req.direction, applied, value = entry.session.value(), "Adjust");

    Ok(Json(AdjustResponse {
        applied,
        value: entry.session.value(),
        in_window: entry.session.is_in_window(),
    }))
}

/// Advance a session by whole ticks on a manual clock
async fn advance_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AdvanceRequest>,
) -> Result<Json<AdvanceResponse>, StatusCode> {
    let response = on_blocking_pool(&state, move |state| {
        let dt = state.config.tick_interval();
        let mut sessions = state.sessions.blocking_write();
        let entry = sessions.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
        let mut ledger = state.ledger.blocking_write();

        let mut ticks_run = 0;
        while ticks_run < req.ticks && step_entry(&id, entry, &mut ledger, dt).is_some() {
            ticks_run += 1;
        }

        Ok::<_, StatusCode>(AdvanceResponse {
            ticks_run,
            view: view(&id, entry),
        })
    })
    .await??;

    Ok(Json(response))
}

/// Ledger statistics
async fn ledger_stats(State(state): State<Arc<AppState>>) -> Json<LedgerStats> {
    let ledger = state.ledger.read().await;
    Json(ledger.stats())
}

/// Sell all trays
async fn ledger_liquidate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Recorded<Liquidation>>, StatusCode> {
    let sale = on_blocking_pool(&state, |state| state.ledger.blocking_write().liquidate()).await?;
    Ok(Json(sale))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let rx = entry.update_tx.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Handle WebSocket connection; ends when either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<SessionUpdate>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let update = match rx.recv().await {
                Ok(update) => update,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "WebSocket client lagging");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let json = serde_json::to_string(&update).unwrap_or_default();
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Clients only listen; drain until they close
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// One tick of a running session: feedback, broadcast, and a single ledger
/// write when it ends. `None` once the session is no longer running.
fn step_entry(
    id: &str,
    entry: &mut SessionEntry,
    ledger: &mut Ledger,
    dt: Duration,
) -> Option<TickOutput> {
    if entry.session.status() != SessionStatus::Running {
        return None;
    }
    let output = entry.session.tick(dt);
    let feedback = entry.feedback.update(&entry.session);

    // No subscribers is fine
    let _ = entry.update_tx.send(SessionUpdate {
        tick: output.clone(),
        score: entry.session.quality_score(),
        feedback,
    });

    if entry.recorded.is_none() {
        if let Some(outcome) = entry.session.outcome() {
            let recorded = ledger.record_session(&outcome);
            info!(
                session_id = %id,
                score = outcome.score,
                failed = outcome.failed,
                persisted = recorded.persisted,
                "Session finished"
            );
            entry.recorded = Some(recorded.value);
            entry.finished_at = Some(Instant::now());
        }
    }
    Some(output)
}

/// Ledger writes hit the store synchronously, so work that may record an
/// outcome runs on the blocking pool rather than a runtime worker
async fn on_blocking_pool<T, F>(state: &Arc<AppState>, work: F) -> Result<T, StatusCode>
where
    F: FnOnce(&AppState) -> T + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| {
            warn!(error = %e, "Blocking task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Advance every running session one tick and drop sessions finished longer
/// than the TTL ago; returns how many ticked
pub async fn tick_all(state: &Arc<AppState>) -> usize {
    on_blocking_pool(state, tick_all_blocking).await.unwrap_or(0)
}

fn tick_all_blocking(state: &AppState) -> usize {
    let dt = state.config.tick_interval();
    let mut sessions = state.sessions.blocking_write();
    let mut ledger = state.ledger.blocking_write();
    let ticked = sessions
        .iter_mut()
        .filter_map(|(id, entry)| step_entry(id, entry, &mut ledger, dt))
        .count();

    let ttl = state.finished_ttl;
    sessions.retain(|id, entry| {
        let keep = entry.finished_at.map_or(true, |at| at.elapsed() < ttl);
        if !keep {
            debug!(session_id = %id, "Finished session evicted");
        }
        keep
    });
    ticked
}

fn view(id: &str, entry: &SessionEntry) -> SessionView {
    let session = &entry.session;
    SessionView {
        session_id: id.to_string(),
        status: session.status(),
        value: session.value(),
        target_min: session.target_min(),
        target_max: session.target_max(),
        in_window: session.is_in_window(),
        elapsed_ms: session.elapsed().as_millis() as u64,
        time_remaining_ms: session.time_remaining().as_millis() as u64,
        score: session.quality_score(),
        feedback: entry.feedback.current(),
        failure_progress: session.failure_progress(),
        failure_warning: session.is_failure_warning(),
        failure_reason: session.failure_reason().map(str::to_string),
        recent_in_window_ratio: session.history().in_window_ratio(),
        outcome: entry.recorded.clone(),
    }
}

/// Generate session ID
fn generate_session_id(counter: &AtomicU64) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let n = counter.fetch_add(1, Ordering::Relaxed);
    format!("session_{:x}_{}", nanos as u64, n)
}

/// Run the API server
pub async fn run_server(
    addr: &str,
    config: GameConfig,
    ledger: Ledger,
) -> Result<(), Box<dyn std::error::Error>> {
    let period = config.tick_interval().max(Duration::from_millis(1));
    let state = Arc::new(AppState::new(config, ledger)?);

    let ticker_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            tick_all(&ticker_state).await;
        }
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, tick_ms = period.as_millis() as u64, "API listening");
    println!("🍳 Sweetspot API running on {}", addr);
    println!("  POST /session/new          - Create session");
    println!("  GET  /session/:id          - Get status");
    println!("  POST /session/:id/adjust   - Adjust temperature");
    println!("  POST /session/:id/advance  - Advance ticks");
    println!("  GET  /ledger/stats         - Ledger stats");
    println!("  POST /ledger/liquidate     - Sell trays");
    println!("  WS   /ws/:id               - Live updates");
    println!("  GET  /health               - Health check");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
