mod config;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, Responder};
use dd_core::{compute_session_hash, GameOverAck, LeaderboardUpdate, SessionLog};
use leaderboard::{
    build_weekly_digest, replay_session, run_announcement_worker, verify_game_over,
    AnnouncementSink, ChannelScheduler, JsonFileStore, LeaderboardError, LeaderboardService,
    MemoryStore, PlayerIdentity, RankingStore, ReplayError, SubmitOutcome, TracingSink,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::config::ServerConfig;

/// Largest `k` a leaderboard query may ask for.
const MAX_QUERY_K: usize = 100;
const UPDATE_CHANNEL_CAPACITY: usize = 64;

struct AppState {
    service: Arc<LeaderboardService>,
    updates: broadcast::Sender<LeaderboardUpdate>,
    leaderboard_size: usize,
}

// Request/Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameOverRequest {
    stable_id: String,
    display_name: String,
    final_score: u64,
    /// Recorded session backing the score; replayed when present
    #[serde(default)]
    session: Option<SessionLog>,
}

#[derive(Debug, Serialize)]
struct GameOverResponse {
    #[serde(flatten)]
    ack: GameOverAck,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    k: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayResponse {
    success: bool,
    replayed_score: u64,
    claimed_score: u64,
    log_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

fn error_status(err: &LeaderboardError) -> actix_web::http::StatusCode {
    use actix_web::http::StatusCode;
    match err {
        LeaderboardError::InvalidSubmission(_) => StatusCode::BAD_REQUEST,
        LeaderboardError::ReplayRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LeaderboardError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LeaderboardError::IdentityResolutionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// API Handlers

/// POST /api/game-over
/// Submit a final score; the leaderboard follows on the broadcast stream
async fn game_over(state: web::Data<AppState>, req: web::Json<GameOverRequest>) -> impl Responder {
    let req = req.into_inner();
    tracing::info!(
        "Received game over for {} ({}) with score {}",
        req.display_name,
        req.stable_id,
        req.final_score
    );

    let player = PlayerIdentity::new(req.stable_id, req.display_name);
    let respond_err = |err: LeaderboardError, display_name: String| {
        HttpResponse::build(error_status(&err)).json(GameOverResponse {
            ack: GameOverAck {
                success: false,
                display_name,
            },
            error: Some(err.to_string()),
        })
    };

    if let Some(log) = &req.session {
        if let Err(e) = verify_game_over(req.final_score, log) {
            tracing::warn!("Rejecting score from {}: {}", player.display_name, e);
            return respond_err(e.into(), player.display_name);
        }
    }

    match state.service.record_game_over(&player, req.final_score).await {
        Ok(report) => {
            if report.outcome == SubmitOutcome::Updated {
                broadcast_leaderboard(&state).await;
            }
            HttpResponse::Ok().json(GameOverResponse {
                ack: GameOverAck {
                    success: true,
                    display_name: player.display_name,
                },
                error: None,
            })
        }
        Err(e) => {
            tracing::error!("Failed to record game over for {}: {}", player.stable_id, e);
            respond_err(e, player.display_name)
        }
    }
}

/// Push the current top entries to every stream subscriber.
async fn broadcast_leaderboard(state: &AppState) {
    match state.service.get_top_k(state.leaderboard_size).await {
        Ok(snapshot) => {
            let update = LeaderboardUpdate::from(snapshot.to_data());
            // No subscribers is not an error
            let receivers = state.updates.send(update).unwrap_or(0);
            tracing::debug!("Broadcast leaderboard to {} subscribers", receivers);
        }
        Err(e) => tracing::error!("Failed to read leaderboard for broadcast: {}", e),
    }
}

/// GET /api/leaderboard?k=
async fn get_leaderboard(
    state: web::Data<AppState>,
    query: web::Query<LeaderboardQuery>,
) -> impl Responder {
    let k = query.k.unwrap_or(state.leaderboard_size).min(MAX_QUERY_K);

    match state.service.get_top_k(k).await {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot.to_data()),
        Err(e) => {
            tracing::error!("Failed to read leaderboard: {}", e);
            HttpResponse::build(error_status(&e)).json(ErrorResponse {
                success: false,
                error: e.to_string(),
            })
        }
    }
}

fn sse_frame(update: &LeaderboardUpdate) -> Option<web::Bytes> {
    match serde_json::to_string(update) {
        Ok(json) => Some(web::Bytes::from(format!(
            "event: leaderboard\ndata: {}\n\n",
            json
        ))),
        Err(e) => {
            tracing::error!("Failed to encode leaderboard update: {}", e);
            None
        }
    }
}

/// GET /api/leaderboard/stream
/// Server-sent events: the current leaderboard, then every update
async fn leaderboard_stream(state: web::Data<AppState>) -> impl Responder {
    let rx = state.updates.subscribe();
    let current = match state.service.get_top_k(state.leaderboard_size).await {
        Ok(snapshot) => Some(LeaderboardUpdate::from(snapshot.to_data())),
        Err(e) => {
            tracing::warn!("Stream opened without initial leaderboard: {}", e);
            None
        }
    };

    let live = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(update) => Some(update),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("Leaderboard stream lagged; skipped {} updates", skipped);
            None
        }
    });
    let body = tokio_stream::iter(current)
        .chain(live)
        .filter_map(|update| sse_frame(&update))
        .map(Ok::<_, actix_web::Error>);

    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .content_type("text/event-stream")
        .streaming(body)
}

/// POST /api/replay
/// Replay a session log and check its claimed score
async fn replay(req: web::Json<SessionLog>) -> impl Responder {
    let log = req.into_inner();
    tracing::info!(
        "Received replay request for session {} ({} events)",
        log.session_id,
        log.events.len()
    );

    match replay_session(&log) {
        Ok(report) => HttpResponse::Ok().json(ReplayResponse {
            success: true,
            replayed_score: report.replayed_score,
            claimed_score: report.claimed_score,
            log_hash: report.log_hash,
            error: None,
        }),
        Err(e) => {
            tracing::warn!("Replay of session {} rejected: {}", log.session_id, e);
            let replayed_score = match e {
                ReplayError::ScoreMismatch { replayed, .. } => replayed,
                _ => 0,
            };
            HttpResponse::UnprocessableEntity().json(ReplayResponse {
                success: false,
                replayed_score,
                claimed_score: log.claimed_score,
                log_hash: hex::encode(compute_session_hash(&log)),
                error: Some(e.to_string()),
            })
        }
    }
}

/// GET /health
/// Health check endpoint
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "dontdrop-api"
    }))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/api/game-over", web::post().to(game_over))
        .route("/api/leaderboard", web::get().to(get_leaderboard))
        .route("/api/leaderboard/stream", web::get().to(leaderboard_stream))
        .route("/api/replay", web::post().to(replay));
}

fn open_store(config: &ServerConfig) -> std::io::Result<Arc<dyn RankingStore>> {
    match &config.store_path {
        Some(path) => {
            tracing::info!("Using JSON store at {}", path.display());
            let store = JsonFileStore::open(path).map_err(|e| {
                tracing::error!("Failed to open store {}: {}", path.display(), e);
                std::io::Error::other(e.to_string())
            })?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DONTDROP_STORE_PATH not set; scores are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Post the weekly digest every `config.digest_interval`.
async fn run_digest_loop(
    service: Arc<LeaderboardService>,
    sink: Arc<dyn AnnouncementSink>,
    period: std::time::Duration,
) {
    let mut interval = actix_rt::time::interval(period);
    // The first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        match build_weekly_digest(&service, chrono::Utc::now()).await {
            Ok(digest) => {
                if let Err(e) = sink.publish(&digest.title(), &digest.render()).await {
                    tracing::error!("Failed to publish weekly digest {}: {:#}", digest.week, e);
                }
            }
            Err(e) => tracing::error!("Failed to build weekly digest: {}", e),
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Don't Drop API Server");

    let config = ServerConfig::from_env();
    tracing::info!(
        "Leaderboard size {}, digest every {:?}",
        config.leaderboard_size,
        config.digest_interval
    );

    let store = open_store(&config)?;
    let (scheduler, jobs) = ChannelScheduler::new();
    let sink: Arc<dyn AnnouncementSink> = Arc::new(TracingSink);
    actix_rt::spawn(run_announcement_worker(jobs, sink.clone()));

    let service = Arc::new(LeaderboardService::new(store, Arc::new(scheduler)));
    actix_rt::spawn(run_digest_loop(service.clone(), sink, config.digest_interval));

    let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
    let state = web::Data::new(AppState {
        service,
        updates,
        leaderboard_size: config.leaderboard_size,
    });

    tracing::info!("Binding to {}", config.bind_address);
    let json_limit = config.json_limit;

    HttpServer::new(move || {
        // Configure CORS to allow all origins
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_any_header()
            .max_age(86400);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(json_limit))
            .configure(routes)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
