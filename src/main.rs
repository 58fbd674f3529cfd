// Number-Pool Lottery - Main Entry Point
// Capped-AMM lottery rounds over an HTTP API

use axum::{
    routing::{get, post},
    Router,
};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

mod app_state;
mod engine;
mod handlers;
mod ledger;
mod models;
mod randomness;
mod registry;

use app_state::{AppState, ServiceConfig, SharedState};
use handlers::*;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().init();

    println!("\n═══════════════════════════════════════════════");
    println!("     🎰 Number-Pool Lottery");
    println!("═══════════════════════════════════════════════\n");

    let config = ServiceConfig::from_env();
    let port = config.bind_port;
    let state: SharedState = Arc::new(Mutex::new(AppState::new(config)));

    // Clone for the shutdown handler before moving into the router
    let shutdown_state = state.clone();

    let app = Router::new()
        // ===== ROUNDS =====
        .route("/rounds", post(create_round))
        .route("/rounds", get(get_rounds))
        .route("/rounds/:id", get(get_round))
        // ===== BETTING =====
        .route("/rounds/:id/bets", post(place_bet))
        .route("/rounds/:id/bets/:player", get(get_user_bets))
        .route("/rounds/:id/odds", get(get_odds))
        .route("/rounds/:id/max-bet/:number", get(get_max_bet))
        .route("/rounds/:id/exposure/:number", get(get_exposure))
        // ===== DRAW & SETTLEMENT =====
        .route("/rounds/:id/draw", post(request_draw))
        .route("/rounds/:id/fulfill", post(fulfill_draw))
        .route("/rounds/:id/claim", post(claim_winnings))
        .route("/rounds/:id/withdraw", post(withdraw_collateral))
        // ===== LEDGER =====
        .route("/deposit", post(deposit))
        .route("/balance/:account", get(get_balance))
        .route("/ledger", get(get_ledger_activity))
        // ===== HEALTH =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{}", addr);

    println!("📋 Endpoints:");
    println!("   POST /rounds                       - Create round (locks collateral)");
    println!("   GET  /rounds, /rounds/:id          - Round metadata");
    println!("   POST /rounds/:id/bets              - Place bet");
    println!("   GET  /rounds/:id/odds?number=N     - Odds quote");
    println!("   GET  /rounds/:id/max-bet/:number   - Largest admissible bet");
    println!("   GET  /rounds/:id/exposure/:number  - Exposure and stakes");
    println!("   GET  /rounds/:id/bets/:player      - Player's bets");
    println!("   POST /rounds/:id/draw              - Request the draw");
    println!("   POST /rounds/:id/fulfill           - Oracle callback (external mode)");
    println!("   POST /rounds/:id/claim             - Claim winnings");
    println!("   POST /rounds/:id/withdraw          - Withdraw residual collateral");
    println!("   POST /deposit, GET /balance/:acct  - Cash ledger");
    println!("   GET  /ledger                       - Emitted records\n");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    // Persist state on ctrl-c
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
        info!("shutdown signal received, saving state");
        if let Ok(app_state) = shutdown_state.lock() {
            if let Err(e) = app_state.save_to_disk() {
                tracing::error!("failed to save state: {}", e);
            }
        }
        std::process::exit(0);
    });

    axum::serve(listener, app).await.unwrap();
}
