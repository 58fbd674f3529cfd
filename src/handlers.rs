// HTTP request handlers for the lottery API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::app_state::{unix_now, SharedState};
use crate::engine::LotteryError;
use crate::models::*;

type ApiError = (StatusCode, Json<ErrorBody>);

/// Map an engine error to an HTTP status
///
/// 404 for missing rounds, 409 for operations illegal in the current
/// lifecycle phase, 422 for the solvency rejection, 400 for bad input.
fn reject(err: LotteryError) -> ApiError {
    let status = match err {
        LotteryError::RoundNotFound(_) => StatusCode::NOT_FOUND,
        LotteryError::ExceedsLimit => StatusCode::UNPROCESSABLE_ENTITY,
        LotteryError::RoundEnded
        | LotteryError::RoundNotEnded
        | LotteryError::NothingToClaim
        | LotteryError::NothingToWithdraw
        | LotteryError::BettingStillOpen
        | LotteryError::DrawAlreadyRequested
        | LotteryError::DrawNotRequested
        | LotteryError::AlreadyResolved => StatusCode::CONFLICT,
        LotteryError::InvalidNumber(_)
        | LotteryError::InvalidAmount
        | LotteryError::InvalidParameters(_)
        | LotteryError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorBody::new(err.to_string())))
}

// ===== ROUNDS =====

pub async fn create_round(
    State(state): State<SharedState>,
    Json(req): Json<CreateRoundRequest>,
) -> Result<Json<CreateRoundResponse>, ApiError> {
    let now = unix_now();
    let mut app = state.lock().unwrap();
    let round_id = app
        .registry
        .create_round(
            &req.creator,
            req.digits,
            req.bet_period_secs,
            req.initial_odds,
            req.min_odds,
            req.creator_fee_bps,
            req.collateral,
            now,
        )
        .map_err(reject)?;
    let round = app.registry.round(round_id).map_err(reject)?;
    Ok(Json(CreateRoundResponse {
        round_id,
        bet_deadline: round.bet_deadline,
        liability_limit: round.liability_limit,
    }))
}

pub async fn get_rounds(State(state): State<SharedState>) -> Json<Vec<RoundSummary>> {
    let now = unix_now();
    let app = state.lock().unwrap();
    let mut summaries: Vec<RoundSummary> = app
        .registry
        .rounds
        .values()
        .map(|r| RoundSummary::from_round(r, now))
        .collect();
    summaries.sort_by_key(|s| s.round_id);
    Json(summaries)
}

pub async fn get_round(
    State(state): State<SharedState>,
    Path(round_id): Path<u64>,
) -> Result<Json<RoundSummary>, ApiError> {
    let now = unix_now();
    let app = state.lock().unwrap();
    let round = app.registry.round(round_id).map_err(reject)?;
    Ok(Json(RoundSummary::from_round(round, now)))
}

// ===== BETTING =====

pub async fn place_bet(
    State(state): State<SharedState>,
    Path(round_id): Path<u64>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<Json<crate::engine::BetReceipt>, ApiError> {
    let now = unix_now();
    let mut app = state.lock().unwrap();
    let receipt = app
        .registry
        .place_bet(round_id, &req.player, req.number, req.amount, now)
        .map_err(reject)?;
    Ok(Json(receipt))
}

pub async fn get_odds(
    State(state): State<SharedState>,
    Path(round_id): Path<u64>,
    Query(query): Query<OddsQuery>,
) -> Result<Json<OddsResponse>, ApiError> {
    let app = state.lock().unwrap();
    let odds = app.registry.get_odds(round_id, query.number).map_err(reject)?;
    Ok(Json(OddsResponse { round_id, number: query.number, odds }))
}

pub async fn get_max_bet(
    State(state): State<SharedState>,
    Path((round_id, number)): Path<(u64, u32)>,
) -> Result<Json<MaxBetResponse>, ApiError> {
    let app = state.lock().unwrap();
    let max_bet = app.registry.max_bet(round_id, number).map_err(reject)?;
    Ok(Json(MaxBetResponse { round_id, number, max_bet }))
}

pub async fn get_exposure(
    State(state): State<SharedState>,
    Path((round_id, number)): Path<(u64, u32)>,
) -> Result<Json<ExposureResponse>, ApiError> {
    let app = state.lock().unwrap();
    let exposure = app.registry.exposure(round_id, number).map_err(reject)?;
    let total_stakes = app.registry.total_stakes(round_id, number).map_err(reject)?;
    Ok(Json(ExposureResponse { round_id, number, exposure, total_stakes }))
}

pub async fn get_user_bets(
    State(state): State<SharedState>,
    Path((round_id, player)): Path<(u64, String)>,
) -> Result<Json<UserBetsResponse>, ApiError> {
    let app = state.lock().unwrap();
    let bets = app.registry.user_bets(round_id, &player).map_err(reject)?;
    Ok(Json(UserBetsResponse { round_id, player, bets }))
}

// ===== DRAW & SETTLEMENT =====

pub async fn request_draw(
    State(state): State<SharedState>,
    Path(round_id): Path<u64>,
    Json(req): Json<DrawRequest>,
) -> Result<Json<DrawResponse>, ApiError> {
    let now = unix_now();
    let mut app = state.lock().unwrap();
    app.registry.request_draw(round_id, &req.caller, now).map_err(reject)?;
    let round = app.registry.round(round_id).map_err(reject)?;
    Ok(Json(DrawResponse {
        round_id,
        resolved: round.is_resolved,
        winning_number: round.winning_number,
    }))
}

pub async fn fulfill_draw(
    State(state): State<SharedState>,
    Path(round_id): Path<u64>,
    Json(req): Json<FulfillDrawRequest>,
) -> Result<Json<DrawResponse>, ApiError> {
    let now = unix_now();
    let mut app = state.lock().unwrap();
    app.registry.fulfill_draw(round_id, req.winning_number, now).map_err(reject)?;
    Ok(Json(DrawResponse {
        round_id,
        resolved: true,
        winning_number: Some(req.winning_number),
    }))
}

pub async fn claim_winnings(
    State(state): State<SharedState>,
    Path(round_id): Path<u64>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<crate::engine::ClaimReceipt>, ApiError> {
    let now = unix_now();
    let mut app = state.lock().unwrap();
    let receipt = app.registry.claim_winnings(round_id, &req.player, now).map_err(reject)?;
    Ok(Json(receipt))
}

pub async fn withdraw_collateral(
    State(state): State<SharedState>,
    Path(round_id): Path<u64>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let now = unix_now();
    let mut app = state.lock().unwrap();
    let residual = app.registry.withdraw_collateral(round_id, now).map_err(reject)?;
    Ok(Json(WithdrawResponse { round_id, residual_withdrawn: residual }))
}

// ===== LEDGER =====

pub async fn deposit(
    State(state): State<SharedState>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    if req.amount == 0 {
        return Err(reject(LotteryError::InvalidAmount));
    }
    let now = unix_now();
    let mut app = state.lock().unwrap();
    app.registry.deposit(&req.account, req.amount, now);
    let balance = app.registry.ledger.balance(&req.account);
    Ok(Json(BalanceResponse { account: req.account, balance }))
}

pub async fn get_balance(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> Json<BalanceResponse> {
    let app = state.lock().unwrap();
    let balance = app.registry.ledger.balance(&account);
    Json(BalanceResponse { account, balance })
}

pub async fn get_ledger_activity(State(state): State<SharedState>) -> Json<Vec<TransactionView>> {
    let app = state.lock().unwrap();
    let views = app
        .registry
        .ledger
        .recent_transactions(100)
        .into_iter()
        .map(TransactionView::from)
        .collect();
    Json(views)
}

pub async fn health_check(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let app = state.lock().unwrap();
    Json(serde_json::json!({
        "status": "ok",
        "rounds": app.registry.rounds.len(),
        "oracle": app.registry.oracle_name(),
    }))
}
