use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use base64::{prelude::BASE64_STANDARD, Engine};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::app_database::{AppDatabase, AppDatabaseError};
use crate::models::{Block, Launcher, Partial, PoolSpaceSnapshot, TimeseriesRow, Transaction};
use crate::scan_stats::ScanStatsClient;
use crate::validation::LauncherUpdatePayload;
use crate::views::{
    project_launcher, project_launcher_public, BlockView, LauncherView, PayoutAddressView,
    PayoutView, PublicLauncherView, Requester, RewardRecord, StatsView, TransactionView,
};
use crate::Config;

const MOJOS_PER_XCH: f64 = 1_000_000_000_000.0;
const BLOCKS_PER_DAY: f64 = 4_608.0;
const POOL_REWARD_XCH: f64 = 1.75;
const TIB_BYTES: f64 = 1_099_511_627_776.0;

#[derive(Deserialize)]
pub struct PagingParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct PartialsParams {
    launcher: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct PayoutAddressesParams {
    launcher: String,
}

#[derive(Deserialize)]
pub struct SpaceParams {
    days: Option<i64>,
}

#[derive(Deserialize)]
pub struct TimeseriesParams {
    hours: Option<i64>,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    launcher_id: String,
    authentication_token: i64,
    signature: String,
}

#[derive(Deserialize)]
pub struct LoginQrPayload {
    token: String,
}

// The auth collaborator issues Bearer credentials carrying the launcher id;
// the session collaborator stores one in the launcher_id cookie. This layer
// only compares the identifiers against the record being rendered.
fn resolve_requester(
    bearer: &Option<TypedHeader<Authorization<Bearer>>>,
    headers: &HeaderMap,
) -> Requester {
    Requester {
        auth_launcher_id: bearer
            .as_ref()
            .map(|TypedHeader(auth)| auth.token().to_string()),
        session_launcher_id: headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(session_launcher_id),
    }
}

fn session_launcher_id(cookies: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "launcher_id").then(|| value.to_string())
    })
}

fn db_error(what: &str, err: AppDatabaseError) -> (StatusCode, String) {
    match err {
        AppDatabaseError::EntityDoesNotExist => {
            (StatusCode::NOT_FOUND, format!("{} not found", what))
        }
        _ => {
            error!(target: "server_log", "Database error loading {}: {:?}", what, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to get {}", what),
            )
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

async fn project_for_requester(
    app_database: &AppDatabase,
    launcher: &Launcher,
    total_points: u64,
    requester: &Requester,
) -> Result<LauncherView, AppDatabaseError> {
    let entries = app_database
        .get_payout_entries(launcher.launcher_id.clone())
        .await?;
    let referrer = if requester.can_view_private(&launcher.launcher_id) {
        app_database
            .get_active_referrer(launcher.launcher_id.clone())
            .await?
    } else {
        None
    };

    Ok(project_launcher(
        launcher,
        total_points,
        &entries,
        referrer,
        requester,
    ))
}

async fn public_view(
    app_database: &AppDatabase,
    launcher: &Launcher,
    total_points: u64,
) -> Result<PublicLauncherView, AppDatabaseError> {
    let entries = app_database
        .get_payout_entries(launcher.launcher_id.clone())
        .await?;
    Ok(project_launcher_public(launcher, total_points, &entries))
}

pub async fn get_launchers(
    query_params: Query<PagingParams>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    headers: HeaderMap,
    Extension(app_database): Extension<Arc<AppDatabase>>,
) -> Result<Json<Vec<LauncherView>>, (StatusCode, String)> {
    let requester = resolve_requester(&bearer, &headers);
    let limit = query_params.limit.unwrap_or(50);
    let offset = query_params.offset.unwrap_or(0);

    let total_points = app_database
        .get_total_points()
        .await
        .map_err(|e| db_error("launchers", e))?;
    let launchers = app_database
        .get_launchers(limit, offset)
        .await
        .map_err(|e| db_error("launchers", e))?;

    let mut views = Vec::with_capacity(launchers.len());
    for launcher in &launchers {
        let view = project_for_requester(&app_database, launcher, total_points, &requester)
            .await
            .map_err(|e| db_error("launchers", e))?;
        views.push(view);
    }

    Ok(Json(views))
}

pub async fn get_launcher(
    Path(launcher_id): Path<String>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    headers: HeaderMap,
    Extension(app_database): Extension<Arc<AppDatabase>>,
) -> Result<Json<LauncherView>, (StatusCode, String)> {
    let requester = resolve_requester(&bearer, &headers);

    let launcher = app_database
        .get_launcher(launcher_id)
        .await
        .map_err(|e| db_error("launcher", e))?;
    let total_points = app_database
        .get_total_points()
        .await
        .map_err(|e| db_error("launcher", e))?;

    let view = project_for_requester(&app_database, &launcher, total_points, &requester)
        .await
        .map_err(|e| db_error("launcher", e))?;

    Ok(Json(view))
}

pub async fn update_launcher(
    Path(launcher_id): Path<String>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    headers: HeaderMap,
    Extension(app_database): Extension<Arc<AppDatabase>>,
    Json(payload): Json<LauncherUpdatePayload>,
) -> Result<Json<LauncherView>, Response> {
    let requester = resolve_requester(&bearer, &headers);
    if !requester.can_view_private(&launcher_id) {
        return Err((
            StatusCode::FORBIDDEN,
            "Not authorized to update this launcher".to_string(),
        )
            .into_response());
    }

    let update = payload.validate().map_err(|e| e.into_response())?;

    let update_id = Uuid::new_v4();
    app_database
        .apply_launcher_update(launcher_id.clone(), update)
        .await
        .map_err(|e| db_error("launcher", e).into_response())?;
    tracing::info!(target: "server_log", "{} - launcher update applied for {}", update_id, launcher_id);

    let launcher = app_database
        .get_launcher(launcher_id)
        .await
        .map_err(|e| db_error("launcher", e).into_response())?;
    let total_points = app_database
        .get_total_points()
        .await
        .map_err(|e| db_error("launcher", e).into_response())?;

    let view = project_for_requester(&app_database, &launcher, total_points, &requester)
        .await
        .map_err(|e| db_error("launcher", e).into_response())?;

    Ok(Json(view))
}

pub async fn get_blocks(
    query_params: Query<PagingParams>,
    Extension(app_database): Extension<Arc<AppDatabase>>,
) -> Result<Json<Vec<BlockView>>, (StatusCode, String)> {
    let limit = query_params.limit.unwrap_or(50);
    let offset = query_params.offset.unwrap_or(0);

    let blocks = app_database
        .get_blocks(limit, offset)
        .await
        .map_err(|e| db_error("blocks", e))?;
    let total_points = app_database
        .get_total_points()
        .await
        .map_err(|e| db_error("blocks", e))?;

    let mut views = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let launcher = app_database
            .get_launcher(block.farmed_by.clone())
            .await
            .map_err(|e| db_error("blocks", e))?;
        let farmed_by = public_view(&app_database, &launcher, total_points)
            .await
            .map_err(|e| db_error("blocks", e))?;
        views.push(BlockView::new(block, farmed_by));
    }

    Ok(Json(views))
}

pub async fn get_partials(
    query_params: Query<PartialsParams>,
    Extension(app_database): Extension<Arc<AppDatabase>>,
) -> Result<Json<Vec<Partial>>, (StatusCode, String)> {
    let limit = query_params.limit.unwrap_or(50);
    let offset = query_params.offset.unwrap_or(0);

    let partials = app_database
        .get_partials(query_params.launcher.clone(), limit, offset)
        .await
        .map_err(|e| db_error("partials", e))?;

    Ok(Json(partials))
}

pub async fn get_payouts(
    query_params: Query<PagingParams>,
    Extension(app_database): Extension<Arc<AppDatabase>>,
) -> Result<Json<Vec<PayoutView>>, (StatusCode, String)> {
    let limit = query_params.limit.unwrap_or(50);
    let offset = query_params.offset.unwrap_or(0);

    let payouts = app_database
        .get_payouts(limit, offset)
        .await
        .map_err(|e| db_error("payouts", e))?;

    let mut views = Vec::with_capacity(payouts.len());
    for payout in &payouts {
        let blocks = app_database
            .get_block_names_for_payout(payout.id)
            .await
            .map_err(|e| db_error("payouts", e))?;
        views.push(PayoutView::new(payout, blocks));
    }

    Ok(Json(views))
}

pub async fn get_payout_addresses(
    query_params: Query<PayoutAddressesParams>,
    Extension(app_database): Extension<Arc<AppDatabase>>,
) -> Result<Json<Vec<PayoutAddressView>>, (StatusCode, String)> {
    let launcher = app_database
        .get_launcher(query_params.launcher.clone())
        .await
        .map_err(|e| db_error("launcher", e))?;
    let total_points = app_database
        .get_total_points()
        .await
        .map_err(|e| db_error("payout addresses", e))?;
    let launcher_view = public_view(&app_database, &launcher, total_points)
        .await
        .map_err(|e| db_error("payout addresses", e))?;

    let details = app_database
        .get_payout_address_details(query_params.launcher.clone())
        .await
        .map_err(|e| db_error("payout addresses", e))?;

    let mut payout_blocks: HashMap<i32, Vec<String>> = HashMap::new();
    for detail in &details {
        if !payout_blocks.contains_key(&detail.payout_id) {
            let blocks = app_database
                .get_block_names_for_payout(detail.payout_id)
                .await
                .map_err(|e| db_error("payout addresses", e))?;
            payout_blocks.insert(detail.payout_id, blocks);
        }
    }

    let views = details
        .iter()
        .map(|detail| PayoutAddressView {
            id: detail.id,
            payout: PayoutView {
                id: detail.payout_id,
                datetime: detail.payout_datetime,
                amount: detail.payout_amount,
                fee: detail.payout_fee,
                blocks: payout_blocks
                    .get(&detail.payout_id)
                    .cloned()
                    .unwrap_or_default(),
            },
            puzzle_hash: detail.puzzle_hash.clone(),
            launcher: launcher_view.clone(),
            amount: detail.amount,
            transaction: detail.transaction.clone().map(|transaction| TransactionView {
                transaction,
                created_at_time: detail.transaction_created_at_time.unwrap_or(0),
                confirmed_block_index: detail.transaction_confirmed_block_index,
            }),
        })
        .collect();

    Ok(Json(views))
}

pub async fn get_transactions(
    query_params: Query<PagingParams>,
    Extension(app_database): Extension<Arc<AppDatabase>>,
) -> Result<Json<Vec<Transaction>>, (StatusCode, String)> {
    let limit = query_params.limit.unwrap_or(50);
    let offset = query_params.offset.unwrap_or(0);

    let transactions = app_database
        .get_transactions(limit, offset)
        .await
        .map_err(|e| db_error("transactions", e))?;

    Ok(Json(transactions))
}

pub async fn get_stats(
    Extension(app_database): Extension<Arc<AppDatabase>>,
    Extension(app_config): Extension<Arc<Config>>,
) -> Result<Json<StatsView>, (StatusCode, String)> {
    if !app_config.stats_enabled {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Stats not enabled for this server.".to_string(),
        ));
    }

    let global_info = app_database
        .get_global_info()
        .await
        .map_err(|e| db_error("stats", e))?;
    let farmer_counts = app_database
        .get_farmer_counts()
        .await
        .map_err(|e| db_error("stats", e))?;
    let pool_space = app_database
        .get_pool_space_total()
        .await
        .map_err(|e| db_error("stats", e))?;
    let block_stats = app_database
        .get_block_stats()
        .await
        .map_err(|e| db_error("stats", e))?;
    let recent_blocks = app_database
        .get_recent_blocks(10)
        .await
        .map_err(|e| db_error("stats", e))?;

    let (blockchain_height, blockchain_space, xch_current_price, pool_wallets) = match global_info {
        Some(info) => (
            info.blockchain_height,
            info.blockchain_space,
            serde_json::from_str(&info.xch_current_price).unwrap_or(serde_json::Value::Null),
            serde_json::from_str(&info.pool_wallets).unwrap_or(serde_json::Value::Null),
        ),
        None => (0, 0, serde_json::Value::Null, serde_json::Value::Null),
    };

    let estimate_win = estimate_win_minutes(blockchain_space, pool_space);
    let time_since_last_win = block_stats
        .latest_timestamp
        .map(|latest| now_secs().saturating_sub(latest))
        .unwrap_or(0);

    let last_rewards = recent_blocks
        .iter()
        .map(|block| RewardRecord {
            name: block.name.clone(),
            amount: block.amount,
            timestamp: block.timestamp,
            farmed_by: block.farmed_by.clone(),
        })
        .collect();

    Ok(Json(StatsView {
        blockchain_height,
        blockchain_space,
        fee: app_config.pool_fee,
        estimate_win,
        time_since_last_win,
        rewards_amount: block_stats.amount as f64 / MOJOS_PER_XCH,
        rewards_blocks: block_stats.count,
        last_rewards,
        pool_space,
        farmers: farmer_counts.farmers,
        farmers_active: farmer_counts.farmers_active,
        reward_system: app_config.reward_system.clone(),
        xch_current_price,
        pool_wallets,
        average_effort: average_effort(&recent_blocks, estimate_win as f64 * 60.0),
        xch_tb_month: xch_tib_month(blockchain_space),
    }))
}

pub async fn get_space(
    query_params: Query<SpaceParams>,
    Extension(app_database): Extension<Arc<AppDatabase>>,
    Extension(app_config): Extension<Arc<Config>>,
) -> Result<Json<Vec<PoolSpaceSnapshot>>, (StatusCode, String)> {
    if !app_config.stats_enabled {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Stats not enabled for this server.".to_string(),
        ));
    }

    let days = query_params.days.unwrap_or(7);
    let since = chrono::Utc::now().naive_utc() - chrono::Duration::days(days);

    let snapshots = app_database
        .get_space_series(since)
        .await
        .map_err(|e| db_error("space", e))?;

    Ok(Json(snapshots))
}

pub async fn get_timeseries(
    query_params: Query<TimeseriesParams>,
    Extension(app_database): Extension<Arc<AppDatabase>>,
    Extension(app_config): Extension<Arc<Config>>,
) -> Result<Json<Vec<TimeseriesRow>>, (StatusCode, String)> {
    if !app_config.stats_enabled {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Stats not enabled for this server.".to_string(),
        ));
    }

    let hours = query_params.hours.unwrap_or(24);
    let since = now_secs().saturating_sub(hours.max(0) as u64 * 3600);

    let rows = app_database
        .get_partial_timeseries(since)
        .await
        .map_err(|e| db_error("timeseries", e))?;

    Ok(Json(rows))
}

// Shape validation and launcher existence only; signature verification is
// the auth collaborator's job.
pub async fn post_login(
    Extension(app_database): Extension<Arc<AppDatabase>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if BASE64_STANDARD.decode(&payload.signature).is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            "signature is not valid base64".to_string(),
        ));
    }

    let launcher = app_database
        .get_launcher(payload.launcher_id.clone())
        .await
        .map_err(|e| db_error("launcher", e))?;

    Ok(Json(json!({
        "launcher_id": launcher.launcher_id,
        "authentication_token": payload.authentication_token,
    })))
}

pub async fn post_login_qr(
    Json(payload): Json<LoginQrPayload>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if payload.token.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "token must not be empty".to_string()));
    }

    Ok(Json(json!({ "token": payload.token })))
}

pub async fn get_scan_stats(
    Extension(scan_stats_client): Extension<Arc<Option<ScanStatsClient>>>,
) -> Result<Json<crate::scan_stats::XchScanStats>, (StatusCode, String)> {
    let Some(client) = scan_stats_client.as_ref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Scan stats not configured for this server.".to_string(),
        ));
    };

    match client.get_stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            error!(target: "server_log", "Failed to fetch scan stats: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch scan stats".to_string(),
            ))
        }
    }
}

fn estimate_win_minutes(blockchain_space: u64, pool_space: u64) -> u64 {
    if pool_space == 0 {
        return 0;
    }
    let ratio = blockchain_space as f64 / pool_space as f64;
    let seconds = ratio * (86_400.0 / BLOCKS_PER_DAY);
    (seconds / 60.0) as u64
}

fn average_effort(recent_blocks: &[Block], estimate_win_secs: f64) -> u64 {
    if estimate_win_secs <= 0.0 || recent_blocks.len() < 2 {
        return 0;
    }

    // recent blocks arrive newest-first
    let mut total_interval = 0.0;
    for pair in recent_blocks.windows(2) {
        total_interval += pair[0].timestamp.saturating_sub(pair[1].timestamp) as f64;
    }
    let mean_interval = total_interval / (recent_blocks.len() - 1) as f64;

    ((mean_interval / estimate_win_secs) * 100.0) as u64
}

fn xch_tib_month(blockchain_space: u64) -> f64 {
    if blockchain_space == 0 {
        return 0.0;
    }
    BLOCKS_PER_DAY * 30.0 * POOL_REWARD_XCH * (TIB_BYTES / blockchain_space as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_parsed_from_cookie_header() {
        assert_eq!(
            session_launcher_id("launcher_id=0xaaa1"),
            Some("0xaaa1".to_string())
        );
        assert_eq!(
            session_launcher_id("other=1; launcher_id=0xaaa1; theme=dark"),
            Some("0xaaa1".to_string())
        );
        assert_eq!(session_launcher_id("other=1; theme=dark"), None);
        assert_eq!(session_launcher_id(""), None);
    }

    #[test]
    fn requester_resolution_reads_both_identities() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "launcher_id=0xses1".parse().unwrap());

        let requester = resolve_requester(&None, &headers);
        assert_eq!(requester.auth_launcher_id, None);
        assert_eq!(requester.session_launcher_id, Some("0xses1".to_string()));
    }

    #[test]
    fn estimate_win_handles_empty_pool() {
        assert_eq!(estimate_win_minutes(1_000_000, 0), 0);
        // pool holds the whole netspace: one block interval, under a minute
        assert_eq!(estimate_win_minutes(1_000, 1_000), 0);
        // pool holds a tenth of netspace
        let minutes = estimate_win_minutes(10_000, 1_000);
        assert_eq!(minutes, 3);
    }

    #[test]
    fn average_effort_needs_two_blocks() {
        assert_eq!(average_effort(&[], 600.0), 0);
    }

    #[test]
    fn xch_tib_month_is_zero_without_netspace() {
        assert_eq!(xch_tib_month(0), 0.0);
        assert!(xch_tib_month(1_099_511_627_776) > 0.0);
    }
}
