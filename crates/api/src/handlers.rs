//! Request handlers.

use crate::error::ApiError;
use crate::models::{
    AddLiquidityRequest, AmountInput, ApiResponse, CacheInvalidation, ComponentHealth,
    FieldError, HealthResponse, PoolListQuery, PoolPage, PositionsResponse,
    RemoveLiquidityRequest,
};
use crate::services::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PoolFilter};
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::Utc;
use meteora_lp_domain::{AddLiquidityQuote, Pool, RemoveLiquidityQuote, TokenAmount};
use meteora_lp_protocols::{Pubkey, parse_address};
use tracing::info;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let service = &state.service;
    let (rpc_healthy, cache_healthy) = tokio::join!(service.rpc_healthy(), service.cache().ping());

    Json(ApiResponse::ok(HealthResponse {
        status: if rpc_healthy && cache_healthy {
            "healthy"
        } else {
            "degraded"
        }
        .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        rpc: ComponentHealth {
            name: "solana-rpc".to_string(),
            healthy: rpc_healthy,
        },
        cache: ComponentHealth {
            name: service.cache().backend().to_string(),
            healthy: cache_healthy,
        },
        timestamp: Utc::now(),
    }))
}

/// `GET /pools?page=&limit=&tokenAMint=&tokenBMint=`
pub async fn list_pools(
    State(state): State<AppState>,
    query: Result<Query<PoolListQuery>, QueryRejection>,
) -> ApiResult<PoolPage> {
    let Query(query) = query?;

    let mut errors = Vec::new();
    let page = parse_count(&mut errors, "page", query.page.as_deref(), 1, usize::MAX);
    let limit = parse_count(
        &mut errors,
        "limit",
        query.limit.as_deref(),
        DEFAULT_PAGE_SIZE,
        MAX_PAGE_SIZE,
    );
    let mint_a = optional_mint(&mut errors, "tokenAMint", query.token_a_mint.as_deref());
    let mint_b = optional_mint(&mut errors, "tokenBMint", query.token_b_mint.as_deref());
    if !errors.is_empty() {
        return Err(ApiError::invalid_fields(errors));
    }

    let filter = PoolFilter { mint_a, mint_b };
    let pools = state.service.find_pools(&filter, page, limit).await?;
    Ok(Json(ApiResponse::ok(pools)))
}

/// `GET /pools/{id}`
pub async fn get_pool(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Pool> {
    let pool = state.service.get_pool(&id).await?;
    Ok(Json(ApiResponse::ok(pool)))
}

/// `GET /positions/{address}`
pub async fn get_positions(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<PositionsResponse> {
    let positions = state.service.positions(&address).await?;
    Ok(Json(ApiResponse::ok(PositionsResponse {
        wallet: address,
        positions,
    })))
}

/// `POST /liquidity/add`
pub async fn add_liquidity(
    State(state): State<AppState>,
    payload: Result<Json<AddLiquidityRequest>, JsonRejection>,
) -> ApiResult<AddLiquidityQuote> {
    let Json(request) = payload?;

    let mut errors = Vec::new();
    let pool_id = require_text(&mut errors, "poolId", request.pool_id.as_deref());
    let amount_a = require_amount(&mut errors, "amountA", request.amount_a.as_ref());
    let amount_b = require_amount(&mut errors, "amountB", request.amount_b.as_ref());
    let (Some(pool_id), Some(amount_a), Some(amount_b)) = (pool_id, amount_a, amount_b) else {
        return Err(ApiError::invalid_fields(errors));
    };

    let quote = state.service.quote_add(pool_id, amount_a, amount_b).await?;
    info!(
        pool = pool_id,
        lp_tokens = %quote.estimated_lp_tokens,
        "Quoted add liquidity"
    );
    Ok(Json(ApiResponse::ok(quote)))
}

/// `POST /liquidity/remove`
pub async fn remove_liquidity(
    State(state): State<AppState>,
    payload: Result<Json<RemoveLiquidityRequest>, JsonRejection>,
) -> ApiResult<RemoveLiquidityQuote> {
    let Json(request) = payload?;

    let mut errors = Vec::new();
    let pool_id = require_text(&mut errors, "poolId", request.pool_id.as_deref());
    let lp_amount = require_amount(&mut errors, "lpTokenAmount", request.lp_token_amount.as_ref());
    let min_a = optional_amount(&mut errors, "minAmountA", request.min_amount_a.as_ref());
    let min_b = optional_amount(&mut errors, "minAmountB", request.min_amount_b.as_ref());
    if !errors.is_empty() {
        return Err(ApiError::invalid_fields(errors));
    }
    let (Some(pool_id), Some(lp_amount)) = (pool_id, lp_amount) else {
        return Err(ApiError::invalid_fields(errors));
    };

    let quote = state
        .service
        .quote_remove(pool_id, lp_amount, min_a.flatten(), min_b.flatten())
        .await?;
    info!(pool = pool_id, lp_tokens = %lp_amount, "Quoted remove liquidity");
    Ok(Json(ApiResponse::ok(quote)))
}

/// `DELETE /cache/pools/{id}`
pub async fn invalidate_pool_cache(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CacheInvalidation> {
    let removed = state.service.invalidate_pool(&id).await?;
    Ok(Json(ApiResponse::ok(CacheInvalidation {
        pool_id: id,
        removed,
    })))
}

/// Positive integer up to `max`, `default` when absent.
fn parse_count(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    default: usize,
    max: usize,
) -> usize {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return default;
    };
    match raw.parse::<usize>() {
        Ok(count) if (1..=max).contains(&count) => count,
        Ok(_) if max < usize::MAX => {
            errors.push(field_error(field, &format!("must be between 1 and {max}")));
            default
        }
        _ => {
            errors.push(field_error(field, "must be a positive integer"));
            default
        }
    }
}

fn optional_mint(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>) -> Option<Pubkey> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
    match parse_address(raw) {
        Ok(mint) => Some(mint),
        Err(_) => {
            errors.push(field_error(field, "must be a valid mint address"));
            None
        }
    }
}

fn require_text<'a>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => Some(value),
        None => {
            errors.push(field_error(field, "is required"));
            None
        }
    }
}

fn require_amount(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&AmountInput>,
) -> Option<TokenAmount> {
    match value {
        None => {
            errors.push(field_error(field, "is required"));
            None
        }
        Some(input) => parse_amount(errors, field, input),
    }
}

/// `None` on a parse error, `Some(None)` when absent.
fn optional_amount(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&AmountInput>,
) -> Option<Option<TokenAmount>> {
    match value {
        None => Some(None),
        Some(input) => parse_amount(errors, field, input).map(Some),
    }
}

fn parse_amount(
    errors: &mut Vec<FieldError>,
    field: &str,
    input: &AmountInput,
) -> Option<TokenAmount> {
    let parsed = input.parse();
    if parsed.is_none() {
        errors.push(field_error(field, "must be a non-negative integer amount"));
    }
    parsed
}

fn field_error(field: &str, message: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: format!("{field} {message}"),
    }
}
