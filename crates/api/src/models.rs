//! API request and response models.

use chrono::{DateTime, Utc};
use meteora_lp_domain::{Pool, Position, TokenAmount};
use serde::{Deserialize, Serialize};

/// Successful response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wraps `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Failed response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Error description.
    pub error: ErrorBody,
}

/// Error description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub message: String,
    /// Per-field validation problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// One invalid request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as sent by the client.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Raw token amount as sent by clients: a decimal string or a JSON integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// Integer literal.
    Number(u64),
    /// Decimal string, for values beyond 64 bits.
    Text(String),
}

impl AmountInput {
    /// Parses into a raw amount.
    pub fn parse(&self) -> Option<TokenAmount> {
        match self {
            Self::Number(value) => Some(TokenAmount::from(*value)),
            Self::Text(value) => TokenAmount::from_dec_str(value),
        }
    }
}

/// Add liquidity request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityRequest {
    /// Pool address.
    pub pool_id: Option<String>,
    /// Raw token A amount.
    pub amount_a: Option<AmountInput>,
    /// Raw token B amount.
    pub amount_b: Option<AmountInput>,
}

/// Remove liquidity request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquidityRequest {
    /// Pool address.
    pub pool_id: Option<String>,
    /// Raw LP amount to burn.
    pub lp_token_amount: Option<AmountInput>,
    /// Minimum acceptable token A out.
    #[serde(default)]
    pub min_amount_a: Option<AmountInput>,
    /// Minimum acceptable token B out.
    #[serde(default)]
    pub min_amount_b: Option<AmountInput>,
}

/// Query string of the pool listing. Values are validated by the handler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolListQuery {
    /// 1-based page number.
    pub page: Option<String>,
    /// Pools per page.
    pub limit: Option<String>,
    /// One side of the pair to match.
    pub token_a_mint: Option<String>,
    /// Other side of the pair to match.
    pub token_b_mint: Option<String>,
}

/// One page of the pool listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPage {
    /// Pools on this page.
    pub pools: Vec<Pool>,
    /// Where this page sits in the filtered listing.
    pub pagination: Pagination,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_items: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub items_per_page: usize,
}

/// Positions of one wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    /// Wallet address.
    pub wallet: String,
    /// Non-zero positions.
    pub positions: Vec<Position>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since start-up.
    pub uptime_secs: u64,
    /// RPC node status.
    pub rpc: ComponentHealth,
    /// Cache backend status.
    pub cache: ComponentHealth,
    /// Check time.
    pub timestamp: DateTime<Utc>,
}

/// Status of one dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    /// Backend name.
    pub name: String,
    /// Whether it answered.
    pub healthy: bool,
}

/// Result of a cache invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInvalidation {
    /// Pool address.
    pub pool_id: String,
    /// Whether a cached entry existed.
    pub removed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_input_accepts_number_or_string() {
        let number: AmountInput = serde_json::from_str("1000").unwrap();
        assert_eq!(number.parse(), Some(TokenAmount::from(1000u64)));

        let text: AmountInput =
            serde_json::from_str("\"340282366920938463463374607431768211456\"").unwrap();
        assert!(text.parse().is_some());

        let bad: AmountInput = serde_json::from_str("\"1.5\"").unwrap();
        assert_eq!(bad.parse(), None);
    }

    #[test]
    fn test_error_envelope_omits_empty_details() {
        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                message: "Pool not found".into(),
                details: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["message"], "Pool not found");
        assert!(json["error"].get("details").is_none());
    }
}
