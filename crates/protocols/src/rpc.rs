//! Retrying Solana RPC provider.

use crate::error::SourceError;
use crate::spl::{TOKEN_PROGRAM_ID, TokenAccountInfo};
use crate::{AccountSource, RawAccount};
use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use solana_account_decoder::UiAccountEncoding;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::RpcFilterType;
use solana_client::rpc_request::{RpcError, RpcRequest};
use solana_client::rpc_response::{Response, RpcKeyedAccount};
use solana_sdk::pubkey::Pubkey;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF_MS: u64 = 5_000;

/// JSON-RPC code for a node that is behind; the only error response worth retrying.
const NODE_UNHEALTHY_CODE: i64 = -32005;

/// RPC provider configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// HTTP endpoint.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Total attempts per call, including the first.
    pub max_retries: u32,
    /// Initial backoff in milliseconds; doubles per attempt.
    pub retry_base_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "https://api.mainnet-beta.solana.com".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_ms: 200,
        }
    }
}

/// Solana RPC access with bounded retry and exponential backoff.
///
/// Every call is an idempotent read, so transient failures are retried.
pub struct RpcProvider {
    client: RpcClient,
    config: RpcConfig,
}

impl RpcProvider {
    /// Creates a provider for the configured endpoint.
    pub fn new(config: RpcConfig) -> Self {
        let client = RpcClient::new_with_timeout(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
        );
        Self { client, config }
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match call().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempt = attempt + 1, "RPC call recovered");
                    }
                    return Ok(value);
                }
                Err(e) if !is_retryable(&e) => {
                    warn!(operation, error = %e, "RPC call rejected");
                    return Err(SourceError::Upstream(format!("{operation}: {e}")));
                }
                Err(e) => {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "RPC call failed"
                    );
                    last_error = e.to_string();
                    if attempt + 1 < attempts {
                        tokio::time::sleep(backoff_delay(self.config.retry_base_ms, attempt)).await;
                    }
                }
            }
        }

        error!(operation, attempts, "RPC call exhausted retries");
        Err(SourceError::Upstream(format!("{operation}: {last_error}")))
    }
}

/// Transport failures and unhealthy-node responses are retried; any other
/// JSON-RPC error response would come back the same.
fn is_retryable(error: &ClientError) -> bool {
    match error.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. }) => {
            *code == NODE_UNHEALTHY_CODE
        }
        ClientErrorKind::RpcError(RpcError::ForUser(_)) => false,
        _ => true,
    }
}

/// Exponential backoff with up to 25% jitter.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms
        .saturating_mul(1u64 << attempt.min(16))
        .min(MAX_BACKOFF_MS);
    let jitter = if exp >= 4 {
        rand::rng().random_range(0..exp / 4)
    } else {
        0
    };
    Duration::from_millis(exp + jitter)
}

#[async_trait]
impl AccountSource for RpcProvider {
    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        data_size: u64,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, SourceError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::DataSize(data_size)]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };

        let accounts = self
            .with_retry("getProgramAccounts", || {
                self.client
                    .get_program_accounts_with_config(program_id, config.clone())
            })
            .await?;

        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>, SourceError> {
        let keys = [*address];
        let mut accounts = self
            .with_retry("getMultipleAccounts", || {
                self.client.get_multiple_accounts(&keys)
            })
            .await?;

        Ok(accounts.pop().flatten().map(|account| RawAccount {
            owner: account.owner,
            data: account.data,
        }))
    }

    async fn token_accounts(&self, owner: &Pubkey) -> Result<Vec<TokenAccountInfo>, SourceError> {
        let config = RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            ..RpcAccountInfoConfig::default()
        };
        let params = json!([
            owner.to_string(),
            { "programId": TOKEN_PROGRAM_ID },
            config
        ]);

        let response: Response<Vec<RpcKeyedAccount>> = self
            .with_retry("getTokenAccountsByOwner", || {
                self.client
                    .send(RpcRequest::GetTokenAccountsByOwner, params.clone())
            })
            .await?;

        let mut infos = Vec::with_capacity(response.value.len());
        for keyed in response.value {
            let decoded = keyed
                .account
                .data
                .decode()
                .ok_or_else(|| "unsupported encoding".to_string())
                .and_then(|data| TokenAccountInfo::decode(&data).map_err(|e| e.to_string()));
            match decoded {
                Ok(info) => infos.push(info),
                Err(reason) => warn!(
                    address = %keyed.pubkey,
                    reason = %reason,
                    "Skipping undecodable token account"
                ),
            }
        }
        Ok(infos)
    }

    async fn is_healthy(&self) -> bool {
        match self.client.get_health().await {
            Ok(()) => true,
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "RPC health check failed");
                false
            }
        }
    }
}
