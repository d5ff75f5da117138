use std::time::Duration;

use anyhow::Context;
use api_types::wallet_state::WalletStateV0;
use reqwest::Client;
use rpc_types::error::ErrorCode;
use rpc_types::WalletFlowSnapshot;
use tracing::debug;

use crate::config::WalletFlowConfig;

/// Trait that represents the API for reading the payment participants'
/// wallets.
#[async_trait::async_trait]
pub trait IWalletApi: Send + Sync + 'static {
    /// Fetches the current buyer and seller balances. Stateless, every call
    /// hits the remote source.
    async fn fetch_wallet_snapshot(&self) -> anyhow::Result<WalletFlowSnapshot>;
}

/// Live code implementation of the IWalletApi trait that uses a real
/// reqwest::Client to call out to the wallet state endpoint
pub struct LiveWalletApi {
    client: Client,
    wallet_state_url: String,
    request_timeout: Duration,
}

impl LiveWalletApi {
    pub fn new(config: &WalletFlowConfig) -> Self {
        Self {
            client: Client::new(),
            wallet_state_url: config.wallet_state_url.clone(),
            request_timeout: config.request_timeout,
        }
    }
}

#[async_trait::async_trait]
impl IWalletApi for LiveWalletApi {
    async fn fetch_wallet_snapshot(&self) -> anyhow::Result<WalletFlowSnapshot> {
        let response = tokio::time::timeout(self.request_timeout, async {
            self.client
                .get(&self.wallet_state_url)
                .header(reqwest::header::CACHE_CONTROL, "no-store")
                .send()
                .await
        })
        .await
        .context(ErrorCode::Timeout)?
        .context(ErrorCode::WalletStateUnavailable)?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "wallet state request rejected");
            return Err(ErrorCode::WalletStateUnavailable.into());
        }

        let body = tokio::time::timeout(self.request_timeout, response.json::<serde_json::Value>())
            .await
            .context(ErrorCode::Timeout)?
            .map_err(|e| ErrorCode::InvalidJson(e.to_string()))?;

        Ok(WalletStateV0::from_json_lenient(&body)?.into())
    }
}

#[cfg(test)]
mod tests {
    use api_types::wallet_state::WalletStateError;
    use rpc_types::WalletParticipant;

    use super::*;
    use crate::config::RuntimeEnvironment;

    fn api_for(server: &mockito::ServerGuard) -> anyhow::Result<LiveWalletApi> {
        let config = WalletFlowConfig::new(
            RuntimeEnvironment::Dev,
            Some(format!("{}/api/wallet/state", server.url())),
        )?;
        Ok(LiveWalletApi::new(&config))
    }

    #[tokio::test]
    async fn test_fetch_wallet_snapshot() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/wallet/state")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"buyer":{"address":"0xBuyer","balance":9.75},"seller":{"address":"0xSeller","balance":"n/a"}}"#,
            )
            .create_async()
            .await;

        let snapshot = api_for(&server)?.fetch_wallet_snapshot().await?;
        mock.assert_async().await;
        assert_eq!(
            snapshot.buyer,
            WalletParticipant {
                address: "0xBuyer".into(),
                balance: 9.75
            }
        );
        assert_eq!(
            snapshot.seller,
            WalletParticipant {
                address: "0xSeller".into(),
                balance: 0.0
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/wallet/state")
            .with_status(500)
            .with_body(r#"{"error":"Unable to retrieve wallet state."}"#)
            .create_async()
            .await;

        let err = api_for(&server)?.fetch_wallet_snapshot().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to retrieve wallet state");
        assert_eq!(
            err.downcast_ref::<ErrorCode>(),
            Some(&ErrorCode::WalletStateUnavailable)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_participant() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/wallet/state")
            .with_status(200)
            .with_body(r#"{"buyer":null,"seller":{"address":"0xSeller","balance":1}}"#)
            .create_async()
            .await;

        let err = api_for(&server)?.fetch_wallet_snapshot().await.unwrap_err();
        assert_eq!(err.to_string(), "Missing buyer or seller data in response");
        assert_eq!(
            err.downcast_ref::<WalletStateError>(),
            Some(&WalletStateError::MissingParticipant)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_json() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/wallet/state")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = api_for(&server)?.fetch_wallet_snapshot().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ErrorCode>(),
            Some(ErrorCode::InvalidJson(_))
        ));
        Ok(())
    }
}
