use std::time::Duration;

use rpc_types::error::ErrorCode;
use strum_macros::{Display, EnumString};

use crate::constants::{
    EVENT_HISTORY_LIMIT, HOLDING_PHASE_DELAY, RELEASING_PHASE_DELAY, WALLET_STATE_REQUEST_TIMEOUT,
    WALLET_STATE_URL_DEV, WALLET_STATE_URL_ENV,
};

/// Enum representing the environment in whose context the wallet flow is
/// instantiated.
/// - Dev = a locally running chat app, wallet state served from localhost
/// - Staging = a preview deployment
/// - Prod = the public deployment
///
/// Dev falls back to the local wallet state endpoint. Staging and Prod have no
/// built-in endpoint and must be given one through `WALLET_STATE_URL` (or an
/// explicit override), so that a misconfigured deployment fails loudly
/// instead of reading balances from the wrong place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RuntimeEnvironment {
    Dev,
    Staging,
    Prod,
}

/// Tunables of the payment flow for a given runtime.
#[derive(Debug, Clone)]
pub struct WalletFlowConfig {
    /// Endpoint returning the buyer/seller balance snapshot.
    pub wallet_state_url: String,
    pub request_timeout: Duration,
    /// Wait before `holding` is shown.
    pub holding_delay: Duration,
    /// Wait before `releasing` is shown.
    pub releasing_delay: Duration,
    pub event_history_limit: usize,
}

impl WalletFlowConfig {
    pub fn new(runtime_env: RuntimeEnvironment, wallet_state_url: Option<String>) -> anyhow::Result<Self> {
        let wallet_state_url = match (wallet_state_url, runtime_env) {
            (Some(url), _) => url,
            (None, RuntimeEnvironment::Dev) => WALLET_STATE_URL_DEV.to_string(),
            (None, env) => return Err(ErrorCode::WalletStateUrlMissing(env.to_string()).into()),
        };

        Ok(Self {
            wallet_state_url,
            request_timeout: WALLET_STATE_REQUEST_TIMEOUT,
            holding_delay: HOLDING_PHASE_DELAY,
            releasing_delay: RELEASING_PHASE_DELAY,
            event_history_limit: EVENT_HISTORY_LIMIT,
        })
    }

    /// Like [`Self::new`], taking the URL from `WALLET_STATE_URL` when set.
    pub fn from_env(runtime_env: RuntimeEnvironment) -> anyhow::Result<Self> {
        let url = std::env::var(WALLET_STATE_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty());
        Self::new(runtime_env, url)
    }
}
