use std::time::Duration;

// Time between the start of a flow and the authorization being shown as
// approved
pub const HOLDING_PHASE_DELAY: Duration = Duration::from_millis(480);

// Time between the approval and the deliverables being shown as under
// review
pub const RELEASING_PHASE_DELAY: Duration = Duration::from_millis(720);

// Activity log retention, oldest entries are evicted first
pub const EVENT_HISTORY_LIMIT: usize = 24;

pub const WALLET_STATE_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// Local development server of the chat app
pub const WALLET_STATE_URL_DEV: &str = "http://localhost:3001/api/wallet/state";

// Overrides the wallet state URL of any environment
pub const WALLET_STATE_URL_ENV: &str = "WALLET_STATE_URL";

// Transaction references are shortened to this many characters in the log
pub const TX_REFERENCE_DISPLAY_LENGTH: usize = 12;
