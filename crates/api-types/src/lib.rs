pub mod chat;
pub mod payment_response;
pub mod wallet_state;
