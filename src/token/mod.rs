mod cipher;
mod manager;
mod record;
mod schedule;

pub use cipher::TokenCipher;
pub use manager::{Clock, SystemClock, TokenLifecycleManager};
pub use record::{CredentialRecord, TokenError, CREDENTIAL_KEY};
pub use schedule::{next_check_delay, MIN_CHECK_INTERVAL_MS, REFRESH_MARGIN_MS, RETRY_BACKOFF};
