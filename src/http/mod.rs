mod client;
mod retry;

pub use client::{HttpClient, TransferProgress};
pub use retry::{MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, check_retryable, classify_error};
