use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway API key is not configured")]
    MissingApiKey,

    #[error("Gateway request timed out")]
    Timeout,

    #[error("Gateway transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Gateway rejected request ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("Gateway response missing {0}")]
    MissingField(&'static str),

    #[error("Undecodable gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(error)
        }
    }
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Webhook signing secret is not configured")]
    MissingSecret,

    #[error("No signature header found")]
    MissingHeader,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("Timestamp outside the tolerance zone")]
    StaleTimestamp,

    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,

    #[error("Invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}
