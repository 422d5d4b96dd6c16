use crate::models::parse_number;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Why the wager API refused a request. Display text is the message shown to
/// the bettor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Another submission already used this point value; the server's view
    /// overrides local state
    #[error("You already have a {}-point bet in this room", duplicate_label(.points))]
    DuplicatePoints { points: Option<u8> },

    #[error("Cannot bet on this game - betting is closed")]
    InvalidGameStatus,

    #[error("Points wagered must be 1, 2, or 3")]
    InvalidPoints,

    #[error("Invalid bet: {0}")]
    InvalidBetType(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Please log in to place bets")]
    AuthenticationRequired,

    #[error("Server error - please try again later")]
    ServerError { status: u16 },

    #[error("Failed to place bet (HTTP {status})")]
    Rejected { status: u16 },

    #[error("Failed to place bet: {0}")]
    Transport(String),
}

fn duplicate_label(points: &Option<u8>) -> String {
    match points {
        Some(points) => points.to_string(),
        None => "duplicate".to_string(),
    }
}

impl SubmissionError {
    /// Text to show the bettor
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// A conflict the local validator could not have seen
    pub fn is_race(&self) -> bool {
        matches!(self, SubmissionError::DuplicatePoints { .. })
    }

    /// Worth retrying without changing the selection
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmissionError::ServerError { .. } | SubmissionError::Transport(_)
        )
    }
}

/// Error body returned by the wager API
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    points_wagered: Option<Value>,
}

/// Map a failed HTTP response onto the submission outcome classes
pub fn classify_failure(status: u16, body: &str) -> SubmissionError {
    let body: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    match status {
        409 => SubmissionError::DuplicatePoints {
            points: body.points_wagered.as_ref().and_then(parse_number),
        },
        400 => match body.error.as_deref() {
            Some("Invalid game status") => SubmissionError::InvalidGameStatus,
            Some("Invalid points wagered") => SubmissionError::InvalidPoints,
            Some("Invalid bet type") => {
                SubmissionError::InvalidBetType(body.message.unwrap_or_default())
            }
            _ => SubmissionError::BadRequest(
                body.message
                    .unwrap_or_else(|| "Invalid bet data".to_string()),
            ),
        },
        401 => SubmissionError::AuthenticationRequired,
        500..=599 => SubmissionError::ServerError { status },
        _ => SubmissionError::Rejected { status },
    }
}
