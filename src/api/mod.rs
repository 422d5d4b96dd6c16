pub mod outcome;
pub mod wager_api;

pub use outcome::{classify_failure, SubmissionError};
pub use wager_api::{WagerApiClient, WagerGateway};
