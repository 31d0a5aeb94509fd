//! Client side of the gate: keeps a token in three places and threads it
//! into navigations under the protected prefix.
//!
//! `TokenStore` owns the tiers (session file, in-memory slot, cookie jar) and
//! refuses to hand out a token when they disagree. `TokenPropagator` rewrites
//! URLs and links so a full-page navigation carries the token even when the
//! cookie did not make it.

pub mod rewrite;
pub mod store;

pub use rewrite::TokenPropagator;
pub use store::{TierSnapshot, TokenStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("stored tokens disagree across tiers; resync required")]
    Diverged,

    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
