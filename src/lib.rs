/// Crypto Trends Bot Library
///
/// Core functionality for the crypto trends bot: X API access, trend
/// scoring, market analysis, summary generation, post composition and the
/// scheduling around them.

pub mod analysis;
pub mod bot;
pub mod composer;
pub mod config;
pub mod error;
pub mod generation;
pub mod http_server;
pub mod oauth;
pub mod scheduler;
pub mod trends;
pub mod twitter;
