//! Configuration module
//!
//! Settings shared by every command.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the deploy service
    pub server_url: String,
}
