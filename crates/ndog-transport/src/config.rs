//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every endpoint opened in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Local address listeners bind to.
    ///
    /// Default: `0.0.0.0` (all IPv4 interfaces).
    pub bind_host: String,

    /// Upper bound on a TCP connect. `None` waits as long as the OS does.
    pub connect_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            connect_timeout: None,
        }
    }
}
