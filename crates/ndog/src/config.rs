//! Aggregate configuration for one ndog run.

use ndog_chat::ChatConfig;
use ndog_transfer::TransferConfig;
use ndog_transport::TransportConfig;
use serde::{Deserialize, Serialize};

/// Every setting a run can use, grouped by the layer that reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdogConfig {
    pub transport: TransportConfig,
    pub transfer: TransferConfig,
    pub chat: ChatConfig,

    /// Draw progress bars for file operations. Default: `true`.
    pub show_progress: bool,
}

impl Default for NdogConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            transfer: TransferConfig::default(),
            chat: ChatConfig::default(),
            show_progress: true,
        }
    }
}

impl NdogConfig {
    /// Validates every section.
    pub fn validated(self) -> Self {
        Self {
            transfer: self.transfer.validated(),
            chat: self.chat.validated(),
            ..self
        }
    }
}
