//! Transport configuration

use embassy_time::Duration;
use rphub_hal::{SpiBusConfig, SpiDeviceConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default bound on waiting for the transport lock
pub const DEFAULT_LOCK_TIMEOUT_MS: u32 = 1000;

/// Bus, device and locking parameters for a [`Transport`](crate::Transport)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransportConfig {
    /// Bus pins and transfer limit
    pub bus: SpiBusConfig,
    /// Display controller device settings
    pub device: SpiDeviceConfig,
    /// How long an operation waits for the transport lock
    pub lock_timeout_ms: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bus: SpiBusConfig::default(),
            device: SpiDeviceConfig::default(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    /// Default wiring with a different chunk limit
    pub fn with_max_chunk_size(max_transfer_size: usize) -> Self {
        Self {
            bus: SpiBusConfig {
                max_transfer_size,
                ..SpiBusConfig::default()
            },
            ..Self::default()
        }
    }

    /// Lock acquisition bound
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.lock_timeout_ms))
    }

    /// Largest single SPI transaction
    pub fn max_chunk_size(&self) -> usize {
        self.bus.max_chunk_size()
    }
}
