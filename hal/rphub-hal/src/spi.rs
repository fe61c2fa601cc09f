//! SPI bus abstractions
//!
//! Provides the bus and device configuration used to reach the display
//! controller, plus the [`SpiHost`] trait that chip-specific HALs implement
//! to open and release the bus.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest single transaction the bus accepts unless configured otherwise
pub const DEFAULT_MAX_TRANSFER_SIZE: usize = 4096;

/// SPI bus pin assignment and transfer limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpiBusConfig {
    /// Controller-out pin
    pub mosi: u8,
    /// Controller-in pin
    pub miso: u8,
    /// Clock pin
    pub sclk: u8,
    /// Largest transaction in bytes (0 selects [`DEFAULT_MAX_TRANSFER_SIZE`])
    pub max_transfer_size: usize,
}

impl Default for SpiBusConfig {
    fn default() -> Self {
        Self {
            mosi: 11,
            miso: 10,
            sclk: 12,
            max_transfer_size: DEFAULT_MAX_TRANSFER_SIZE,
        }
    }
}

impl SpiBusConfig {
    /// Effective chunk limit for a single transaction
    pub fn max_chunk_size(&self) -> usize {
        if self.max_transfer_size == 0 {
            DEFAULT_MAX_TRANSFER_SIZE
        } else {
            self.max_transfer_size
        }
    }
}

/// Per-device settings for the display controller on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpiDeviceConfig {
    /// Chip-select pin
    pub cs: u8,
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Clock mode
    pub mode: Mode,
    /// Transactions the driver may keep in flight
    pub queue_size: u8,
}

impl Default for SpiDeviceConfig {
    fn default() -> Self {
        Self {
            cs: 13,
            frequency: 1_000_000, // 1 MHz
            mode: Mode::Mode0,
            queue_size: 3,
        }
    }
}

/// Clock polarity and phase of the display controller link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<Mode> for embedded_hal::spi::Mode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => embedded_hal::spi::MODE_0,
            Mode::Mode1 => embedded_hal::spi::MODE_1,
            Mode::Mode2 => embedded_hal::spi::MODE_2,
            Mode::Mode3 => embedded_hal::spi::MODE_3,
        }
    }
}

/// Failure while bringing the bus up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusInitError<E> {
    /// The bus was already initialized by another user
    ///
    /// The bus is shared, so callers may carry on and add their device.
    AlreadyInitialized,
    /// Driver-specific failure
    Failed(E),
}

/// SPI host controller
///
/// Owns the physical bus and hands out device handles. Release methods
/// are infallible and must tolerate being called for a bus that was never
/// fully brought up.
pub trait SpiHost {
    /// Device handle used for transactions
    type Device: embedded_hal_async::spi::SpiDevice<u8>;

    /// Error type for bus and device setup
    type Error: core::fmt::Debug;

    /// Configure the bus pins and transfer limit
    fn initialize_bus(&mut self, config: &SpiBusConfig) -> Result<(), BusInitError<Self::Error>>;

    /// Attach a device to the initialized bus
    fn add_device(&mut self, config: &SpiDeviceConfig) -> Result<Self::Device, Self::Error>;

    /// Detach a device previously returned by [`SpiHost::add_device`]
    fn remove_device(&mut self, device: Self::Device);

    /// Release the bus
    fn free_bus(&mut self);
}
