//! Client side of the RPHUB75 display link
//!
//! This crate drives a remote HUB75 framebuffer controller over SPI:
//!
//! - [`Transport`]: exclusive, chunked access to the SPI device with an
//!   optional capture buffer for replies
//! - [`Hub75`]: the command encoder (display init/flip, framebuffer clear,
//!   blit, draw and read, diagnostics)
//! - [`Error`]: one error type for validation and bus failures
//!
//! # Usage
//!
//! ```ignore
//! let transport: Transport<CriticalSectionRawMutex, _> =
//!     Transport::new(board_spi_host, TransportConfig::default());
//! transport.initialize().await?;
//!
//! let hub = Hub75::new(&transport);
//! hub.display_init(&PanelConfig::default()).await?;
//! hub.fb_clear(0, Color::hsv(160, 255, 128)).await?;
//! hub.display_flip(0).await?;
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// Must come first so the logging macros are visible to later modules
#[macro_use]
mod fmt;

pub mod config;
pub mod diagnostics;
pub mod display;
pub mod error;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::TransportConfig;
pub use display::Hub75;
pub use error::Error;
pub use transport::{CommandSink, Transport};

pub use rphub_protocol::{Blit, Color, PanelConfig, Region, FB_COUNT};
