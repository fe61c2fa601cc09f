//! RPHUB75 Hardware Abstraction Layer
//!
//! This crate defines the bus-side seam between the display client and the
//! chip-specific SPI driver. The client never touches peripheral registers;
//! it asks an [`SpiHost`] to bring the bus up, hands it a device
//! configuration, and then talks to whatever
//! [`embedded_hal_async::spi::SpiDevice`] comes back.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  rphub-client (transport + encoder)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  rphub-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  chip SPI     │       │  test doubles │
//! │  host driver  │       │               │
//! └───────────────┘       └───────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod spi;

pub use spi::{
    BusInitError, Mode, SpiBusConfig, SpiDeviceConfig, SpiHost,
    DEFAULT_MAX_TRANSFER_SIZE,
};
