//! RPHUB75 Display Command Protocol
//!
//! This crate defines the SPI command protocol spoken to the RPHUB75
//! display controller, a remote device that owns several HUB75
//! framebuffers. The protocol is positional and unframed: the device reads
//! a two-byte header and then a parameter record whose length is implied
//! by the opcode.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌──────────┬────────┬──────────────────────────┐
//! │ CATEGORY │ OPCODE │ PARAMETER RECORD         │
//! │ 1B       │ 1B     │ 0–14B, little-endian     │
//! └──────────┴────────┴──────────────────────────┘
//! ```
//!
//! Bitmap draws follow the header with a second transfer carrying
//! `width * height` row-major RGB triples.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod color;
pub mod command;

pub use color::{pixels_as_bytes, Color, BYTES_PER_PIXEL};
pub use command::opcode;
pub use command::{
    bitmap_len, pixel_count, Blit, Category, Command, DecodeError, EncodeError, PanelConfig,
    Region, FB_COUNT, MAX_HEADER_SIZE,
};
