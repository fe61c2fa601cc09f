//! Command headers for the RPHUB75 display controller
//!
//! Header format:
//! - CATEGORY (1 byte): command family, see [`Category`]
//! - OPCODE (1 byte): command within the family, see [`opcode`]
//! - RECORD (0-14 bytes): fixed-layout parameters, little-endian, no padding
//!
//! The device decodes records positionally, so every field is written
//! explicitly here instead of relying on any in-memory struct layout.

use heapless::Vec;

use crate::color::{Color, BYTES_PER_PIXEL};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of framebuffers the display firmware provides
pub const FB_COUNT: u8 = 4;

/// Largest parameter record (BLIT)
pub const MAX_RECORD_SIZE: usize = 14;

/// Largest complete header (CATEGORY + OPCODE + MAX_RECORD)
pub const MAX_HEADER_SIZE: usize = 2 + MAX_RECORD_SIZE;

/// Command families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Category {
    /// Panel driver control
    Hub75 = 0x01,
    /// Framebuffer drawing
    Fb = 0x02,
    /// Diagnostics
    Misc = 0x03,
}

impl Category {
    /// Parse a category from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Category::Hub75),
            0x02 => Some(Category::Fb),
            0x03 => Some(Category::Misc),
            _ => None,
        }
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Opcode values, scoped by category
pub mod opcode {
    // Category::Hub75
    pub const HUB75_INIT: u8 = 0x01;
    pub const HUB75_DEINIT: u8 = 0x02;
    pub const HUB75_FLIP: u8 = 0x03;

    // Category::Fb
    pub const FB_CLEAR: u8 = 0x01;
    pub const FB_BLIT: u8 = 0x02;
    pub const FB_DRAW: u8 = 0x03;
    pub const FB_READ: u8 = 0x04;

    // Category::Misc
    pub const MISC_HWINFO: u8 = 0x01;
    pub const MISC_STAT: u8 = 0x02;
}

/// Errors raised while building a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Framebuffer index is not below [`FB_COUNT`]
    IndexOutOfRange { index: u8 },
    /// Bitmap dimensions overflow `usize`
    SizeOverflow,
    /// Output buffer too small for the header
    BufferTooSmall,
}

/// Errors raised while parsing a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Fewer bytes than the opcode's record needs
    Truncated,
    /// Category byte not recognized
    UnknownCategory(u8),
    /// Opcode not defined for the category
    UnknownOpcode { category: u8, opcode: u8 },
    /// Framebuffer index is not below [`FB_COUNT`]
    IndexOutOfRange { index: u8 },
}

/// Panel wiring sent with display-init
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PanelConfig {
    /// First of the RGB data pins
    pub data_base: u8,
    /// First of the row address pins
    pub rows_base: u8,
    /// First of the latch/output-enable pins
    pub ctrl_base: u8,
    /// Pixel clock pin
    pub clk_pin: u8,
    /// Panel width in pixels
    pub width: u16,
    /// Panel height in pixels
    pub height: u16,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            data_base: 0,
            rows_base: 6,
            ctrl_base: 11,
            clk_pin: 13,
            width: 64,
            height: 64,
        }
    }
}

/// Copy of a rectangle between (or within) framebuffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Blit {
    pub src_fb: u8,
    pub dst_fb: u8,
    pub src_x: u16,
    pub src_y: u16,
    pub dst_x: u16,
    pub dst_y: u16,
    pub width: u16,
    pub height: u16,
}

/// Rectangle within one framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub fb: u8,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    /// Number of pixels covered
    pub fn pixel_count(&self) -> Result<usize, EncodeError> {
        pixel_count(usize::from(self.width), usize::from(self.height))
    }

    /// Size of the RGB payload covering this region
    pub fn payload_len(&self) -> Result<usize, EncodeError> {
        bitmap_len(usize::from(self.width), usize::from(self.height))
    }
}

/// `width * height`, rejecting products that wrap
///
/// The product is divided back by `width` and compared with `height`, so
/// the check holds on any pointer width.
pub fn pixel_count(width: usize, height: usize) -> Result<usize, EncodeError> {
    let count = width.wrapping_mul(height);
    if width != 0 && count / width != height {
        return Err(EncodeError::SizeOverflow);
    }
    Ok(count)
}

/// Payload bytes for a `width` x `height` bitmap
pub fn bitmap_len(width: usize, height: usize) -> Result<usize, EncodeError> {
    pixel_count(width, height)?
        .checked_mul(BYTES_PER_PIXEL)
        .ok_or(EncodeError::SizeOverflow)
}

/// A command header the display controller understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Configure the panel driver
    DisplayInit(PanelConfig),
    /// Stop driving the panel
    DisplayDeinit,
    /// Show a framebuffer on the panel
    DisplayFlip { fb: u8 },
    /// Fill a framebuffer with one color
    FbClear { fb: u8, color: Color },
    /// Copy a rectangle
    FbBlit(Blit),
    /// Write a bitmap; the pixels follow in a separate transfer
    FbDraw(Region),
    /// Read a rectangle back; the device answers with RGB triples
    FbRead(Region),
    /// Request hardware information
    HardwareInfo,
    /// Request runtime statistics
    Stat,
}

impl Command {
    /// Command family
    pub fn category(&self) -> Category {
        match self {
            Command::DisplayInit(_) | Command::DisplayDeinit | Command::DisplayFlip { .. } => {
                Category::Hub75
            }
            Command::FbClear { .. }
            | Command::FbBlit(_)
            | Command::FbDraw(_)
            | Command::FbRead(_) => Category::Fb,
            Command::HardwareInfo | Command::Stat => Category::Misc,
        }
    }

    /// Opcode within the family
    pub fn opcode(&self) -> u8 {
        match self {
            Command::DisplayInit(_) => opcode::HUB75_INIT,
            Command::DisplayDeinit => opcode::HUB75_DEINIT,
            Command::DisplayFlip { .. } => opcode::HUB75_FLIP,
            Command::FbClear { .. } => opcode::FB_CLEAR,
            Command::FbBlit(_) => opcode::FB_BLIT,
            Command::FbDraw(_) => opcode::FB_DRAW,
            Command::FbRead(_) => opcode::FB_READ,
            Command::HardwareInfo => opcode::MISC_HWINFO,
            Command::Stat => opcode::MISC_STAT,
        }
    }

    /// Parameter record size in bytes
    pub fn record_len(&self) -> usize {
        match self {
            Command::DisplayInit(_) => 8,
            Command::DisplayDeinit | Command::HardwareInfo | Command::Stat => 0,
            Command::DisplayFlip { .. } => 1,
            Command::FbClear { .. } => 4,
            Command::FbBlit(_) => 14,
            Command::FbDraw(_) | Command::FbRead(_) => 9,
        }
    }

    /// Total header size in bytes
    pub fn encoded_len(&self) -> usize {
        2 + self.record_len()
    }

    /// Check framebuffer indices and region sizes
    pub fn validate(&self) -> Result<(), EncodeError> {
        match self {
            Command::DisplayFlip { fb } | Command::FbClear { fb, .. } => check_fb(*fb),
            Command::FbBlit(blit) => {
                check_fb(blit.src_fb)?;
                check_fb(blit.dst_fb)
            }
            Command::FbDraw(region) | Command::FbRead(region) => {
                check_fb(region.fb)?;
                region.payload_len().map(|_| ())
            }
            Command::DisplayInit(_)
            | Command::DisplayDeinit
            | Command::HardwareInfo
            | Command::Stat => Ok(()),
        }
    }

    /// Encode this header into a byte buffer
    ///
    /// Validation runs before anything is written. Returns the number of
    /// bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, EncodeError> {
        self.validate()?;

        let len = self.encoded_len();
        if buffer.len() < len {
            return Err(EncodeError::BufferTooSmall);
        }

        let mut w = Writer { buf: &mut buffer[..len], pos: 0 };
        w.u8(self.category().to_byte());
        w.u8(self.opcode());

        match self {
            Command::DisplayInit(panel) => {
                w.u8(panel.data_base);
                w.u8(panel.rows_base);
                w.u8(panel.ctrl_base);
                w.u8(panel.clk_pin);
                w.u16(panel.width);
                w.u16(panel.height);
            }
            Command::DisplayFlip { fb } => w.u8(*fb),
            Command::FbClear { fb, color } => {
                w.u8(color.r);
                w.u8(color.g);
                w.u8(color.b);
                w.u8(*fb);
            }
            Command::FbBlit(blit) => {
                w.u16(blit.src_x);
                w.u16(blit.src_y);
                w.u16(blit.dst_x);
                w.u16(blit.dst_y);
                w.u16(blit.width);
                w.u16(blit.height);
                w.u8(blit.src_fb);
                w.u8(blit.dst_fb);
            }
            Command::FbDraw(region) | Command::FbRead(region) => {
                w.u16(region.x);
                w.u16(region.y);
                w.u16(region.width);
                w.u16(region.height);
                w.u8(region.fb);
            }
            Command::DisplayDeinit | Command::HardwareInfo | Command::Stat => {}
        }

        debug_assert_eq!(w.pos, len);
        Ok(len)
    }

    /// Encode this header into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_HEADER_SIZE>, EncodeError> {
        let mut buffer = [0u8; MAX_HEADER_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| EncodeError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Parse a header as the display controller would
    ///
    /// Trailing bytes after the record are ignored; for DRAW they are the
    /// start of the pixel payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader { buf: bytes, pos: 0 };
        let category_byte = r.u8()?;
        let op = r.u8()?;
        let category =
            Category::from_byte(category_byte).ok_or(DecodeError::UnknownCategory(category_byte))?;
        let unknown = DecodeError::UnknownOpcode {
            category: category_byte,
            opcode: op,
        };

        let command = match (category, op) {
            (Category::Hub75, opcode::HUB75_INIT) => Command::DisplayInit(PanelConfig {
                data_base: r.u8()?,
                rows_base: r.u8()?,
                ctrl_base: r.u8()?,
                clk_pin: r.u8()?,
                width: r.u16()?,
                height: r.u16()?,
            }),
            (Category::Hub75, opcode::HUB75_DEINIT) => Command::DisplayDeinit,
            (Category::Hub75, opcode::HUB75_FLIP) => Command::DisplayFlip { fb: r.fb()? },
            (Category::Fb, opcode::FB_CLEAR) => {
                let color = Color::rgb(r.u8()?, r.u8()?, r.u8()?);
                Command::FbClear { fb: r.fb()?, color }
            }
            (Category::Fb, opcode::FB_BLIT) => {
                let (src_x, src_y, dst_x, dst_y) = (r.u16()?, r.u16()?, r.u16()?, r.u16()?);
                let (width, height) = (r.u16()?, r.u16()?);
                Command::FbBlit(Blit {
                    src_fb: r.fb()?,
                    dst_fb: r.fb()?,
                    src_x,
                    src_y,
                    dst_x,
                    dst_y,
                    width,
                    height,
                })
            }
            (Category::Fb, opcode::FB_DRAW) => Command::FbDraw(r.region()?),
            (Category::Fb, opcode::FB_READ) => Command::FbRead(r.region()?),
            (Category::Misc, opcode::MISC_HWINFO) => Command::HardwareInfo,
            (Category::Misc, opcode::MISC_STAT) => Command::Stat,
            _ => return Err(unknown),
        };

        Ok(command)
    }
}

fn check_fb(index: u8) -> Result<(), EncodeError> {
    if index >= FB_COUNT {
        return Err(EncodeError::IndexOutOfRange { index });
    }
    Ok(())
}

/// Cursor over a buffer already sized for the header
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn u8(&mut self, value: u8) {
        self.buf[self.pos] = value;
        self.pos += 1;
    }

    fn u16(&mut self, value: u16) {
        self.buf[self.pos..self.pos + 2].copy_from_slice(&value.to_le_bytes());
        self.pos += 2;
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.buf.get(self.pos).ok_or(DecodeError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let lo = self.u8()?;
        let hi = self.u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn fb(&mut self) -> Result<u8, DecodeError> {
        let index = self.u8()?;
        if index >= FB_COUNT {
            return Err(DecodeError::IndexOutOfRange { index });
        }
        Ok(index)
    }

    fn region(&mut self) -> Result<Region, DecodeError> {
        let (x, y, width, height) = (self.u16()?, self.u16()?, self.u16()?, self.u16()?);
        Ok(Region {
            fb: self.fb()?,
            x,
            y,
            width,
            height,
        })
    }
}
