//! Client error type

use embedded_hal::spi::ErrorKind;
use rphub_protocol::EncodeError;

/// Errors returned by the transport and the command encoder
///
/// Validation errors are raised before any bus traffic. Transfer errors
/// abort the rest of the current operation but leave the transport usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Transport used before `initialize` or after `deinitialize`
    NotInitialized,
    /// Argument inconsistent with the request (length mismatch, oversize read)
    InvalidArgument,
    /// Operation needs a capture buffer and none is configured
    InvalidState,
    /// Transport lock not acquired within the configured timeout
    Timeout,
    /// The SPI device reported an error
    TransferFailed(ErrorKind),
    /// Capture buffer allocation failed
    OutOfMemory,
    /// Framebuffer index is not below `FB_COUNT`
    IndexOutOfRange { index: u8 },
    /// Bitmap dimensions overflow `usize`
    SizeOverflow,
    /// The SPI bus could not be initialized
    BusInit,
    /// The display controller could not be added to the bus
    DeviceInit,
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::IndexOutOfRange { index } => Error::IndexOutOfRange { index },
            EncodeError::SizeOverflow => Error::SizeOverflow,
            EncodeError::BufferTooSmall => Error::InvalidArgument,
        }
    }
}
