//! Drawing commands for the RPHUB75 display controller
//!
//! Every operation validates its arguments, encodes the full header into a
//! local buffer and only then touches the bus. A failed frame ends the
//! operation; nothing after it is sent.

use rphub_protocol::{pixels_as_bytes, Blit, Color, Command, EncodeError, PanelConfig, Region};

use crate::error::Error;
use crate::transport::CommandSink;

/// Command encoder bound to a transport
pub struct Hub75<'a, S> {
    sink: &'a S,
}

impl<S> Clone for Hub75<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Hub75<'_, S> {}

impl<'a, S: CommandSink> Hub75<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self { sink }
    }

    /// Encode `command` and send it as one frame
    pub(crate) async fn send_command(&self, op: &'static str, command: Command) -> Result<(), Error> {
        let header = command.encode_to_vec().map_err(|e| {
            error!("{}: invalid command: {}", op, e);
            Error::from(e)
        })?;
        self.send_frame(op, &header).await
    }

    pub(crate) async fn send_frame(&self, op: &'static str, bytes: &[u8]) -> Result<(), Error> {
        self.sink.send(bytes).await.map_err(|e| {
            error!("{}: send failed: {}", op, e);
            e
        })
    }

    /// Configure the panel driver on the remote device
    pub async fn display_init(&self, panel: &PanelConfig) -> Result<(), Error> {
        self.send_command("display_init", Command::DisplayInit(*panel)).await
    }

    /// Stop driving the panel
    pub async fn display_deinit(&self) -> Result<(), Error> {
        self.send_command("display_deinit", Command::DisplayDeinit).await
    }

    /// Show framebuffer `fb`
    pub async fn display_flip(&self, fb: u8) -> Result<(), Error> {
        self.send_command("display_flip", Command::DisplayFlip { fb }).await
    }

    /// Fill framebuffer `fb` with `color`
    pub async fn fb_clear(&self, fb: u8, color: Color) -> Result<(), Error> {
        self.send_command("fb_clear", Command::FbClear { fb, color }).await
    }

    /// Copy a rectangle between framebuffers
    pub async fn fb_blit(&self, blit: &Blit) -> Result<(), Error> {
        self.send_command("fb_blit", Command::FbBlit(*blit)).await
    }

    /// Write `bitmap` (row-major, `width * height` pixels) into `region`
    ///
    /// The header and the pixels are two transfers. An empty region sends
    /// the header alone.
    pub async fn fb_draw(&self, region: Region, bitmap: &[Color]) -> Result<(), Error> {
        let command = Command::FbDraw(region);
        command.validate().map_err(|e| {
            error!("fb_draw: {}", e);
            Error::from(e)
        })?;

        let pixels = region.pixel_count()?;
        if bitmap.len() != pixels {
            error!(
                "fb_draw: bitmap has {} pixels, region needs {}",
                bitmap.len(),
                pixels
            );
            return Err(Error::InvalidArgument);
        }

        self.send_command("fb_draw", command).await?;

        if !bitmap.is_empty() {
            self.send_frame("fb_draw", pixels_as_bytes(bitmap)).await?;
        }
        Ok(())
    }

    /// Ask the device for the pixels of `region`
    ///
    /// The reply is read into the transport's capture buffer, which must
    /// hold at least `width * height * 3` bytes; otherwise nothing is sent.
    /// Returns the reply length.
    pub async fn fb_read(&self, region: Region) -> Result<usize, Error> {
        let invalid = |e: EncodeError| {
            error!("fb_read: invalid command: {}", e);
            Error::from(e)
        };
        let header = Command::FbRead(region).encode_to_vec().map_err(invalid)?;
        let len = region.payload_len().map_err(invalid)?;

        self.sink.request(&header, len).await.map_err(|e| {
            error!("fb_read: request failed: {}", e);
            e
        })?;
        Ok(len)
    }
}
