//! Chunked SPI transport
//!
//! The display controller's SPI peripheral accepts at most
//! `max_transfer_size` bytes per transaction. [`Transport::send`] splits
//! larger writes into consecutive transactions and holds the transport lock
//! for the whole write, so chunks of two concurrent senders never
//! interleave on the wire.
//!
//! An optional capture buffer records what the device clocks back. With
//! capture enabled every chunk is a full-duplex transfer; without it the
//! incoming bytes are discarded.

use alloc::vec::Vec;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::with_timeout;
use embedded_hal::spi::Error as _;
use embedded_hal_async::spi::{Operation, SpiDevice};
use rphub_hal::{BusInitError, SpiHost};

use crate::config::TransportConfig;
use crate::error::Error;

/// Byte sink the command encoder writes through
///
/// [`Transport`] is the real implementation; tests substitute recorders.
#[allow(async_fn_in_trait)]
pub trait CommandSink {
    /// Write `bytes` as one logical operation
    async fn send(&self, bytes: &[u8]) -> Result<(), Error>;

    /// Write `header` and receive a `reply_len` byte reply as one
    /// logical operation
    async fn request(&self, header: &[u8], reply_len: usize) -> Result<(), Error>;
}

/// Bus state guarded by the transport lock
struct Session<H: SpiHost> {
    host: H,
    /// Set when this transport brought the bus up and must free it
    bus_open: bool,
    device: Option<H::Device>,
    capture: Vec<u8>,
    /// Valid bytes at the front of `capture`
    received: usize,
}

impl<H: SpiHost> Session<H> {
    /// Reject a reply of `len` bytes the capture buffer cannot hold
    fn check_reply(&self, len: usize) -> Result<(), Error> {
        if self.device.is_none() {
            error!("transport: SPI not initialized");
            return Err(Error::NotInitialized);
        }
        if self.capture.is_empty() {
            error!("transport: no capture buffer configured");
            return Err(Error::InvalidState);
        }
        if len > self.capture.len() {
            error!(
                "transport: reply of {} bytes exceeds capture capacity {}",
                len,
                self.capture.len()
            );
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    async fn write_chunks(&mut self, bytes: &[u8], max_chunk: usize) -> Result<(), Error> {
        let Some(device) = self.device.as_mut() else {
            error!("send: SPI not initialized");
            return Err(Error::NotInitialized);
        };

        if bytes.is_empty() {
            return Ok(());
        }

        let capture = self.capture.as_mut_slice();
        self.received = 0;

        for (index, chunk) in bytes.chunks(max_chunk).enumerate() {
            trace!("send: chunk {} ({} bytes)", index, chunk.len());
            let result = if capture.is_empty() {
                device.write(chunk).await
            } else {
                transfer_capturing(device, chunk, capture).await
            };
            if let Err(e) = result {
                let kind = e.kind();
                error!("SPI transmit failed at chunk {}: {}", index, kind);
                return Err(Error::TransferFailed(kind));
            }
        }

        if !capture.is_empty() {
            // Captured bytes end the buffer; move them to the front.
            let cap = capture.len();
            let n = bytes.len().min(cap);
            capture.copy_within(cap - n.., 0);
            self.received = n;
        }

        Ok(())
    }

    /// Caller has checked `len` with [`Session::check_reply`]
    async fn read_chunks(&mut self, len: usize, max_chunk: usize) -> Result<(), Error> {
        let Some(device) = self.device.as_mut() else {
            return Err(Error::NotInitialized);
        };

        self.received = 0;
        for chunk in self.capture[..len].chunks_mut(max_chunk) {
            if let Err(e) = device.read(chunk).await {
                let kind = e.kind();
                error!("SPI receive failed: {}", kind);
                return Err(Error::TransferFailed(kind));
            }
        }
        self.received = len;
        Ok(())
    }
}

/// Exclusive, chunking access to the display controller
///
/// Use `CriticalSectionRawMutex` when tasks on different executors or
/// interrupt priorities share the transport, `NoopRawMutex` otherwise.
pub struct Transport<M: RawMutex, H: SpiHost> {
    config: TransportConfig,
    session: Mutex<M, Session<H>>,
}

impl<M: RawMutex, H: SpiHost> Transport<M, H> {
    /// Create a closed transport; call [`Transport::initialize`] before use
    pub fn new(host: H, config: TransportConfig) -> Self {
        Self {
            config,
            session: Mutex::new(Session {
                host,
                bus_open: false,
                device: None,
                capture: Vec::new(),
                received: 0,
            }),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Largest single SPI transaction
    pub fn max_chunk_size(&self) -> usize {
        self.config.max_chunk_size()
    }

    async fn lock(&self) -> Result<MutexGuard<'_, M, Session<H>>, Error> {
        with_timeout(self.config.lock_timeout(), self.session.lock())
            .await
            .map_err(|_| {
                warn!("transport: lock not acquired within {} ms", self.config.lock_timeout_ms);
                Error::Timeout
            })
    }

    /// Bring up the bus and attach the display controller
    ///
    /// Calling this on an open transport succeeds without touching the bus.
    /// A bus already initialized by someone else is shared, not an error.
    pub async fn initialize(&self) -> Result<(), Error> {
        let mut guard = self.lock().await?;
        let session = &mut *guard;

        if session.device.is_some() {
            debug!("transport: already initialized");
            return Ok(());
        }

        match session.host.initialize_bus(&self.config.bus) {
            Ok(()) => session.bus_open = true,
            Err(BusInitError::AlreadyInitialized) => {
                debug!("transport: sharing already initialized bus");
            }
            Err(BusInitError::Failed(_)) => {
                error!("transport: SPI bus initialization failed");
                return Err(Error::BusInit);
            }
        }

        let device = session
            .host
            .add_device(&self.config.device)
            .map_err(|_| {
                error!("transport: adding SPI device failed");
                Error::DeviceInit
            })?;
        session.device = Some(device);

        info!(
            "SPI initialized on MOSI={} MISO={} SCLK={} CS={}",
            self.config.bus.mosi,
            self.config.bus.miso,
            self.config.bus.sclk,
            self.config.device.cs
        );
        Ok(())
    }

    /// Detach the device and release the bus
    ///
    /// Each resource is released only if it was acquired, so this is safe
    /// after a partially failed [`Transport::initialize`] and when called
    /// twice. The capture buffer is kept.
    pub async fn deinitialize(&self) -> Result<(), Error> {
        let mut guard = self.lock().await?;
        let session = &mut *guard;

        if let Some(device) = session.device.take() {
            session.host.remove_device(device);
        }
        if session.bus_open {
            session.host.free_bus();
            session.bus_open = false;
        }

        info!("SPI deinitialized");
        Ok(())
    }

    /// Whether the device is attached
    pub async fn is_initialized(&self) -> Result<bool, Error> {
        Ok(self.lock().await?.device.is_some())
    }

    /// Write `bytes` in chunks of at most [`Transport::max_chunk_size`]
    ///
    /// Stops at the first failed chunk; later chunks are not sent. With a
    /// capture buffer configured, it holds the last `capacity` bytes
    /// received once the write completes.
    pub async fn send(&self, bytes: &[u8]) -> Result<(), Error> {
        let max_chunk = self.max_chunk_size();
        let mut session = self.lock().await?;
        session.write_chunks(bytes, max_chunk).await
    }

    /// Receive `len` bytes into the capture buffer
    ///
    /// On success [`Transport::last_received`] returns exactly those bytes.
    pub async fn read_into(&self, len: usize) -> Result<(), Error> {
        let max_chunk = self.max_chunk_size();
        let mut session = self.lock().await?;
        session.check_reply(len)?;
        session.read_chunks(len, max_chunk).await
    }

    /// Write `header`, then receive a `reply_len` byte reply
    ///
    /// Both halves run under one lock hold, so no other sender can slip in
    /// between request and reply. The capture buffer is checked before the
    /// header goes out; a reply that cannot be held sends nothing.
    pub async fn request(&self, header: &[u8], reply_len: usize) -> Result<(), Error> {
        let max_chunk = self.max_chunk_size();
        let mut session = self.lock().await?;
        if reply_len > 0 {
            session.check_reply(reply_len)?;
        }
        session.write_chunks(header, max_chunk).await?;
        if reply_len > 0 {
            session.read_chunks(reply_len, max_chunk).await?;
        }
        Ok(())
    }

    /// Resize the capture buffer; 0 disables capture
    ///
    /// The new buffer is allocated before the old one is released, so an
    /// allocation failure leaves the previous buffer in place.
    pub async fn set_receive_capacity(&self, capacity: usize) -> Result<(), Error> {
        let mut buffer = Vec::new();
        if capacity > 0 {
            buffer.try_reserve_exact(capacity).map_err(|_| {
                error!("set_receive_capacity: cannot allocate {} bytes", capacity);
                Error::OutOfMemory
            })?;
            buffer.resize(capacity, 0);
        }

        let mut session = self.lock().await?;
        session.capture = buffer;
        session.received = 0;
        debug!("capture capacity set to {}", capacity);
        Ok(())
    }

    /// Current capture buffer capacity
    pub async fn receive_capacity(&self) -> Result<usize, Error> {
        Ok(self.lock().await?.capture.len())
    }

    /// Lend the most recently captured bytes to `f`
    ///
    /// Never waits: returns [`Error::Timeout`] if an operation currently
    /// holds the transport. The slice is empty after a failed transfer or
    /// when capture is disabled.
    pub fn last_received<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, Error> {
        let session = self.session.try_lock().map_err(|_| Error::Timeout)?;
        Ok(f(&session.capture[..session.received]))
    }
}

/// One full-duplex transaction that leaves the newest bytes at the end
/// of `capture`
async fn transfer_capturing<D: SpiDevice>(
    device: &mut D,
    chunk: &[u8],
    capture: &mut [u8],
) -> Result<(), D::Error> {
    let cap = capture.len();
    if chunk.len() >= cap {
        let (head, tail) = chunk.split_at(chunk.len() - cap);
        if head.is_empty() {
            device.transfer(capture, tail).await
        } else {
            device
                .transaction(&mut [Operation::Write(head), Operation::Transfer(capture, tail)])
                .await
        }
    } else {
        capture.copy_within(chunk.len().., 0);
        device.transfer(&mut capture[cap - chunk.len()..], chunk).await
    }
}

impl<M: RawMutex, H: SpiHost> CommandSink for Transport<M, H> {
    async fn send(&self, bytes: &[u8]) -> Result<(), Error> {
        Transport::send(self, bytes).await
    }

    async fn request(&self, header: &[u8], reply_len: usize) -> Result<(), Error> {
        Transport::request(self, header, reply_len).await
    }
}
