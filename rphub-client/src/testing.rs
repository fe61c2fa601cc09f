//! Host-side doubles for the SPI host, the SPI device and the command sink

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::spi::{ErrorKind, ErrorType, Operation};
use rphub_hal::{BusInitError, SpiBusConfig, SpiDeviceConfig, SpiHost};

use crate::config::TransportConfig;
use crate::error::Error;
use crate::transport::{CommandSink, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

impl embedded_hal::spi::Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Overrun
    }
}

/// Everything the mock bus saw
#[derive(Debug, Default)]
pub struct BusLog {
    /// Bytes written by each successful transaction
    pub transactions: Vec<Vec<u8>>,
    /// Length of each receive-only transaction
    pub reads: Vec<usize>,
    /// Transactions started, including failed ones
    pub attempts: usize,
    pub bus_inits: usize,
    pub bus_frees: usize,
    pub devices_added: usize,
    pub devices_removed: usize,
}

/// SPI host handing out [`MockDevice`]s that share one [`BusLog`]
#[derive(Default)]
pub struct MockHost {
    pub log: Rc<RefCell<BusLog>>,
    pub bus_error: Option<BusInitError<MockError>>,
    pub fail_add_device: bool,
    /// Clock written bytes straight back
    pub echo: bool,
    /// Index of the transaction that fails
    pub fail_at: Option<usize>,
    /// Every transaction waits for this signal first
    pub gate: Option<Rc<Signal<NoopRawMutex, ()>>>,
    /// Yield to the executor inside every transaction
    pub yield_each: bool,
    /// Bytes returned by receive-only reads, zero once exhausted
    pub replies: VecDeque<u8>,
}

pub struct MockDevice {
    log: Rc<RefCell<BusLog>>,
    echo: bool,
    fail_at: Option<usize>,
    gate: Option<Rc<Signal<NoopRawMutex, ()>>>,
    yield_each: bool,
    replies: VecDeque<u8>,
}

impl SpiHost for MockHost {
    type Device = MockDevice;
    type Error = MockError;

    fn initialize_bus(&mut self, _config: &SpiBusConfig) -> Result<(), BusInitError<MockError>> {
        match self.bus_error {
            Some(e) => Err(e),
            None => {
                self.log.borrow_mut().bus_inits += 1;
                Ok(())
            }
        }
    }

    fn add_device(&mut self, _config: &SpiDeviceConfig) -> Result<MockDevice, MockError> {
        if self.fail_add_device {
            return Err(MockError);
        }
        self.log.borrow_mut().devices_added += 1;
        Ok(MockDevice {
            log: self.log.clone(),
            echo: self.echo,
            fail_at: self.fail_at,
            gate: self.gate.clone(),
            yield_each: self.yield_each,
            replies: core::mem::take(&mut self.replies),
        })
    }

    fn remove_device(&mut self, _device: MockDevice) {
        self.log.borrow_mut().devices_removed += 1;
    }

    fn free_bus(&mut self) {
        self.log.borrow_mut().bus_frees += 1;
    }
}

impl ErrorType for MockDevice {
    type Error = MockError;
}

impl MockDevice {
    fn reply(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.replies.pop_front().unwrap_or(0);
        }
    }
}

impl embedded_hal_async::spi::SpiDevice for MockDevice {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), MockError> {
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        if self.yield_each {
            embassy_futures::yield_now().await;
        }

        let attempt = {
            let mut log = self.log.borrow_mut();
            log.attempts += 1;
            log.attempts - 1
        };
        if self.fail_at == Some(attempt) {
            return Err(MockError);
        }

        let mut written = Vec::new();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(w) => written.extend_from_slice(w),
                Operation::Transfer(r, w) => {
                    written.extend_from_slice(w);
                    r.fill(0);
                    if self.echo {
                        let n = r.len().min(w.len());
                        r[..n].copy_from_slice(&w[..n]);
                    }
                }
                Operation::TransferInPlace(buf) => {
                    written.extend_from_slice(buf);
                    if !self.echo {
                        buf.fill(0);
                    }
                }
                Operation::Read(r) => {
                    self.log.borrow_mut().reads.push(r.len());
                    self.reply(r);
                }
                Operation::DelayNs(_) => {}
            }
        }

        if !written.is_empty() {
            self.log.borrow_mut().transactions.push(written);
        }
        Ok(())
    }
}

pub fn mock_transport(host: MockHost, max_chunk: usize) -> Transport<NoopRawMutex, MockHost> {
    Transport::new(host, TransportConfig::with_max_chunk_size(max_chunk))
}

/// Command sink recording each `send` as one frame
#[derive(Default)]
pub struct RecordingSink {
    pub frames: RefCell<Vec<Vec<u8>>>,
    /// Reply length of each `request`
    pub reads: RefCell<Vec<usize>>,
    /// Index of the `send` call that fails
    pub fail_on_send: Option<usize>,
    pub sends: RefCell<usize>,
}

impl CommandSink for RecordingSink {
    async fn send(&self, bytes: &[u8]) -> Result<(), Error> {
        let call = {
            let mut sends = self.sends.borrow_mut();
            *sends += 1;
            *sends - 1
        };
        if self.fail_on_send == Some(call) {
            return Err(Error::TransferFailed(ErrorKind::Other));
        }
        self.frames.borrow_mut().push(bytes.to_vec());
        Ok(())
    }

    async fn request(&self, header: &[u8], reply_len: usize) -> Result<(), Error> {
        self.send(header).await?;
        if reply_len > 0 {
            self.reads.borrow_mut().push(reply_len);
        }
        Ok(())
    }
}
