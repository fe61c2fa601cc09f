//! Diagnostic commands and the transport self-test

use alloc::vec::Vec;

use rphub_protocol::Command;

use crate::display::Hub75;
use crate::error::Error;
use crate::transport::CommandSink;

/// Self-test pattern length; larger than one default chunk
pub const SELF_TEST_LEN: usize = 5000;

/// First byte of the self-test pattern
pub const SELF_TEST_HEAD: u8 = 0xA5;

/// Last byte of the self-test pattern
pub const SELF_TEST_TAIL: u8 = 0x5A;

/// Build the self-test pattern
///
/// Layout: `SELF_TEST_HEAD`, a counter (`index as u8`) for the body, then
/// `marker` and `SELF_TEST_TAIL` as the last two bytes.
pub fn self_test_pattern(marker: u8) -> Result<Vec<u8>, Error> {
    let mut pattern = Vec::new();
    pattern
        .try_reserve_exact(SELF_TEST_LEN)
        .map_err(|_| Error::OutOfMemory)?;
    pattern.extend((0..SELF_TEST_LEN).map(|i| i as u8));

    pattern[0] = SELF_TEST_HEAD;
    pattern[SELF_TEST_LEN - 2] = marker;
    pattern[SELF_TEST_LEN - 1] = SELF_TEST_TAIL;
    Ok(pattern)
}

/// Check bytes that should be an intact self-test pattern
pub fn verify_self_test_pattern(bytes: &[u8], marker: u8) -> bool {
    if bytes.len() != SELF_TEST_LEN {
        return false;
    }
    let last = SELF_TEST_LEN - 1;
    bytes[0] == SELF_TEST_HEAD
        && bytes[last] == SELF_TEST_TAIL
        && bytes[last - 1] == marker
        && bytes[1..last - 1]
            .iter()
            .enumerate()
            .all(|(i, &b)| b == (i + 1) as u8)
}

impl<S: CommandSink> Hub75<'_, S> {
    /// Request hardware information from the controller
    pub async fn hardware_info(&self) -> Result<(), Error> {
        self.send_command("hardware_info", Command::HardwareInfo).await
    }

    /// Request runtime statistics from the controller
    pub async fn stat(&self) -> Result<(), Error> {
        self.send_command("stat", Command::Stat).await
    }

    /// Push the self-test pattern through the transport
    ///
    /// The pattern carries no header; it only exercises chunking.
    pub async fn self_test(&self, marker: u8) -> Result<(), Error> {
        let pattern = self_test_pattern(marker).map_err(|e| {
            error!("self_test: {}", e);
            e
        })?;
        info!("self_test: sending {} bytes, marker {=u8:#x}", pattern.len(), marker);
        self.send_frame("self_test", &pattern).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock_transport, MockHost, RecordingSink};
    use embassy_futures::block_on;

    #[test]
    fn test_pattern_layout() {
        let pattern = self_test_pattern(0x42).unwrap();
        assert_eq!(pattern.len(), SELF_TEST_LEN);
        assert_eq!(pattern[0], 0xA5);
        assert_eq!(pattern[1], 1);
        assert_eq!(pattern[256], 0);
        assert_eq!(pattern[SELF_TEST_LEN - 2], 0x42);
        assert_eq!(pattern[SELF_TEST_LEN - 1], 0x5A);
        assert!(verify_self_test_pattern(&pattern, 0x42));
        assert!(!verify_self_test_pattern(&pattern, 0x43));
        assert!(!verify_self_test_pattern(&pattern[1..], 0x42));
    }

    #[test]
    fn test_query_headers() {
        let sink = RecordingSink::default();
        let hub = Hub75::new(&sink);

        block_on(async {
            hub.hardware_info().await.unwrap();
            hub.stat().await.unwrap();
        });

        assert_eq!(*sink.frames.borrow(), vec![vec![0x03, 0x01], vec![0x03, 0x02]]);
    }

    #[test]
    fn test_self_test_is_chunked_and_echoed() {
        let host = MockHost {
            echo: true,
            ..MockHost::default()
        };
        let log = host.log.clone();
        let transport = mock_transport(host, 4096);
        let hub = Hub75::new(&transport);

        block_on(async {
            transport.initialize().await.unwrap();
            transport.set_receive_capacity(SELF_TEST_LEN).await.unwrap();
            hub.self_test(0x7E).await.unwrap();
        });

        let sizes: Vec<usize> = log.borrow().transactions.iter().map(|t| t.len()).collect();
        assert_eq!(sizes, vec![4096, SELF_TEST_LEN - 4096]);
        let intact = transport
            .last_received(|bytes| verify_self_test_pattern(bytes, 0x7E))
            .unwrap();
        assert!(intact);
    }
}
