//! Recording transport for tests and simulated decks.
//!
//! [`MockTransport`] is a cheap cloneable handle over shared state: hand one
//! clone to a [`Deck`](crate::deck::Deck) and keep another to queue input and
//! assert on what was sent.
//!
//! # Example
//!
//! ```rust,ignore
//! use deckhand::device::mock::{MockTransport, Operation};
//!
//! let mock = MockTransport::new();
//! let deck = Deck::builder(Model::Mk2, Box::new(mock.clone())).open();
//!
//! mock.queue_buttons(Model::Mk2, &[3]);
//! deck.poll(Instant::now());
//!
//! assert!(mock.write_count() > 0);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::Transport;
use super::model::{Model, Protocol};
use super::protocol::{self, input_report_len};
use crate::error::{DeckError, Result};

/// Recorded operation for assertions. Reads are counted, not logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SendFeature(Vec<u8>),
    GetFeature { report_id: u8 },
    Write(Vec<u8>),
}

#[derive(Default)]
struct MockState {
    operation_log: Mutex<Vec<Operation>>,
    input_queue: Mutex<VecDeque<Vec<u8>>>,
    feature_responses: Mutex<HashMap<u8, Vec<u8>>>,
    error_injection: Mutex<Option<DeckError>>,
    fail_after_ops: Mutex<Option<usize>>,
    reads: AtomicUsize,
    disconnected: AtomicBool,
}

/// Transport with no hardware behind it.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation once `ops` operations have been logged.
    #[must_use]
    pub fn with_fail_after(self, ops: usize) -> Self {
        *self.state.fail_after_ops.lock().unwrap() = Some(ops);
        self
    }

    /// Answer serial and firmware requests the way `model`'s hardware would.
    #[must_use]
    pub fn with_identity(self, model: Model, serial: &str, firmware: &str) -> Self {
        let protocol = model.protocol();
        if let Some(req) = protocol::serial_request(protocol) {
            self.respond_string(req.report_id, req.len, req.payload.start, serial);
        }
        if let Some(req) = protocol::firmware_request(protocol) {
            self.respond_string(req.report_id, req.len, req.payload.start, firmware);
        }
        self
    }

    fn respond_string(&self, report_id: u8, len: usize, offset: usize, value: &str) {
        let mut response = vec![0u8; len];
        response[0] = report_id;
        let bytes = value.as_bytes();
        let end = (offset + bytes.len()).min(len);
        response[offset..end].copy_from_slice(&bytes[..end - offset]);
        self.set_feature_response(report_id, response);
    }

    /// Canned answer for `get_feature_report` with this report id.
    pub fn set_feature_response(&self, report_id: u8, response: Vec<u8>) {
        self.state
            .feature_responses
            .lock()
            .unwrap()
            .insert(report_id, response);
    }

    // === Error Simulation ===

    /// Inject an error for the next operation.
    pub fn inject_error(&self, error: DeckError) {
        *self.state.error_injection.lock().unwrap() = Some(error);
    }

    /// Fail every operation until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self) {
        self.state.disconnected.store(true, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.state.disconnected.store(false, Ordering::SeqCst);
    }

    // === Input Simulation ===

    /// Queue one raw input report, returned by the next `read`.
    pub fn queue_input(&self, report: Vec<u8>) {
        self.state.input_queue.lock().unwrap().push_back(report);
    }

    /// Queue a button report for `model` with exactly `pressed` held down.
    ///
    /// Logical positions are encoded the way the hardware sends them, so
    /// mirrored models receive wire order.
    pub fn queue_buttons(&self, model: Model, pressed: &[usize]) {
        let count = model.button_count();
        let offset = match model.protocol() {
            Protocol::Mini | Protocol::Original => 1,
            Protocol::Gen2 | Protocol::Pedal | Protocol::Plus => 4,
            Protocol::Virtual => return,
        };
        let mut report = vec![0u8; input_report_len(model)];
        report[0] = 0x01;
        for &position in pressed.iter().filter(|&&p| p < count) {
            report[offset + model.swap_index(position)] = 1;
        }
        self.queue_input(report);
    }

    /// Queue an empty read, which the deck must treat as "no change".
    pub fn queue_empty(&self) {
        self.queue_input(Vec::new());
    }

    // === Assertions ===

    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.state.operation_log.lock().unwrap().clone()
    }

    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.state.operation_log.lock().unwrap().len()
    }

    /// Every output report written, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                Operation::Write(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes().len()
    }

    /// Every feature report sent, in order.
    #[must_use]
    pub fn feature_reports(&self) -> Vec<Vec<u8>> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                Operation::SendFeature(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    /// Number of `read` calls, including empty ones.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    /// Assert a specific operation was performed at least once.
    ///
    /// # Panics
    ///
    /// Panics if the operation was not found.
    pub fn assert_contains(&self, expected: &Operation) {
        let ops = self.operations();
        assert!(
            ops.contains(expected),
            "Expected operation {expected:?} not found in: {ops:#?}",
        );
    }

    /// Clear the operation log for fresh assertions.
    pub fn clear_operations(&self) {
        self.state.operation_log.lock().unwrap().clear();
    }

    // === Internal Helpers ===

    fn record_op(&self, op: Operation) {
        trace!(?op, "Recording operation");
        self.state.operation_log.lock().unwrap().push(op);
    }

    fn check_error(&self) -> Result<()> {
        if let Some(error) = self.state.error_injection.lock().unwrap().take() {
            return Err(error);
        }

        if self.state.disconnected.load(Ordering::SeqCst) {
            return Err(DeckError::DeviceCommunication(
                "Mock device disconnected".to_string(),
            ));
        }

        if let Some(limit) = *self.state.fail_after_ops.lock().unwrap() {
            if self.operation_count() >= limit {
                return Err(DeckError::DeviceCommunication(
                    "Mock failure after ops limit".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Transport for MockTransport {
    fn send_feature_report(&mut self, data: &[u8]) -> Result<()> {
        self.check_error()?;
        self.record_op(Operation::SendFeature(data.to_vec()));
        Ok(())
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_error()?;
        let report_id = buf.first().copied().unwrap_or_default();
        self.record_op(Operation::GetFeature { report_id });

        let responses = self.state.feature_responses.lock().unwrap();
        let Some(response) = responses.get(&report_id) else {
            return Ok(0);
        };
        let len = response.len().min(buf.len());
        buf[..len].copy_from_slice(&response[..len]);
        Ok(len)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.check_error()?;
        self.record_op(Operation::Write(data.to_vec()));
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        self.check_error()?;

        let Some(report) = self.state.input_queue.lock().unwrap().pop_front() else {
            return Ok(0);
        };
        let len = report.len().min(buf.len());
        buf[..len].copy_from_slice(&report[..len]);
        Ok(len)
    }
}

/// Builder for a [`MockTransport`] posing as a given model.
pub struct MockTransportBuilder {
    model: Model,
    serial: String,
    firmware: String,
    fail_after_ops: Option<usize>,
    disconnected: bool,
}

impl MockTransportBuilder {
    #[must_use]
    pub fn new(model: Model) -> Self {
        Self {
            model,
            serial: format!("MOCK-{}-001", model.slug()),
            firmware: "1.0.0-mock".to_string(),
            fail_after_ops: None,
            disconnected: false,
        }
    }

    #[must_use]
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    #[must_use]
    pub fn firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = firmware.into();
        self
    }

    /// Set the transport to fail after N operations.
    #[must_use]
    pub fn fail_after(mut self, ops: usize) -> Self {
        self.fail_after_ops = Some(ops);
        self
    }

    /// Start unplugged; every operation fails until `reconnect`.
    #[must_use]
    pub const fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    #[must_use]
    pub fn build(self) -> MockTransport {
        let mut mock = MockTransport::new().with_identity(self.model, &self.serial, &self.firmware);
        if let Some(ops) = self.fail_after_ops {
            mock = mock.with_fail_after(ops);
        }
        if self.disconnected {
            mock.disconnect();
        }
        mock
    }
}
