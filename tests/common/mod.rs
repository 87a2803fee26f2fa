//! Common test utilities for deckhand.
//!
//! - `env`: serialized environment variable overrides
//! - helpers to open a deck over the recording transport and press keys
#![allow(dead_code)]

pub mod env;

use std::time::Instant;

use assert_cmd::Command;
use deckhand::Deck;
use deckhand::device::DeckEvent;
use deckhand::device::Model;
use deckhand::device::mock::{MockTransport, MockTransportBuilder};
use deckhand::persistence::MemoryStore;
use tracing_subscriber::EnvFilter;

pub const TEST_SERIAL: &str = "AL12K1A00042";

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Open `model` over a mock answering with [`TEST_SERIAL`].
pub fn open_deck(model: Model, store: &MemoryStore) -> (Deck, MockTransport) {
    init_test_logging();
    let mock = MockTransportBuilder::new(model).serial(TEST_SERIAL).build();
    let deck = Deck::builder(model, Box::new(mock.clone()))
        .store(store.clone())
        .open();
    (deck, mock)
}

/// Press and release one key, returning the events of both ticks.
pub fn tap(deck: &mut Deck, mock: &MockTransport, position: usize) -> Vec<DeckEvent> {
    let model = deck.model();
    let now = Instant::now();
    mock.queue_buttons(model, &[position]);
    let mut events = deck.poll(now);
    mock.queue_buttons(model, &[]);
    events.extend(deck.poll(now));
    events
}

/// The `deckhand` binary with profile data and config lookups kept in
/// `scratch`.
pub fn deckhand(scratch: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("deckhand").expect("binary is built");
    cmd.env("DECKHAND_DATA_DIR", scratch)
        .env("XDG_CONFIG_HOME", scratch)
        .env("NO_COLOR", "1")
        .env_remove("DECKHAND_SERIAL")
        .env_remove("DECKHAND_FORMAT")
        .env_remove("DECKHAND_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}
