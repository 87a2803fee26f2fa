//! Integration tests for deckhand.
//!
//! These tests drive decks end to end over the recording mock transport,
//! without real hardware.
//!
//! # Modules
//!
//! - `wire_protocol`: report layouts as seen by the transport
//! - `icon_rendering`: icon composition and encoding per model
//! - `navigation`: folders, the page stack and nested pages
//! - `persistence`: debounced saves and profile documents on disk
//! - `deck_session`: input edges, profile switches and dials

mod common;

#[path = "integration/wire_protocol.rs"]
mod wire_protocol;

#[path = "integration/icon_rendering.rs"]
mod icon_rendering;

#[path = "integration/navigation.rs"]
mod navigation;

#[path = "integration/persistence.rs"]
mod persistence;

#[path = "integration/deck_session.rs"]
mod deck_session;
