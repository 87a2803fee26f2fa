//! deckhand library - host-side driver for Elgato Stream Deck devices.
//!
//! This library exposes everything the `deckhand` CLI is built from, for use
//! in tests and other applications.
//!
//! # Modules
//!
//! - `device`: model table, wire protocol and HID transports
//! - `icon`: icon description, composition and encoding
//! - `page` / `profile`: the persisted page tree and named profiles
//! - `action`: the action contract and built-in actions
//! - `deck`: one open deck with polling, navigation and saving
//! - `persistence`: profile documents and debounced saves
//! - `manager`: discovery of hardware and virtual decks
//! - `config`: settings file handling
//! - `error`: error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod action;
pub mod cli;
pub mod config;
pub mod deck;
pub mod device;
pub mod error;
pub mod icon;
pub mod logging;
pub mod manager;
pub mod page;
pub mod persistence;
pub mod profile;

pub use deck::Deck;
pub use error::{DeckError, Result};
