//! Debounced saves and profile documents.

use std::time::{Duration, Instant};

use deckhand::Deck;
use deckhand::config::Settings;
use deckhand::device::Model;
use deckhand::device::mock::{MockTransportBuilder, Operation};
use deckhand::device::protocol;
use deckhand::persistence::{FileStore, MemoryStore};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::common::env::{with_data_dir, without_data_dir};
use crate::common::{TEST_SERIAL, init_test_logging, open_deck};

fn open_with_files(model: Model, dir: &TempDir) -> Deck {
    init_test_logging();
    let mock = MockTransportBuilder::new(model).serial(TEST_SERIAL).build();
    Deck::builder(model, Box::new(mock))
        .store(FileStore::new(dir.path()))
        .open()
}

#[test]
fn test_burst_of_changes_is_saved_once() {
    let store = MemoryStore::new();
    let (mut deck, _mock) = open_deck(Model::Mk2, &store);
    let start = Instant::now();

    // ten changes over one second, with the deck polled in between
    for step in 1..=10u32 {
        deck.poll(start + Duration::from_millis(u64::from(step) * 100));
        deck.set_brightness(0.1 + f64::from(step) * 0.01);
    }
    assert!(deck.has_pending_save());

    deck.poll(start + Duration::from_millis(4500));
    assert_eq!(store.write_count(), 0);

    // due five seconds after the first change, not the last
    deck.poll(start + Duration::from_secs(6));
    assert_eq!(store.write_count(), 1);
    assert!(!deck.has_pending_save());

    deck.poll(start + Duration::from_secs(20));
    assert_eq!(store.write_count(), 1);

    let document: Value = serde_json::from_str(&store.get(TEST_SERIAL).unwrap()).unwrap();
    let brightness = document["profiles"][0]["brightness"].as_f64().unwrap();
    assert!((brightness - 0.2).abs() < 1e-9);
}

#[test]
fn test_missing_document_loads_default_profile() {
    let store = MemoryStore::new();
    let (deck, _mock) = open_deck(Model::Mk2, &store);

    let profiles = deck.profiles();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].name, "Default");
    assert!((profiles[0].brightness - 0.5).abs() < f64::EPSILON);
    assert!(profiles[0].active);
    assert!((0..15).all(|position| deck.button_action(position).is_none()));
    assert!(!deck.has_pending_save());
    assert_eq!(store.write_count(), 0);
}

#[test]
fn test_active_profile_and_brightness_restored() {
    let document = json!({
        "active-profile": "b",
        "profiles": [
            {"id": "a", "name": "Work", "brightness": 0.3, "page": []},
            {"id": "b", "name": "Games", "brightness": 0.75, "page": [
                {"type": "action", "factory": "default", "action": "default-brightness-action",
                 "settings": {"mode": 1, "value": 0.1}},
            ]},
        ],
    });
    let store = MemoryStore::with_document(TEST_SERIAL, &document.to_string());
    let (deck, mock) = open_deck(Model::Xl, &store);

    assert_eq!(deck.active_profile().name(), "Games");
    assert!((deck.brightness() - 0.75).abs() < f64::EPSILON);
    mock.assert_contains(&Operation::SendFeature(
        protocol::brightness_report(Model::Xl.protocol(), 0.75).unwrap(),
    ));
    assert_eq!(
        deck.button_action(0).map(|info| info.id.as_str()),
        Some("default-brightness-action")
    );
}

#[test]
fn test_drop_flushes_pending_save() {
    let store = MemoryStore::new();
    let (mut deck, mock) = open_deck(Model::Mk2, &store);
    let id = deck.add_profile("Later");
    deck.rename_profile(&id, "Sooner").unwrap();
    drop(deck);

    assert_eq!(store.write_count(), 1);
    let document: Value = serde_json::from_str(&store.get(TEST_SERIAL).unwrap()).unwrap();
    assert_eq!(document["profiles"][1]["name"], "Sooner");
    // closing shows the logo again
    assert_eq!(
        mock.feature_reports().last().unwrap(),
        &protocol::reset_report(Model::Mk2.protocol()).unwrap()
    );
}

#[test]
fn test_profiles_round_trip_through_files() {
    let dir = TempDir::new().unwrap();
    let second = {
        let mut deck = open_with_files(Model::Plus, &dir);
        let second = deck.add_profile("Streaming");
        deck.load_profile(&second).unwrap();
        deck.set_brightness(0.9);
        deck.save().unwrap();
        second
    };

    let path = dir.path().join(format!("{TEST_SERIAL}.json"));
    assert!(path.is_file());
    assert!(!dir.path().join(format!("{TEST_SERIAL}.json.tmp")).exists());

    let deck = open_with_files(Model::Plus, &dir);
    assert_eq!(deck.profiles().len(), 2);
    assert_eq!(deck.active_profile().id(), second);
    assert!((deck.brightness() - 0.9).abs() < f64::EPSILON);
}

#[test]
fn test_corrupt_file_falls_back_and_is_replaced() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(format!("{TEST_SERIAL}.json"));
    std::fs::write(&path, "{ not json").unwrap();

    let mut deck = open_with_files(Model::Mk2, &dir);
    assert_eq!(deck.profiles().len(), 1);
    assert_eq!(deck.profiles()[0].name, "Default");

    deck.save().unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(serde_json::from_str::<Value>(&contents).is_ok());
}

#[test]
fn test_data_dir_env_wins_over_settings() {
    let dir = TempDir::new().unwrap();
    let _env = with_data_dir(dir.path().to_str().unwrap());
    let settings = Settings {
        data_dir: Some("/srv/decks".into()),
        ..Settings::default()
    };
    assert_eq!(settings.data_dir(), dir.path());
}

#[test]
fn test_data_dir_from_settings() {
    let _env = without_data_dir();
    let settings = Settings {
        data_dir: Some("/srv/decks".into()),
        ..Settings::default()
    };
    assert_eq!(settings.data_dir(), std::path::Path::new("/srv/decks"));
    assert!(Settings::default().data_dir().ends_with("deckhand"));
}
