//! Input edges, actions and profile switches on open decks.

use std::time::Instant;

use deckhand::Deck;
use deckhand::device::mock::{MockTransportBuilder, Operation};
use deckhand::device::protocol::{self, TouchEvent, TouchGesture};
use deckhand::device::{DeckEvent, Model};
use deckhand::error::DeckError;
use deckhand::manager::deliver_switches;
use deckhand::persistence::MemoryStore;
use serde_json::{Value, json};

use crate::common::{TEST_SERIAL, init_test_logging, open_deck, tap};

fn switch_item(serial: Option<&str>, profile: &str) -> Value {
    let mut settings = json!({ "profile-id": profile });
    if let Some(serial) = serial {
        settings["serial-number"] = json!(serial);
    }
    json!({
        "type": "action",
        "factory": "default",
        "action": "default-switch-profile-action",
        "settings": settings,
    })
}

#[test]
fn test_only_state_changes_raise_events() {
    let store = MemoryStore::new();
    let (mut deck, mock) = open_deck(Model::Mk2, &store);
    let now = Instant::now();

    let mut ticks = Vec::new();
    for pressed in [false, false, true, true, false] {
        let keys: &[usize] = if pressed { &[2] } else { &[] };
        mock.queue_buttons(Model::Mk2, keys);
        mock.queue_empty();
        ticks.push(deck.poll(now));
        ticks.push(deck.poll(now));
    }

    let events: Vec<(usize, DeckEvent)> = ticks
        .into_iter()
        .enumerate()
        .flat_map(|(tick, events)| events.into_iter().map(move |e| (tick, e)))
        .collect();
    assert_eq!(
        events,
        vec![
            (4, DeckEvent::ButtonPressed { position: 2 }),
            (8, DeckEvent::ButtonReleased { position: 2 }),
        ]
    );
}

#[test]
fn test_chords_raise_one_event_per_key() {
    let store = MemoryStore::new();
    let (mut deck, mock) = open_deck(Model::Original, &store);
    let now = Instant::now();

    mock.queue_buttons(Model::Original, &[0, 14]);
    let events = deck.poll(now);
    assert_eq!(
        events,
        vec![
            DeckEvent::ButtonPressed { position: 0 },
            DeckEvent::ButtonPressed { position: 14 },
        ]
    );
}

#[test]
fn test_brightness_key_raises_brightness() {
    let document = json!({
        "profiles": [{"id": "p", "name": "Main", "brightness": 0.5, "page": [
            {"type": "action", "factory": "default", "action": "default-brightness-action",
             "settings": {"mode": 1, "value": 0.25}},
        ]}],
    });
    let store = MemoryStore::with_document(TEST_SERIAL, &document.to_string());
    let (mut deck, mock) = open_deck(Model::Mk2, &store);
    mock.clear_operations();

    tap(&mut deck, &mock, 0);

    assert!((deck.brightness() - 0.75).abs() < 1e-9);
    mock.assert_contains(&Operation::SendFeature(
        protocol::brightness_report(Model::Mk2.protocol(), 0.75).unwrap(),
    ));
    assert!(deck.has_pending_save());
}

#[test]
fn test_profile_key_in_a_folder_switches_profile() {
    let document = json!({
        "active-profile": "work",
        "profiles": [
            {"id": "work", "name": "Work", "brightness": 0.4, "page": [
                {"type": "action", "factory": "default", "action": "default-switch-page-action",
                 "settings": {"page": [switch_item(None, "games")]}},
            ]},
            {"id": "games", "name": "Games", "brightness": 1.0, "page": []},
        ],
    });
    let store = MemoryStore::with_document(TEST_SERIAL, &document.to_string());
    let (mut deck, mock) = open_deck(Model::Mk2, &store);

    tap(&mut deck, &mock, 0);
    assert_eq!(deck.stack().len(), 2);
    assert_eq!(deck.button_icon(1).and_then(|i| i.text.as_deref()), Some("Games"));

    tap(&mut deck, &mock, 1);

    assert_eq!(deck.active_profile().id(), "games");
    assert_eq!(deck.stack(), [deck.active_profile().root()]);
    assert!((deck.brightness() - 1.0).abs() < f64::EPSILON);
    assert!(deck.has_pending_save());
    assert!(deck.take_forwarded().is_empty());
}

#[test]
fn test_profile_key_for_unknown_profile_does_nothing() {
    let document = json!({
        "profiles": [{"id": "only", "name": "Only", "page": [switch_item(None, "gone")]}],
    });
    let store = MemoryStore::with_document(TEST_SERIAL, &document.to_string());
    let (mut deck, mock) = open_deck(Model::Mk2, &store);

    tap(&mut deck, &mock, 0);
    assert_eq!(deck.active_profile().id(), "only");
    assert!(!deck.has_pending_save());
}

#[test]
fn test_switch_for_another_deck_is_forwarded() {
    init_test_logging();
    let first = json!({
        "profiles": [{"id": "a", "name": "A", "page": [switch_item(Some("OTHER-DECK"), "y")]}],
    });
    let second = json!({
        "active-profile": "x",
        "profiles": [
            {"id": "x", "name": "X", "page": []},
            {"id": "y", "name": "Y", "brightness": 0.2, "page": []},
        ],
    });
    let store = MemoryStore::with_document(TEST_SERIAL, &first.to_string());
    store.insert("OTHER-DECK", &second.to_string());

    let (deck, mock) = open_deck(Model::Mk2, &store);
    let other_mock = MockTransportBuilder::new(Model::Xl).serial("OTHER-DECK").build();
    let other = Deck::builder(Model::Xl, Box::new(other_mock))
        .store(store.clone())
        .open();
    let mut decks = vec![deck, other];

    // a switch aimed elsewhere leaves no label on this deck
    assert_eq!(decks[0].button_icon(0).and_then(|i| i.text.clone()), None);

    tap(&mut decks[0], &mock, 0);
    let forwarded = decks[0].take_forwarded();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].serial, "OTHER-DECK");
    assert_eq!(decks[0].active_profile().id(), "a");

    deliver_switches(&mut decks, forwarded);
    assert_eq!(decks[1].active_profile().id(), "y");
    assert!((decks[1].brightness() - 0.2).abs() < f64::EPSILON);
}

#[test]
fn test_plus_dials_and_touchscreen() {
    let store = MemoryStore::new();
    let (mut deck, mock) = open_deck(Model::Plus, &store);
    let now = Instant::now();

    let mut rotate = vec![0u8; 14];
    rotate[1] = 0x03;
    rotate[4] = 0x01;
    rotate[5] = 3;
    rotate[8] = 0xfe;
    mock.queue_input(rotate);
    assert_eq!(
        deck.poll(now),
        vec![
            DeckEvent::DialRotated { dial: 0, delta: 3 },
            DeckEvent::DialRotated { dial: 3, delta: -2 },
        ]
    );

    let mut press = vec![0u8; 14];
    press[1] = 0x03;
    press[6] = 1;
    mock.queue_input(press.clone());
    mock.queue_input(press);
    assert_eq!(deck.poll(now), vec![DeckEvent::DialPressed { dial: 1 }]);
    assert!(deck.poll(now).is_empty());

    let mut release = vec![0u8; 14];
    release[1] = 0x03;
    mock.queue_input(release);
    assert_eq!(deck.poll(now), vec![DeckEvent::DialReleased { dial: 1 }]);

    let mut touch = vec![0u8; 14];
    touch[1] = 0x02;
    touch[4] = 0x03;
    touch[6..8].copy_from_slice(&100u16.to_le_bytes());
    touch[8..10].copy_from_slice(&50u16.to_le_bytes());
    touch[10..12].copy_from_slice(&700u16.to_le_bytes());
    touch[12..14].copy_from_slice(&40u16.to_le_bytes());
    mock.queue_input(touch);
    assert_eq!(
        deck.poll(now),
        vec![DeckEvent::Touch(TouchEvent {
            x: 100,
            y: 50,
            gesture: TouchGesture::Swipe { to_x: 700, to_y: 40 },
        })]
    );
}

#[test]
fn test_read_errors_do_not_stop_polling() {
    let store = MemoryStore::new();
    let (mut deck, mock) = open_deck(Model::Neo, &store);
    let now = Instant::now();

    mock.inject_error(DeckError::DeviceCommunication("unplugged".to_string()));
    assert!(deck.poll(now).is_empty());

    mock.queue_buttons(Model::Neo, &[7]);
    assert_eq!(deck.poll(now), vec![DeckEvent::ButtonPressed { position: 7 }]);
}

#[test]
fn test_unplugged_deck_resumes_after_reconnect() {
    let store = MemoryStore::new();
    let (mut deck, mock) = open_deck(Model::Xl, &store);
    let now = Instant::now();

    mock.queue_buttons(Model::Xl, &[12]);
    mock.disconnect();
    assert!(deck.poll(now).is_empty());
    assert!(deck.poll(now).is_empty());

    mock.reconnect();
    assert_eq!(deck.poll(now), vec![DeckEvent::ButtonPressed { position: 12 }]);
}
