//! Folders, the page stack and nested pages.

use deckhand::action::default::BRIGHTNESS_ACTION;
use deckhand::device::Model;
use deckhand::error::DeckError;
use deckhand::icon::Icon;
use deckhand::page::{DEFAULT_FACTORY, PageId, SWITCH_PAGE_ACTION};
use deckhand::persistence::MemoryStore;
use deckhand::Deck;
use deckhand::device::DeckEvent;
use serde_json::Value;

use crate::common::{TEST_SERIAL, open_deck, tap};

fn add_folder(deck: &mut Deck, position: usize) -> PageId {
    deck.set_button_action(position, DEFAULT_FACTORY, SWITCH_PAGE_ACTION)
        .unwrap();
    folder_at(deck, position)
}

fn folder_at(deck: &Deck, position: usize) -> PageId {
    let page = deck.current_page().unwrap();
    deck.pages().get(page).unwrap().subpage(position).unwrap()
}

fn action_id(deck: &Deck, position: usize) -> Option<String> {
    deck.button_action(position).map(|info| info.id.clone())
}

#[test]
fn test_push_then_pop_restores_root() {
    let store = MemoryStore::new();
    let (mut deck, _mock) = open_deck(Model::Mk2, &store);
    let root = deck.current_page().unwrap();
    let folder = add_folder(&mut deck, 2);

    deck.push_page(folder).unwrap();
    assert_eq!(deck.stack(), [root, folder]);
    // the way back up is always slot 0 of a folder
    assert_eq!(action_id(&deck, 0).as_deref(), Some(SWITCH_PAGE_ACTION));
    assert!(action_id(&deck, 2).is_none());

    deck.pop_page().unwrap();
    assert_eq!(deck.stack(), [root]);
    assert_eq!(action_id(&deck, 2).as_deref(), Some(SWITCH_PAGE_ACTION));
}

#[test]
fn test_push_rejects_pages_that_are_not_children_of_the_top() {
    let store = MemoryStore::new();
    let (mut deck, _mock) = open_deck(Model::Mk2, &store);
    let root = deck.current_page().unwrap();
    let first = add_folder(&mut deck, 2);
    let second = add_folder(&mut deck, 3);

    deck.push_page(first).unwrap();
    assert!(matches!(deck.push_page(second), Err(DeckError::Navigation(_))));
    assert!(matches!(deck.push_page(root), Err(DeckError::Navigation(_))));
    assert!(matches!(deck.push_page(first), Err(DeckError::Navigation(_))));
    assert_eq!(deck.stack(), [root, first]);
}

#[test]
fn test_pop_at_root_is_an_error() {
    let store = MemoryStore::new();
    let (mut deck, _mock) = open_deck(Model::Mini, &store);

    assert!(matches!(deck.pop_page(), Err(DeckError::Navigation(_))));
    assert_eq!(deck.stack().len(), 1);
}

#[test]
fn test_folders_of_inactive_profiles_cannot_be_pushed() {
    let store = MemoryStore::new();
    let (mut deck, _mock) = open_deck(Model::Mk2, &store);
    let first = deck.active_profile().id().to_string();
    add_folder(&mut deck, 1);

    let second = deck.add_profile("Streaming");
    deck.load_profile(&second).unwrap();
    let foreign = deck
        .pages()
        .get(deck.current_page().unwrap())
        .and_then(|page| page.subpage(1));
    assert!(foreign.is_none());

    deck.load_profile(&first).unwrap();
    let folder = folder_at(&deck, 1);
    deck.load_profile(&second).unwrap();
    assert!(matches!(deck.push_page(folder), Err(DeckError::Navigation(_))));
}

#[test]
fn test_key_presses_open_and_close_folders() {
    let store = MemoryStore::new();
    let (mut deck, mock) = open_deck(Model::Xl, &store);
    add_folder(&mut deck, 9);

    let events = tap(&mut deck, &mock, 9);
    assert_eq!(
        events,
        vec![
            DeckEvent::ButtonPressed { position: 9 },
            DeckEvent::ButtonReleased { position: 9 },
        ]
    );
    assert_eq!(deck.stack().len(), 2);

    tap(&mut deck, &mock, 0);
    assert_eq!(deck.stack().len(), 1);
    assert_eq!(action_id(&deck, 9).as_deref(), Some(SWITCH_PAGE_ACTION));
}

#[test]
fn test_nested_folders_survive_save_and_reload() {
    let store = MemoryStore::new();
    {
        let (mut deck, mock) = open_deck(Model::Mk2, &store);
        add_folder(&mut deck, 2);
        tap(&mut deck, &mock, 2);
        deck.set_button_action(1, DEFAULT_FACTORY, BRIGHTNESS_ACTION)
            .unwrap();
        let inner = add_folder(&mut deck, 4);
        deck.push_page(inner).unwrap();
        assert_eq!(deck.stack().len(), 3);
        deck.save().unwrap();
    }

    let document: Value = serde_json::from_str(&store.get(TEST_SERIAL).unwrap()).unwrap();
    let root = &document["profiles"][0]["page"];
    assert_eq!(root.as_array().unwrap().len(), 15);
    let folder = &root[2]["settings"]["page"];
    assert_eq!(folder[0]["action"], SWITCH_PAGE_ACTION);
    assert_eq!(folder[1]["action"], BRIGHTNESS_ACTION);
    let inner = &folder[4]["settings"]["page"];
    assert_eq!(inner[0]["action"], SWITCH_PAGE_ACTION);
    assert_eq!(inner.as_array().unwrap().len(), 15);

    let (mut deck, mock) = open_deck(Model::Mk2, &store);
    assert_eq!(deck.stack().len(), 1);
    tap(&mut deck, &mock, 2);
    assert_eq!(action_id(&deck, 1).as_deref(), Some(BRIGHTNESS_ACTION));
    tap(&mut deck, &mock, 4);
    assert_eq!(deck.stack().len(), 3);
}

#[test]
fn test_replacing_a_folder_drops_its_page() {
    let store = MemoryStore::new();
    let (mut deck, _mock) = open_deck(Model::Mk2, &store);
    let folder = add_folder(&mut deck, 5);
    let before = deck.pages().len();

    deck.set_button_action(5, DEFAULT_FACTORY, BRIGHTNESS_ACTION)
        .unwrap();
    assert!(!deck.pages().contains(folder));
    assert_eq!(deck.pages().len(), before - 1);
    assert!(matches!(deck.push_page(folder), Err(DeckError::Navigation(_))));
}

#[test]
fn test_custom_icon_on_empty_key_survives_navigation() {
    let store = MemoryStore::new();
    let (mut deck, _mock) = open_deck(Model::Mk2, &store);
    let icon = Icon::default().with_text("Mute");
    deck.set_custom_icon(6, Some(icon.clone())).unwrap();
    let folder = add_folder(&mut deck, 2);

    deck.push_page(folder).unwrap();
    assert!(deck.custom_icon(6).is_none());
    deck.pop_page().unwrap();

    assert!(deck.button_action(6).is_none());
    assert_eq!(deck.custom_icon(6), Some(&icon));
}
