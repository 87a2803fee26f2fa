//! Pages, page items and the page arena.
//!
//! Pages form a tree per profile: the root page is owned by its
//! [`Profile`](crate::profile::Profile), every other page is a folder opened
//! from a slot of its parent. All pages live in one [`PageTree`] arena keyed
//! by [`PageId`]; parents are ids, never references.
//!
//! The arena only holds *live* subpages, the ones a realized folder action
//! created. A page's persisted form always carries its folders inline under
//! the owning item's `settings.page`; [`PageTree::update_all_items`] writes
//! the live state back into that form.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::{Map, Value, json};
use tracing::{trace, warn};

use crate::icon::Icon;

/// Factory of the built-in actions.
pub const DEFAULT_FACTORY: &str = "default";
/// Folder action: opens a subpage, or goes up from slot 0 of a subpage.
pub const SWITCH_PAGE_ACTION: &str = "default-switch-page-action";

/// Handle to a page in a [`PageTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// What a slot holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Empty,
    Action {
        factory: String,
        action: String,
        /// Opaque to the page; owned by the action
        settings: Option<Value>,
    },
}

/// Persisted content of one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PageItem {
    pub kind: ItemKind,
    /// Kept for empty slots too
    pub custom_icon: Option<Icon>,
}

impl Default for PageItem {
    fn default() -> Self {
        Self::empty()
    }
}

impl PageItem {
    pub const fn empty() -> Self {
        Self {
            kind: ItemKind::Empty,
            custom_icon: None,
        }
    }

    pub fn action(factory: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Action {
                factory: factory.into(),
                action: action.into(),
                settings: None,
            },
            custom_icon: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, value: Value) -> Self {
        if let ItemKind::Action { settings, .. } = &mut self.kind {
            *settings = Some(value);
        }
        self
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self.kind, ItemKind::Empty)
    }

    /// True for the built-in folder action.
    pub fn is_switch_page(&self) -> bool {
        matches!(
            &self.kind,
            ItemKind::Action { factory, action, .. }
                if factory == DEFAULT_FACTORY && action == SWITCH_PAGE_ACTION
        )
    }

    pub fn settings(&self) -> Option<&Value> {
        match &self.kind {
            ItemKind::Action { settings, .. } => settings.as_ref(),
            ItemKind::Empty => None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();

        if let ItemKind::Action {
            factory,
            action,
            settings,
        } = &self.kind
        {
            object.insert("type".into(), json!("action"));
            object.insert("factory".into(), json!(factory));
            object.insert("action".into(), json!(action));
            if let Some(settings) = settings {
                object.insert("settings".into(), settings.clone());
            }
        }
        if let Some(icon) = &self.custom_icon {
            object.insert("custom-icon".into(), icon.to_json());
        }

        Value::Object(object)
    }

    /// Parse one persisted slot. Malformed input yields an empty item.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            warn!("Page item is not a JSON object");
            return Self::empty();
        };

        let custom_icon = object.get("custom-icon").and_then(|v| match Icon::from_json(v) {
            Ok(icon) => Some(icon),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid custom icon");
                None
            }
        });

        let str_member = |key: &str| object.get(key).and_then(Value::as_str);
        let kind = match (str_member("type"), str_member("factory"), str_member("action")) {
            (Some("action"), Some(factory), Some(action)) => ItemKind::Action {
                factory: factory.to_string(),
                action: action.to_string(),
                settings: object.get("settings").filter(|s| s.is_object()).cloned(),
            },
            (Some("action"), ..) => {
                warn!("Action item without factory or action id, treating as empty");
                ItemKind::Empty
            }
            _ => ItemKind::Empty,
        };

        Self { kind, custom_icon }
    }
}

/// One page of slots.
#[derive(Debug, Clone)]
pub struct Page {
    profile: String,
    parent: Option<PageId>,
    items: Vec<PageItem>,
    /// Live folders opened from this page, by slot
    subpages: BTreeMap<usize, PageId>,
}

impl Page {
    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub const fn parent(&self) -> Option<PageId> {
        self.parent
    }

    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn items(&self) -> &[PageItem] {
        &self.items
    }

    pub fn item(&self, position: usize) -> Option<&PageItem> {
        self.items.get(position)
    }

    pub fn subpage(&self, position: usize) -> Option<PageId> {
        self.subpages.get(&position).copied()
    }
}

/// Arena of every live page of one deck.
#[derive(Debug)]
pub struct PageTree {
    pages: HashMap<PageId, Page>,
    slot_count: usize,
    next_id: u64,
}

impl PageTree {
    pub fn new(slot_count: usize) -> Self {
        Self {
            pages: HashMap::new(),
            slot_count,
            next_id: 0,
        }
    }

    pub const fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages.contains_key(&id)
    }

    /// Page with every slot empty, except the "up" item on subpages.
    pub fn create_empty(&mut self, profile: &str, parent: Option<PageId>) -> PageId {
        self.insert(profile, parent, Vec::new())
    }

    /// Page from its persisted JSON array. A non-array yields an empty page.
    pub fn create_from_json(&mut self, profile: &str, parent: Option<PageId>, value: &Value) -> PageId {
        let items = match value.as_array() {
            Some(array) => array.iter().map(PageItem::from_json).collect(),
            None => {
                warn!("Page JSON is not an array");
                Vec::new()
            }
        };
        self.insert(profile, parent, items)
    }

    fn insert(&mut self, profile: &str, parent: Option<PageId>, mut items: Vec<PageItem>) -> PageId {
        if parent.is_some() && !items.first().is_some_and(PageItem::is_switch_page) {
            items.insert(0, PageItem::action(DEFAULT_FACTORY, SWITCH_PAGE_ACTION));
        }
        items.resize_with(self.slot_count, PageItem::empty);

        let id = PageId(self.next_id);
        self.next_id += 1;
        self.pages.insert(
            id,
            Page {
                profile: profile.to_string(),
                parent,
                items,
                subpages: BTreeMap::new(),
            },
        );
        trace!(%id, ?parent, "Created page");
        id
    }

    /// Persisted form: the item array.
    pub fn to_json(&self, id: PageId) -> Option<Value> {
        let page = self.pages.get(&id)?;
        Some(Value::Array(page.items.iter().map(PageItem::to_json).collect()))
    }

    /// Replace the item at `position`. Out of range positions are ignored.
    pub fn set_item(&mut self, id: PageId, position: usize, item: PageItem) {
        if let Some(slot) = self
            .pages
            .get_mut(&id)
            .and_then(|page| page.items.get_mut(position))
        {
            *slot = item;
        }
    }

    /// Register `child` as the live folder at `position` of `parent`,
    /// dropping whatever folder was registered there before.
    pub fn register_subpage(&mut self, parent: PageId, position: usize, child: PageId) {
        let previous = self
            .pages
            .get_mut(&parent)
            .and_then(|page| page.subpages.insert(position, child));
        if let Some(previous) = previous.filter(|&p| p != child) {
            self.remove_subtree(previous);
        }
    }

    /// Drop the live folder at `position`, if any.
    pub fn unregister_subpage(&mut self, parent: PageId, position: usize) {
        let previous = self
            .pages
            .get_mut(&parent)
            .and_then(|page| page.subpages.remove(&position));
        if let Some(previous) = previous {
            self.remove_subtree(previous);
        }
    }

    /// Drop every live folder below `id`, keeping `id` itself.
    pub fn clear_subpages(&mut self, id: PageId) {
        let children = self
            .pages
            .get_mut(&id)
            .map(|page| std::mem::take(&mut page.subpages))
            .unwrap_or_default();
        for child in children.into_values() {
            self.remove_subtree(child);
        }
    }

    /// Remove `id` and every live page below it.
    pub fn remove_subtree(&mut self, id: PageId) {
        if let Some(page) = self.pages.remove(&id) {
            for child in page.subpages.into_values() {
                self.remove_subtree(child);
            }
        }
    }

    /// Write live folder state back into the owning items' `settings.page`,
    /// deepest folders first.
    pub fn update_all_items(&mut self, id: PageId) {
        let children: Vec<(usize, PageId)> = match self.pages.get(&id) {
            Some(page) => page.subpages.iter().map(|(&slot, &child)| (slot, child)).collect(),
            None => return,
        };

        for (slot, child) in children {
            self.update_all_items(child);
            let Some(child_json) = self.to_json(child) else {
                continue;
            };
            let Some(item) = self.pages.get_mut(&id).and_then(|p| p.items.get_mut(slot)) else {
                continue;
            };
            if let ItemKind::Action { settings, .. } = &mut item.kind {
                let object = settings.get_or_insert_with(|| json!({}));
                if let Some(map) = object.as_object_mut() {
                    map.insert("page".into(), child_json);
                } else {
                    *object = json!({ "page": child_json });
                }
            }
        }
    }

    /// Remove every page belonging to `profile`.
    pub fn remove_profile(&mut self, profile: &str) {
        self.pages.retain(|_, page| page.profile != profile);
    }
}
