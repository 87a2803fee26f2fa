//! Action capability contract.
//!
//! An [`Action`] is the runtime behavior bound to one control. Actions are
//! created by an [`ActionFactory`] looked up by id in the
//! [`ActionRegistry`], and never talk to the deck directly: every callback
//! receives an [`ActionContext`] that exposes read-only deck state and a
//! queue of [`DeckRequest`]s, applied by the deck once the callback returns.

pub mod default;

use serde::Serialize;
use serde_json::Value;

use crate::error::{DeckError, Result};
use crate::icon::Icon;
use crate::page::{PageId, PageTree};
use crate::profile::Profile;

pub use default::DefaultActionFactory;

/// Static description of an action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionInfo {
    pub id: String,
    pub factory: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActionInfo {
    pub fn new(factory: &str, id: &str, name: &str, icon_name: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            factory: factory.to_string(),
            name: name.to_string(),
            icon_name: icon_name.map(str::to_string),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Something an action asks the deck to do.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckRequest {
    PushPage(PageId),
    PopPage,
    SetBrightness(f64),
    /// Switch profile. `serial` names the target deck, `None` means this one;
    /// an unknown `profile` resolves to the active profile.
    LoadProfile {
        serial: Option<String>,
        profile: Option<String>,
    },
    /// The action's icon changed and the button must be redrawn.
    IconChanged,
}

/// Deck state visible to an action callback.
pub struct ActionContext<'a> {
    position: usize,
    page: PageId,
    serial: &'a str,
    brightness: f64,
    active_profile: &'a str,
    profiles: &'a [Profile],
    pages: &'a mut PageTree,
    requests: Vec<DeckRequest>,
}

impl<'a> ActionContext<'a> {
    pub fn new(
        position: usize,
        page: PageId,
        serial: &'a str,
        brightness: f64,
        active_profile: &'a str,
        profiles: &'a [Profile],
        pages: &'a mut PageTree,
    ) -> Self {
        Self {
            position,
            page,
            serial,
            brightness,
            active_profile,
            profiles,
            pages,
            requests: Vec::new(),
        }
    }

    /// Slot the action is bound to.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Page the action was realized from.
    pub const fn page(&self) -> PageId {
        self.page
    }

    pub fn page_has_parent(&self) -> bool {
        self.pages.get(self.page).is_some_and(|page| !page.is_root())
    }

    /// Live folder registered at this slot, if any.
    pub fn subpage(&self) -> Option<PageId> {
        self.pages.get(self.page)?.subpage(self.position)
    }

    pub const fn serial(&self) -> &str {
        self.serial
    }

    pub const fn brightness(&self) -> f64 {
        self.brightness
    }

    pub const fn active_profile(&self) -> &str {
        self.active_profile
    }

    pub const fn profiles(&self) -> &[Profile] {
        self.profiles
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id() == id)
    }

    /// Create a folder below the current page and register it at this slot,
    /// replacing any folder registered there.
    pub fn create_subpage(&mut self, json: Option<&Value>) -> PageId {
        let profile = self
            .pages
            .get(self.page)
            .map_or_else(|| self.active_profile.to_string(), |p| p.profile().to_string());
        let id = match json {
            Some(json) => self.pages.create_from_json(&profile, Some(self.page), json),
            None => self.pages.create_empty(&profile, Some(self.page)),
        };
        self.pages.register_subpage(self.page, self.position, id);
        id
    }

    pub fn push_page(&mut self, page: PageId) {
        self.requests.push(DeckRequest::PushPage(page));
    }

    pub fn pop_page(&mut self) {
        self.requests.push(DeckRequest::PopPage);
    }

    pub fn set_brightness(&mut self, brightness: f64) {
        self.requests.push(DeckRequest::SetBrightness(brightness));
    }

    pub fn load_profile(&mut self, serial: Option<String>, profile: Option<String>) {
        self.requests.push(DeckRequest::LoadProfile { serial, profile });
    }

    pub fn icon_changed(&mut self) {
        self.requests.push(DeckRequest::IconChanged);
    }

    /// Drain queued requests, in the order they were made.
    pub fn take_requests(&mut self) -> Vec<DeckRequest> {
        std::mem::take(&mut self.requests)
    }
}

/// Runtime behavior bound to one control.
///
/// Every method but [`info`](Action::info) and [`icon`](Action::icon) has a
/// do-nothing default.
pub trait Action {
    fn info(&self) -> &ActionInfo;

    fn icon(&self) -> &Icon;

    /// True only for the placeholder bound to empty slots.
    fn is_placeholder(&self) -> bool {
        false
    }

    /// Control pressed.
    fn activate(&mut self, _ctx: &mut ActionContext<'_>) {}

    /// Control released.
    fn deactivate(&mut self, _ctx: &mut ActionContext<'_>) {}

    /// Opaque description of the editable settings.
    fn preferences(&self) -> Option<Value> {
        None
    }

    fn serialize_settings(&self) -> Option<Value> {
        None
    }

    /// Restore persisted settings. Called once, right after creation.
    fn deserialize_settings(&mut self, _ctx: &mut ActionContext<'_>, _settings: &Value) {}
}

/// Creates actions of one family.
pub trait ActionFactory: Send + Sync {
    fn id(&self) -> &str;

    fn actions(&self) -> Vec<ActionInfo>;

    /// Create the action `action`, or `None` when this factory has no such
    /// action.
    fn create(&self, action: &str, ctx: &mut ActionContext<'_>) -> Option<Box<dyn Action>>;
}

/// Placeholder bound to empty slots.
#[derive(Debug)]
pub struct EmptyAction {
    info: ActionInfo,
    icon: Icon,
}

impl EmptyAction {
    pub fn new() -> Self {
        Self {
            info: ActionInfo::new("", "", "Empty", None),
            icon: Icon::default(),
        }
    }
}

impl Default for EmptyAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for EmptyAction {
    fn info(&self) -> &ActionInfo {
        &self.info
    }

    fn icon(&self) -> &Icon {
        &self.icon
    }

    fn is_placeholder(&self) -> bool {
        true
    }
}

/// Every action factory known to the process.
#[derive(Default)]
pub struct ActionRegistry {
    factories: Vec<Box<dyn ActionFactory>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `default` factory.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DefaultActionFactory::new());
        registry
    }

    /// Add a factory. A factory with the same id replaces the old one.
    pub fn register(&mut self, factory: impl ActionFactory + 'static) {
        self.factories.retain(|f| f.id() != factory.id());
        self.factories.push(Box::new(factory));
    }

    pub fn factory(&self, id: &str) -> Option<&dyn ActionFactory> {
        self.factories
            .iter()
            .find(|f| f.id() == id)
            .map(AsRef::as_ref)
    }

    /// Every action of every factory.
    pub fn actions(&self) -> Vec<ActionInfo> {
        self.factories.iter().flat_map(|f| f.actions()).collect()
    }

    /// Create an action by factory and action id.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::UnknownFactory`] or [`DeckError::UnknownAction`]
    /// when either id does not resolve.
    pub fn create(
        &self,
        factory: &str,
        action: &str,
        ctx: &mut ActionContext<'_>,
    ) -> Result<Box<dyn Action>> {
        let found = self.factory(factory).ok_or_else(|| DeckError::UnknownFactory {
            factory: factory.to_string(),
        })?;
        found
            .create(action, ctx)
            .ok_or_else(|| DeckError::UnknownAction {
                factory: factory.to_string(),
                action: action.to_string(),
            })
    }
}
