//! Named profiles, each with its own root page and brightness.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::page::{PageId, PageTree};

/// Brightness given to new profiles.
pub const DEFAULT_BRIGHTNESS: f64 = 0.5;

/// Name of the profile created when nothing could be loaded.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// One profile of a deck.
#[derive(Debug, Clone)]
pub struct Profile {
    id: String,
    pub name: String,
    brightness: f64,
    root: PageId,
}

/// Listing form of a profile, for the CLI and for actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    pub brightness: f64,
    pub active: bool,
}

impl Profile {
    /// New profile with a fresh id and an all-empty root page.
    pub fn new(pages: &mut PageTree, name: impl Into<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let root = pages.create_empty(&id, None);
        Self {
            id,
            name: name.into(),
            brightness: DEFAULT_BRIGHTNESS,
            root,
        }
    }

    /// Parse the persisted form, allocating its root page in `pages`.
    ///
    /// Missing members fall back to defaults; returns `None` only when
    /// `value` is not an object.
    pub fn from_json(pages: &mut PageTree, value: &Value) -> Option<Self> {
        let Some(object) = value.as_object() else {
            warn!("Profile is not a JSON object");
            return None;
        };

        let id = object
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROFILE_NAME)
            .to_string();
        let brightness = object
            .get("brightness")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_BRIGHTNESS)
            .clamp(0.0, 1.0);

        let root = match object.get("page") {
            Some(page) => pages.create_from_json(&id, None, page),
            None => pages.create_empty(&id, None),
        };

        Some(Self {
            id,
            name,
            brightness,
            root,
        })
    }

    pub fn to_json(&self, pages: &PageTree) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "brightness": self.brightness,
            "page": pages.to_json(self.root).unwrap_or_else(|| json!([])),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: f64) {
        self.brightness = brightness.clamp(0.0, 1.0);
    }

    pub const fn root(&self) -> PageId {
        self.root
    }

    pub fn summary(&self, active: bool) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            brightness: self.brightness,
            active,
        }
    }
}
