//! Built-in actions: folders, profile switching, brightness.

use serde_json::{Value, json};
use tracing::debug;

use super::{Action, ActionContext, ActionFactory, ActionInfo};
use crate::icon::Icon;
use crate::page::{DEFAULT_FACTORY, SWITCH_PAGE_ACTION};

pub const SWITCH_PROFILE_ACTION: &str = "default-switch-profile-action";
pub const BRIGHTNESS_ACTION: &str = "default-brightness-action";

/// Factory for the `default` family.
pub struct DefaultActionFactory {
    entries: Vec<ActionInfo>,
}

impl DefaultActionFactory {
    pub fn new() -> Self {
        Self {
            entries: vec![
                ActionInfo::new(DEFAULT_FACTORY, SWITCH_PAGE_ACTION, "Folder", Some("folder-symbolic"))
                    .with_description("Open a page of its own"),
                ActionInfo::new(
                    DEFAULT_FACTORY,
                    SWITCH_PROFILE_ACTION,
                    "Switch Profile",
                    Some("view-list-bullet-symbolic"),
                ),
                ActionInfo::new(
                    DEFAULT_FACTORY,
                    BRIGHTNESS_ACTION,
                    "Brightness",
                    Some("display-brightness-symbolic"),
                ),
            ],
        }
    }

    fn entry(&self, id: &str) -> Option<ActionInfo> {
        self.entries.iter().find(|e| e.id == id).cloned()
    }
}

impl Default for DefaultActionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionFactory for DefaultActionFactory {
    fn id(&self) -> &str {
        DEFAULT_FACTORY
    }

    fn actions(&self) -> Vec<ActionInfo> {
        self.entries.clone()
    }

    fn create(&self, action: &str, ctx: &mut ActionContext<'_>) -> Option<Box<dyn Action>> {
        let info = self.entry(action)?;
        let created: Box<dyn Action> = match action {
            SWITCH_PAGE_ACTION => Box::new(SwitchPageAction::new(info, ctx)),
            SWITCH_PROFILE_ACTION => Box::new(SwitchProfileAction::new(info, ctx)),
            BRIGHTNESS_ACTION => Box::new(BrightnessAction::new(info)),
            _ => return None,
        };
        Some(created)
    }
}

/// Folder. Opens its subpage, or pops when it is the "up" item at slot 0 of
/// a subpage.
pub struct SwitchPageAction {
    info: ActionInfo,
    icon: Icon,
    enters_folder: bool,
}

impl SwitchPageAction {
    fn new(info: ActionInfo, ctx: &mut ActionContext<'_>) -> Self {
        let enters_folder = ctx.position() != 0 || !ctx.page_has_parent();
        let icon = if enters_folder {
            ctx.create_subpage(None);
            Icon::named("folder-symbolic")
        } else {
            Icon::named("go-up-symbolic")
        };
        Self {
            info,
            icon,
            enters_folder,
        }
    }

    pub const fn enters_folder(&self) -> bool {
        self.enters_folder
    }
}

impl Action for SwitchPageAction {
    fn info(&self) -> &ActionInfo {
        &self.info
    }

    fn icon(&self) -> &Icon {
        &self.icon
    }

    fn activate(&mut self, ctx: &mut ActionContext<'_>) {
        if !self.enters_folder {
            ctx.pop_page();
            return;
        }
        match ctx.subpage() {
            Some(page) => ctx.push_page(page),
            None => debug!(position = ctx.position(), "Folder has no page"),
        }
    }

    // "page" is filled in from the live folder by the page tree
    fn serialize_settings(&self) -> Option<Value> {
        Some(json!({}))
    }

    fn deserialize_settings(&mut self, ctx: &mut ActionContext<'_>, settings: &Value) {
        if !self.enters_folder {
            return;
        }
        if let Some(page) = settings.get("page") {
            ctx.create_subpage(Some(page));
        }
    }
}

/// Switches to a profile, shown by name.
pub struct SwitchProfileAction {
    info: ActionInfo,
    icon: Icon,
    serial: Option<String>,
    profile: Option<String>,
}

impl SwitchProfileAction {
    fn new(info: ActionInfo, ctx: &ActionContext<'_>) -> Self {
        let mut action = Self {
            icon: Icon::named(info.icon_name.clone().unwrap_or_default()),
            info,
            serial: None,
            profile: None,
        };
        action.update_label(ctx);
        action
    }

    fn targets_this_deck(&self, ctx: &ActionContext<'_>) -> bool {
        self.serial.as_deref().is_none_or(|s| s == ctx.serial())
    }

    fn update_label(&mut self, ctx: &ActionContext<'_>) {
        if !self.targets_this_deck(ctx) {
            self.icon.text = None;
            return;
        }
        let target = self
            .profile
            .as_deref()
            .and_then(|id| ctx.profile(id))
            .or_else(|| ctx.profile(ctx.active_profile()));
        self.icon.text = target.map(|p| p.name().to_string());
    }
}

impl Action for SwitchProfileAction {
    fn info(&self) -> &ActionInfo {
        &self.info
    }

    fn icon(&self) -> &Icon {
        &self.icon
    }

    fn activate(&mut self, ctx: &mut ActionContext<'_>) {
        ctx.load_profile(self.serial.clone(), self.profile.clone());
    }

    fn preferences(&self) -> Option<Value> {
        Some(json!({
            "serial-number": {"type": "string", "optional": true},
            "profile-id": {"type": "profile"},
        }))
    }

    fn serialize_settings(&self) -> Option<Value> {
        let mut settings = serde_json::Map::new();
        if let Some(serial) = &self.serial {
            settings.insert("serial-number".into(), json!(serial));
        }
        if let Some(profile) = &self.profile {
            settings.insert("profile-id".into(), json!(profile));
        }
        Some(Value::Object(settings))
    }

    fn deserialize_settings(&mut self, ctx: &mut ActionContext<'_>, settings: &Value) {
        if let Some(serial) = settings.get("serial-number").and_then(Value::as_str) {
            self.serial = Some(serial.to_string());
        }
        if let Some(profile) = settings.get("profile-id").and_then(Value::as_str) {
            self.profile = Some(profile.to_string());
        }
        self.update_label(ctx);
    }
}

/// What a brightness press does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrightnessMode {
    #[default]
    Set,
    Increase,
    Decrease,
}

impl BrightnessMode {
    const fn from_index(index: i64) -> Self {
        match index {
            1 => Self::Increase,
            2 => Self::Decrease,
            _ => Self::Set,
        }
    }

    const fn index(self) -> i64 {
        match self {
            Self::Set => 0,
            Self::Increase => 1,
            Self::Decrease => 2,
        }
    }

    const fn icon_name(self) -> &'static str {
        match self {
            Self::Set => "display-brightness-symbolic",
            Self::Increase => "daytime-sunrise-symbolic",
            Self::Decrease => "daytime-sunset-symbolic",
        }
    }
}

const DEFAULT_BRIGHTNESS_STEP: f64 = 0.01;

/// Sets, raises or lowers the deck brightness.
pub struct BrightnessAction {
    info: ActionInfo,
    icon: Icon,
    mode: BrightnessMode,
    value: f64,
}

impl BrightnessAction {
    fn new(info: ActionInfo) -> Self {
        let mode = BrightnessMode::default();
        Self {
            info,
            icon: Icon::named(mode.icon_name()),
            mode,
            value: DEFAULT_BRIGHTNESS_STEP,
        }
    }

    pub const fn mode(&self) -> BrightnessMode {
        self.mode
    }

    fn set_mode(&mut self, mode: BrightnessMode) {
        self.mode = mode;
        self.icon.icon_name = Some(mode.icon_name().to_string());
    }
}

impl Action for BrightnessAction {
    fn info(&self) -> &ActionInfo {
        &self.info
    }

    fn icon(&self) -> &Icon {
        &self.icon
    }

    fn activate(&mut self, ctx: &mut ActionContext<'_>) {
        let current = ctx.brightness();
        let target = match self.mode {
            BrightnessMode::Set => self.value,
            BrightnessMode::Increase => current + self.value,
            BrightnessMode::Decrease => current - self.value,
        };
        ctx.set_brightness(target.clamp(0.0, 1.0));
    }

    fn preferences(&self) -> Option<Value> {
        Some(json!({
            "mode": {"type": "enum", "values": ["set", "increase", "decrease"]},
            "value": {"type": "number", "min": 0.01, "max": 1.0, "step": 0.01},
        }))
    }

    fn serialize_settings(&self) -> Option<Value> {
        Some(json!({
            "mode": self.mode.index(),
            "value": self.value,
        }))
    }

    fn deserialize_settings(&mut self, ctx: &mut ActionContext<'_>, settings: &Value) {
        self.value = settings
            .get("value")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_BRIGHTNESS_STEP);
        let mode = settings
            .get("mode")
            .and_then(Value::as_i64)
            .map_or_else(BrightnessMode::default, BrightnessMode::from_index);
        if mode != self.mode {
            self.set_mode(mode);
            ctx.icon_changed();
        }
    }
}
