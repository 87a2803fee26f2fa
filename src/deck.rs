//! One open deck: input polling, page navigation, icons and saving.
//!
//! A [`Deck`] owns its transport, its profiles and every live page. It is
//! driven from outside by calling [`Deck::poll`] at the model's cadence; each
//! call performs exactly one non-blocking read, turns state changes into
//! action callbacks, applies the requests the actions made, and writes the
//! profile document once a pending save falls due.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::action::{Action, ActionContext, ActionInfo, ActionRegistry, DeckRequest, EmptyAction};
use crate::device::protocol::{self, InputReport, ScreenRect, StringRequest};
use crate::device::{BoxedTransport, DeckEvent, DeviceInfo, Model};
use crate::error::{DeckError, Result};
use crate::icon::{Icon, IconRenderer};
use crate::page::{ItemKind, PageId, PageItem, PageTree};
use crate::persistence::{self, LoadedProfiles, ProfileStore, SAVE_DELAY, SaveScheduler};
use crate::profile::{Profile, ProfileSummary};

/// A profile switch aimed at another deck, for the owner of every deck to
/// deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSwitch {
    pub serial: String,
    pub profile: Option<String>,
}

/// Live binding of one key.
struct Button {
    action: Box<dyn Action>,
    custom_icon: Option<Icon>,
}

impl Button {
    fn empty() -> Self {
        Self {
            action: Box::new(EmptyAction::new()),
            custom_icon: None,
        }
    }

    /// Persisted form of what the key currently holds.
    fn to_item(&self) -> PageItem {
        let mut item = if self.action.is_placeholder() {
            PageItem::empty()
        } else {
            let info = self.action.info();
            let item = PageItem::action(&info.factory, &info.id);
            match self.action.serialize_settings() {
                Some(settings) => item.with_settings(settings),
                None => item,
            }
        };
        item.custom_icon = self.custom_icon.clone();
        item
    }
}

/// Builder for [`Deck`].
pub struct DeckBuilder {
    model: Model,
    transport: BoxedTransport,
    serial: Option<String>,
    fallback_serial: Option<String>,
    store: Option<Box<dyn ProfileStore>>,
    registry: Option<Arc<ActionRegistry>>,
    icon_dirs: Vec<PathBuf>,
    save_delay: Duration,
}

impl DeckBuilder {
    /// Use this serial instead of asking the device.
    #[must_use]
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Serial to use when the device does not answer the serial request.
    #[must_use]
    pub fn fallback_serial(mut self, serial: impl Into<String>) -> Self {
        self.fallback_serial = Some(serial.into());
        self
    }

    /// Where profiles are loaded from and saved to. Without a store the deck
    /// starts from the default profile and never saves.
    #[must_use]
    pub fn store(mut self, store: impl ProfileStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    #[must_use]
    pub fn registry(mut self, registry: Arc<ActionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Directories searched for named icons.
    #[must_use]
    pub fn icon_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.icon_dirs = dirs;
        self
    }

    #[must_use]
    pub const fn save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    /// Reset the device, read its identity, load its profiles and show the
    /// active profile's root page.
    ///
    /// Feature report failures are logged and the deck opens anyway: a
    /// failed reset is skipped, an unreadable serial falls back to
    /// [`fallback_serial`](Self::fallback_serial) (or an empty string) and an
    /// unreadable firmware version is left empty.
    pub fn open(self) -> Deck {
        let Self {
            model,
            mut transport,
            serial,
            fallback_serial,
            store,
            registry,
            icon_dirs,
            save_delay,
        } = self;
        let protocol = model.protocol();

        if let Some(report) = protocol::reset_report(protocol) {
            if let Err(e) = transport.send_feature_report(&report) {
                warn!(model = model.display_name(), error = %e, "Failed to reset deck");
            }
        }

        let serial = match serial {
            Some(serial) => serial,
            None => match protocol::serial_request(protocol) {
                Some(request) => read_string(&mut transport, &request).unwrap_or_else(|e| {
                    let fallback = fallback_serial.unwrap_or_default();
                    warn!(model = model.display_name(), error = %e, %fallback, "Failed to read serial number");
                    fallback
                }),
                None => format!("fake-deck-{}-serial-0", model.slug()),
            },
        };
        let firmware = match protocol::firmware_request(protocol) {
            Some(request) => read_string(&mut transport, &request).unwrap_or_else(|e| {
                warn!(serial = %serial, error = %e, "Failed to read firmware version");
                String::new()
            }),
            None => String::from("virtual"),
        };

        let mut pages = PageTree::new(model.button_count());
        let LoadedProfiles { profiles, active } = match &store {
            Some(store) => persistence::load_profiles(&**store, &serial, &mut pages),
            None => LoadedProfiles::fallback(&mut pages),
        };

        let renderer = model
            .icon_layout()
            .filter(|_| !model.is_virtual())
            .map(|layout| IconRenderer::new(layout, icon_dirs));

        info!(
            serial = %serial,
            model = model.display_name(),
            firmware = %firmware,
            profiles = profiles.len(),
            "Opened deck"
        );

        let mut deck = Deck {
            model,
            transport,
            serial,
            firmware,
            brightness: 0.0,
            buttons: (0..model.button_count()).map(|_| Button::empty()).collect(),
            key_states: vec![false; model.button_count()],
            dial_states: vec![false; model.dial_count()],
            profiles,
            active,
            pages,
            stack: Vec::new(),
            scheduler: SaveScheduler::new(save_delay),
            store,
            registry: registry.unwrap_or_else(|| Arc::new(ActionRegistry::with_defaults())),
            renderer,
            forwarded: Vec::new(),
        };
        deck.enter_profile(active, true);
        deck
    }
}

fn read_string(transport: &mut BoxedTransport, request: &StringRequest) -> Result<String> {
    let mut buf = request.buffer();
    let len = transport.get_feature_report(&mut buf)?;
    Ok(request.parse(&buf[..len]))
}

/// An open deck.
pub struct Deck {
    model: Model,
    transport: BoxedTransport,
    serial: String,
    firmware: String,
    brightness: f64,
    buttons: Vec<Button>,
    key_states: Vec<bool>,
    dial_states: Vec<bool>,
    profiles: Vec<Profile>,
    active: usize,
    pages: PageTree,
    /// Bottom is always the active profile's root page
    stack: Vec<PageId>,
    scheduler: SaveScheduler,
    store: Option<Box<dyn ProfileStore>>,
    registry: Arc<ActionRegistry>,
    renderer: Option<IconRenderer>,
    forwarded: Vec<ProfileSwitch>,
}

impl Deck {
    pub fn builder(model: Model, transport: BoxedTransport) -> DeckBuilder {
        DeckBuilder {
            model,
            transport,
            serial: None,
            fallback_serial: None,
            store: None,
            registry: None,
            icon_dirs: Vec::new(),
            save_delay: SAVE_DELAY,
        }
    }

    pub const fn model(&self) -> Model {
        self.model
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn firmware(&self) -> &str {
        &self.firmware
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.model, self.serial.clone(), self.firmware.clone())
    }

    pub const fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn pages(&self) -> &PageTree {
        &self.pages
    }

    /// Navigation stack, root first.
    pub fn stack(&self) -> &[PageId] {
        &self.stack
    }

    pub fn current_page(&self) -> Option<PageId> {
        self.stack.last().copied()
    }

    pub fn active_profile(&self) -> &Profile {
        &self.profiles[self.active]
    }

    pub fn profiles(&self) -> Vec<ProfileSummary> {
        self.profiles
            .iter()
            .enumerate()
            .map(|(index, profile)| profile.summary(index == self.active))
            .collect()
    }

    /// Action bound to the key at `position`, `None` for empty keys.
    pub fn button_action(&self, position: usize) -> Option<&ActionInfo> {
        self.buttons
            .get(position)
            .filter(|button| !button.action.is_placeholder())
            .map(|button| button.action.info())
    }

    /// Icon the key at `position` shows, before custom icon overrides.
    pub fn button_icon(&self, position: usize) -> Option<&Icon> {
        self.buttons.get(position).map(|button| button.action.icon())
    }

    pub fn custom_icon(&self, position: usize) -> Option<&Icon> {
        self.buttons.get(position)?.custom_icon.as_ref()
    }

    pub const fn has_pending_save(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn save_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    // === Polling ===

    /// Run one poll tick: one read, edge detection, then any due save.
    ///
    /// Transport errors are logged and swallowed.
    pub fn poll(&mut self, now: Instant) -> Vec<DeckEvent> {
        let mut events = Vec::new();

        let len = protocol::input_report_len(self.model);
        if len > 0 {
            let mut buf = vec![0u8; len];
            match self.transport.read(&mut buf) {
                Ok(0) => {}
                Ok(read) => match protocol::parse_input(self.model, &buf[..read]) {
                    Some(report) => self.handle_input(report, &mut events),
                    None => trace!(serial = %self.serial, bytes = read, "Ignoring input report"),
                },
                Err(e) => warn!(serial = %self.serial, error = %e, "Failed to read input report"),
            }
        }

        if self.scheduler.take_due(now) {
            if let Err(e) = self.save() {
                warn!(serial = %self.serial, error = %e, "Failed to save profiles");
            }
        }

        events
    }

    fn handle_input(&mut self, report: InputReport, events: &mut Vec<DeckEvent>) {
        match report {
            InputReport::Buttons(states) => {
                for (position, &pressed) in states.iter().enumerate().take(self.key_states.len()) {
                    if self.key_states[position] == pressed {
                        continue;
                    }
                    self.key_states[position] = pressed;
                    events.push(if pressed {
                        DeckEvent::ButtonPressed { position }
                    } else {
                        DeckEvent::ButtonReleased { position }
                    });
                    self.dispatch(position, pressed);
                }
            }
            InputReport::DialRotation(deltas) => {
                for (dial, &delta) in deltas.iter().enumerate() {
                    if delta != 0 {
                        events.push(DeckEvent::DialRotated { dial, delta });
                    }
                }
            }
            InputReport::DialPress(states) => {
                for (dial, &pressed) in states.iter().enumerate().take(self.dial_states.len()) {
                    if self.dial_states[dial] == pressed {
                        continue;
                    }
                    self.dial_states[dial] = pressed;
                    events.push(if pressed {
                        DeckEvent::DialPressed { dial }
                    } else {
                        DeckEvent::DialReleased { dial }
                    });
                }
            }
            InputReport::Touch(touch) => events.push(DeckEvent::Touch(touch)),
        }
    }

    /// Call `activate` or `deactivate` on the key's action, then apply what
    /// it asked for.
    fn dispatch(&mut self, position: usize, pressed: bool) {
        let Some(&page) = self.stack.last() else {
            return;
        };
        let active_id = self.profiles.get(self.active).map_or("", Profile::id);
        let mut ctx = ActionContext::new(
            position,
            page,
            &self.serial,
            self.brightness,
            active_id,
            &self.profiles,
            &mut self.pages,
        );
        let Some(button) = self.buttons.get_mut(position) else {
            return;
        };

        debug!(position, pressed, action = %button.action.info().id, "Key state changed");
        if pressed {
            button.action.activate(&mut ctx);
        } else {
            button.action.deactivate(&mut ctx);
        }

        let requests = ctx.take_requests();
        self.apply_requests(position, requests);
    }

    fn apply_requests(&mut self, position: usize, requests: Vec<DeckRequest>) {
        for request in requests {
            trace!(position, ?request, "Applying action request");
            match request {
                DeckRequest::PushPage(page) => {
                    if let Err(e) = self.push_page(page) {
                        warn!(error = %e, "Folder could not be opened");
                    }
                }
                DeckRequest::PopPage => {
                    if let Err(e) = self.pop_page() {
                        warn!(error = %e, "Could not leave folder");
                    }
                }
                DeckRequest::SetBrightness(brightness) => self.set_brightness(brightness),
                DeckRequest::LoadProfile { serial, profile } => match serial {
                    Some(serial) if serial != self.serial => {
                        debug!(target = %serial, "Forwarding profile switch");
                        self.forwarded.push(ProfileSwitch { serial, profile });
                    }
                    _ => self.switch_profile(profile.as_deref()),
                },
                DeckRequest::IconChanged => self.refresh_icon(position),
            }
        }
    }

    /// Profile switches this deck's actions aimed at other decks.
    pub fn take_forwarded(&mut self) -> Vec<ProfileSwitch> {
        std::mem::take(&mut self.forwarded)
    }

    /// Switch to `profile`, or stay on the active one when the id is
    /// missing or unknown.
    pub fn switch_profile(&mut self, profile: Option<&str>) {
        let Some(id) = profile.filter(|id| self.profiles.iter().any(|p| p.id() == *id)) else {
            debug!(requested = ?profile, "Unknown profile, keeping the active one");
            return;
        };
        let id = id.to_string();
        if let Err(e) = self.load_profile(&id) {
            warn!(error = %e, "Profile switch failed");
        }
    }

    // === Navigation ===

    /// Open `page` on top of the stack.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Navigation`] unless `page` belongs to the active
    /// profile, is not on the stack yet, and is a child of the current top.
    /// State is left untouched on error.
    pub fn push_page(&mut self, page: PageId) -> Result<()> {
        let top = self
            .current_page()
            .ok_or_else(|| DeckError::Navigation("no page is shown".to_string()))?;
        let target = self
            .pages
            .get(page)
            .ok_or_else(|| DeckError::Navigation(format!("{page} does not exist")))?;

        if target.profile() != self.active_profile().id() {
            return Err(DeckError::Navigation(format!(
                "{page} belongs to another profile"
            )));
        }
        if self.stack.contains(&page) {
            return Err(DeckError::Navigation(format!("{page} is already open")));
        }
        if target.parent() != Some(top) {
            return Err(DeckError::Navigation(format!(
                "{page} is not a folder of {top}"
            )));
        }

        self.update_pages();
        self.stack.push(page);
        debug!(%page, depth = self.stack.len(), "Pushed page");
        self.realize(page);
        Ok(())
    }

    /// Close the top page and return to its parent.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Navigation`] when only the root page is open.
    pub fn pop_page(&mut self) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(DeckError::Navigation(
                "already at the root page".to_string(),
            ));
        }

        self.sync_top();
        let popped = self.stack.pop();
        let Some(&top) = self.stack.last() else {
            return Ok(());
        };
        self.pages.update_all_items(top);
        debug!(?popped, %top, depth = self.stack.len(), "Popped page");
        self.realize(top);
        Ok(())
    }

    /// Write the live keys into the top page, then fold every open folder
    /// back into its parent's item settings.
    pub fn update_pages(&mut self) {
        self.sync_top();
        for &page in self.stack.iter().rev() {
            self.pages.update_all_items(page);
        }
    }

    fn sync_top(&mut self) {
        let Some(&page) = self.stack.last() else {
            return;
        };
        for (position, button) in self.buttons.iter().enumerate() {
            self.pages.set_item(page, position, button.to_item());
        }
    }

    /// Bind fresh actions to every key from the items of `page`.
    fn realize(&mut self, page: PageId) {
        self.pages.clear_subpages(page);
        let items: Vec<PageItem> = match self.pages.get(page) {
            Some(found) => found.items().to_vec(),
            None => {
                warn!(%page, "Cannot show a page that does not exist");
                return;
            }
        };

        for (position, item) in items.into_iter().enumerate().take(self.buttons.len()) {
            let action = self.create_action(page, position, &item.kind);
            self.buttons[position] = Button {
                action,
                custom_icon: item.custom_icon,
            };
        }
        trace!(%page, "Realized page");
        self.refresh_icons();
    }

    fn create_action(&mut self, page: PageId, position: usize, kind: &ItemKind) -> Box<dyn Action> {
        let ItemKind::Action {
            factory,
            action,
            settings,
        } = kind
        else {
            return Box::new(EmptyAction::new());
        };

        let registry = Arc::clone(&self.registry);
        let active_id = self.profiles.get(self.active).map_or("", Profile::id);
        let mut ctx = ActionContext::new(
            position,
            page,
            &self.serial,
            self.brightness,
            active_id,
            &self.profiles,
            &mut self.pages,
        );

        match registry.create(factory, action, &mut ctx) {
            Ok(mut created) => {
                if let Some(settings) = settings {
                    created.deserialize_settings(&mut ctx, settings);
                }
                for request in ctx.take_requests() {
                    if request != DeckRequest::IconChanged {
                        debug!(position, ?request, "Dropping request made while loading settings");
                    }
                }
                created
            }
            Err(e) => {
                warn!(position, error = %e, "Leaving key empty");
                Box::new(EmptyAction::new())
            }
        }
    }

    // === Profiles ===

    /// Make `id` the active profile.
    ///
    /// Switching to the active profile does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ProfileNotFound`] for unknown ids.
    pub fn load_profile(&mut self, id: &str) -> Result<()> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| DeckError::ProfileNotFound { id: id.to_string() })?;
        if index == self.active && !self.stack.is_empty() {
            return Ok(());
        }

        self.leave_profile();
        self.enter_profile(index, false);
        self.request_save();
        Ok(())
    }

    fn leave_profile(&mut self) {
        self.update_pages();
        if let Some(&root) = self.stack.first() {
            self.pages.clear_subpages(root);
        }
        self.stack.clear();
    }

    fn enter_profile(&mut self, index: usize, force_brightness: bool) {
        self.active = index;
        let profile = &self.profiles[index];
        let (brightness, root) = (profile.brightness(), profile.root());
        info!(serial = %self.serial, profile = %profile.name(), "Loading profile");

        self.write_brightness(brightness, force_brightness);
        self.stack.push(root);
        self.realize(root);
    }

    /// Add an empty profile and return its id.
    pub fn add_profile(&mut self, name: &str) -> String {
        let profile = Profile::new(&mut self.pages, name);
        let id = profile.id().to_string();
        self.profiles.push(profile);
        self.request_save();
        id
    }

    /// Delete a profile, switching away from it first when it is active.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::LastProfile`] for the only profile and
    /// [`DeckError::ProfileNotFound`] for unknown ids.
    pub fn remove_profile(&mut self, id: &str) -> Result<()> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| DeckError::ProfileNotFound { id: id.to_string() })?;
        if self.profiles.len() == 1 {
            return Err(DeckError::LastProfile);
        }

        if index == self.active {
            let fallback = if index == 0 { 1 } else { 0 };
            self.leave_profile();
            self.enter_profile(fallback, false);
        }

        self.pages.remove_profile(id);
        self.profiles.remove(index);
        if index < self.active {
            self.active -= 1;
        }
        self.request_save();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DeckError::ProfileNotFound`] for unknown ids.
    pub fn rename_profile(&mut self, id: &str, name: &str) -> Result<()> {
        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| DeckError::ProfileNotFound { id: id.to_string() })?;
        profile.name = name.to_string();
        self.request_save();
        Ok(())
    }

    // === Brightness ===

    /// Set the display brightness, clamped to `[0, 1]`.
    ///
    /// Values within `f64::EPSILON` of the current brightness are ignored.
    pub fn set_brightness(&mut self, brightness: f64) {
        let brightness = brightness.clamp(0.0, 1.0);
        if (brightness - self.brightness).abs() < f64::EPSILON {
            return;
        }
        self.write_brightness(brightness, true);
        self.profiles[self.active].set_brightness(brightness);
        self.request_save();
    }

    fn write_brightness(&mut self, brightness: f64, force: bool) {
        if !force && (brightness - self.brightness).abs() < f64::EPSILON {
            return;
        }
        self.brightness = brightness;
        let Some(report) = protocol::brightness_report(self.model.protocol(), brightness) else {
            return;
        };
        if let Err(e) = self.transport.send_feature_report(&report) {
            warn!(serial = %self.serial, error = %e, "Failed to set brightness");
        }
    }

    // === Editing ===

    fn check_position(&self, position: usize) -> Result<()> {
        if position >= self.buttons.len() {
            return Err(DeckError::InvalidPosition {
                position,
                count: self.buttons.len(),
            });
        }
        Ok(())
    }

    /// Bind a new action with default settings to a key of the current page.
    ///
    /// # Errors
    ///
    /// Returns an error for out of range positions and unknown actions.
    pub fn set_button_action(&mut self, position: usize, factory: &str, action: &str) -> Result<()> {
        self.check_position(position)?;
        let page = self
            .current_page()
            .ok_or_else(|| DeckError::Navigation("no page is shown".to_string()))?;

        self.pages.unregister_subpage(page, position);
        let registry = Arc::clone(&self.registry);
        let active_id = self.profiles.get(self.active).map_or("", Profile::id);
        let mut ctx = ActionContext::new(
            position,
            page,
            &self.serial,
            self.brightness,
            active_id,
            &self.profiles,
            &mut self.pages,
        );
        let created = registry.create(factory, action, &mut ctx)?;

        self.buttons[position].action = created;
        self.pages.set_item(page, position, self.buttons[position].to_item());
        self.refresh_icon(position);
        self.request_save();
        Ok(())
    }

    /// Make a key of the current page empty. Its custom icon goes too.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::InvalidPosition`] for out of range positions.
    pub fn clear_button(&mut self, position: usize) -> Result<()> {
        self.check_position(position)?;
        if let Some(page) = self.current_page() {
            self.pages.unregister_subpage(page, position);
            self.pages.set_item(page, position, PageItem::empty());
        }
        self.buttons[position] = Button::empty();
        self.refresh_icon(position);
        self.request_save();
        Ok(())
    }

    /// Replace or remove the custom icon of a key.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::InvalidPosition`] for out of range positions.
    pub fn set_custom_icon(&mut self, position: usize, icon: Option<Icon>) -> Result<()> {
        self.check_position(position)?;
        self.buttons[position].custom_icon = icon;
        self.refresh_icon(position);
        self.request_save();
        Ok(())
    }

    // === Display ===

    fn refresh_icons(&mut self) {
        for position in 0..self.buttons.len() {
            self.refresh_icon(position);
        }
    }

    /// Render and push the icon of one key. Failures are logged.
    fn refresh_icon(&mut self, position: usize) {
        let (Some(renderer), Some(button)) = (&self.renderer, self.buttons.get(position)) else {
            return;
        };

        let reports = renderer
            .render(button.custom_icon.as_ref(), Some(button.action.icon()))
            .and_then(|data| protocol::image_reports(self.model, position, &data));
        let reports = match reports {
            Ok(reports) => reports,
            Err(e) => {
                warn!(position, error = %e, "Failed to render key image");
                return;
            }
        };

        for report in reports {
            if let Err(e) = self.transport.write(&report) {
                warn!(position, error = %e, "Failed to write key image");
                return;
            }
        }
    }

    /// Write an encoded image to one slot of the touchscreen strip.
    ///
    /// Decks without a touchscreen ignore the call.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::InvalidPosition`] for slots past the strip and
    /// transport errors.
    pub fn set_touchscreen_image(&mut self, slot: usize, data: &[u8]) -> Result<()> {
        let Some(screen) = self.model.touchscreen() else {
            return Ok(());
        };
        if slot >= screen.slots {
            return Err(DeckError::InvalidPosition {
                position: slot,
                count: screen.slots,
            });
        }

        let width = screen.slot_width();
        let rect = ScreenRect {
            x: (slot as u32 * width) as u16,
            y: 0,
            width: width as u16,
            height: screen.layout.height as u16,
        };
        for report in protocol::touchscreen_reports(rect, data) {
            self.transport.write(&report)?;
        }
        Ok(())
    }

    // === Persistence ===

    fn request_save(&mut self) {
        if self.scheduler.request(Instant::now()) {
            trace!(serial = %self.serial, deadline = ?self.scheduler.deadline(), "Save scheduled");
        }
    }

    /// Write the profile document now, cancelling any pending save.
    ///
    /// Virtual decks and decks without a store never write.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be rendered or stored.
    pub fn save(&mut self) -> Result<()> {
        self.scheduler.take();
        if self.model.is_virtual() || self.store.is_none() {
            return Ok(());
        }

        let brightness = self.brightness;
        self.profiles[self.active].set_brightness(brightness);
        self.update_pages();

        let document = persistence::render_document(
            self.profiles[self.active].id(),
            &self.profiles,
            &self.pages,
        )?;
        if let Some(store) = &self.store {
            store.save(&self.serial, &document)?;
            debug!(serial = %self.serial, "Saved profiles");
        }
        Ok(())
    }

    /// Show the logo screen.
    ///
    /// # Errors
    ///
    /// Returns transport errors.
    pub fn reset(&mut self) -> Result<()> {
        if let Some(report) = protocol::reset_report(self.model.protocol()) {
            self.transport.send_feature_report(&report)?;
        }
        Ok(())
    }
}

impl Drop for Deck {
    fn drop(&mut self) {
        if let Err(e) = self.save() {
            warn!(serial = %self.serial, error = %e, "Final save failed");
        }
        if let Err(e) = self.reset() {
            debug!(serial = %self.serial, error = %e, "Reset on close failed");
        }
    }
}
