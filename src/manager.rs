//! Discovery of attached decks.

use std::sync::Arc;

use hidapi::HidApi;
use tracing::{debug, info, trace, warn};

use crate::action::ActionRegistry;
use crate::config::Settings;
use crate::deck::{Deck, DeckBuilder, ProfileSwitch};
use crate::device::mock::MockTransport;
use crate::device::{BoxedTransport, Model, UsbDevice, list_devices, open_device};
use crate::error::Result;
use crate::persistence::FileStore;

/// Opens decks with shared settings and one action registry.
pub struct DeckManager {
    settings: Settings,
    registry: Arc<ActionRegistry>,
}

impl DeckManager {
    pub fn new(settings: Settings) -> Self {
        Self::with_registry(settings, Arc::new(ActionRegistry::with_defaults()))
    }

    pub fn with_registry(settings: Settings, registry: Arc<ActionRegistry>) -> Self {
        Self { settings, registry }
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Elgato HID devices currently attached, without opening them.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Hid`](crate::error::DeckError::Hid) when the HID
    /// library cannot start.
    pub fn scan(&self) -> Result<Vec<UsbDevice>> {
        let api = HidApi::new()?;
        Ok(list_devices(&api))
    }

    /// Open and load every attached deck.
    ///
    /// Products that are not decks are skipped silently; devices whose handle
    /// cannot be opened are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only when the HID library cannot start.
    pub fn enumerate(&self) -> Result<Vec<Deck>> {
        let api = HidApi::new()?;
        let mut decks = Vec::new();

        for device in list_devices(&api) {
            let model = match device.model() {
                Ok(model) => model,
                Err(e) if e.is_unrecognized() => {
                    trace!(product_id = device.product_id, "Skipping non-deck product");
                    continue;
                }
                Err(e) => {
                    warn!(path = %device.path, error = %e, "Skipping device");
                    continue;
                }
            };

            let transport = match open_device(&api, &device) {
                Ok(transport) => transport,
                Err(e) => {
                    warn!(path = %device.path, model = model.display_name(), error = %e, "Failed to open deck");
                    continue;
                }
            };

            let fallback = device.serial.clone().unwrap_or_else(|| device.path.clone());
            decks.push(
                self.builder(model, Box::new(transport))
                    .fallback_serial(fallback)
                    .open(),
            );
        }

        info!(count = decks.len(), "Enumerated decks");
        Ok(decks)
    }

    /// Create `max(count, 1)` virtual decks, alternating between the 15 and
    /// 32 key layouts.
    pub fn enumerate_fake(&self, count: usize) -> Vec<Deck> {
        (0..count.max(1))
            .map(|index| {
                let model = if index % 2 == 0 {
                    Model::FakeOriginal
                } else {
                    Model::FakeXl
                };
                let serial = format!("fake-deck-{}-serial-{index}", model.slug());
                debug!(%serial, "Creating virtual deck");

                self.builder(model, Box::new(MockTransport::new()))
                    .serial(serial)
                    .open()
            })
            .collect()
    }

    fn builder(&self, model: Model, transport: BoxedTransport) -> DeckBuilder {
        Deck::builder(model, transport)
            .store(FileStore::new(self.settings.data_dir()))
            .registry(Arc::clone(&self.registry))
            .icon_dirs(self.settings.icon_dirs.clone())
            .save_delay(self.settings.save_delay())
    }
}

/// Hand forwarded profile switches to the decks they name.
///
/// Switches naming a deck that is not open are dropped with a warning.
pub fn deliver_switches(decks: &mut [Deck], switches: Vec<ProfileSwitch>) {
    for switch in switches {
        match decks.iter_mut().find(|deck| deck.serial() == switch.serial) {
            Some(deck) => deck.switch_profile(switch.profile.as_deref()),
            None => warn!(serial = %switch.serial, "Profile switch for a deck that is not open"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_count_has_a_floor_of_one() {
        let manager = DeckManager::new(Settings::default());
        let decks = manager.enumerate_fake(0);
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].serial(), "fake-deck-original-serial-0");
    }

    #[test]
    fn test_fake_decks_alternate_models() {
        let manager = DeckManager::new(Settings::default());
        let decks = manager.enumerate_fake(3);
        let models: Vec<Model> = decks.iter().map(Deck::model).collect();
        assert_eq!(models, vec![Model::FakeOriginal, Model::FakeXl, Model::FakeOriginal]);
        assert_eq!(decks[1].serial(), "fake-deck-xl-serial-1");
        assert_eq!(decks[1].profiles().len(), 1);
    }
}
