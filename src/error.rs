//! Error types for deck operations.

use thiserror::Error;

/// Primary error type for deck operations.
#[derive(Error, Debug)]
pub enum DeckError {
    // Device errors
    #[error("No Stream Deck devices found")]
    NoDevicesFound,

    #[error("Device not found: {serial}")]
    DeviceNotFound { serial: String },

    #[error("Unrecognized product id {product_id:#06x}")]
    Unrecognized { product_id: u16 },

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("Device communication error: {0}")]
    DeviceCommunication(String),

    #[error("Invalid control position {position}: device has {count} controls")]
    InvalidPosition { position: usize, count: usize },

    // Rendering errors
    #[error("Icon encoding failed: {0}")]
    Encoding(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(#[from] image::ImageError),

    // Action errors
    #[error("No action factory named {factory}")]
    UnknownFactory { factory: String },

    #[error("Action factory {factory} has no action {action}")]
    UnknownAction { factory: String, action: String },

    // Navigation errors
    #[error("Invalid navigation: {0}")]
    Navigation(String),

    #[error("Profile not found: {id}")]
    ProfileNotFound { id: String },

    #[error("Cannot remove the only profile")]
    LastProfile,

    // Persistence and configuration errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl DeckError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoDevicesFound
                | Self::DeviceNotFound { .. }
                | Self::InvalidPosition { .. }
                | Self::ProfileNotFound { .. }
                | Self::LastProfile
                | Self::ConfigParse(_)
        )
    }

    /// Returns true for errors that only mean "not one of ours".
    ///
    /// Enumeration skips these without logging.
    pub const fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized { .. })
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoDevicesFound => Some("Ensure the Stream Deck is connected via USB, or try --fake 1"),
            Self::DeviceNotFound { .. } => Some("Run: deckhand list"),
            Self::OpenFailed(_) | Self::Hid(_) => {
                Some("Check udev rules / permissions for the HID device")
            }
            Self::ProfileNotFound { .. } => Some("Run: deckhand profiles"),
            Self::ConfigParse(_) => Some("Check the configuration file syntax"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using DeckError.
pub type Result<T> = std::result::Result<T, DeckError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| DeckError::Other(format!("{}: {e}", f().into())))
    }
}
