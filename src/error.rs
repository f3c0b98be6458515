//! Error types and handling for the `travelmap` pipeline

use thiserror::Error;

/// Main error type for the travel map pipeline
#[derive(Error, Debug)]
pub enum TravelMapError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Backend or third-party API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A single geocoding stage could not produce coordinates.
    /// The resolver recovers from this by moving on to the next stage.
    #[error("Geocoding stage '{stage}' failed: {message}")]
    StageFailed { stage: &'static str, message: String },

    /// Every geocoding stage was exhausted for one address
    #[error("Unable to locate: {address}")]
    Unresolvable { address: String },

    /// A route polyline decoded to fewer than two usable points
    #[error("Route polyline decoded to {points} point(s), at least 2 are required")]
    RouteDecode { points: usize },

    /// Nothing could be placed on the map
    #[error("Nothing to display: {message}")]
    NothingToDisplay { message: String },

    /// Plan generation stream errors
    #[error("Plan stream error: {message}")]
    Stream { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON (de)serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl TravelMapError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new stage failure
    pub fn stage<S: Into<String>>(stage: &'static str, message: S) -> Self {
        Self::StageFailed {
            stage,
            message: message.into(),
        }
    }

    pub fn unresolvable<S: Into<String>>(address: S) -> Self {
        Self::Unresolvable {
            address: address.into(),
        }
    }

    pub fn nothing_to_display<S: Into<String>>(message: S) -> Self {
        Self::NothingToDisplay {
            message: message.into(),
        }
    }

    pub fn stream<S: Into<String>>(message: S) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelMapError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            TravelMapError::Api { .. } => {
                "Unable to connect to the travel planning service. Please check your internet connection."
                    .to_string()
            }
            TravelMapError::Validation { message } => format!("Invalid input: {message}"),
            TravelMapError::StageFailed { stage, .. } => {
                format!("Geocoding via {stage} was unavailable.")
            }
            TravelMapError::Unresolvable { address } => format!("Could not locate \"{address}\"."),
            TravelMapError::RouteDecode { .. } => {
                "Route data was incomplete; showing a straight line instead.".to_string()
            }
            TravelMapError::NothingToDisplay { message } => message.clone(),
            TravelMapError::Stream { message } => {
                format!("Generating the travel plan failed: {message}")
            }
            TravelMapError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            TravelMapError::Json { .. } => "Received malformed data.".to_string(),
        }
    }
}

impl From<reqwest::Error> for TravelMapError {
    fn from(err: reqwest::Error) -> Self {
        TravelMapError::api(err.to_string())
    }
}

impl From<reqwest_middleware::Error> for TravelMapError {
    fn from(err: reqwest_middleware::Error) -> Self {
        TravelMapError::api(err.to_string())
    }
}
