//! Error types and handling for `CareMap`

use thiserror::Error;

/// Main error type for the `CareMap` pipeline
#[derive(Error, Debug)]
pub enum CareMapError {
    /// The geocoder had no match for a place name
    #[error("Location not found: {query}")]
    NotFound { query: String },

    /// Network failure or an unsuccessful upstream status
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Upstream answered with a body we could not interpret
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// The host refused or could not provide a position fix
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },
}

impl CareMapError {
    /// Create a new not-found error for a geocoding query
    pub fn not_found<S: Into<String>>(query: S) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a new permission error
    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get the message shown to the person holding the phone
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { .. } => "場所が見つかりませんでした".to_string(),
            Self::PermissionDenied { .. } => "位置情報を許可してください".to_string(),
            Self::Transport { .. } | Self::Decode { .. } => {
                "通信に失敗しました。しばらくしてからもう一度お試しください".to_string()
            }
            Self::Config { .. } => "設定に誤りがあります".to_string(),
            Self::Validation { message } => format!("入力が正しくありません: {message}"),
        }
    }
}

impl From<reqwest::Error> for CareMapError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::decode(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}
