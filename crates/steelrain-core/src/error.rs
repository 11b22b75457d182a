use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid range for {field}: min {min} > max {max}")]
    InvalidRange { field: String, min: f32, max: f32 },

    #[error("Empty sensor grid: {width}x{height}")]
    EmptyGrid { width: usize, height: usize },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn config_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("port = [").unwrap_err();
        let config_err: ConfigError = toml_err.into();
        assert!(matches!(config_err, ConfigError::Toml(_)));
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::InvalidRange {
                field: "pose.pitch".into(),
                min: 21.0,
                max: 4.0
            }
            .to_string(),
            "Invalid range for pose.pitch: min 21 > max 4"
        );
        assert_eq!(
            ConfigError::EmptyGrid {
                width: 0,
                height: 27
            }
            .to_string(),
            "Empty sensor grid: 0x27"
        );
        assert_eq!(
            ConfigError::invalid("fire.max_rounds_per_minute", "must be > 0").to_string(),
            "Invalid value for fire.max_rounds_per_minute: must be > 0"
        );
    }
}
