/// Result type for configuration-time operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while validating a view configuration.
///
/// Runtime tree operations never fail; they degrade to placeholders or
/// empty results instead.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required attribute name was left blank.
    #[error("{role} attribute name must not be empty")]
    EmptyAttributeName { role: &'static str },

    /// The host does not know the configured attribute.
    #[error("unknown {role} attribute '{name}'")]
    UnknownAttribute { role: &'static str, name: String },

    /// Caption polling would spin.
    #[error("caption poll interval must be greater than zero")]
    ZeroPollInterval,
}

impl ConfigError {
    pub(crate) fn unknown(role: &'static str, name: &str) -> Self {
        Self::UnknownAttribute {
            role,
            name: name.to_owned(),
        }
    }
}
