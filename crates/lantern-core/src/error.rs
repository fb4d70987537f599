use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use lantern_core::Error;
    /// let err = Error::config_error("flushAt must be at least 1");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating transport errors from any displayable cause
    ///
    /// # Example
    /// ```
    /// use lantern_core::Error;
    /// let err = Error::transport("connection refused");
    /// ```
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Helper for creating API errors from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
        }
    }

    /// Helper for creating prompt errors
    pub fn prompt(msg: impl Into<String>) -> Self {
        Error::Prompt(msg.into())
    }

    /// Helper for creating media errors
    pub fn media(msg: impl Into<String>) -> Self {
        Error::Media(msg.into())
    }

    /// Helper for creating general errors with a message
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::api(404, "prompt not found");
        assert_eq!(err.to_string(), "API error 404: prompt not found");

        let err = Error::config_error("queueCapacity must cover flushAt");
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
