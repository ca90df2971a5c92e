/// Convenience result type used across Lustre.
pub type LustreResult<T> = Result<T, LustreError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum LustreError {
    /// Invalid user-provided or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Frame-level failures inside the transformation chain.
    ///
    /// These abort the affected frame only; the driver loop drops the frame
    /// and continues with the next one.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Failures in the decode source or encode sink bridge.
    #[error("media error: {0}")]
    Media(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LustreError {
    /// Build a [`LustreError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LustreError::Pipeline`] value.
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Build a [`LustreError::Media`] value.
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_prefix() {
        let e = LustreError::validation("bad frame");
        assert_eq!(e.to_string(), "validation error: bad frame");

        let e = LustreError::media("ffmpeg exited");
        assert_eq!(e.to_string(), "media error: ffmpeg exited");
    }

    #[test]
    fn anyhow_errors_wrap_transparently() {
        let e: LustreError = anyhow::anyhow!("io broke").into();
        assert_eq!(e.to_string(), "io broke");
    }
}
