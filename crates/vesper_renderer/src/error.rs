//! Error types for render configuration and setup.

use thiserror::Error;
use vesper_core::SceneError;

/// Settings or per-iteration parameters that cannot drive a render.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Photon count must be positive")]
    ZeroPhotonCount,

    #[error("Connection count must be positive")]
    ZeroConnectionCount,

    #[error("Iteration index {0} is below 1")]
    InvalidIteration(u32),

    #[error("Search radius must be positive and finite, got {0}")]
    InvalidRadius(f32),

    #[error("Radius alpha must lie in (0, 1), got {0}")]
    InvalidRadiusAlpha(f32),

    #[error("Maximum path length must be at least 1")]
    ZeroPathLength,

    #[error("Path index {index} does not fit in {bits} bits")]
    IndexOutOfRange { index: usize, bits: u32 },

    #[error("Viewport is empty ({width}x{height})")]
    EmptyViewport { width: u32, height: u32 },

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to set up or run a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::IndexOutOfRange { index: 1 << 26, bits: 26 };
        assert_eq!(err.to_string(), "Path index 67108864 does not fit in 26 bits");

        let err: RenderError = SceneError::Empty.into();
        assert_eq!(err.to_string(), "Scene has no geometry");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: ConfigError = parse.unwrap_err().into();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
