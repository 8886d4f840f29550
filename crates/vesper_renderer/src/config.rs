//! Render settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which estimators contribute to the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technique {
    /// Vertex connection and merging
    #[default]
    Vcm,
    /// Bidirectional path tracing (connections only)
    Bpt,
    /// Progressive photon mapping (merging only)
    Ppm,
}

impl Technique {
    pub fn uses_connections(self) -> bool {
        matches!(self, Technique::Vcm | Technique::Bpt)
    }

    pub fn uses_merging(self) -> bool {
        matches!(self, Technique::Vcm | Technique::Ppm)
    }
}

/// Configuration for the VCM integrator and the iteration loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcmSettings {
    pub technique: Technique,
    /// Maximum number of path segments from camera to light
    pub max_path_length: u32,
    /// Initial merge radius as a fraction of the scene's bounding radius
    pub radius_factor: f32,
    /// Radius reduction rate, in (0, 1)
    pub radius_alpha: f32,
    pub iterations: u32,
    /// Stop after this many seconds even if iterations remain
    pub time_budget_secs: Option<f64>,
    pub seed: u64,
    pub bucket_size: u32,
    /// Probability in (0, 1] that a light sample selects the emitter.
    /// Contributions are divided by it, so it trades light samples for
    /// speed without changing the converged image.
    pub light_sample_weight: f32,
}

impl Default for VcmSettings {
    fn default() -> Self {
        Self {
            technique: Technique::Vcm,
            max_path_length: 10,
            radius_factor: 0.0025,
            radius_alpha: 0.75,
            iterations: 16,
            time_budget_secs: None,
            seed: 0,
            bucket_size: crate::bucket::DEFAULT_BUCKET_SIZE,
            light_sample_weight: 1.0,
        }
    }
}

impl VcmSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: VcmSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_path_length == 0 {
            return Err(ConfigError::ZeroPathLength);
        }
        if !(self.radius_factor.is_finite() && self.radius_factor > 0.0) {
            return Err(ConfigError::InvalidRadius(self.radius_factor));
        }
        if !(self.radius_alpha > 0.0 && self.radius_alpha < 1.0) {
            return Err(ConfigError::InvalidRadiusAlpha(self.radius_alpha));
        }
        if self.iterations == 0 {
            return Err(ConfigError::InvalidSetting("iterations must be at least 1".into()));
        }
        if self.bucket_size == 0 {
            return Err(ConfigError::InvalidSetting("bucket_size must be at least 1".into()));
        }
        if let Some(budget) = self.time_budget_secs {
            if !(budget > 0.0) {
                return Err(ConfigError::InvalidSetting(format!(
                    "time_budget_secs must be positive, got {}",
                    budget
                )));
            }
        }
        if !(self.light_sample_weight > 0.0 && self.light_sample_weight <= 1.0) {
            return Err(ConfigError::InvalidSetting(format!(
                "light_sample_weight must be in (0, 1], got {}",
                self.light_sample_weight
            )));
        }
        Ok(())
    }
}
