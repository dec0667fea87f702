//! Accelerator platform description.
//!
//! Loads [`PlatformDescriptor`] from a TOML file (`platform.toml`) with
//! environment variable overrides via `CONV3D_PLATFORM_*` prefixed variables,
//! or from one of the built-in [`PlatformPreset`]s.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Core count, on-chip buffer capacities and inter-tier bandwidth of one
/// accelerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    /// Number of independent cube cores.
    /// Override: `CONV3D_PLATFORM_CORE_COUNT`
    pub core_count: u64,

    /// Tier-1 (L1) buffer capacity in bytes.
    /// Override: `CONV3D_PLATFORM_L1_SIZE`
    pub l1_size: u64,

    /// Left-operand tier-0 buffer capacity in bytes.
    /// Override: `CONV3D_PLATFORM_L0A_SIZE`
    pub l0a_size: u64,

    /// Right-operand tier-0 buffer capacity in bytes.
    /// Override: `CONV3D_PLATFORM_L0B_SIZE`
    pub l0b_size: u64,

    /// Accumulator tier-0 buffer capacity in bytes.
    /// Override: `CONV3D_PLATFORM_L0C_SIZE`
    pub l0c_size: u64,

    /// Global memory / L2 to L1 bandwidth in bytes per cycle.
    /// Override: `CONV3D_PLATFORM_L2_RATE`
    pub l2_rate: u64,

    /// DDR to L2 bandwidth in bytes per cycle.
    /// Override: `CONV3D_PLATFORM_DDR_RATE`
    pub ddr_rate: u64,
}

impl Default for PlatformDescriptor {
    fn default() -> Self {
        PlatformPreset::Ascend910B.descriptor()
    }
}

/// Errors that can occur when loading or validating a [`PlatformDescriptor`].
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("failed to read platform file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

const ENV_OVERRIDES: &[&str] = &[
    "CONV3D_PLATFORM_CORE_COUNT",
    "CONV3D_PLATFORM_L1_SIZE",
    "CONV3D_PLATFORM_L0A_SIZE",
    "CONV3D_PLATFORM_L0B_SIZE",
    "CONV3D_PLATFORM_L0C_SIZE",
    "CONV3D_PLATFORM_L2_RATE",
    "CONV3D_PLATFORM_DDR_RATE",
];

impl PlatformDescriptor {
    /// Names of every environment variable consulted by
    /// [`apply_env_overrides`](Self::apply_env_overrides).
    pub const ENV_OVERRIDES: &'static [&'static str] = ENV_OVERRIDES;

    /// Generate a default platform TOML string.
    pub fn default_toml() -> String {
        Self::default().to_toml()
    }

    /// Render this descriptor as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Load a platform from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, PlatformError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from a TOML string (useful for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, PlatformError> {
        let mut platform: PlatformDescriptor = toml::from_str(toml_str)?;
        platform.apply_env_overrides()?;
        platform.validate()?;
        Ok(platform)
    }

    /// Start from `preset` and apply environment overrides.
    pub fn from_preset(preset: PlatformPreset) -> Result<Self, PlatformError> {
        let mut platform = preset.descriptor();
        platform.apply_env_overrides()?;
        platform.validate()?;
        Ok(platform)
    }

    /// Smallest inter-tier bandwidth, the bottleneck for data movement.
    #[must_use]
    pub fn min_bandwidth(&self) -> u64 {
        self.l2_rate.min(self.ddr_rate)
    }

    /// Validate the descriptor, returning an error with a descriptive message
    /// on failure.
    pub fn validate(&self) -> Result<(), PlatformError> {
        let fields = [
            ("core_count", self.core_count),
            ("l1_size", self.l1_size),
            ("l0a_size", self.l0a_size),
            ("l0b_size", self.l0b_size),
            ("l0c_size", self.l0c_size),
            ("l2_rate", self.l2_rate),
            ("ddr_rate", self.ddr_rate),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| *v == 0) {
            return Err(PlatformError::Validation(format!("{name} must be > 0")));
        }
        Ok(())
    }

    /// Apply `CONV3D_PLATFORM_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), PlatformError> {
        let targets: [(&str, &mut u64); 7] = [
            ("CONV3D_PLATFORM_CORE_COUNT", &mut self.core_count),
            ("CONV3D_PLATFORM_L1_SIZE", &mut self.l1_size),
            ("CONV3D_PLATFORM_L0A_SIZE", &mut self.l0a_size),
            ("CONV3D_PLATFORM_L0B_SIZE", &mut self.l0b_size),
            ("CONV3D_PLATFORM_L0C_SIZE", &mut self.l0c_size),
            ("CONV3D_PLATFORM_L2_RATE", &mut self.l2_rate),
            ("CONV3D_PLATFORM_DDR_RATE", &mut self.ddr_rate),
        ];
        for (key, slot) in targets {
            if let Ok(val) = std::env::var(key) {
                *slot = val.trim().parse::<u64>().map_err(|e| PlatformError::EnvOverride {
                    key: key.into(),
                    value: val.clone(),
                    reason: e.to_string(),
                })?;
                tracing::debug!(key, value = *slot, "platform override applied");
            }
        }
        Ok(())
    }
}

/// Built-in platform presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformPreset {
    /// Training-class part: 24 cube cores, 512 KiB L1.
    Ascend910B,
    /// Inference-class part: 8 cube cores, 1 MiB L1.
    Ascend310P,
}

impl PlatformPreset {
    /// All known presets.
    pub const ALL: &'static [PlatformPreset] =
        &[PlatformPreset::Ascend910B, PlatformPreset::Ascend310P];

    /// The descriptor this preset stands for.
    #[must_use]
    pub const fn descriptor(self) -> PlatformDescriptor {
        match self {
            Self::Ascend910B => PlatformDescriptor {
                core_count: 24,
                l1_size: 512 * 1024,
                l0a_size: 64 * 1024,
                l0b_size: 64 * 1024,
                l0c_size: 128 * 1024,
                l2_rate: 128,
                ddr_rate: 32,
            },
            Self::Ascend310P => PlatformDescriptor {
                core_count: 8,
                l1_size: 1024 * 1024,
                l0a_size: 64 * 1024,
                l0b_size: 64 * 1024,
                l0c_size: 256 * 1024,
                l2_rate: 64,
                ddr_rate: 17,
            },
        }
    }
}

impl fmt::Display for PlatformPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascend910B => write!(f, "ascend910b"),
            Self::Ascend310P => write!(f, "ascend310p"),
        }
    }
}

impl std::str::FromStr for PlatformPreset {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascend910b" | "910b" => Ok(Self::Ascend910B),
            "ascend310p" | "310p" => Ok(Self::Ascend310P),
            other => Err(format!("unknown platform preset: {other}")),
        }
    }
}

/// Source of platform facts for a tiling decision.
pub trait PlatformInfo {
    /// Snapshot of the platform the convolution will run on.
    fn platform(&self) -> PlatformDescriptor;
}

impl PlatformInfo for PlatformDescriptor {
    fn platform(&self) -> PlatformDescriptor {
        self.clone()
    }
}

impl PlatformInfo for PlatformPreset {
    fn platform(&self) -> PlatformDescriptor {
        self.descriptor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cleared_env() -> Vec<(&'static str, Option<&'static str>)> {
        ENV_OVERRIDES.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn test_presets_are_valid() {
        for preset in PlatformPreset::ALL {
            assert!(preset.descriptor().validate().is_ok(), "{preset}");
        }
    }

    #[test]
    fn test_default_toml_round_trips() {
        let toml_str = PlatformDescriptor::default_toml();
        let platform: PlatformDescriptor = toml::from_str(&toml_str).unwrap();
        assert_eq!(platform, PlatformDescriptor::default());
    }

    #[test]
    fn test_min_bandwidth_picks_slower_tier() {
        let platform = PlatformPreset::Ascend910B.descriptor();
        assert_eq!(platform.min_bandwidth(), 32);
    }

    #[test]
    fn test_validation_zero_core_count() {
        let platform = PlatformDescriptor { core_count: 0, ..PlatformDescriptor::default() };
        let err = platform.validate().unwrap_err();
        assert!(err.to_string().contains("core_count must be > 0"));
    }

    #[test]
    fn test_validation_zero_rate() {
        let platform = PlatformDescriptor { ddr_rate: 0, ..PlatformDescriptor::default() };
        let err = platform.validate().unwrap_err();
        assert!(err.to_string().contains("ddr_rate"));
    }

    #[test]
    #[serial(conv3d_env)]
    fn test_from_toml_full() {
        let toml_str = r#"
core_count = 20
l1_size = 524288
l0a_size = 65536
l0b_size = 65536
l0c_size = 131072
l2_rate = 110
ddr_rate = 30
"#;
        temp_env::with_vars(cleared_env(), || {
            let platform = PlatformDescriptor::from_toml(toml_str).unwrap();
            assert_eq!(platform.core_count, 20);
            assert_eq!(platform.l2_rate, 110);
            assert_eq!(platform.min_bandwidth(), 30);
        });
    }

    #[test]
    #[serial(conv3d_env)]
    fn test_env_override_core_count() {
        let mut vars = cleared_env();
        vars[0] = ("CONV3D_PLATFORM_CORE_COUNT", Some("4"));
        temp_env::with_vars(vars, || {
            let platform = PlatformDescriptor::from_preset(PlatformPreset::Ascend910B).unwrap();
            assert_eq!(platform.core_count, 4);
            assert_eq!(platform.l1_size, 512 * 1024);
        });
    }

    #[test]
    #[serial(conv3d_env)]
    fn test_env_override_invalid_value() {
        let mut vars = cleared_env();
        vars[1] = ("CONV3D_PLATFORM_L1_SIZE", Some("big"));
        temp_env::with_vars(vars, || {
            let err = PlatformDescriptor::from_preset(PlatformPreset::Ascend310P).unwrap_err();
            match err {
                PlatformError::EnvOverride { key, .. } => {
                    assert_eq!(key, "CONV3D_PLATFORM_L1_SIZE");
                }
                other => panic!("expected EnvOverride, got: {other}"),
            }
        });
    }

    #[test]
    #[serial(conv3d_env)]
    fn test_load_from_tempfile() {
        temp_env::with_vars(cleared_env(), || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("platform.toml");
            std::fs::write(&path, PlatformDescriptor::default_toml()).unwrap();
            let platform = PlatformDescriptor::load(&path).unwrap();
            assert_eq!(platform, PlatformDescriptor::default());
        });
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = PlatformDescriptor::load(Path::new("/nonexistent/platform.toml"));
        assert!(matches!(result, Err(PlatformError::Io(_))));
    }

    #[test]
    fn test_preset_display_roundtrip() {
        for preset in PlatformPreset::ALL {
            let parsed: PlatformPreset = preset.to_string().parse().unwrap();
            assert_eq!(*preset, parsed);
        }
    }

    #[test]
    fn test_platform_info_for_preset() {
        let platform = PlatformPreset::Ascend310P.platform();
        assert_eq!(platform.core_count, 8);
    }
}
