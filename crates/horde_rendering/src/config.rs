//! Render configuration.
//!
//! Loaded once from TOML at startup. Everything the renderer needs that is
//! not entity state lives here: materials, sorting priorities, creep
//! profiles with their animation tables, VFX atlases and overlay styles.
//!
//! ```toml
//! max_instances = 8192
//! quad_mesh = 1
//!
//! [health_bar]
//! material = 10
//! sorting_priority = 1000
//!
//! [[creeps]]
//! kind = 1
//! material = 20
//! run = [{ uv = [0.0, 0.0, 0.25, 0.25] }]
//! death = [{ uv = [0.0, 0.25, 0.25, 0.25] }]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::kernels::{DebuffStyle, DebuffStyles, VfxAtlas, VfxFrame, VfxRange};
use crate::profile::{AnimationFrame, AnimationTable, SharedRenderProfile};

fn default_fill_chunk_size() -> usize {
    64
}

fn default_scale() -> f32 {
    1.0
}

fn default_white() -> [f32; 4] {
    [1.0; 4]
}

/// Material and priority of a fixed batch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Material handle.
    pub material: u32,
    /// Sorting priority.
    #[serde(default)]
    pub sorting_priority: i32,
}

/// A status overlay batch and its placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Material handle.
    pub material: u32,
    /// Sorting priority.
    #[serde(default)]
    pub sorting_priority: i32,
    /// Placement; defaults to the built-in style for the overlay.
    #[serde(default)]
    pub style: Option<DebuffStyle>,
}

/// A VFX batch and its atlas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VfxConfig {
    /// Material handle.
    pub material: u32,
    /// Sorting priority.
    #[serde(default)]
    pub sorting_priority: i32,
    /// Number of weapon kinds.
    pub weapon_kinds: u32,
    /// Shared frame list.
    pub frames: Vec<VfxFrame>,
    /// Two ranges per weapon kind: plain ones first, enhanced ones after.
    pub ranges: Vec<VfxRange>,
}

impl VfxConfig {
    /// Validates and builds the atlas.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] for inconsistent ranges.
    pub fn atlas(&self, name: &str) -> RenderResult<VfxAtlas> {
        VfxAtlas::new(name, self.frames.clone(), self.ranges.clone(), self.weapon_kinds)
    }
}

/// Visual parameters of one creep kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreepRenderConfig {
    /// Creep kind.
    pub kind: u32,
    /// Material handle.
    pub material: u32,
    /// Sorting priority.
    #[serde(default)]
    pub sorting_priority: i32,
    /// Base sprite scale.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Tint while dying.
    #[serde(default = "default_white")]
    pub death_color: [f32; 4],
    /// Health bar height above the creep.
    #[serde(default)]
    pub hp_bar_offset: f32,
    /// Health bar width.
    #[serde(default = "default_scale")]
    pub hp_bar_width: f32,
    /// Seconds per run frame.
    #[serde(default)]
    pub time_between_run_frames: f32,
    /// Seconds per death frame.
    #[serde(default)]
    pub time_between_die_frames: f32,
    /// Run cycle.
    pub run: Vec<AnimationFrame>,
    /// Death sequence.
    pub death: Vec<AnimationFrame>,
}

impl CreepRenderConfig {
    /// Builds the shared profile.
    ///
    /// # Errors
    ///
    /// [`RenderError::EmptyAnimationTable`] for an empty run or death table.
    pub fn profile(&self) -> RenderResult<SharedRenderProfile> {
        Ok(SharedRenderProfile {
            kind: self.kind,
            scale: self.scale,
            death_color: self.death_color,
            hp_bar_offset: self.hp_bar_offset,
            hp_bar_width: self.hp_bar_width,
            time_between_run_frames: self.time_between_run_frames,
            time_between_die_frames: self.time_between_die_frames,
            run: AnimationTable::new(&format!("creep {} run", self.kind), self.run.clone())?,
            death: AnimationTable::new(&format!("creep {} death", self.kind), self.death.clone())?,
        })
    }
}

/// Full renderer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Capacity of every batch.
    pub max_instances: usize,
    /// Instances per parallel fill job.
    #[serde(default = "default_fill_chunk_size")]
    pub fill_chunk_size: usize,
    /// Seed of the start-frame generator.
    #[serde(default)]
    pub rng_seed: u64,
    /// Mesh handle of the shared quad.
    pub quad_mesh: u32,
    /// Health bars.
    pub health_bar: BatchConfig,
    /// "Not heading in" warning overlay.
    pub warning: OverlayConfig,
    /// Stun overlay.
    pub stun: OverlayConfig,
    /// Fear overlay.
    pub fear: OverlayConfig,
    /// Muzzle flashes.
    pub muzzle: VfxConfig,
    /// Impacts.
    pub impact: VfxConfig,
    /// One entry per creep kind.
    #[serde(default)]
    pub creeps: Vec<CreepRenderConfig>,
}

impl RenderConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`RenderError::ConfigParse`] or any [`validate`](Self::validate) error.
    pub fn from_toml_str(source: &str) -> RenderResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`RenderError::ConfigIo`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RenderError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks everything that would otherwise fail during initialization.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`], [`RenderError::EmptyAnimationTable`].
    pub fn validate(&self) -> RenderResult<()> {
        if self.max_instances == 0 {
            return Err(RenderError::InvalidConfig("max_instances must be non-zero".into()));
        }
        if self.fill_chunk_size == 0 {
            return Err(RenderError::InvalidConfig("fill_chunk_size must be non-zero".into()));
        }
        self.muzzle.atlas("muzzle")?;
        self.impact.atlas("impact")?;
        for creep in &self.creeps {
            creep.profile()?;
        }
        Ok(())
    }

    /// Overlay styles, falling back to the built-in ones.
    #[must_use]
    pub fn debuff_styles(&self) -> DebuffStyles {
        let defaults = DebuffStyles::default();
        DebuffStyles {
            stun: self.stun.style.unwrap_or(defaults.stun),
            warning: self.warning.style.unwrap_or(defaults.warning),
            fear: self.fear.style.unwrap_or(defaults.fear),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../assets/render_config.toml");

    #[test]
    fn test_sample_config_parses() {
        let config = RenderConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.fill_chunk_size, 64);
        assert!(!config.creeps.is_empty());
        assert_eq!(config.muzzle.ranges.len(), 2 * config.muzzle.weapon_kinds as usize);
        let profile = config.creeps[0].profile().unwrap();
        assert!(profile.run_frames() > 0);
    }

    #[test]
    fn test_style_override() {
        let mut config = RenderConfig::from_toml_str(SAMPLE).unwrap();
        let custom = DebuffStyle {
            scale: [1.0, 1.0, 1.0],
            vertical_offset: 0.9,
        };
        config.fear.style = Some(custom);
        let styles = config.debuff_styles();
        assert_eq!(styles.fear, custom);
        assert_eq!(styles.stun, DebuffStyles::default().stun);
    }

    #[test]
    fn test_empty_table_rejected() {
        let mut config = RenderConfig::from_toml_str(SAMPLE).unwrap();
        config.creeps[0].death.clear();
        assert!(matches!(
            config.validate(),
            Err(RenderError::EmptyAnimationTable(_))
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = RenderConfig::from_toml_str(SAMPLE).unwrap();
        config.max_instances = 0;
        assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(
            RenderConfig::from_toml_str("max_instances = \"many\""),
            Err(RenderError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            RenderConfig::load("/definitely/not/here.toml"),
            Err(RenderError::ConfigIo { .. })
        ));
    }
}
