use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::block::{BlockDescription, BlockId};
use crate::block_types::{CubeBlock, LightBlock, PlantBlock, SlabBlock, TranslucentBlock};
use crate::brightness::BlockBrightness;
use crate::coords::CHUNK_SIZE_Y;
use crate::lighting::LightingConfig;
use crate::model::{FaceTiles, RenderEffect};
use crate::registry::{register_builtin_blocks, BlockRegistry, RegistryError};
use crate::worldgen::{
    FlatLandGenerator, LandGenerator, NoiseLandGenerator, NoiseParams, TerrainPalette,
    DEFAULT_WORLD_SEED,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse world config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("config refers to unknown block `{0}`")]
    UnknownBlock(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Everything needed to stand up a world: lighting tunables, the land
/// generator and any blocks added on top of the builtin set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub lighting: LightingConfig,
    pub generator: GeneratorConfig,
    pub blocks: Vec<BlockDefinition>,
}

impl WorldConfig {
    /// Parses and validates already-read TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = toml::from_str(source).map_err(|err| {
            warn!("rejected world config: {err}");
            ConfigError::from(err)
        })?;
        if let Err(err) = config.validate() {
            warn!("rejected world config: {err}");
            return Err(err);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lighting.falloff == 0 {
            return Err(invalid("lighting.falloff", "must be at least 1"));
        }
        self.generator.validate()?;
        for block in &self.blocks {
            block.validate()?;
        }
        Ok(())
    }

    /// Builtin blocks plus the configured definitions.
    pub fn build_registry(&self) -> Result<BlockRegistry, ConfigError> {
        let mut registry = register_builtin_blocks();
        register_definitions(&mut registry, &self.blocks)?;
        Ok(registry)
    }

    pub fn build_generator(
        &self,
        registry: &BlockRegistry,
    ) -> Result<Box<dyn LandGenerator>, ConfigError> {
        self.generator.build(registry)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    Flat(FlatSettings),
    Noise(NoiseSettings),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig::Noise(NoiseSettings::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatSettings {
    pub height: usize,
    pub surface: String,
    pub filler: String,
    pub bedrock: Option<String>,
}

impl Default for FlatSettings {
    fn default() -> Self {
        Self {
            height: 5,
            surface: "grass".to_string(),
            filler: "dirt".to_string(),
            bedrock: Some("bedrock".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub seed: u32,
    pub base_height: i32,
    pub amplitude: f64,
    pub frequency: f64,
    pub sea_level: i32,
    pub dirt_depth: i32,
    pub decoration_rarity: u64,
    pub stone: String,
    pub dirt: String,
    pub grass: String,
    pub sand: String,
    pub water: String,
    pub bedrock: String,
    pub decoration: Option<String>,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        let params = NoiseParams::default();
        Self {
            seed: DEFAULT_WORLD_SEED,
            base_height: params.base_height,
            amplitude: params.amplitude,
            frequency: params.frequency,
            sea_level: params.sea_level,
            dirt_depth: params.dirt_depth,
            decoration_rarity: params.decoration_rarity,
            stone: "stone".to_string(),
            dirt: "dirt".to_string(),
            grass: "grass".to_string(),
            sand: "sand".to_string(),
            water: "water".to_string(),
            bedrock: "bedrock".to_string(),
            decoration: Some("flower".to_string()),
        }
    }
}

fn resolve_block(registry: &BlockRegistry, name: &str) -> Result<BlockId, ConfigError> {
    registry
        .id_of(name)
        .ok_or_else(|| ConfigError::UnknownBlock(name.to_string()))
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            GeneratorConfig::Flat(flat) => {
                if flat.height == 0 || flat.height >= CHUNK_SIZE_Y {
                    return Err(invalid(
                        "generator.height",
                        format!("must be in 1..{CHUNK_SIZE_Y}, got {}", flat.height),
                    ));
                }
            }
            GeneratorConfig::Noise(noise) => {
                let max_y = CHUNK_SIZE_Y as i32 - 2;
                if !(noise.frequency.is_finite() && noise.frequency > 0.0) {
                    return Err(invalid("generator.frequency", "must be a positive number"));
                }
                if !(noise.amplitude.is_finite() && noise.amplitude >= 0.0) {
                    return Err(invalid("generator.amplitude", "must not be negative"));
                }
                if !(1..=max_y).contains(&noise.base_height) {
                    return Err(invalid(
                        "generator.base_height",
                        format!("must be in 1..={max_y}, got {}", noise.base_height),
                    ));
                }
                if !(0..=max_y).contains(&noise.sea_level) {
                    return Err(invalid(
                        "generator.sea_level",
                        format!("must be in 0..={max_y}, got {}", noise.sea_level),
                    ));
                }
                if noise.dirt_depth < 0 {
                    return Err(invalid("generator.dirt_depth", "must not be negative"));
                }
                if noise.decoration_rarity == 0 {
                    return Err(invalid("generator.decoration_rarity", "must be at least 1"));
                }
            }
        }
        Ok(())
    }

    /// Resolves layer block names against `registry`.
    pub fn build(&self, registry: &BlockRegistry) -> Result<Box<dyn LandGenerator>, ConfigError> {
        match self {
            GeneratorConfig::Flat(flat) => {
                let mut generator = FlatLandGenerator::new(
                    flat.height,
                    resolve_block(registry, &flat.surface)?,
                    resolve_block(registry, &flat.filler)?,
                );
                if let Some(bedrock) = &flat.bedrock {
                    generator = generator.with_bedrock(resolve_block(registry, bedrock)?);
                }
                debug!("using flat land generator, {} layers", flat.height);
                Ok(Box::new(generator))
            }
            GeneratorConfig::Noise(noise) => {
                let palette = TerrainPalette {
                    stone: resolve_block(registry, &noise.stone)?,
                    dirt: resolve_block(registry, &noise.dirt)?,
                    grass: resolve_block(registry, &noise.grass)?,
                    sand: resolve_block(registry, &noise.sand)?,
                    water: resolve_block(registry, &noise.water)?,
                    bedrock: resolve_block(registry, &noise.bedrock)?,
                    decoration: noise
                        .decoration
                        .as_deref()
                        .map(|name| resolve_block(registry, name))
                        .transpose()?,
                };
                let params = NoiseParams {
                    seed: noise.seed,
                    base_height: noise.base_height,
                    amplitude: noise.amplitude,
                    frequency: noise.frequency,
                    sea_level: noise.sea_level,
                    dirt_depth: noise.dirt_depth,
                    decoration_rarity: noise.decoration_rarity,
                };
                debug!("using noise land generator, seed {:#x}", noise.seed);
                Ok(Box::new(NoiseLandGenerator::new(params, palette)))
            }
        }
    }
}

/// Atlas tiles for a block: one tile for every face, or top/bottom/side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileSpec {
    Uniform(u16),
    Faces { top: u16, bottom: u16, side: u16 },
}

impl TileSpec {
    pub fn to_face_tiles(self) -> FaceTiles {
        match self {
            TileSpec::Uniform(tile) => FaceTiles::uniform(tile),
            TileSpec::Faces { top, bottom, side } => FaceTiles::top_bottom_sides(top, bottom, side),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cutout() -> RenderEffect {
    RenderEffect::Cutout
}

fn default_plant_height() -> f32 {
    1.0
}

/// A data-driven block, mapped onto one of the builtin description kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockDefinition {
    Cube {
        name: String,
        tiles: TileSpec,
        #[serde(default)]
        emission: Option<BlockBrightness>,
        #[serde(default)]
        glow: Option<u16>,
        #[serde(default)]
        extra_data: bool,
    },
    Translucent {
        name: String,
        tiles: TileSpec,
        #[serde(default)]
        attenuation: BlockBrightness,
        #[serde(default = "default_cutout")]
        effect: RenderEffect,
        #[serde(default = "default_true")]
        solid: bool,
    },
    Slab {
        name: String,
        tiles: TileSpec,
    },
    Plant {
        name: String,
        tile: u16,
        #[serde(default = "default_plant_height")]
        height: f32,
    },
    Light {
        name: String,
        tile: u16,
        emission: BlockBrightness,
        #[serde(default)]
        glow: Option<u16>,
    },
}

impl BlockDefinition {
    pub fn name(&self) -> &str {
        match self {
            BlockDefinition::Cube { name, .. }
            | BlockDefinition::Translucent { name, .. }
            | BlockDefinition::Slab { name, .. }
            | BlockDefinition::Plant { name, .. }
            | BlockDefinition::Light { name, .. } => name,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name().trim().is_empty() {
            return Err(invalid("blocks.name", "must not be empty"));
        }
        match self {
            BlockDefinition::Plant { height, .. } if !(*height > 0.0 && *height <= 1.0) => Err(
                invalid("blocks.height", format!("`{}`: must be in (0, 1]", self.name())),
            ),
            BlockDefinition::Light { emission, .. } if emission.is_dark() => Err(invalid(
                "blocks.emission",
                format!("`{}`: a light block must emit something", self.name()),
            )),
            _ => Ok(()),
        }
    }

    pub fn to_description(&self) -> Result<Arc<dyn BlockDescription>, ConfigError> {
        self.validate()?;
        let description: Arc<dyn BlockDescription> = match self {
            BlockDefinition::Cube {
                name,
                tiles,
                emission,
                glow,
                extra_data,
            } => {
                let mut cube = CubeBlock::new(name, tiles.to_face_tiles());
                if let Some(emission) = emission {
                    cube = cube.with_emission(*emission);
                }
                if let Some(glow) = glow {
                    cube = cube.with_glow(*glow);
                }
                if *extra_data {
                    cube = cube.with_extra_data();
                }
                Arc::new(cube)
            }
            BlockDefinition::Translucent {
                name,
                tiles,
                attenuation,
                effect,
                solid,
            } => Arc::new(TranslucentBlock::new(
                name,
                tiles.to_face_tiles(),
                *attenuation,
                *effect,
                *solid,
            )),
            BlockDefinition::Slab { name, tiles } => {
                Arc::new(SlabBlock::new(name, tiles.to_face_tiles()))
            }
            BlockDefinition::Plant { name, tile, height } => {
                Arc::new(PlantBlock::new(name, *tile, *height))
            }
            BlockDefinition::Light {
                name,
                tile,
                emission,
                glow,
            } => Arc::new(LightBlock::new(name, *tile, *glow, *emission)),
        };
        Ok(description)
    }
}

/// Registers every definition in order, returning the assigned ids.
pub fn register_definitions(
    registry: &mut BlockRegistry,
    definitions: &[BlockDefinition],
) -> Result<Vec<BlockId>, ConfigError> {
    definitions
        .iter()
        .map(|definition| -> Result<BlockId, ConfigError> {
            let description = definition.to_description()?;
            Ok(registry.register(definition.name(), description)?)
        })
        .collect()
}
