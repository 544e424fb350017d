use std::fmt;

use noise::{NoiseFn, Perlin};
use tracing::trace;

use crate::block::BlockId;
use crate::chunk::ChunkBlockData;
use crate::coords::{ChunkPos, LocalPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};

pub const DEFAULT_WORLD_SEED: u32 = 0xC0FFEE;

/// Fills fresh chunks. Output must depend only on the chunk position and the
/// generator's own parameters.
pub trait LandGenerator: Send + Sync + fmt::Debug {
    /// Overwrites every cell of `data` and leaves its height cache current.
    fn generate(&self, pos: ChunkPos, data: &mut ChunkBlockData);
}

pub fn generate_chunk(generator: &dyn LandGenerator, pos: ChunkPos) -> ChunkBlockData {
    let mut data = ChunkBlockData::new_void();
    generator.generate(pos, &mut data);
    data
}

/// `height` solid layers: optional bedrock at the bottom, filler, and one
/// surface layer on top.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLandGenerator {
    pub height: usize,
    pub surface: BlockId,
    pub filler: BlockId,
    pub bedrock: Option<BlockId>,
}

impl FlatLandGenerator {
    pub fn new(height: usize, surface: BlockId, filler: BlockId) -> Self {
        Self {
            height: height.min(CHUNK_SIZE_Y),
            surface,
            filler,
            bedrock: None,
        }
    }

    pub fn with_bedrock(mut self, bedrock: BlockId) -> Self {
        self.bedrock = Some(bedrock);
        self
    }

    fn layer(&self, y: usize) -> BlockId {
        if y + 1 == self.height {
            self.surface
        } else if y == 0 {
            self.bedrock.unwrap_or(self.filler)
        } else {
            self.filler
        }
    }
}

impl LandGenerator for FlatLandGenerator {
    fn generate(&self, pos: ChunkPos, data: &mut ChunkBlockData) {
        data.clear();
        for y in 0..self.height {
            let id = self.layer(y);
            for z in 0..CHUNK_SIZE_Z {
                for x in 0..CHUNK_SIZE_X {
                    data.set_raw(LocalPos::from_usize(x, y, z), id);
                }
            }
        }
        data.recompute_heights();
        trace!("generated flat chunk {} ({} layers)", pos, self.height);
    }
}

/// Block ids the noise generator lays down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainPalette {
    pub stone: BlockId,
    pub dirt: BlockId,
    pub grass: BlockId,
    pub sand: BlockId,
    pub water: BlockId,
    pub bedrock: BlockId,
    pub decoration: Option<BlockId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    pub seed: u32,
    pub base_height: i32,
    pub amplitude: f64,
    pub frequency: f64,
    pub sea_level: i32,
    pub dirt_depth: i32,
    /// One in `decoration_rarity` grass columns gets a decoration block.
    pub decoration_rarity: u64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_WORLD_SEED,
            base_height: 48,
            amplitude: 18.0,
            frequency: 0.008,
            sea_level: 44,
            dirt_depth: 3,
            decoration_rarity: 23,
        }
    }
}

/// Rolling Perlin terrain with beaches and water up to sea level.
#[derive(Debug, Clone)]
pub struct NoiseLandGenerator {
    params: NoiseParams,
    palette: TerrainPalette,
    terrain: Perlin,
}

impl NoiseLandGenerator {
    pub fn new(params: NoiseParams, palette: TerrainPalette) -> Self {
        Self {
            params,
            palette,
            terrain: Perlin::new(params.seed),
        }
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    pub fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        let wx = f64::from(world_x);
        let wz = f64::from(world_z);
        let frequency = self.params.frequency;

        let coarse = self.terrain.get([wx * frequency, wz * frequency]);
        let detail = self
            .terrain
            .get([wx * frequency * 4.0 + 101.3, wz * frequency * 4.0 - 73.7])
            * 0.35;

        let height = f64::from(self.params.base_height) + (coarse + detail) * self.params.amplitude;
        (height.round() as i32).clamp(1, CHUNK_SIZE_Y as i32 - 2)
    }

    fn should_decorate(&self, world_x: i32, world_z: i32) -> bool {
        let hash = u64::from(self.params.seed)
            .wrapping_mul(6364136223846793005)
            .wrapping_add((world_x as i64 as u64).wrapping_mul(2654435761))
            .wrapping_add((world_z as i64 as u64).wrapping_mul(40503));
        (hash >> 8) % self.params.decoration_rarity.max(1) == 0
    }

    fn column_block(&self, y: i32, surface: i32) -> BlockId {
        let palette = &self.palette;
        let beach = surface <= self.params.sea_level + 1;
        if y == 0 {
            palette.bedrock
        } else if y < surface - self.params.dirt_depth {
            palette.stone
        } else if y < surface {
            if beach {
                palette.sand
            } else {
                palette.dirt
            }
        } else if y == surface {
            if beach {
                palette.sand
            } else {
                palette.grass
            }
        } else if y <= self.params.sea_level {
            palette.water
        } else {
            BlockId::VOID
        }
    }
}

impl LandGenerator for NoiseLandGenerator {
    fn generate(&self, pos: ChunkPos, data: &mut ChunkBlockData) {
        data.clear();
        let origin = pos.origin();

        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                let world_x = origin.x + x as i32;
                let world_z = origin.z + z as i32;
                let surface = self.surface_height(world_x, world_z);
                let top = surface.max(self.params.sea_level);

                for y in 0..=top {
                    let id = self.column_block(y, surface);
                    if !id.is_void() {
                        data.set_raw(LocalPos::from_usize(x, y as usize, z), id);
                    }
                }

                let grass_top = surface > self.params.sea_level + 1;
                if let Some(decoration) = self.palette.decoration {
                    if grass_top && self.should_decorate(world_x, world_z) {
                        data.set_raw(
                            LocalPos::from_usize(x, surface as usize + 1, z),
                            decoration,
                        );
                    }
                }
            }
        }

        data.recompute_heights();
        trace!(
            "generated noise chunk {} ({} blocks)",
            pos,
            data.count_non_void()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{
        generate_chunk, FlatLandGenerator, LandGenerator, NoiseLandGenerator, NoiseParams,
        TerrainPalette,
    };
    use crate::chunk::ChunkBlockData;
    use crate::coords::{ChunkPos, LocalPos, CHUNK_SIZE_X, CHUNK_SIZE_Z};
    use crate::registry::{register_builtin_blocks, BlockRegistry};

    fn palette(registry: &BlockRegistry) -> TerrainPalette {
        let id = |name: &str| registry.id_of(name).expect(name);
        TerrainPalette {
            stone: id("stone"),
            dirt: id("dirt"),
            grass: id("grass"),
            sand: id("sand"),
            water: id("water"),
            bedrock: id("bedrock"),
            decoration: Some(id("flower")),
        }
    }

    #[test]
    fn flat_generation_is_reproducible() {
        let registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        let grass = registry.id_of("grass").expect("grass");
        let generator = FlatLandGenerator::new(5, grass, stone);
        let pos = ChunkPos::new(-4, 9);

        let mut first = ChunkBlockData::new_void();
        let mut second = ChunkBlockData::new_void();
        generator.generate(pos, &mut first);
        generator.generate(pos, &mut second);

        assert!(first.same_blocks(&second));
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                assert_eq!(first.height(x, z), 4);
            }
        }
        assert_eq!(first.get_id(LocalPos::new(3, 4, 3)), grass);
        assert_eq!(first.get_id(LocalPos::new(3, 0, 3)), stone);
        assert!(first.get_id(LocalPos::new(3, 5, 3)).is_void());
    }

    #[test]
    fn flat_generation_overwrites_previous_contents() {
        let registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        let bedrock = registry.id_of("bedrock").expect("bedrock");
        let generator = FlatLandGenerator::new(2, stone, stone).with_bedrock(bedrock);

        let mut data = ChunkBlockData::new_void();
        data.set_raw(LocalPos::new(1, 60, 1), stone);
        generator.generate(ChunkPos::new(0, 0), &mut data);

        assert!(data.get_id(LocalPos::new(1, 60, 1)).is_void());
        assert_eq!(data.height(1, 1), 1);
        assert_eq!(data.get_id(LocalPos::new(1, 0, 1)), bedrock);
    }

    #[test]
    fn noise_generation_is_deterministic_and_seeded() {
        let registry = register_builtin_blocks();
        let generator = NoiseLandGenerator::new(NoiseParams::default(), palette(&registry));
        let pos = ChunkPos::new(2, -3);

        let first = generate_chunk(&generator, pos);
        let second = generate_chunk(&generator, pos);
        assert!(first.same_blocks(&second));

        let reseeded = NoiseLandGenerator::new(
            NoiseParams {
                seed: 7,
                amplitude: 40.0,
                ..NoiseParams::default()
            },
            palette(&registry),
        );
        let heights_differ = (0..8).any(|i| {
            generator.surface_height(i * 97, i * 31) != reseeded.surface_height(i * 97, i * 31)
        });
        assert!(heights_differ);
    }

    #[test]
    fn noise_columns_are_filled_up_to_sea_level() {
        let registry = register_builtin_blocks();
        let params = NoiseParams::default();
        let generator = NoiseLandGenerator::new(params, palette(&registry));
        let data = generate_chunk(&generator, ChunkPos::new(0, 0));

        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                assert!(data.height(x, z) >= params.sea_level);
                assert!(!data.get_id(LocalPos::from_usize(x, 0, z)).is_void());
            }
        }
    }
}
