use std::collections::VecDeque;

use glam::IVec3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::brightness::{BlockBrightness, MAX_CHANNEL};
use crate::coords::{ChunkPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::neighborhood::NeighborLookup;
use crate::registry::BlockRegistry;

const WINDOW_X: usize = CHUNK_SIZE_X + 2;
const WINDOW_Z: usize = CHUNK_SIZE_Z + 2;
const MAX_MARGIN: usize = 16;
const NEIGHBOR_OFFSETS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Lighting tunables, supplied by the world config.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightingConfig {
    /// Sky channel value of cells open to the sky.
    pub sky_level: u8,
    /// Subtracted from every channel per step of propagation.
    pub falloff: u8,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sky_level: MAX_CHANNEL,
            falloff: 17,
        }
    }
}

impl LightingConfig {
    /// How far outside the chunk emitters can still reach into it.
    pub fn margin(&self) -> usize {
        let falloff = usize::from(self.falloff.max(1));
        (usize::from(MAX_CHANNEL) / falloff + 2).min(MAX_MARGIN)
    }

    pub fn sky(&self) -> BlockBrightness {
        BlockBrightness::new(0, 0, 0, self.sky_level)
    }
}

/// Light levels for a chunk and a one-cell ring around it, addressed with
/// chunk-local coordinates in `-1..=CHUNK_SIZE`.
#[derive(Clone, Debug, PartialEq)]
pub struct BrightnessMap {
    levels: Vec<BlockBrightness>,
    above: BlockBrightness,
}

impl BrightnessMap {
    /// Every cell (and the space above the world) at `level`.
    pub fn uniform(level: BlockBrightness) -> Self {
        Self {
            levels: vec![level; WINDOW_X * CHUNK_SIZE_Y * WINDOW_Z],
            above: level,
        }
    }

    pub fn get(&self, local: IVec3) -> BlockBrightness {
        if local.y >= CHUNK_SIZE_Y as i32 {
            return self.above;
        }
        match window_index(local) {
            Some(index) => self.levels[index],
            None => BlockBrightness::DARK,
        }
    }
}

fn window_index(local: IVec3) -> Option<usize> {
    let x = usize::try_from(local.x + 1).ok()?;
    let y = usize::try_from(local.y).ok()?;
    let z = usize::try_from(local.z + 1).ok()?;
    if x >= WINDOW_X || y >= CHUNK_SIZE_Y || z >= WINDOW_Z {
        return None;
    }
    Some(x + z * WINDOW_X + y * WINDOW_X * WINDOW_Z)
}

/// Flood-fills block and sky light over the chunk at `chunk_pos` plus enough
/// margin for outside emitters to reach in, then keeps the one-cell window the
/// model builder samples.
///
/// Cells above the topmost non-void block of their column start at full sky,
/// emitters start at their initial brightness, and every step subtracts the
/// falloff plus the entered cell's attenuation. Sky light travelling straight
/// down from full sky loses nothing but attenuation. Contributions only merge
/// with `max`.
///
/// Light sources neither attenuate light nor shade the sky below them, so
/// placing one can only raise levels and removing one can only lower them.
pub fn compute_chunk_light(
    lookup: &dyn NeighborLookup,
    chunk_pos: ChunkPos,
    registry: &BlockRegistry,
    config: &LightingConfig,
) -> BrightnessMap {
    let margin = config.margin();
    let size_x = CHUNK_SIZE_X + 2 * margin;
    let size_z = CHUNK_SIZE_Z + 2 * margin;
    let volume = size_x * CHUNK_SIZE_Y * size_z;
    let base = chunk_pos.origin() - IVec3::new(margin as i32, 0, margin as i32);
    let index_of = |x: usize, y: usize, z: usize| x + z * size_x + y * size_x * size_z;

    let sky = config.sky();
    let falloff = BlockBrightness::uniform(config.falloff);
    let mut attenuation = vec![BlockBrightness::DARK; volume];
    let mut light = vec![BlockBrightness::DARK; volume];
    let mut queue = VecDeque::new();

    for z in 0..size_z {
        for x in 0..size_x {
            let column = base + IVec3::new(x as i32, 0, z as i32);
            // Unloaded columns get no sky.
            let mut open_sky = lookup.column_height(column.x, column.z).is_some();
            for y in (0..CHUNK_SIZE_Y).rev() {
                let index = index_of(x, y, z);
                let instance = lookup.block_at(column + IVec3::new(0, y as i32, 0));
                let description = registry.description(instance.id);

                let mut seed = BlockBrightness::DARK;
                if description.is_light_source() {
                    seed = description.initial_brightness();
                } else {
                    attenuation[index] = description.light_attenuation();
                    open_sky &= instance.id.is_void();
                }
                if open_sky {
                    seed = seed.max(sky);
                }
                if !seed.is_dark() {
                    light[index] = seed;
                    queue.push_back(index);
                }
            }
        }
    }

    let layer = size_x * size_z;
    while let Some(index) = queue.pop_front() {
        let source = light[index];
        let y = index / layer;
        let rem = index % layer;
        let z = rem / size_x;
        let x = rem % size_x;

        for (dx, dy, dz) in NEIGHBOR_OFFSETS {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            let nz = z as i32 + dz;
            if nx < 0
                || ny < 0
                || nz < 0
                || nx >= size_x as i32
                || ny >= CHUNK_SIZE_Y as i32
                || nz >= size_z as i32
            {
                continue;
            }

            let neighbor = index_of(nx as usize, ny as usize, nz as usize);
            let mut candidate = source.attenuate(falloff);
            if dy == -1 && source.sky() == config.sky_level {
                candidate = candidate.with_sky(config.sky_level);
            }
            candidate = candidate.attenuate(attenuation[neighbor]);

            let merged = light[neighbor].max(candidate);
            if merged != light[neighbor] {
                light[neighbor] = merged;
                queue.push_back(neighbor);
            }
        }
    }

    let mut levels = vec![BlockBrightness::DARK; WINDOW_X * CHUNK_SIZE_Y * WINDOW_Z];
    for y in 0..CHUNK_SIZE_Y {
        for z in 0..WINDOW_Z {
            for x in 0..WINDOW_X {
                let region = index_of(x + margin - 1, y, z + margin - 1);
                levels[x + z * WINDOW_X + y * WINDOW_X * WINDOW_Z] = light[region];
            }
        }
    }

    trace!("lit chunk {} with a {}-cell margin", chunk_pos, margin);
    BrightnessMap { levels, above: sky }
}
