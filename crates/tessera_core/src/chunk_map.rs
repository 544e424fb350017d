use std::sync::Arc;

use glam::IVec3;
use rustc_hash::FxHashMap;
use tracing::trace;

use tessera_shared::block::BlockId;
use tessera_shared::chunk::ChunkBlockData;
use tessera_shared::coords::{world_to_chunk, ChunkPos};
use tessera_shared::neighborhood::{BlockInstance, ChunkNeighborhoodView, NeighborLookup};
use tessera_shared::orientation::BlockOrientation;

/// Offsets of the eight chunks around a centre chunk.
pub const NEIGHBOR_OFFSETS: [ChunkPos; 8] = [
    ChunkPos::new(-1, -1),
    ChunkPos::new(0, -1),
    ChunkPos::new(1, -1),
    ChunkPos::new(-1, 0),
    ChunkPos::new(1, 0),
    ChunkPos::new(-1, 1),
    ChunkPos::new(0, 1),
    ChunkPos::new(1, 1),
];

/// Loaded chunks keyed by position. Chunks are shared so model requests can
/// snapshot them without copying; edits go through copy-on-write.
#[derive(Default)]
pub struct ChunkMap {
    chunks: FxHashMap<ChunkPos, Arc<ChunkBlockData>>,
}

impl ChunkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: ChunkPos, chunk: ChunkBlockData) {
        self.chunks.insert(pos, Arc::new(chunk));
    }

    pub fn remove(&mut self, pos: ChunkPos) -> Option<Arc<ChunkBlockData>> {
        self.chunks.remove(&pos)
    }

    pub fn get(&self, pos: ChunkPos) -> Option<&ChunkBlockData> {
        self.chunks.get(&pos).map(Arc::as_ref)
    }

    pub fn snapshot(&self, pos: ChunkPos) -> Option<Arc<ChunkBlockData>> {
        self.chunks.get(&pos).cloned()
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }

    /// Borrowed view of `center` and whichever of its neighbours are loaded.
    pub fn view(&self, center: ChunkPos) -> Option<ChunkNeighborhoodView<'_>> {
        let chunk = self.get(center)?;
        let view = NEIGHBOR_OFFSETS
            .iter()
            .fold(ChunkNeighborhoodView::new(center, chunk), |view, offset| {
                match self.get(center + *offset) {
                    Some(neighbor) => view.with_neighbor(*offset, neighbor),
                    None => view,
                }
            });
        Some(view)
    }

    /// Writes one block. Returns `false` when the position is outside the
    /// world or its chunk is not loaded.
    pub fn set_block(&mut self, world: IVec3, id: BlockId, orientation: BlockOrientation) -> bool {
        let Some((chunk_pos, local)) = world_to_chunk(world) else {
            return false;
        };
        let Some(chunk) = self.chunks.get_mut(&chunk_pos) else {
            return false;
        };
        Arc::make_mut(chunk).set(local, id, orientation);
        trace!("set block {} at {} in chunk {}", id.0, world, chunk_pos);
        true
    }
}

impl NeighborLookup for ChunkMap {
    fn block_at(&self, world: IVec3) -> BlockInstance<'_> {
        let Some((chunk_pos, local)) = world_to_chunk(world) else {
            return BlockInstance::VOID;
        };
        match self.get(chunk_pos) {
            Some(chunk) => chunk.instance(local),
            None => BlockInstance::VOID,
        }
    }

    fn column_height(&self, x: i32, z: i32) -> Option<i32> {
        let (chunk_pos, local) = world_to_chunk(IVec3::new(x, 0, z))?;
        self.get(chunk_pos)
            .map(|chunk| chunk.height(usize::from(local.x), usize::from(local.z)))
    }
}
