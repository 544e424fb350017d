use rustc_hash::FxHashMap;
use tracing::trace;

use crate::block::{BlockExtraData, BlockId};
use crate::coords::{local_to_index, LocalPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, CHUNK_VOLUME};
use crate::neighborhood::BlockInstance;
use crate::orientation::BlockOrientation;
use crate::registry::BlockRegistry;

/// Height cache value for a column without any non-void block.
pub const EMPTY_COLUMN: i32 = -1;

/// Block storage for one column chunk.
///
/// Ids and orientations are dense; extra data lives in a sparse slot map keyed
/// by cell index. `heights[z][x]` always holds the topmost non-void `y` of the
/// column or [`EMPTY_COLUMN`].
#[derive(Clone, Debug)]
pub struct ChunkBlockData {
    ids: Box<[BlockId]>,
    orientations: Box<[BlockOrientation]>,
    extra: FxHashMap<u32, BlockExtraData>,
    heights: [[i16; CHUNK_SIZE_X]; CHUNK_SIZE_Z],
}

impl ChunkBlockData {
    pub fn new_void() -> Self {
        Self {
            ids: vec![BlockId::VOID; CHUNK_VOLUME].into_boxed_slice(),
            orientations: vec![BlockOrientation::North; CHUNK_VOLUME].into_boxed_slice(),
            extra: FxHashMap::default(),
            heights: [[EMPTY_COLUMN as i16; CHUNK_SIZE_X]; CHUNK_SIZE_Z],
        }
    }

    /// Resets every cell to void and empties the height cache.
    pub fn clear(&mut self) {
        self.ids.fill(BlockId::VOID);
        self.orientations.fill(BlockOrientation::North);
        self.extra.clear();
        for row in &mut self.heights {
            row.fill(EMPTY_COLUMN as i16);
        }
    }

    pub fn get_id(&self, local: LocalPos) -> BlockId {
        self.ids[local_to_index(local)]
    }

    pub fn orientation(&self, local: LocalPos) -> BlockOrientation {
        self.orientations[local_to_index(local)]
    }

    pub fn extra_data(&self, local: LocalPos) -> Option<&BlockExtraData> {
        self.extra.get(&(local_to_index(local) as u32))
    }

    pub fn instance(&self, local: LocalPos) -> BlockInstance<'_> {
        let index = local_to_index(local);
        BlockInstance {
            id: self.ids[index],
            orientation: self.orientations[index],
            brightness: Default::default(),
            extra: self.extra.get(&(index as u32)),
        }
    }

    /// Overwrites a cell, dropping any extra data it held, and keeps the height
    /// cache current.
    pub fn set(&mut self, local: LocalPos, id: BlockId, orientation: BlockOrientation) {
        let index = local_to_index(local);
        self.ids[index] = id;
        self.orientations[index] = orientation;
        self.extra.remove(&(index as u32));
        self.update_column_after_write(local, id);
    }

    /// Places a block together with its extra data. The payload is dropped when
    /// the block's description does not carry extra data.
    pub fn place(
        &mut self,
        registry: &BlockRegistry,
        local: LocalPos,
        id: BlockId,
        orientation: BlockOrientation,
        extra: Option<BlockExtraData>,
    ) {
        self.set(local, id, orientation);
        let Some(extra) = extra else {
            return;
        };
        if registry.description(id).has_extra_data() {
            self.extra.insert(local_to_index(local) as u32, extra);
        } else {
            trace!(
                "dropping extra data for {} at {:?}",
                registry.description(id).name(),
                local
            );
        }
    }

    /// Writes a cell without touching the height cache. Callers must run
    /// [`ChunkBlockData::recompute_heights`] before handing the chunk on.
    pub fn set_raw(&mut self, local: LocalPos, id: BlockId) {
        let index = local_to_index(local);
        self.ids[index] = id;
        self.orientations[index] = BlockOrientation::North;
        self.extra.remove(&(index as u32));
    }

    pub fn height(&self, x: usize, z: usize) -> i32 {
        i32::from(self.heights[z][x])
    }

    pub fn recompute_heights(&mut self) {
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                self.recompute_column_height(x, z);
            }
        }
    }

    pub fn recompute_column_height(&mut self, x: usize, z: usize) {
        self.heights[z][x] = self.scan_column(x, z, CHUNK_SIZE_Y) as i16;
    }

    pub fn count_non_void(&self) -> usize {
        self.ids.iter().filter(|id| !id.is_void()).count()
    }

    /// Block ids, orientations and the height cache all match.
    pub fn same_blocks(&self, other: &Self) -> bool {
        self.ids == other.ids
            && self.orientations == other.orientations
            && self.heights == other.heights
    }

    fn update_column_after_write(&mut self, local: LocalPos, id: BlockId) {
        let x = usize::from(local.x);
        let z = usize::from(local.z);
        let y = i32::from(local.y);
        let current = self.height(x, z);

        if !id.is_void() && y > current {
            self.heights[z][x] = y as i16;
        } else if id.is_void() && y == current {
            self.heights[z][x] = self.scan_column(x, z, local.y as usize) as i16;
        }
    }

    fn scan_column(&self, x: usize, z: usize, below: usize) -> i32 {
        (0..below)
            .rev()
            .find(|&y| !self.ids[local_to_index(LocalPos::from_usize(x, y, z))].is_void())
            .map_or(EMPTY_COLUMN, |y| y as i32)
    }
}

impl Default for ChunkBlockData {
    fn default() -> Self {
        Self::new_void()
    }
}
