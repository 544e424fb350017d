use glam::IVec3;

use crate::block::{BlockExtraData, BlockId};
use crate::brightness::BlockBrightness;
use crate::chunk::ChunkBlockData;
use crate::coords::{world_to_chunk, ChunkPos};
use crate::orientation::{BlockOrientation, Face};
use crate::registry::BlockRegistry;

/// Materialised view of one cell, composed at query time.
#[derive(Clone, Copy, Debug)]
pub struct BlockInstance<'a> {
    pub id: BlockId,
    pub orientation: BlockOrientation,
    pub brightness: BlockBrightness,
    pub extra: Option<&'a BlockExtraData>,
}

impl BlockInstance<'static> {
    pub const VOID: Self = BlockInstance {
        id: BlockId::VOID,
        orientation: BlockOrientation::North,
        brightness: BlockBrightness::DARK,
        extra: None,
    };
}

impl BlockInstance<'_> {
    pub fn is_void(&self) -> bool {
        self.id.is_void()
    }
}

impl Default for BlockInstance<'_> {
    fn default() -> Self {
        BlockInstance::VOID
    }
}

/// Read-only access to blocks around a chunk, supplied by whoever owns the
/// loaded chunks. Positions outside loaded data must yield
/// [`BlockInstance::VOID`] and `None` respectively; they are never errors.
pub trait NeighborLookup {
    fn block_at(&self, world: IVec3) -> BlockInstance<'_>;

    /// Topmost non-void `y` of the world column, `Some(EMPTY_COLUMN)` for an
    /// empty column and `None` when the column is not loaded.
    fn column_height(&self, x: i32, z: i32) -> Option<i32>;
}

/// A chunk together with its eight horizontal neighbours.
#[derive(Clone, Copy, Debug)]
pub struct ChunkNeighborhoodView<'a> {
    center_pos: ChunkPos,
    center: &'a ChunkBlockData,
    // Indexed by (dx + 1) + (dz + 1) * 3; slot 4 mirrors the centre.
    chunks: [Option<&'a ChunkBlockData>; 9],
}

impl<'a> ChunkNeighborhoodView<'a> {
    pub fn new(center_pos: ChunkPos, center: &'a ChunkBlockData) -> Self {
        let mut chunks = [None; 9];
        chunks[4] = Some(center);
        Self {
            center_pos,
            center,
            chunks,
        }
    }

    pub fn with_neighbor(mut self, offset: ChunkPos, chunk: &'a ChunkBlockData) -> Self {
        assert!(
            offset.x.abs() <= 1 && offset.z.abs() <= 1 && offset != ChunkPos::default(),
            "neighbor offset must address one of the eight surrounding chunks: {offset}"
        );
        self.chunks[slot(offset)] = Some(chunk);
        self
    }

    pub fn center_pos(&self) -> ChunkPos {
        self.center_pos
    }

    pub fn center(&self) -> &'a ChunkBlockData {
        self.center
    }

    fn chunk_for(&self, chunk_pos: ChunkPos) -> Option<&'a ChunkBlockData> {
        let offset = chunk_pos - self.center_pos;
        if offset.x.abs() > 1 || offset.z.abs() > 1 {
            return None;
        }
        self.chunks[slot(offset)]
    }
}

fn slot(offset: ChunkPos) -> usize {
    ((offset.x + 1) + (offset.z + 1) * 3) as usize
}

impl NeighborLookup for ChunkNeighborhoodView<'_> {
    fn block_at(&self, world: IVec3) -> BlockInstance<'_> {
        let Some((chunk_pos, local)) = world_to_chunk(world) else {
            return BlockInstance::VOID;
        };
        match self.chunk_for(chunk_pos) {
            Some(chunk) => chunk.instance(local),
            None => BlockInstance::VOID,
        }
    }

    fn column_height(&self, x: i32, z: i32) -> Option<i32> {
        let (chunk_pos, local) = world_to_chunk(IVec3::new(x, 0, z))?;
        self.chunk_for(chunk_pos)
            .map(|chunk| chunk.height(usize::from(local.x), usize::from(local.z)))
    }
}

/// The 3×3×3 cells around a block, indexed `[x][y][z]` with the block itself
/// at `[1][1][1]`.
#[derive(Clone, Copy, Debug)]
pub struct BlockNeighborhood<'a> {
    cells: [[[BlockInstance<'a>; 3]; 3]; 3],
    registry: &'a BlockRegistry,
}

impl<'a> BlockNeighborhood<'a> {
    pub fn new(cells: [[[BlockInstance<'a>; 3]; 3]; 3], registry: &'a BlockRegistry) -> Self {
        Self { cells, registry }
    }

    /// Collects the cells around `center` from `lookup`, then lets `brightness`
    /// fill in each cell's light.
    pub fn gather(
        lookup: &'a dyn NeighborLookup,
        registry: &'a BlockRegistry,
        center: IVec3,
        brightness: impl Fn(IVec3) -> BlockBrightness,
    ) -> Self {
        let mut cells = [[[BlockInstance::VOID; 3]; 3]; 3];
        for (x, plane) in cells.iter_mut().enumerate() {
            for (y, column) in plane.iter_mut().enumerate() {
                for (z, cell) in column.iter_mut().enumerate() {
                    let offset = IVec3::new(x as i32 - 1, y as i32 - 1, z as i32 - 1);
                    let world = center + offset;
                    let mut instance = lookup.block_at(world);
                    instance.brightness = brightness(offset);
                    *cell = instance;
                }
            }
        }
        Self { cells, registry }
    }

    pub fn registry(&self) -> &'a BlockRegistry {
        self.registry
    }

    pub fn center(&self) -> &BlockInstance<'a> {
        &self.cells[1][1][1]
    }

    /// `offset` components must each lie in `-1..=1`.
    pub fn at(&self, offset: IVec3) -> &BlockInstance<'a> {
        debug_assert!(
            offset.abs().max_element() <= 1,
            "neighborhood offset out of range: {offset}"
        );
        &self.cells[(offset.x + 1) as usize][(offset.y + 1) as usize][(offset.z + 1) as usize]
    }

    pub fn across(&self, face: Face) -> &BlockInstance<'a> {
        self.at(face.normal_ivec3())
    }

    /// Whether the cell beyond `face` fully covers the shared face.
    pub fn is_covered(&self, face: Face) -> bool {
        let neighbor = self.across(face);
        if neighbor.is_void() {
            return false;
        }
        self.registry
            .description(neighbor.id)
            .is_face_opaque(neighbor.orientation, face.opposite())
    }

    /// Whether the cell at `offset` is an opaque cube; used for ambient occlusion.
    pub fn occludes(&self, offset: IVec3) -> bool {
        let instance = self.at(offset);
        !instance.is_void() && self.registry.description(instance.id).is_full_cube()
    }
}
