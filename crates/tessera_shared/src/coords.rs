use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::IVec3;
use serde::{Deserialize, Serialize};

pub const CHUNK_SIZE_X: usize = 16;
pub const CHUNK_SIZE_Y: usize = 128;
pub const CHUNK_SIZE_Z: usize = 16;
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;

pub const CHUNK_SIZE_X_I32: i32 = CHUNK_SIZE_X as i32;
pub const CHUNK_SIZE_Y_I32: i32 = CHUNK_SIZE_Y as i32;
pub const CHUNK_SIZE_Z_I32: i32 = CHUNK_SIZE_Z as i32;

/// Column chunk coordinate. Chunks span the full world height, so only X and Z
/// partition the grid.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn origin(self) -> IVec3 {
        IVec3::new(self.x * CHUNK_SIZE_X_I32, 0, self.z * CHUNK_SIZE_Z_I32)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    pub fn from_usize(x: usize, y: usize, z: usize) -> Self {
        debug_assert!(
            x < CHUNK_SIZE_X && y < CHUNK_SIZE_Y && z < CHUNK_SIZE_Z,
            "local position out of bounds: ({x}, {y}, {z})"
        );
        Self {
            x: x as u8,
            y: y as u8,
            z: z as u8,
        }
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(i32::from(self.x), i32::from(self.y), i32::from(self.z))
    }
}

impl Add for ChunkPos {
    type Output = ChunkPos;

    fn add(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x + rhs.x,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for ChunkPos {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for ChunkPos {
    type Output = ChunkPos;

    fn sub(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x - rhs.x,
            z: self.z - rhs.z,
        }
    }
}

impl SubAssign for ChunkPos {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.z -= rhs.z;
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

/// Splits a world position into its chunk and chunk-local parts. Returns `None`
/// when `y` lies outside the world's vertical range.
pub fn world_to_chunk(world_pos: IVec3) -> Option<(ChunkPos, LocalPos)> {
    if !(0..CHUNK_SIZE_Y_I32).contains(&world_pos.y) {
        return None;
    }

    let (chunk_x, local_x) = div_rem_floor(world_pos.x, CHUNK_SIZE_X_I32);
    let (chunk_z, local_z) = div_rem_floor(world_pos.z, CHUNK_SIZE_Z_I32);

    Some((
        ChunkPos {
            x: chunk_x,
            z: chunk_z,
        },
        LocalPos {
            x: local_x as u8,
            y: world_pos.y as u8,
            z: local_z as u8,
        },
    ))
}

pub fn chunk_to_world(chunk_pos: ChunkPos, local: LocalPos) -> IVec3 {
    chunk_pos.origin() + local.as_ivec3()
}

pub fn local_to_index(local: LocalPos) -> usize {
    usize::from(local.x)
        + usize::from(local.z) * CHUNK_SIZE_X
        + usize::from(local.y) * CHUNK_SIZE_X * CHUNK_SIZE_Z
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{
        chunk_to_world, local_to_index, world_to_chunk, ChunkPos, LocalPos, CHUNK_SIZE_X,
        CHUNK_SIZE_Y, CHUNK_SIZE_Z, CHUNK_VOLUME,
    };

    #[test]
    fn local_to_index_is_x_then_z_then_y() {
        assert_eq!(local_to_index(LocalPos::new(0, 0, 0)), 0);
        assert_eq!(local_to_index(LocalPos::new(1, 0, 0)), 1);
        assert_eq!(local_to_index(LocalPos::new(0, 0, 1)), CHUNK_SIZE_X);
        assert_eq!(local_to_index(LocalPos::new(0, 1, 0)), CHUNK_SIZE_X * CHUNK_SIZE_Z);

        let far_corner = LocalPos::from_usize(CHUNK_SIZE_X - 1, CHUNK_SIZE_Y - 1, CHUNK_SIZE_Z - 1);
        assert_eq!(local_to_index(far_corner), CHUNK_VOLUME - 1);
    }

    #[test]
    fn chunk_pos_arithmetic_is_component_wise() {
        let a = ChunkPos::new(10, 4);
        let b = ChunkPos::new(-3, 1);

        assert_eq!(a + b, ChunkPos::new(7, 5));
        assert_eq!(a - b, ChunkPos::new(13, 3));

        let mut c = a;
        c += b;
        assert_eq!(c, ChunkPos::new(7, 5));
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn world_to_chunk_handles_negative_coordinates_and_vertical_range() {
        let (chunk, local) = world_to_chunk(IVec3::new(-1, 5, -1)).expect("inside world height");
        assert_eq!(chunk, ChunkPos::new(-1, -1));
        assert_eq!(
            local,
            LocalPos::new((CHUNK_SIZE_X - 1) as u8, 5, (CHUNK_SIZE_Z - 1) as u8)
        );

        let world = IVec3::new(-33, 95, 66);
        let (chunk, local) = world_to_chunk(world).expect("inside world height");
        assert_eq!(chunk_to_world(chunk, local), world);

        assert!(world_to_chunk(IVec3::new(0, -1, 0)).is_none());
        assert!(world_to_chunk(IVec3::new(0, CHUNK_SIZE_Y as i32, 0)).is_none());
    }
}
