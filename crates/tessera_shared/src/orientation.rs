use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Face {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn normal_ivec3(self) -> IVec3 {
        match self {
            Face::PosX => IVec3::X,
            Face::NegX => IVec3::NEG_X,
            Face::PosY => IVec3::Y,
            Face::NegY => IVec3::NEG_Y,
            Face::PosZ => IVec3::Z,
            Face::NegZ => IVec3::NEG_Z,
        }
    }

    pub fn normal(self) -> Vec3 {
        self.normal_ivec3().as_vec3()
    }

    pub fn opposite(self) -> Face {
        match self {
            Face::PosX => Face::NegX,
            Face::NegX => Face::PosX,
            Face::PosY => Face::NegY,
            Face::NegY => Face::PosY,
            Face::PosZ => Face::NegZ,
            Face::NegZ => Face::PosZ,
        }
    }

    /// 0 for X, 1 for Y, 2 for Z.
    pub fn axis(self) -> usize {
        match self {
            Face::PosX | Face::NegX => 0,
            Face::PosY | Face::NegY => 1,
            Face::PosZ | Face::NegZ => 2,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Face::PosX | Face::PosY | Face::PosZ)
    }

    pub fn from_axis(axis: usize, positive: bool) -> Face {
        match (axis, positive) {
            (0, true) => Face::PosX,
            (0, false) => Face::NegX,
            (1, true) => Face::PosY,
            (1, false) => Face::NegY,
            (2, true) => Face::PosZ,
            (2, false) => Face::NegZ,
            _ => panic!("axis index out of range: {axis}"),
        }
    }

    fn from_normal(normal: IVec3) -> Face {
        match normal.to_array() {
            [1, 0, 0] => Face::PosX,
            [-1, 0, 0] => Face::NegX,
            [0, 1, 0] => Face::PosY,
            [0, -1, 0] => Face::NegY,
            [0, 0, 1] => Face::PosZ,
            [0, 0, -1] => Face::NegZ,
            other => panic!("not a unit axis normal: {other:?}"),
        }
    }
}

/// Rotation/reflection applied to a block's model and collision volume.
///
/// The four horizontal states are quarter turns about the vertical axis through
/// the cell centre (`North` is the identity); the `Inverted` states additionally
/// mirror the block through its horizontal mid-plane.
#[repr(u8)]
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum BlockOrientation {
    #[default]
    North = 0,
    East = 1,
    South = 2,
    West = 3,
    NorthInverted = 4,
    EastInverted = 5,
    SouthInverted = 6,
    WestInverted = 7,
}

impl BlockOrientation {
    pub const ALL: [BlockOrientation; 8] = [
        BlockOrientation::North,
        BlockOrientation::East,
        BlockOrientation::South,
        BlockOrientation::West,
        BlockOrientation::NorthInverted,
        BlockOrientation::EastInverted,
        BlockOrientation::SouthInverted,
        BlockOrientation::WestInverted,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn quarter_turns(self) -> u8 {
        self.index() % 4
    }

    pub fn is_inverted(self) -> bool {
        self.index() >= 4
    }

    /// Maps a block-local point in `[0, 1]^3` from model space into the cell.
    pub fn rotate_point(self, point: Vec3) -> Vec3 {
        let mut out = point;
        for _ in 0..self.quarter_turns() {
            out = Vec3::new(1.0 - out.z, out.y, out.x);
        }
        if self.is_inverted() {
            out.y = 1.0 - out.y;
        }
        out
    }

    /// Maps a model-space box to the axis-aligned box it occupies in the cell.
    pub fn rotate_box(self, min: Vec3, max: Vec3) -> (Vec3, Vec3) {
        let a = self.rotate_point(min);
        let b = self.rotate_point(max);
        (a.min(b), a.max(b))
    }

    /// Model face → the face it ends up on in the cell.
    pub fn rotate_face(self, face: Face) -> Face {
        Face::from_normal(self.rotate_ivec(face.normal_ivec3(), self.quarter_turns()))
    }

    /// Cell face → the model face that was rotated onto it.
    pub fn inverse_face(self, face: Face) -> Face {
        let turns = (4 - self.quarter_turns()) % 4;
        Face::from_normal(self.rotate_ivec(face.normal_ivec3(), turns))
    }

    fn rotate_ivec(self, vector: IVec3, turns: u8) -> IVec3 {
        let mut out = vector;
        for _ in 0..turns {
            out = IVec3::new(-out.z, out.y, out.x);
        }
        if self.is_inverted() {
            out.y = -out.y;
        }
        out
    }
}
