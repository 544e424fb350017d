use std::any::Any;
use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::brightness::BlockBrightness;
use crate::collision::BlockCollision;
use crate::model::ModelBuilders;
use crate::neighborhood::BlockNeighborhood;
use crate::orientation::{BlockOrientation, Face};

#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const VOID: Self = Self(0);
    pub const DEFAULT: Self = Self(1);

    pub fn is_void(self) -> bool {
        self == Self::VOID
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Heap payload attached to a single block instance.
///
/// Implemented for every cloneable, thread-safe `'static` type, so callers only
/// need `BlockExtraData::boxed(value)`.
pub trait ExtraPayload: Send + Sync + fmt::Debug {
    fn clone_box(&self) -> Box<dyn ExtraPayload>;
    fn as_any(&self) -> &dyn Any;
}

impl<T> ExtraPayload for T
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn clone_box(&self) -> Box<dyn ExtraPayload> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Per-instance data for blocks whose description reports `has_extra_data()`.
/// Cloning deep-copies the boxed branch; two chunks never share a payload.
#[derive(Debug)]
pub enum BlockExtraData {
    Inline(u32),
    Boxed(Box<dyn ExtraPayload>),
}

impl BlockExtraData {
    pub fn boxed<T>(value: T) -> Self
    where
        T: Clone + Send + Sync + fmt::Debug + 'static,
    {
        Self::Boxed(Box::new(value))
    }

    pub fn inline(&self) -> Option<u32> {
        match self {
            Self::Inline(value) => Some(*value),
            Self::Boxed(_) => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Inline(_) => None,
            Self::Boxed(payload) => (**payload).as_any().downcast_ref::<T>(),
        }
    }
}

impl Clone for BlockExtraData {
    fn clone(&self) -> Self {
        match self {
            Self::Inline(value) => Self::Inline(*value),
            Self::Boxed(payload) => Self::Boxed((**payload).clone_box()),
        }
    }
}

/// Behaviour shared by every block of one type.
///
/// Descriptions are registered once, before any chunk work starts, and are only
/// read afterwards; implementations must not use interior mutability.
pub trait BlockDescription: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn is_visible(&self) -> bool {
        true
    }

    /// Whether `face` (in cell space, after `orientation` is applied) completely
    /// covers the neighbouring cell on that side.
    fn is_face_opaque(&self, orientation: BlockOrientation, face: Face) -> bool;

    fn is_full_cube(&self) -> bool {
        Face::ALL
            .into_iter()
            .all(|face| self.is_face_opaque(BlockOrientation::North, face))
    }

    fn is_light_source(&self) -> bool {
        false
    }

    fn initial_brightness(&self) -> BlockBrightness {
        BlockBrightness::DARK
    }

    /// Subtracted from light entering this cell, per channel.
    fn light_attenuation(&self) -> BlockBrightness;

    fn has_extra_data(&self) -> bool {
        false
    }

    fn collision(&self) -> &dyn BlockCollision;

    /// Emits this block's geometry. `position` is chunk-local; the neighbourhood
    /// is centred on the block.
    fn add_block_model(
        &self,
        builders: &mut ModelBuilders,
        position: IVec3,
        neighborhood: &BlockNeighborhood<'_>,
    );
}

#[cfg(test)]
mod tests {
    use super::{BlockExtraData, BlockId};

    #[derive(Clone, Debug, PartialEq)]
    struct SignText(String);

    #[test]
    fn reserved_ids_are_void_and_default() {
        assert!(BlockId::VOID.is_void());
        assert!(!BlockId::DEFAULT.is_void());
        assert!(BlockId(4) < BlockId(5));
    }

    #[test]
    fn cloning_boxed_extra_data_makes_an_independent_copy() {
        let original = BlockExtraData::boxed(SignText("hello".to_string()));
        let copy = original.clone();

        let original_ptr = original.downcast_ref::<SignText>().expect("payload") as *const SignText;
        let copy_ptr = copy.downcast_ref::<SignText>().expect("payload") as *const SignText;
        assert_ne!(original_ptr, copy_ptr);
        assert_eq!(copy.downcast_ref::<SignText>(), Some(&SignText("hello".to_string())));
        assert_eq!(copy.inline(), None);
    }

    #[test]
    fn inline_extra_data_is_not_downcastable() {
        let data = BlockExtraData::Inline(7);
        assert_eq!(data.inline(), Some(7));
        assert!(data.downcast_ref::<u32>().is_none());
    }
}
