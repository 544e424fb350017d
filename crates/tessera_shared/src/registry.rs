use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::block::{BlockDescription, BlockId};
use crate::block_types::{CubeBlock, LightBlock, PlantBlock, SlabBlock, TranslucentBlock, VoidBlock};
use crate::brightness::BlockBrightness;
use crate::model::FaceTiles;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown block id {0}")]
    UnknownBlock(u16),
    #[error("unknown block name `{0}`")]
    UnknownName(String),
    #[error("block name `{0}` is already registered")]
    DuplicateName(String),
    #[error("block registry is full ({0} entries)")]
    CapacityExceeded(usize),
}

/// Id-indexed arena of block descriptions.
///
/// Ids 0 and 1 always hold the void and default descriptions. The registry is
/// filled during startup and only read afterwards, so it can be shared across
/// worker threads behind an `Arc` without locking.
#[derive(Debug)]
pub struct BlockRegistry {
    descriptions: Vec<Arc<dyn BlockDescription>>,
    by_name: FxHashMap<String, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            descriptions: Vec::new(),
            by_name: FxHashMap::default(),
        };
        registry.seed_reserved();
        registry
    }

    pub fn register(
        &mut self,
        name: &str,
        description: Arc<dyn BlockDescription>,
    ) -> Result<BlockId, RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        let next_index = self.descriptions.len();
        let id = u16::try_from(next_index)
            .map(BlockId)
            .map_err(|_| RegistryError::CapacityExceeded(next_index))?;

        debug!("registered block {} as id {}", name, id.0);
        self.by_name.insert(name.to_string(), id);
        self.descriptions.push(description);
        Ok(id)
    }

    pub fn get_by_id(&self, id: BlockId) -> Result<&dyn BlockDescription, RegistryError> {
        self.descriptions
            .get(id.index())
            .map(|description| description.as_ref())
            .ok_or(RegistryError::UnknownBlock(id.0))
    }

    pub fn get_by_name(&self, name: &str) -> Result<&dyn BlockDescription, RegistryError> {
        let id = self
            .id_of(name)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))?;
        self.get_by_id(id)
    }

    pub fn id_of(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    /// Hot-path lookup for ids read out of chunk storage. An unknown id is a
    /// bug; release builds fall back to the default block.
    pub fn description(&self, id: BlockId) -> &dyn BlockDescription {
        debug_assert!(
            id.index() < self.descriptions.len(),
            "block id {} not registered",
            id.0
        );
        match self.descriptions.get(id.index()) {
            Some(description) => description.as_ref(),
            None => self.descriptions[BlockId::DEFAULT.index()].as_ref(),
        }
    }

    /// Drops every description. Ids issued before the call must not be used
    /// afterwards; void and default are re-seeded under their reserved ids.
    pub fn clear(&mut self) {
        debug!("clearing block registry ({} entries)", self.descriptions.len());
        self.descriptions.clear();
        self.by_name.clear();
        self.seed_reserved();
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &dyn BlockDescription)> + '_ {
        self.descriptions
            .iter()
            .enumerate()
            .map(|(index, description)| (BlockId(index as u16), description.as_ref()))
    }

    fn seed_reserved(&mut self) {
        let reserved: [Arc<dyn BlockDescription>; 2] = [
            Arc::new(VoidBlock::new("void")),
            Arc::new(CubeBlock::new("default", FaceTiles::uniform(0))),
        ];
        for description in reserved {
            let name = description.name().to_string();
            let id = BlockId(self.descriptions.len() as u16);
            self.by_name.insert(name, id);
            self.descriptions.push(description);
        }
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the stock block set used by the generators and tools.
pub fn register_builtin_blocks() -> BlockRegistry {
    let mut registry = BlockRegistry::new();

    let builtins: Vec<Arc<dyn BlockDescription>> = vec![
        Arc::new(CubeBlock::new("stone", FaceTiles::uniform(1))),
        Arc::new(CubeBlock::new("dirt", FaceTiles::uniform(2))),
        Arc::new(CubeBlock::new("grass", FaceTiles::top_bottom_sides(3, 2, 4))),
        Arc::new(CubeBlock::new("sand", FaceTiles::uniform(5))),
        Arc::new(CubeBlock::new("bedrock", FaceTiles::uniform(6))),
        Arc::new(CubeBlock::new("painted_planks", FaceTiles::uniform(8)).with_extra_data()),
        Arc::new(TranslucentBlock::glass("glass", FaceTiles::uniform(16))),
        Arc::new(TranslucentBlock::liquid(
            "water",
            FaceTiles::uniform(17),
            BlockBrightness::new(34, 17, 0, 17),
        )),
        Arc::new(TranslucentBlock::foliage("leaves", FaceTiles::uniform(18))),
        Arc::new(
            CubeBlock::new("glowstone", FaceTiles::uniform(24))
                .with_emission(BlockBrightness::new(238, 204, 136, 0))
                .with_glow(25),
        ),
        Arc::new(LightBlock::new(
            "lantern",
            26,
            Some(27),
            BlockBrightness::new(255, 221, 153, 0),
        )),
        Arc::new(SlabBlock::new("stone_slab", FaceTiles::uniform(1))),
        Arc::new(PlantBlock::new("flower", 32, 0.75)),
        Arc::new(PlantBlock::new("tall_grass", 33, 1.0)),
    ];

    for description in builtins {
        let name = description.name().to_string();
        if let Err(err) = registry.register(&name, description) {
            panic!("builtin block table is inconsistent: {err}");
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{register_builtin_blocks, BlockRegistry, RegistryError};
    use crate::block::BlockId;
    use crate::block_types::CubeBlock;
    use crate::model::FaceTiles;

    #[test]
    fn new_registry_reserves_void_and_default() {
        let registry = BlockRegistry::new();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.id_of("void"), Some(BlockId::VOID));
        assert_eq!(registry.id_of("default"), Some(BlockId::DEFAULT));
        assert!(!registry.description(BlockId::VOID).is_visible());
        assert!(registry.description(BlockId::DEFAULT).is_full_cube());
    }

    #[test]
    fn register_assigns_fresh_ids_and_rejects_duplicates() {
        let mut registry = BlockRegistry::new();
        let marble = registry
            .register("marble", Arc::new(CubeBlock::new("marble", FaceTiles::uniform(9))))
            .expect("fresh name");
        assert_eq!(marble, BlockId(2));
        assert_eq!(registry.get_by_name("marble").map(|d| d.name()), Ok("marble"));

        let err = registry
            .register("marble", Arc::new(CubeBlock::new("marble", FaceTiles::uniform(9))))
            .expect_err("duplicate name");
        assert_eq!(err, RegistryError::DuplicateName("marble".to_string()));
    }

    #[test]
    fn lookups_fail_with_unknown_block() {
        let registry = BlockRegistry::new();
        assert_eq!(
            registry.get_by_id(BlockId(42)).map(|d| d.name()),
            Err(RegistryError::UnknownBlock(42))
        );
        assert_eq!(
            registry.get_by_name("granite").map(|d| d.name()),
            Err(RegistryError::UnknownName("granite".to_string()))
        );
    }

    #[test]
    fn clear_keeps_reserved_ids_and_drops_the_rest() {
        let mut registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        assert!(registry.len() > 2);

        registry.clear();
        assert_eq!(registry.len(), 2);
        assert!(registry.get_by_id(stone).is_err());
        assert_eq!(registry.id_of("stone"), None);
        assert_eq!(registry.id_of("void"), Some(BlockId::VOID));
    }

    #[test]
    fn builtin_blocks_have_expected_capabilities() {
        let registry = register_builtin_blocks();
        let stone = registry.get_by_name("stone").expect("stone");
        assert!(stone.is_full_cube());
        assert!(!stone.is_light_source());

        let lantern = registry.get_by_name("lantern").expect("lantern");
        assert!(lantern.is_light_source());
        assert!(!lantern.is_full_cube());

        let planks = registry.get_by_name("painted_planks").expect("planks");
        assert!(planks.has_extra_data());

        let ids: Vec<BlockId> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), registry.len());
        assert_eq!(ids[0], BlockId::VOID);
    }
}
