use glam::{IVec3, Vec3};

use crate::block::{BlockDescription, BlockExtraData};
use crate::brightness::BlockBrightness;
use crate::collision::{BlockCollision, BoxBlockCollision, VoidBlockCollision};
use crate::model::{
    emit_box, emit_cross, BoxShape, FaceLighting, FaceTiles, ModelBuilders, RenderEffect,
};
use crate::neighborhood::BlockNeighborhood;
use crate::orientation::{BlockOrientation, Face};

static VOID_COLLISION: VoidBlockCollision = VoidBlockCollision;

/// Empty space. Never drawn, never collides, lets all light through.
#[derive(Debug, Clone)]
pub struct VoidBlock {
    name: String,
}

impl VoidBlock {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl BlockDescription for VoidBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_visible(&self) -> bool {
        false
    }

    fn is_face_opaque(&self, _orientation: BlockOrientation, _face: Face) -> bool {
        false
    }

    fn light_attenuation(&self) -> BlockBrightness {
        BlockBrightness::DARK
    }

    fn collision(&self) -> &dyn BlockCollision {
        &VOID_COLLISION
    }

    fn add_block_model(
        &self,
        _builders: &mut ModelBuilders,
        _position: IVec3,
        _neighborhood: &BlockNeighborhood<'_>,
    ) {
    }
}

/// Solid opaque cube, optionally emitting light with a fullbright overlay.
#[derive(Debug, Clone)]
pub struct CubeBlock {
    name: String,
    tiles: FaceTiles,
    emission: Option<BlockBrightness>,
    glow_tile: Option<u16>,
    extra_data: bool,
    collision: BoxBlockCollision,
}

impl CubeBlock {
    pub fn new(name: &str, tiles: FaceTiles) -> Self {
        Self {
            name: name.to_string(),
            tiles,
            emission: None,
            glow_tile: None,
            extra_data: false,
            collision: BoxBlockCollision::FULL,
        }
    }

    pub fn with_emission(mut self, emission: BlockBrightness) -> Self {
        self.emission = Some(emission);
        self
    }

    pub fn with_glow(mut self, tile: u16) -> Self {
        self.glow_tile = Some(tile);
        self
    }

    /// Instances carry an inline variant number that shifts every face tile.
    pub fn with_extra_data(mut self) -> Self {
        self.extra_data = true;
        self
    }

    fn tiles_for(&self, extra: Option<&BlockExtraData>) -> FaceTiles {
        let variant = extra
            .and_then(BlockExtraData::inline)
            .and_then(|variant| u16::try_from(variant).ok());
        match variant {
            Some(variant) if self.extra_data => self.tiles.offset(variant),
            _ => self.tiles,
        }
    }
}

impl BlockDescription for CubeBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_face_opaque(&self, _orientation: BlockOrientation, _face: Face) -> bool {
        true
    }

    fn is_full_cube(&self) -> bool {
        true
    }

    fn is_light_source(&self) -> bool {
        self.emission.is_some()
    }

    fn initial_brightness(&self) -> BlockBrightness {
        self.emission.unwrap_or(BlockBrightness::DARK)
    }

    fn light_attenuation(&self) -> BlockBrightness {
        BlockBrightness::FULL
    }

    fn has_extra_data(&self) -> bool {
        self.extra_data
    }

    fn collision(&self) -> &dyn BlockCollision {
        &self.collision
    }

    fn add_block_model(
        &self,
        builders: &mut ModelBuilders,
        position: IVec3,
        neighborhood: &BlockNeighborhood<'_>,
    ) {
        let center = neighborhood.center();
        let shape = BoxShape::full_cube(center.orientation, self.tiles_for(center.extra));
        emit_box(
            builders,
            RenderEffect::Opaque,
            position,
            neighborhood,
            &shape,
            |face| neighborhood.is_covered(face),
        );

        if let Some(tile) = self.glow_tile {
            let glow = BoxShape {
                tiles: FaceTiles::uniform(tile),
                lighting: FaceLighting::Fullbright,
                ..shape
            };
            emit_box(
                builders,
                RenderEffect::Glow,
                position,
                neighborhood,
                &glow,
                |face| neighborhood.is_covered(face),
            );
        }
    }
}

/// See-through full cube: glass, leaves, water. Never covers a neighbour's
/// face and hides faces shared with the same block type.
#[derive(Debug, Clone)]
pub struct TranslucentBlock {
    name: String,
    tiles: FaceTiles,
    attenuation: BlockBrightness,
    effect: RenderEffect,
    collision: BoxBlockCollision,
}

impl TranslucentBlock {
    pub fn new(
        name: &str,
        tiles: FaceTiles,
        attenuation: BlockBrightness,
        effect: RenderEffect,
        solid: bool,
    ) -> Self {
        let collision = if solid {
            BoxBlockCollision::FULL
        } else {
            BoxBlockCollision::FULL.disabled()
        };
        Self {
            name: name.to_string(),
            tiles,
            attenuation,
            effect,
            collision,
        }
    }

    pub fn glass(name: &str, tiles: FaceTiles) -> Self {
        Self::new(name, tiles, BlockBrightness::DARK, RenderEffect::Cutout, true)
    }

    pub fn foliage(name: &str, tiles: FaceTiles) -> Self {
        Self::new(name, tiles, BlockBrightness::uniform(17), RenderEffect::Cutout, true)
    }

    pub fn liquid(name: &str, tiles: FaceTiles, attenuation: BlockBrightness) -> Self {
        Self::new(name, tiles, attenuation, RenderEffect::Translucent, false)
    }
}

impl BlockDescription for TranslucentBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_face_opaque(&self, _orientation: BlockOrientation, _face: Face) -> bool {
        false
    }

    fn light_attenuation(&self) -> BlockBrightness {
        self.attenuation
    }

    fn collision(&self) -> &dyn BlockCollision {
        &self.collision
    }

    fn add_block_model(
        &self,
        builders: &mut ModelBuilders,
        position: IVec3,
        neighborhood: &BlockNeighborhood<'_>,
    ) {
        let center = neighborhood.center();
        let shape = BoxShape::full_cube(center.orientation, self.tiles);
        emit_box(builders, self.effect, position, neighborhood, &shape, |face| {
            neighborhood.is_covered(face) || neighborhood.across(face).id == center.id
        });
    }
}

/// Half-height block. Upright orientations sit on the floor of the cell,
/// inverted ones hang from the ceiling; only the full face is opaque.
#[derive(Debug, Clone)]
pub struct SlabBlock {
    name: String,
    tiles: FaceTiles,
    collision: BoxBlockCollision,
}

impl SlabBlock {
    const MODEL_MAX: Vec3 = Vec3::new(1.0, 0.5, 1.0);

    pub fn new(name: &str, tiles: FaceTiles) -> Self {
        Self {
            name: name.to_string(),
            tiles,
            collision: BoxBlockCollision::new(Vec3::ZERO, Self::MODEL_MAX),
        }
    }
}

impl BlockDescription for SlabBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_face_opaque(&self, orientation: BlockOrientation, face: Face) -> bool {
        orientation.inverse_face(face) == Face::NegY
    }

    fn light_attenuation(&self) -> BlockBrightness {
        BlockBrightness::DARK
    }

    fn collision(&self) -> &dyn BlockCollision {
        &self.collision
    }

    fn add_block_model(
        &self,
        builders: &mut ModelBuilders,
        position: IVec3,
        neighborhood: &BlockNeighborhood<'_>,
    ) {
        let shape = BoxShape {
            min: Vec3::ZERO,
            max: Self::MODEL_MAX,
            orientation: neighborhood.center().orientation,
            tiles: self.tiles,
            lighting: FaceLighting::Smooth,
        };
        emit_box(
            builders,
            RenderEffect::Opaque,
            position,
            neighborhood,
            &shape,
            |face| neighborhood.is_covered(face),
        );
    }
}

/// Flowers and grass: two crossed quads, walk-through, light passes freely.
#[derive(Debug, Clone)]
pub struct PlantBlock {
    name: String,
    tile: u16,
    height: f32,
}

impl PlantBlock {
    pub fn new(name: &str, tile: u16, height: f32) -> Self {
        Self {
            name: name.to_string(),
            tile,
            height,
        }
    }
}

impl BlockDescription for PlantBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_face_opaque(&self, _orientation: BlockOrientation, _face: Face) -> bool {
        false
    }

    fn light_attenuation(&self) -> BlockBrightness {
        BlockBrightness::DARK
    }

    fn collision(&self) -> &dyn BlockCollision {
        &VOID_COLLISION
    }

    fn add_block_model(
        &self,
        builders: &mut ModelBuilders,
        position: IVec3,
        neighborhood: &BlockNeighborhood<'_>,
    ) {
        emit_cross(
            builders,
            RenderEffect::Cutout,
            position,
            neighborhood,
            self.tile,
            self.height,
        );
    }
}

/// Small hanging light such as a lantern: a cut-out box with a glow overlay.
#[derive(Debug, Clone)]
pub struct LightBlock {
    name: String,
    tile: u16,
    glow_tile: Option<u16>,
    emission: BlockBrightness,
    collision: BoxBlockCollision,
}

impl LightBlock {
    const MODEL_MIN: Vec3 = Vec3::new(0.3125, 0.0, 0.3125);
    const MODEL_MAX: Vec3 = Vec3::new(0.6875, 0.5625, 0.6875);

    pub fn new(name: &str, tile: u16, glow_tile: Option<u16>, emission: BlockBrightness) -> Self {
        Self {
            name: name.to_string(),
            tile,
            glow_tile,
            emission,
            collision: BoxBlockCollision::new(Self::MODEL_MIN, Self::MODEL_MAX),
        }
    }
}

impl BlockDescription for LightBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_face_opaque(&self, _orientation: BlockOrientation, _face: Face) -> bool {
        false
    }

    fn is_light_source(&self) -> bool {
        true
    }

    fn initial_brightness(&self) -> BlockBrightness {
        self.emission
    }

    fn light_attenuation(&self) -> BlockBrightness {
        BlockBrightness::DARK
    }

    fn collision(&self) -> &dyn BlockCollision {
        &self.collision
    }

    fn add_block_model(
        &self,
        builders: &mut ModelBuilders,
        position: IVec3,
        neighborhood: &BlockNeighborhood<'_>,
    ) {
        let shape = BoxShape {
            min: Self::MODEL_MIN,
            max: Self::MODEL_MAX,
            orientation: neighborhood.center().orientation,
            tiles: FaceTiles::uniform(self.tile),
            lighting: FaceLighting::Smooth,
        };
        emit_box(
            builders,
            RenderEffect::Cutout,
            position,
            neighborhood,
            &shape,
            |face| neighborhood.is_covered(face),
        );

        if let Some(tile) = self.glow_tile {
            let glow = BoxShape {
                tiles: FaceTiles::uniform(tile),
                lighting: FaceLighting::Fullbright,
                ..shape
            };
            emit_box(
                builders,
                RenderEffect::Glow,
                position,
                neighborhood,
                &glow,
                |face| neighborhood.is_covered(face),
            );
        }
    }
}
