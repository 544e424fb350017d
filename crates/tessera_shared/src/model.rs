use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::brightness::BlockBrightness;
use crate::coords::{ChunkPos, LocalPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::lighting::BrightnessMap;
use crate::neighborhood::{BlockNeighborhood, ChunkNeighborhoodView};
use crate::orientation::{BlockOrientation, Face};
use crate::registry::BlockRegistry;

/// Which render pass a piece of geometry belongs to.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RenderEffect {
    #[default]
    Opaque,
    Cutout,
    Translucent,
    Glow,
}

impl RenderEffect {
    pub const COUNT: usize = 4;
    pub const ALL: [RenderEffect; Self::COUNT] = [
        RenderEffect::Opaque,
        RenderEffect::Cutout,
        RenderEffect::Translucent,
        RenderEffect::Glow,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BlockVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub tile: u32,
    pub brightness: u32,
    pub ao: f32,
}
const _: [(); 44] = [(); std::mem::size_of::<BlockVertex>()];

/// Atlas tile index per model face, in [`Face::ALL`] order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceTiles(pub [u16; 6]);

impl FaceTiles {
    pub const fn uniform(tile: u16) -> Self {
        Self([tile; 6])
    }

    pub const fn top_bottom_sides(top: u16, bottom: u16, sides: u16) -> Self {
        Self([sides, sides, top, bottom, sides, sides])
    }

    pub fn get(&self, face: Face) -> u16 {
        self.0[face.index()]
    }

    pub fn offset(self, by: u16) -> Self {
        Self(self.0.map(|tile| tile.wrapping_add(by)))
    }
}

/// One textured quad in chunk-local space; corners wind counter-clockwise
/// around `normal`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quad {
    pub positions: [Vec3; 4],
    pub normal: Vec3,
    pub tex_coords: [[f32; 2]; 4],
    pub tile: u16,
    pub brightness: [BlockBrightness; 4],
    pub ao: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<BlockVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn push_quad(&mut self, quad: &Quad, reverse_winding: bool) {
        let base_index = self.vertices.len() as u32;
        let normal = quad.normal.to_array();
        for i in 0..4 {
            self.vertices.push(BlockVertex {
                position: quad.positions[i].to_array(),
                normal,
                tex_coord: quad.tex_coords[i],
                tile: u32::from(quad.tile),
                brightness: quad.brightness[i].packed(),
                ao: quad.ao[i],
            });
        }

        let indices = if reverse_winding {
            [
                base_index,
                base_index + 2,
                base_index + 1,
                base_index,
                base_index + 3,
                base_index + 2,
            ]
        } else {
            [
                base_index,
                base_index + 1,
                base_index + 2,
                base_index,
                base_index + 2,
                base_index + 3,
            ]
        };
        self.indices.extend_from_slice(&indices);
    }
}

/// Per-effect mesh builders handed to `BlockDescription::add_block_model`.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilders {
    meshes: [MeshData; RenderEffect::COUNT],
}

impl ModelBuilders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(&self, effect: RenderEffect) -> &MeshData {
        &self.meshes[effect.index()]
    }

    pub fn push_quad(&mut self, effect: RenderEffect, quad: &Quad) {
        self.meshes[effect.index()].push_quad(quad, false);
    }

    /// Emits the quad plus its back side with a flipped normal.
    pub fn push_double_sided(&mut self, effect: RenderEffect, quad: &Quad) {
        let mesh = &mut self.meshes[effect.index()];
        mesh.push_quad(quad, false);
        let back = Quad {
            normal: -quad.normal,
            ..*quad
        };
        mesh.push_quad(&back, true);
    }

    pub fn finish(self, position: ChunkPos) -> ChunkModel {
        ChunkModel {
            position,
            meshes: self.meshes,
        }
    }
}

/// Upload-ready geometry for one chunk, one mesh per render effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkModel {
    pub position: ChunkPos,
    meshes: [MeshData; RenderEffect::COUNT],
}

impl ChunkModel {
    pub fn mesh(&self, effect: RenderEffect) -> &MeshData {
        &self.meshes[effect.index()]
    }

    pub fn vertex_bytes(&self, effect: RenderEffect) -> &[u8] {
        self.mesh(effect).vertex_bytes()
    }

    pub fn index_bytes(&self, effect: RenderEffect) -> &[u8] {
        self.mesh(effect).index_bytes()
    }

    pub fn quad_count(&self) -> usize {
        self.meshes.iter().map(MeshData::quad_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.iter().all(MeshData::is_empty)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaceLighting {
    /// Per-vertex light from the cells around each corner, with ambient occlusion.
    Smooth,
    /// Full brightness, no occlusion; used for glow overlays.
    Fullbright,
}

/// Axis-aligned box in model space plus how to texture and light it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoxShape {
    pub min: Vec3,
    pub max: Vec3,
    pub orientation: BlockOrientation,
    pub tiles: FaceTiles,
    pub lighting: FaceLighting,
}

impl BoxShape {
    pub fn full_cube(orientation: BlockOrientation, tiles: FaceTiles) -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ONE,
            orientation,
            tiles,
            lighting: FaceLighting::Smooth,
        }
    }
}

#[derive(Copy, Clone)]
struct FaceSpec {
    axis: usize,
    u_axis: usize,
    v_axis: usize,
}

// u × v points along the outward normal, so corners listed as
// (u0,v0) (u1,v0) (u1,v1) (u0,v1) wind counter-clockwise.
const FACE_SPECS: [FaceSpec; 6] = [
    // +X
    FaceSpec {
        axis: 0,
        u_axis: 1,
        v_axis: 2,
    },
    // -X
    FaceSpec {
        axis: 0,
        u_axis: 2,
        v_axis: 1,
    },
    // +Y
    FaceSpec {
        axis: 1,
        u_axis: 2,
        v_axis: 0,
    },
    // -Y
    FaceSpec {
        axis: 1,
        u_axis: 0,
        v_axis: 2,
    },
    // +Z
    FaceSpec {
        axis: 2,
        u_axis: 0,
        v_axis: 1,
    },
    // -Z
    FaceSpec {
        axis: 2,
        u_axis: 1,
        v_axis: 0,
    },
];

const CORNER_SIDES: [(i32, i32); 4] = [(-1, -1), (1, -1), (1, 1), (-1, 1)];

/// Emits the faces of `shape` that survive culling. Faces lying on the cell
/// boundary are dropped when `skip_face` returns true for them; interior faces
/// are always emitted. Returns the number of quads written.
pub fn emit_box(
    builders: &mut ModelBuilders,
    effect: RenderEffect,
    position: IVec3,
    neighborhood: &BlockNeighborhood<'_>,
    shape: &BoxShape,
    mut skip_face: impl FnMut(Face) -> bool,
) -> usize {
    let (min, max) = shape.orientation.rotate_box(shape.min, shape.max);
    let origin = position.as_vec3();
    let mut emitted = 0;

    for face in Face::ALL {
        let spec = FACE_SPECS[face.index()];
        let on_boundary = if face.is_positive() {
            max[spec.axis] >= 1.0
        } else {
            min[spec.axis] <= 0.0
        };
        if on_boundary && skip_face(face) {
            continue;
        }

        let plane = if face.is_positive() {
            max[spec.axis]
        } else {
            min[spec.axis]
        };
        let layer = if on_boundary {
            face.normal_ivec3()
        } else {
            IVec3::ZERO
        };

        let mut positions = [Vec3::ZERO; 4];
        let mut tex_coords = [[0.0f32; 2]; 4];
        let mut brightness = [BlockBrightness::FULL; 4];
        let mut ao = [1.0f32; 4];

        for (i, (su, sv)) in CORNER_SIDES.into_iter().enumerate() {
            let mut corner = Vec3::ZERO;
            corner[spec.axis] = plane;
            corner[spec.u_axis] = if su > 0 { max[spec.u_axis] } else { min[spec.u_axis] };
            corner[spec.v_axis] = if sv > 0 { max[spec.v_axis] } else { min[spec.v_axis] };

            positions[i] = origin + corner;
            tex_coords[i] = [corner[spec.u_axis], corner[spec.v_axis]];

            if shape.lighting == FaceLighting::Smooth {
                let mut side_u = layer;
                side_u[spec.u_axis] += su;
                let mut side_v = layer;
                side_v[spec.v_axis] += sv;
                let mut diagonal = side_u;
                diagonal[spec.v_axis] += sv;

                let own = neighborhood
                    .center()
                    .brightness
                    .max(neighborhood.at(layer).brightness);
                brightness[i] = [side_u, side_v, diagonal]
                    .into_iter()
                    .fold(own, |acc, offset| acc.max(neighborhood.at(offset).brightness));

                if on_boundary {
                    let count = u8::from(neighborhood.occludes(side_u))
                        + u8::from(neighborhood.occludes(side_v))
                        + u8::from(neighborhood.occludes(diagonal));
                    ao[i] = 1.0 - 0.2 * f32::from(count);
                }
            }
        }

        let quad = Quad {
            positions,
            normal: face.normal(),
            tex_coords,
            tile: shape.tiles.get(shape.orientation.inverse_face(face)),
            brightness,
            ao,
        };
        builders.push_quad(effect, &quad);
        emitted += 1;
    }

    emitted
}

/// Two crossed double-sided quads through the cell diagonals, `height` tall.
/// Lit with the brightness of the cell itself.
pub fn emit_cross(
    builders: &mut ModelBuilders,
    effect: RenderEffect,
    position: IVec3,
    neighborhood: &BlockNeighborhood<'_>,
    tile: u16,
    height: f32,
) {
    let origin = position.as_vec3();
    let brightness = [neighborhood.center().brightness; 4];
    let diagonals = [
        (Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0)),
        (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    ];

    for (start, end) in diagonals {
        let lift = Vec3::new(0.0, height, 0.0);
        let along = end - start;
        let normal = Vec3::new(-along.z, 0.0, along.x).normalize();
        let quad = Quad {
            positions: [
                origin + start,
                origin + end,
                origin + end + lift,
                origin + start + lift,
            ],
            normal,
            tex_coords: [[0.0, 0.0], [1.0, 0.0], [1.0, height], [0.0, height]],
            tile,
            brightness,
            ao: [1.0; 4],
        };
        builders.push_double_sided(effect, &quad);
    }
}

/// Builds the model of the centre chunk of `view`.
///
/// Blocks are visited in storage order (y, then z, then x), so identical input
/// always yields byte-identical buffers.
pub fn build_chunk_model(
    view: &ChunkNeighborhoodView<'_>,
    registry: &BlockRegistry,
    light: &BrightnessMap,
) -> ChunkModel {
    let chunk = view.center();
    let origin = view.center_pos().origin();
    let mut builders = ModelBuilders::new();
    let mut visited = 0usize;

    for y in 0..CHUNK_SIZE_Y {
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                if y as i32 > chunk.height(x, z) {
                    continue;
                }
                let local = LocalPos::from_usize(x, y, z);
                let id = chunk.get_id(local);
                if id.is_void() {
                    continue;
                }
                let description = registry.description(id);
                if !description.is_visible() {
                    continue;
                }

                let position = local.as_ivec3();
                let neighborhood =
                    BlockNeighborhood::gather(view, registry, origin + position, |offset| {
                        light.get(position + offset)
                    });
                description.add_block_model(&mut builders, position, &neighborhood);
                visited += 1;
            }
        }
    }

    let model = builders.finish(view.center_pos());
    trace!(
        "built model for chunk {}: {} blocks, {} quads",
        view.center_pos(),
        visited,
        model.quad_count()
    );
    model
}

#[cfg(test)]
mod tests {
    use glam::{IVec3, Vec3};

    use super::{build_chunk_model, BlockVertex, RenderEffect};
    use crate::brightness::BlockBrightness;
    use crate::chunk::ChunkBlockData;
    use crate::coords::{ChunkPos, LocalPos};
    use crate::lighting::{compute_chunk_light, BrightnessMap, LightingConfig};
    use crate::neighborhood::ChunkNeighborhoodView;
    use crate::orientation::BlockOrientation;
    use crate::registry::register_builtin_blocks;

    fn normals(vertices: &[BlockVertex]) -> Vec<Vec3> {
        vertices
            .chunks(4)
            .map(|quad| Vec3::from_array(quad[0].normal))
            .collect()
    }

    #[test]
    fn lone_cube_emits_six_outward_quads() {
        let registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        let mut chunk = ChunkBlockData::new_void();
        chunk.set(LocalPos::new(5, 5, 5), stone, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let model = build_chunk_model(&view, &registry, &BrightnessMap::uniform(BlockBrightness::FULL));
        let opaque = model.mesh(RenderEffect::Opaque);

        assert_eq!(opaque.quad_count(), 6);
        assert_eq!(opaque.vertices.len(), 24);
        let centre = Vec3::splat(5.5);
        for quad in opaque.vertices.chunks(4) {
            let normal = Vec3::from_array(quad[0].normal);
            let mid = quad
                .iter()
                .map(|v| Vec3::from_array(v.position))
                .sum::<Vec3>()
                / 4.0;
            assert!((mid - centre).dot(normal) > 0.49);
        }
        assert!(model.mesh(RenderEffect::Glow).is_empty());
    }

    #[test]
    fn opaque_neighbors_share_no_face() {
        let registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        let mut chunk = ChunkBlockData::new_void();
        chunk.set(LocalPos::new(5, 5, 5), stone, BlockOrientation::North);
        chunk.set(LocalPos::new(6, 5, 5), stone, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let model = build_chunk_model(&view, &registry, &BrightnessMap::uniform(BlockBrightness::FULL));
        let opaque = model.mesh(RenderEffect::Opaque);

        assert_eq!(opaque.quad_count(), 10);
        let shared_plane = opaque
            .vertices
            .chunks(4)
            .filter(|quad| quad.iter().all(|v| v.position[0] == 6.0))
            .count();
        assert_eq!(shared_plane, 0);
    }

    #[test]
    fn glass_culls_against_glass_but_not_against_stone() {
        let registry = register_builtin_blocks();
        let glass = registry.id_of("glass").expect("glass");
        let stone = registry.id_of("stone").expect("stone");
        let mut chunk = ChunkBlockData::new_void();
        chunk.set(LocalPos::new(2, 2, 2), glass, BlockOrientation::North);
        chunk.set(LocalPos::new(3, 2, 2), glass, BlockOrientation::North);
        chunk.set(LocalPos::new(2, 3, 2), stone, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let model = build_chunk_model(&view, &registry, &BrightnessMap::uniform(BlockBrightness::FULL));

        // Two glass cubes: 12 faces, minus the shared pair, minus the top of
        // the first one which the stone covers.
        assert_eq!(model.mesh(RenderEffect::Cutout).quad_count(), 9);
        // Stone shows all six faces since glass never covers a neighbour.
        assert_eq!(model.mesh(RenderEffect::Opaque).quad_count(), 6);
    }

    #[test]
    fn missing_neighbor_chunk_is_treated_as_void() {
        let registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        let mut chunk = ChunkBlockData::new_void();
        chunk.set(LocalPos::new(0, 0, 0), stone, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(3, -2), &chunk);
        let model = build_chunk_model(&view, &registry, &BrightnessMap::uniform(BlockBrightness::FULL));
        let faces = normals(&model.mesh(RenderEffect::Opaque).vertices);
        assert_eq!(faces.len(), 6);
        assert!(faces.contains(&Vec3::NEG_X));
        assert!(faces.contains(&Vec3::NEG_Z));
    }

    #[test]
    fn plants_emit_double_sided_cutout_quads() {
        let registry = register_builtin_blocks();
        let flower = registry.id_of("flower").expect("flower");
        let mut chunk = ChunkBlockData::new_void();
        chunk.set(LocalPos::new(1, 1, 1), flower, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let model = build_chunk_model(&view, &registry, &BrightnessMap::uniform(BlockBrightness::FULL));
        assert_eq!(model.mesh(RenderEffect::Cutout).quad_count(), 4);
        assert!(model.mesh(RenderEffect::Opaque).is_empty());
    }

    #[test]
    fn glowstone_adds_a_fullbright_glow_layer() {
        let registry = register_builtin_blocks();
        let glowstone = registry.id_of("glowstone").expect("glowstone");
        let mut chunk = ChunkBlockData::new_void();
        chunk.set(LocalPos::new(8, 8, 8), glowstone, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let model = build_chunk_model(&view, &registry, &BrightnessMap::uniform(BlockBrightness::DARK));
        let glow = model.mesh(RenderEffect::Glow);
        assert_eq!(glow.quad_count(), 6);
        assert!(glow
            .vertices
            .iter()
            .all(|v| v.brightness == BlockBrightness::FULL.packed() && v.ao == 1.0));
    }

    #[test]
    fn emitter_faces_are_at_least_as_bright_as_the_emitter() {
        let registry = register_builtin_blocks();
        let glowstone = registry.id_of("glowstone").expect("glowstone");
        let stone = registry.id_of("stone").expect("stone");
        let mut chunk = ChunkBlockData::new_void();
        for z in 0..16 {
            for x in 0..16 {
                chunk.set(LocalPos::new(x, 127, z), stone, BlockOrientation::North);
            }
        }
        chunk.set(LocalPos::new(8, 10, 8), glowstone, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let light = compute_chunk_light(&view, ChunkPos::new(0, 0), &registry, &LightingConfig::default());
        let own = light.get(IVec3::new(8, 10, 8));
        assert_eq!(own.red(), 238);

        let model = build_chunk_model(&view, &registry, &light);
        let emitter_quads: Vec<_> = model
            .mesh(RenderEffect::Opaque)
            .vertices
            .chunks(4)
            .filter(|quad| {
                quad.iter().all(|v| {
                    (8.0..=9.0).contains(&v.position[0]) && (10.0..=11.0).contains(&v.position[1])
                })
            })
            .collect();
        assert_eq!(emitter_quads.len(), 6);
        for vertex in emitter_quads.into_iter().flatten() {
            assert!(BlockBrightness::from_packed(vertex.brightness).dominates(own));
        }
    }

    #[test]
    fn corner_occlusion_darkens_vertices_next_to_walls() {
        let registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        let mut chunk = ChunkBlockData::new_void();
        chunk.set(LocalPos::new(4, 4, 4), stone, BlockOrientation::North);
        // A wall block sitting diagonally above the +X edge of the top face.
        chunk.set(LocalPos::new(5, 5, 4), stone, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let model = build_chunk_model(&view, &registry, &BrightnessMap::uniform(BlockBrightness::FULL));
        let top = model
            .mesh(RenderEffect::Opaque)
            .vertices
            .chunks(4)
            .find(|quad| quad[0].normal == [0.0, 1.0, 0.0] && quad[0].position[1] == 5.0)
            .expect("top face of the lower block");

        for vertex in top {
            if vertex.position[0] == 5.0 {
                assert!(vertex.ao < 1.0);
            } else {
                assert_eq!(vertex.ao, 1.0);
            }
        }
    }

    #[test]
    fn rebuilding_is_byte_identical() {
        let registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        let lantern = registry.id_of("lantern").expect("lantern");
        let mut chunk = ChunkBlockData::new_void();
        for x in 0..16 {
            chunk.set(LocalPos::new(x, 0, (x * 3) % 16), stone, BlockOrientation::North);
        }
        chunk.set(LocalPos::new(7, 1, 7), lantern, BlockOrientation::North);

        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let light = compute_chunk_light(&view, ChunkPos::new(0, 0), &registry, &LightingConfig::default());
        let first = build_chunk_model(&view, &registry, &light);
        let second = build_chunk_model(&view, &registry, &light);

        for effect in RenderEffect::ALL {
            assert_eq!(first.vertex_bytes(effect), second.vertex_bytes(effect));
            assert_eq!(first.index_bytes(effect), second.index_bytes(effect));
        }
        assert_eq!(light.get(IVec3::new(7, 1, 7)).red(), 255);
    }
}
