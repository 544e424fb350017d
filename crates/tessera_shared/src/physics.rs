use glam::{IVec3, Vec3};
use tracing::trace;

use crate::block::BlockId;
use crate::collision::{ClampedAxes, CollisionResolution, Cylinder};
use crate::neighborhood::NeighborLookup;
use crate::orientation::Face;
use crate::registry::BlockRegistry;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// One cell visited by [`raycast_blocks`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RaycastStep {
    pub cell: IVec3,
    /// Face of `cell` the ray crossed to get here; `None` for the start cell.
    pub entered_through: Option<Face>,
    /// Ray parameter at which the cell was entered.
    pub t: f32,
}

/// Grid walk (Amanatides–Woo) over every cell the ray passes through, in order.
#[derive(Debug, Copy, Clone)]
pub struct RaycastIter {
    current: IVec3,
    step: IVec3,
    t_max: Vec3,
    t_delta: Vec3,
    max_distance: f32,
    started: bool,
    finished: bool,
}

impl RaycastIter {
    fn new(ray: &Ray, max_distance: f32) -> Self {
        let current = ray.origin.floor().as_ivec3();
        let mut step = IVec3::ZERO;
        let mut t_max = Vec3::splat(f32::INFINITY);
        let mut t_delta = Vec3::splat(f32::INFINITY);

        for axis in 0..3 {
            let direction = ray.direction[axis];
            if direction == 0.0 {
                continue;
            }
            step[axis] = if direction > 0.0 { 1 } else { -1 };
            let boundary = if direction > 0.0 {
                current[axis] as f32 + 1.0
            } else {
                current[axis] as f32
            };
            t_max[axis] = (boundary - ray.origin[axis]) / direction;
            t_delta[axis] = 1.0 / direction.abs();
        }

        Self {
            current,
            step,
            t_max,
            t_delta,
            max_distance: max_distance.max(0.0),
            started: false,
            finished: false,
        }
    }
}

impl Iterator for RaycastIter {
    type Item = RaycastStep;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if !self.started {
            self.started = true;
            return Some(RaycastStep {
                cell: self.current,
                entered_through: None,
                t: 0.0,
            });
        }

        let axis = if self.t_max.x <= self.t_max.y && self.t_max.x <= self.t_max.z {
            0
        } else if self.t_max.y <= self.t_max.z {
            1
        } else {
            2
        };
        let distance = self.t_max[axis];

        if !distance.is_finite() || distance > self.max_distance {
            self.finished = true;
            return None;
        }

        self.current[axis] += self.step[axis];
        self.t_max[axis] += self.t_delta[axis];

        Some(RaycastStep {
            cell: self.current,
            entered_through: Some(Face::from_axis(axis, self.step[axis] < 0)),
            t: distance,
        })
    }
}

pub fn raycast_blocks(ray: &Ray, max_distance: f32) -> impl Iterator<Item = RaycastStep> {
    RaycastIter::new(ray, max_distance)
}

/// Final state of an actor after [`resolve_movement`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MoveOutcome {
    pub cylinder: Cylinder,
    pub clamped: ClampedAxes,
    pub on_ground: bool,
}

/// Moves `cylinder` by `delta` through the block grid, one axis at a time
/// (Y, then X, then Z). On each axis every block in the swept range is asked
/// to resolve the move and the correction that travels least wins, so a
/// diagonal move into a wall keeps its sliding component.
pub fn resolve_movement(
    cylinder: &Cylinder,
    delta: Vec3,
    lookup: &dyn NeighborLookup,
    registry: &BlockRegistry,
) -> MoveOutcome {
    let mut current = *cylinder;
    let mut clamped = ClampedAxes::empty();
    let mut on_ground = false;

    for axis in [1, 0, 2] {
        let step = delta[axis];
        if step == 0.0 {
            continue;
        }

        let mut proposed = current.low_centre;
        proposed[axis] += step;

        let (current_min, current_max) = current.bounds();
        let (moved_min, moved_max) = current.moved_to(proposed).bounds();
        let lo = current_min.min(moved_min).floor().as_ivec3();
        let hi = current_max.max(moved_max).floor().as_ivec3();

        let mut best: Option<CollisionResolution> = None;
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                for x in lo.x..=hi.x {
                    let cell = IVec3::new(x, y, z);
                    let instance = lookup.block_at(cell);
                    if instance.is_void() {
                        continue;
                    }
                    let collision = registry.description(instance.id).collision();
                    let Some(resolution) = collision.resolve_collision_with(
                        cell,
                        instance.orientation,
                        &current,
                        proposed,
                    ) else {
                        continue;
                    };

                    let travel = (resolution.low_centre - current.low_centre).length();
                    let better = best.map_or(true, |best| {
                        travel < (best.low_centre - current.low_centre).length()
                    });
                    if better {
                        best = Some(resolution);
                    }
                }
            }
        }

        match best {
            Some(resolution) => {
                trace!("movement clamped on axis {} at {}", axis, resolution.low_centre);
                current = current.moved_to(resolution.low_centre);
                clamped |= resolution.clamped;
                on_ground |= resolution.on_ground;
            }
            None => current = current.moved_to(proposed),
        }
    }

    MoveOutcome {
        cylinder: current,
        clamped,
        on_ground,
    }
}

/// The first block a pick ray strikes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlockPick {
    pub position: IVec3,
    pub id: BlockId,
    pub face: Face,
    pub t: f32,
}

/// Walks the ray cell by cell and returns the first block whose collision
/// volume it intersects within `max_distance`.
pub fn pick_block(
    ray: &Ray,
    max_distance: f32,
    lookup: &dyn NeighborLookup,
    registry: &BlockRegistry,
) -> Option<BlockPick> {
    raycast_blocks(ray, max_distance).find_map(|step| {
        let instance = lookup.block_at(step.cell);
        if instance.is_void() {
            return None;
        }
        registry
            .description(instance.id)
            .collision()
            .intersect_with(step.cell, instance.orientation, ray, max_distance)
            .map(|hit| BlockPick {
                position: step.cell,
                id: instance.id,
                face: hit.face,
                t: hit.t,
            })
    })
}

#[cfg(test)]
mod tests {
    use glam::{IVec3, Vec3};

    use super::{pick_block, raycast_blocks, resolve_movement, Ray};
    use crate::chunk::ChunkBlockData;
    use crate::collision::{ClampedAxes, Cylinder};
    use crate::coords::{ChunkPos, LocalPos, CHUNK_SIZE_X, CHUNK_SIZE_Z};
    use crate::neighborhood::ChunkNeighborhoodView;
    use crate::orientation::{BlockOrientation, Face};
    use crate::registry::register_builtin_blocks;

    #[test]
    fn raycast_returns_expected_voxels_and_faces() {
        let ray = Ray::new(Vec3::new(0.5, 0.5, 0.5), Vec3::X);

        let visited: Vec<(IVec3, Option<Face>)> = raycast_blocks(&ray, 2.1)
            .map(|step| (step.cell, step.entered_through))
            .collect();
        assert_eq!(
            visited,
            vec![
                (IVec3::new(0, 0, 0), None),
                (IVec3::new(1, 0, 0), Some(Face::NegX)),
                (IVec3::new(2, 0, 0), Some(Face::NegX)),
            ]
        );
    }

    fn stone_floor_world() -> (crate::registry::BlockRegistry, ChunkBlockData) {
        let registry = register_builtin_blocks();
        let stone = registry.id_of("stone").expect("stone");
        let mut chunk = ChunkBlockData::new_void();
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                chunk.set(LocalPos::from_usize(x, 0, z), stone, BlockOrientation::North);
            }
        }
        // A wall along x = 8.
        for z in 0..CHUNK_SIZE_Z {
            chunk.set(LocalPos::from_usize(8, 1, z), stone, BlockOrientation::North);
            chunk.set(LocalPos::from_usize(8, 2, z), stone, BlockOrientation::North);
        }
        (registry, chunk)
    }

    #[test]
    fn falling_actor_lands_on_the_floor() {
        let (registry, chunk) = stone_floor_world();
        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let actor = Cylinder::new(Vec3::new(4.5, 1.5, 4.5), 0.3, 1.8);

        let outcome = resolve_movement(&actor, Vec3::new(0.0, -1.0, 0.0), &view, &registry);
        assert_eq!(outcome.cylinder.low_centre, Vec3::new(4.5, 1.0, 4.5));
        assert!(outcome.on_ground);
        assert_eq!(outcome.clamped, ClampedAxes::Y);
    }

    #[test]
    fn diagonal_move_slides_along_the_wall() {
        let (registry, chunk) = stone_floor_world();
        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let actor = Cylinder::new(Vec3::new(7.5, 1.0, 4.5), 0.25, 1.8);

        let outcome = resolve_movement(&actor, Vec3::new(0.5, 0.0, 0.5), &view, &registry);
        assert_eq!(outcome.cylinder.low_centre, Vec3::new(7.75, 1.0, 5.0));
        assert_eq!(outcome.clamped, ClampedAxes::X);
        assert!(!outcome.on_ground);
    }

    #[test]
    fn free_movement_is_unchanged() {
        let (registry, chunk) = stone_floor_world();
        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);
        let actor = Cylinder::new(Vec3::new(3.5, 1.0, 3.5), 0.3, 1.8);

        let outcome = resolve_movement(&actor, Vec3::new(1.0, 0.0, -1.0), &view, &registry);
        assert_eq!(outcome.cylinder.low_centre, Vec3::new(4.5, 1.0, 2.5));
        assert!(outcome.clamped.is_empty());
    }

    #[test]
    fn pick_finds_the_wall_face() {
        let (registry, chunk) = stone_floor_world();
        let stone = registry.id_of("stone").expect("stone");
        let view = ChunkNeighborhoodView::new(ChunkPos::new(0, 0), &chunk);

        let ray = Ray::new(Vec3::new(4.5, 1.5, 4.5), Vec3::X);
        let pick = pick_block(&ray, 10.0, &view, &registry).expect("wall in range");
        assert_eq!(pick.position, IVec3::new(8, 1, 4));
        assert_eq!(pick.face, Face::NegX);
        assert_eq!(pick.id, stone);
        assert_eq!(pick.t, 3.5);

        assert!(pick_block(&ray, 2.0, &view, &registry).is_none());
    }
}
