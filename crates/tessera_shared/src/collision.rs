use std::fmt;

use bitflags::bitflags;
use glam::{IVec3, Vec3};

use crate::orientation::{BlockOrientation, Face};
use crate::physics::Ray;

/// Upright actor volume: a vertical cylinder standing on `low_centre`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Cylinder {
    pub low_centre: Vec3,
    pub radius: f32,
    pub height: f32,
}

impl Cylinder {
    pub fn new(low_centre: Vec3, radius: f32, height: f32) -> Self {
        Self {
            low_centre,
            radius,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.low_centre.y + self.height
    }

    pub fn moved_to(&self, low_centre: Vec3) -> Self {
        Self { low_centre, ..*self }
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let reach = Vec3::new(self.radius, 0.0, self.radius);
        (
            self.low_centre - reach,
            self.low_centre + reach + Vec3::new(0.0, self.height, 0.0),
        )
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClampedAxes: u8 {
        const X = 0b001;
        const Y = 0b010;
        const Z = 0b100;
    }
}

impl ClampedAxes {
    pub fn for_axis(axis: usize) -> Self {
        match axis {
            0 => Self::X,
            1 => Self::Y,
            _ => Self::Z,
        }
    }
}

/// Corrected position after pushing a cylinder out of one block.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CollisionResolution {
    pub low_centre: Vec3,
    pub clamped: ClampedAxes,
    /// The cylinder came to rest on top of the block.
    pub on_ground: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RayHit {
    pub t: f32,
    pub face: Face,
}

/// Per-block-type geometry for actor collision and ray picking.
///
/// Predicates never fail; "no contact" is `false` or `None`.
pub trait BlockCollision: Send + Sync + fmt::Debug {
    fn has_collision_with(
        &self,
        block: IVec3,
        orientation: BlockOrientation,
        cylinder: &Cylinder,
    ) -> bool;

    /// Checks whether moving `cylinder` to `proposed_low_centre` would
    /// penetrate the block and, if so, where it has to stop instead.
    fn resolve_collision_with(
        &self,
        block: IVec3,
        orientation: BlockOrientation,
        cylinder: &Cylinder,
        proposed_low_centre: Vec3,
    ) -> Option<CollisionResolution>;

    fn intersect_with(
        &self,
        block: IVec3,
        orientation: BlockOrientation,
        ray: &Ray,
        max_t: f32,
    ) -> Option<RayHit>;
}

/// Nothing to collide with.
#[derive(Debug, Copy, Clone, Default)]
pub struct VoidBlockCollision;

impl BlockCollision for VoidBlockCollision {
    fn has_collision_with(&self, _: IVec3, _: BlockOrientation, _: &Cylinder) -> bool {
        false
    }

    fn resolve_collision_with(
        &self,
        _: IVec3,
        _: BlockOrientation,
        _: &Cylinder,
        _: Vec3,
    ) -> Option<CollisionResolution> {
        None
    }

    fn intersect_with(&self, _: IVec3, _: BlockOrientation, _: &Ray, _: f32) -> Option<RayHit> {
        None
    }
}

/// A box inside the cell, given in model space and turned by the instance's
/// orientation. With `enabled` unset the box still answers ray picks but
/// actors pass through it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoxBlockCollision {
    pub min: Vec3,
    pub max: Vec3,
    pub enabled: bool,
}

impl BoxBlockCollision {
    pub const FULL: Self = Self::new(Vec3::ZERO, Vec3::ONE);

    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            enabled: true,
        }
    }

    pub const fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    pub fn world_bounds(&self, block: IVec3, orientation: BlockOrientation) -> (Vec3, Vec3) {
        let (min, max) = orientation.rotate_box(self.min, self.max);
        let origin = block.as_vec3();
        (origin + min, origin + max)
    }
}

/// Strict overlap between a cylinder and an axis-aligned box: touching
/// surfaces do not count.
pub fn cylinder_overlaps_box(cylinder: &Cylinder, min: Vec3, max: Vec3) -> bool {
    let low = cylinder.low_centre;
    if !(low.y < max.y && cylinder.top() > min.y) {
        return false;
    }
    let closest_x = low.x.clamp(min.x, max.x);
    let closest_z = low.z.clamp(min.z, max.z);
    let dx = low.x - closest_x;
    let dz = low.z - closest_z;
    dx * dx + dz * dz < cylinder.radius * cylinder.radius
}

impl BlockCollision for BoxBlockCollision {
    fn has_collision_with(
        &self,
        block: IVec3,
        orientation: BlockOrientation,
        cylinder: &Cylinder,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        let (min, max) = self.world_bounds(block, orientation);
        cylinder_overlaps_box(cylinder, min, max)
    }

    fn resolve_collision_with(
        &self,
        block: IVec3,
        orientation: BlockOrientation,
        cylinder: &Cylinder,
        proposed_low_centre: Vec3,
    ) -> Option<CollisionResolution> {
        if !self.enabled {
            return None;
        }
        let (min, max) = self.world_bounds(block, orientation);
        if !cylinder_overlaps_box(&cylinder.moved_to(proposed_low_centre), min, max) {
            return None;
        }

        let current = cylinder.low_centre;
        let delta = proposed_low_centre - current;
        let radius = cylinder.radius;
        let mut corrected = proposed_low_centre;

        if delta.y < 0.0 && current.y >= max.y {
            corrected.y = max.y;
            return Some(CollisionResolution {
                low_centre: corrected,
                clamped: ClampedAxes::Y,
                on_ground: true,
            });
        }
        if delta.y > 0.0 && cylinder.top() <= min.y {
            corrected.y = min.y - cylinder.height;
            return Some(CollisionResolution {
                low_centre: corrected,
                clamped: ClampedAxes::Y,
                on_ground: false,
            });
        }

        let mut clamped = ClampedAxes::empty();
        for axis in [0, 2] {
            if delta[axis] > 0.0 && current[axis] + radius <= min[axis] {
                corrected[axis] = min[axis] - radius;
                clamped |= ClampedAxes::for_axis(axis);
            } else if delta[axis] < 0.0 && current[axis] - radius >= max[axis] {
                corrected[axis] = max[axis] + radius;
                clamped |= ClampedAxes::for_axis(axis);
            }
        }
        if !clamped.is_empty() {
            return Some(CollisionResolution {
                low_centre: corrected,
                clamped,
                on_ground: false,
            });
        }

        // Already touching the box, or approaching past a rounded corner:
        // push out along whichever side needs the least travel.
        Some(push_out(cylinder, proposed_low_centre, min, max))
    }

    fn intersect_with(
        &self,
        block: IVec3,
        orientation: BlockOrientation,
        ray: &Ray,
        max_t: f32,
    ) -> Option<RayHit> {
        let (min, max) = self.world_bounds(block, orientation);
        let size = max - min;
        if size.min_element() <= 0.0 {
            return None;
        }
        let origin = (ray.origin - min) / size;
        let direction = ray.direction / size;
        ray_intersect_std_box(origin, direction, 0.0, max_t).map(|hit| RayHit {
            t: hit.t_enter,
            face: hit.face,
        })
    }
}

fn push_out(cylinder: &Cylinder, proposed: Vec3, min: Vec3, max: Vec3) -> CollisionResolution {
    let radius = cylinder.radius;
    let candidates = [
        (1, max.y - proposed.y, max.y, true),
        (1, proposed.y + cylinder.height - min.y, min.y - cylinder.height, false),
        (0, max.x + radius - proposed.x, max.x + radius, false),
        (0, proposed.x + radius - min.x, min.x - radius, false),
        (2, max.z + radius - proposed.z, max.z + radius, false),
        (2, proposed.z + radius - min.z, min.z - radius, false),
    ];

    let (axis, _, target, on_ground) = candidates
        .into_iter()
        .filter(|(_, travel, _, _)| *travel >= 0.0)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or(candidates[0]);

    let mut corrected = proposed;
    corrected[axis] = target;
    CollisionResolution {
        low_centre: corrected,
        clamped: ClampedAxes::for_axis(axis),
        on_ground,
    }
}

/// Result of a ray against the `[0, 1]^3` box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StdBoxHit {
    pub t_enter: f32,
    pub t_exit: f32,
    /// Face the ray enters through, or leaves through when it starts inside.
    pub face: Face,
}

/// Slab test against the unit cube over `[min_t, max_t]`. Grazing contact
/// (`t_enter == t_exit`, or running along a face) counts as a hit.
pub fn ray_intersect_std_box(
    origin: Vec3,
    direction: Vec3,
    min_t: f32,
    max_t: f32,
) -> Option<StdBoxHit> {
    let mut t_enter = min_t;
    let mut t_exit = max_t;
    let mut enter_face = None;
    let mut exit_face = None;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d == 0.0 {
            if !(0.0..=1.0).contains(&o) {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let near = (0.0 - o) * inv;
        let far = (1.0 - o) * inv;
        let (t0, t1) = if near <= far { (near, far) } else { (far, near) };

        if t0 > t_enter {
            t_enter = t0;
            enter_face = Some(Face::from_axis(axis, d < 0.0));
        }
        if t1 < t_exit {
            t_exit = t1;
            exit_face = Some(Face::from_axis(axis, d > 0.0));
        }
        if t_enter > t_exit {
            return None;
        }
    }

    Some(StdBoxHit {
        t_enter,
        t_exit,
        face: enter_face.or(exit_face).unwrap_or(Face::PosY),
    })
}

#[cfg(test)]
mod tests {
    use glam::{IVec3, Vec3};

    use super::{
        ray_intersect_std_box, BlockCollision, BoxBlockCollision, ClampedAxes, Cylinder,
        VoidBlockCollision,
    };
    use crate::orientation::{BlockOrientation, Face};
    use crate::physics::Ray;

    #[test]
    fn std_box_hit_and_miss() {
        let hit = ray_intersect_std_box(Vec3::new(0.5, 0.5, -1.0), Vec3::Z, 0.0, 10.0)
            .expect("ray through the centre");
        assert_eq!(hit.face, Face::NegZ);
        assert_eq!(hit.t_enter, 1.0);
        assert_eq!(hit.t_exit, 2.0);

        assert!(ray_intersect_std_box(Vec3::new(2.0, 2.0, -1.0), Vec3::Z, 0.0, 10.0).is_none());
    }

    #[test]
    fn std_box_counts_grazing_contact() {
        // Runs exactly along the +X face.
        assert!(ray_intersect_std_box(Vec3::new(1.0, 0.5, -1.0), Vec3::Z, 0.0, 10.0).is_some());
        // Touches only the edge at (1, 1, z).
        let corner = ray_intersect_std_box(
            Vec3::new(2.0, 0.0, 0.5),
            Vec3::new(-1.0, 1.0, 0.0),
            0.0,
            10.0,
        )
        .expect("edge contact");
        assert_eq!(corner.t_enter, corner.t_exit);
        // Too short to reach the cube.
        assert!(ray_intersect_std_box(Vec3::new(0.5, 0.5, -1.0), Vec3::Z, 0.0, 0.5).is_none());
    }

    #[test]
    fn cylinder_above_block_only_collides_once_lowered() {
        let block = BoxBlockCollision::FULL;
        let origin = IVec3::new(2, 3, 4);
        let above = Cylinder::new(Vec3::new(2.5, 4.2, 4.5), 0.3, 1.8);
        assert!(!block.has_collision_with(origin, BlockOrientation::North, &above));

        let resting = above.moved_to(Vec3::new(2.5, 4.0, 4.5));
        assert!(!block.has_collision_with(origin, BlockOrientation::North, &resting));

        let lowered = above.moved_to(Vec3::new(2.5, 3.8, 4.5));
        assert!(block.has_collision_with(origin, BlockOrientation::North, &lowered));

        let resolution = block
            .resolve_collision_with(origin, BlockOrientation::North, &above, lowered.low_centre)
            .expect("downward move penetrates the top face");
        assert_eq!(resolution.low_centre, Vec3::new(2.5, 4.0, 4.5));
        assert_eq!(resolution.clamped, ClampedAxes::Y);
        assert!(resolution.on_ground);
    }

    #[test]
    fn sideways_move_stops_at_the_wall() {
        let block = BoxBlockCollision::FULL;
        let cylinder = Cylinder::new(Vec3::new(-0.5, 0.0, 0.5), 0.25, 1.8);
        let resolution = block
            .resolve_collision_with(
                IVec3::ZERO,
                BlockOrientation::North,
                &cylinder,
                Vec3::new(0.1, 0.0, 0.5),
            )
            .expect("walks into the block");
        assert_eq!(resolution.low_centre, Vec3::new(-0.25, 0.0, 0.5));
        assert_eq!(resolution.clamped, ClampedAxes::X);
        assert!(!resolution.on_ground);

        let missing = block.resolve_collision_with(
            IVec3::ZERO,
            BlockOrientation::North,
            &cylinder,
            Vec3::new(-0.3, 0.0, 0.5),
        );
        assert!(missing.is_none());
    }

    #[test]
    fn void_collision_never_reports_anything() {
        let void = VoidBlockCollision;
        let cylinder = Cylinder::new(Vec3::new(0.5, 0.0, 0.5), 0.4, 1.0);
        let ray = Ray {
            origin: Vec3::new(0.5, 0.5, -1.0),
            direction: Vec3::Z,
        };
        for orientation in BlockOrientation::ALL {
            assert!(!void.has_collision_with(IVec3::ZERO, orientation, &cylinder));
            assert!(void
                .resolve_collision_with(IVec3::ZERO, orientation, &cylinder, Vec3::new(0.5, -1.0, 0.5))
                .is_none());
            assert!(void.intersect_with(IVec3::ZERO, orientation, &ray, 10.0).is_none());
        }
    }

    #[test]
    fn box_picking_maps_the_unit_cube_into_world_space() {
        let slab = BoxBlockCollision::new(Vec3::ZERO, Vec3::new(1.0, 0.5, 1.0));
        let ray = Ray {
            origin: Vec3::new(3.5, 10.0, 7.5),
            direction: Vec3::NEG_Y,
        };
        let upright = slab
            .intersect_with(IVec3::new(3, 5, 7), BlockOrientation::North, &ray, 20.0)
            .expect("hits the slab from above");
        assert_eq!(upright.face, Face::PosY);
        assert_eq!(upright.t, 4.5);

        let hanging = slab
            .intersect_with(IVec3::new(3, 5, 7), BlockOrientation::NorthInverted, &ray, 20.0)
            .expect("hits the inverted slab");
        assert_eq!(hanging.t, 4.0);

        let disabled = slab.disabled();
        assert!(disabled
            .intersect_with(IVec3::new(3, 5, 7), BlockOrientation::North, &ray, 20.0)
            .is_some());
        let cylinder = Cylinder::new(Vec3::new(3.5, 5.0, 7.5), 0.3, 1.0);
        assert!(!disabled.has_collision_with(IVec3::new(3, 5, 7), BlockOrientation::North, &cylinder));
    }
}
