//! Static arena geometry and the swept move the server applies client transforms with.

use glam::Vec3;

// Distance kept between a blocked sphere and the surface it stopped at.
const SKIN: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center(center: Vec3, half_size: Vec3) -> Self {
        Self::new(center - half_size, center + half_size)
    }

    pub fn expanded(&self, by: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(by),
            max: self.max + Vec3::splat(by),
        }
    }

    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) < radius * radius
    }

    fn contains(&self, point: Vec3) -> bool {
        point.cmpgt(self.min).all() && point.cmplt(self.max).all()
    }

    /// Slab test; fraction along `from -> from + delta` where the segment enters the box.
    fn entry_fraction(&self, from: Vec3, delta: Vec3) -> Option<f32> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;

        for axis in 0..3 {
            let (start, d, lo, hi) = (from[axis], delta[axis], self.min[axis], self.max[axis]);
            if d.abs() < f32::EPSILON {
                if start <= lo || start >= hi {
                    return None;
                }
                continue;
            }
            let a = (lo - start) / d;
            let b = (hi - start) / d;
            t_enter = t_enter.max(a.min(b));
            t_exit = t_exit.min(a.max(b));
        }

        (t_enter <= t_exit && t_enter >= 0.0 && t_enter <= 1.0).then_some(t_enter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepResult {
    /// Where the moved sphere ended up.
    pub applied: Vec3,
    /// Whether geometry stopped the move short of its target.
    pub blocking_hit: bool,
}

// Port for the world's swept-move primitive.
pub trait SweptMove {
    fn apply_move_with_sweep(&self, from: Vec3, to: Vec3, radius: f32) -> SweepResult;
}

#[derive(Debug, Clone)]
pub struct Arena {
    boxes: Vec<Aabb>,
    spawn_points: Vec<Vec3>,
}

impl Arena {
    pub fn new(boxes: Vec<Aabb>, spawn_points: Vec<Vec3>) -> Self {
        let spawn_points = if spawn_points.is_empty() {
            vec![Vec3::ZERO]
        } else {
            spawn_points
        };
        Self {
            boxes,
            spawn_points,
        }
    }

    /// Closed cubic room around the origin with a floor-to-ceiling pillar in the middle.
    pub fn default_room() -> Self {
        const HALF: f32 = 20000.0;
        const WALL: f32 = 500.0;
        const PILLAR: f32 = 1000.0;

        let mut boxes = Vec::with_capacity(7);
        for axis in 0..3 {
            for sign in [-1.0_f32, 1.0] {
                let mut center = Vec3::ZERO;
                center[axis] = sign * (HALF + WALL);
                let mut half_size = Vec3::splat(HALF + 2.0 * WALL);
                half_size[axis] = WALL;
                boxes.push(Aabb::from_center(center, half_size));
            }
        }
        boxes.push(Aabb::from_center(
            Vec3::ZERO,
            Vec3::new(PILLAR, PILLAR, HALF),
        ));

        let spawn_points = vec![
            Vec3::new(10000.0, 0.0, 0.0),
            Vec3::new(-10000.0, 0.0, 0.0),
            Vec3::new(0.0, 10000.0, 0.0),
            Vec3::new(0.0, -10000.0, 0.0),
        ];
        Self::new(boxes, spawn_points)
    }

    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Spawn point for the `n`th spawn, cycling through the list.
    pub fn spawn_point(&self, n: usize) -> Vec3 {
        self.spawn_points[n % self.spawn_points.len()]
    }

    pub fn is_clear(&self, center: Vec3, radius: f32) -> bool {
        !self.boxes.iter().any(|b| b.overlaps_sphere(center, radius))
    }

    /// Earliest fraction along the segment where a sphere of `radius` touches geometry.
    ///
    /// Boxes the sphere already starts inside of are ignored so a stuck pawn can move out.
    pub fn first_hit(&self, from: Vec3, to: Vec3, radius: f32) -> Option<f32> {
        let delta = to - from;
        self.boxes
            .iter()
            .map(|b| b.expanded(radius))
            .filter(|b| !b.contains(from))
            .filter_map(|b| b.entry_fraction(from, delta))
            .min_by(|a, b| a.total_cmp(b))
    }
}

impl SweptMove for Arena {
    fn apply_move_with_sweep(&self, from: Vec3, to: Vec3, radius: f32) -> SweepResult {
        let delta = to - from;
        let length = delta.length();
        if length < 1e-4 {
            return SweepResult {
                applied: to,
                blocking_hit: false,
            };
        }

        match self.first_hit(from, to, radius) {
            None => SweepResult {
                applied: to,
                blocking_hit: false,
            },
            Some(t) => {
                let t = (t - SKIN / length).max(0.0);
                SweepResult {
                    applied: from + delta * t,
                    blocking_hit: true,
                }
            }
        }
    }
}

/// Whether the segment passes within `radius` of `center`.
pub fn segment_touches_sphere(from: Vec3, to: Vec3, center: Vec3, radius: f32) -> bool {
    let delta = to - from;
    let length_sq = delta.length_squared();
    let t = if length_sq < f32::EPSILON {
        0.0
    } else {
        ((center - from).dot(delta) / length_sq).clamp(0.0, 1.0)
    };
    (from + delta * t).distance_squared(center) <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_at_x(x: f32) -> Arena {
        Arena::new(
            vec![Aabb::from_center(
                Vec3::new(x, 0.0, 0.0),
                Vec3::new(10.0, 1000.0, 1000.0),
            )],
            vec![],
        )
    }

    #[test]
    fn clear_path_applies_the_requested_position() {
        let arena = wall_at_x(500.0);
        let result = arena.apply_move_with_sweep(Vec3::ZERO, Vec3::new(0.0, 300.0, 0.0), 50.0);

        assert_eq!(result.applied, Vec3::new(0.0, 300.0, 0.0));
        assert!(!result.blocking_hit);
    }

    #[test]
    fn blocked_path_stops_at_the_surface() {
        let arena = wall_at_x(500.0);
        let result = arena.apply_move_with_sweep(Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0), 50.0);

        assert!(result.blocking_hit);
        // Wall face at 490, minus the sphere radius.
        assert!((result.applied.x - 440.0).abs() < 1.0);
        assert!(arena.is_clear(result.applied, 50.0));
    }

    #[test]
    fn thin_walls_cannot_be_tunnelled_through() {
        let arena = wall_at_x(500.0);
        let result =
            arena.apply_move_with_sweep(Vec3::ZERO, Vec3::new(100000.0, 0.0, 0.0), 50.0);

        assert!(result.blocking_hit);
        assert!(result.applied.x < 500.0);
    }

    #[test]
    fn a_pawn_starting_inside_geometry_can_leave() {
        let arena = wall_at_x(0.0);
        let result =
            arena.apply_move_with_sweep(Vec3::ZERO, Vec3::new(-500.0, 0.0, 0.0), 50.0);

        assert!(!result.blocking_hit);
        assert_eq!(result.applied, Vec3::new(-500.0, 0.0, 0.0));
    }

    #[test]
    fn default_room_spawns_are_clear_and_walls_block() {
        let arena = Arena::default_room();
        for n in 0..4 {
            assert!(arena.is_clear(arena.spawn_point(n), 50.0));
        }

        let escape =
            arena.apply_move_with_sweep(arena.spawn_point(0), Vec3::new(50000.0, 0.0, 0.0), 50.0);
        assert!(escape.blocking_hit);
        assert!(escape.applied.x < 20000.0);
    }

    #[test]
    fn segment_sphere_contact() {
        let from = Vec3::new(-100.0, 0.0, 0.0);
        let to = Vec3::new(100.0, 0.0, 0.0);

        assert!(segment_touches_sphere(from, to, Vec3::new(0.0, 40.0, 0.0), 50.0));
        assert!(!segment_touches_sphere(from, to, Vec3::new(0.0, 60.0, 0.0), 50.0));
        assert!(!segment_touches_sphere(from, to, Vec3::new(200.0, 0.0, 0.0), 50.0));
    }
}
