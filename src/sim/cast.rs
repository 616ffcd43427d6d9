//! Swept-circle casting against box obstacles
//!
//! The predictor only needs one query from the physics layer: "sweep a circle
//! along a ray and tell me what it touches first". [`CircleCast`] is that
//! seam. [`BoxWorld`] is a self-contained implementation over axis-aligned
//! boxes, used by the headless arena and the tests.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::field::Bounds;

/// What a collider represents in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Wall,
    Brick,
    Paddle,
    /// Sensor strip under the paddle; the ball is lost when it reaches it
    Baseline,
}

/// Identity of a hit collider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
}

impl Obstacle {
    /// True for the paddle itself and the plane it collects the ball on
    #[inline]
    pub fn is_paddle_plane(&self) -> bool {
        matches!(self.kind, ObstacleKind::Paddle | ObstacleKind::Baseline)
    }
}

/// First contact of a swept circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    /// Circle center at the moment of contact
    pub point: Vec2,
    /// Unit surface normal, pointing back toward the incoming circle
    pub normal: Vec2,
    /// Travel distance from the cast origin to `point`
    pub distance: f32,
    pub obstacle: Obstacle,
}

/// Sweep a circle along a ray and report the first obstacle surface it meets.
///
/// `direction` must be unit length. `None` means nothing was hit within
/// `max_distance`, which never happens inside a closed field.
pub trait CircleCast {
    fn cast(&self, origin: Vec2, radius: f32, direction: Vec2, max_distance: f32)
    -> Option<HitResult>;
}

impl<F> CircleCast for F
where
    F: Fn(Vec2, f32, Vec2, f32) -> Option<HitResult>,
{
    fn cast(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
    ) -> Option<HitResult> {
        self(origin, radius, direction, max_distance)
    }
}

/// Specular reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect(dir: Vec2, normal: Vec2) -> Vec2 {
    dir - 2.0 * dir.dot(normal) * normal
}

/// A box obstacle registered in a [`BoxWorld`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collider {
    pub id: u32,
    pub kind: ObstacleKind,
    pub bounds: Bounds,
}

impl Collider {
    pub fn obstacle(&self) -> Obstacle {
        Obstacle {
            id: self.id,
            kind: self.kind,
        }
    }
}

/// Axis-aligned box obstacles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoxWorld {
    colliders: Vec<Collider>,
    next_id: u32,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collider, returning its id
    pub fn add(&mut self, kind: ObstacleKind, bounds: Bounds) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.colliders.push(Collider { id, kind, bounds });
        id
    }

    pub fn remove(&mut self, id: u32) -> Option<Collider> {
        let index = self.colliders.iter().position(|c| c.id == id)?;
        Some(self.colliders.remove(index))
    }

    pub fn get(&self, id: u32) -> Option<&Collider> {
        self.colliders.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Collider> {
        self.colliders.iter_mut().find(|c| c.id == id)
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn count(&self, kind: ObstacleKind) -> usize {
        self.colliders.iter().filter(|c| c.kind == kind).count()
    }
}

impl CircleCast for BoxWorld {
    fn cast(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
    ) -> Option<HitResult> {
        let mut best: Option<HitResult> = None;

        for collider in &self.colliders {
            // A circle touching a box is its center touching the box grown by
            // the radius. Corners are treated as square.
            let grown = collider.bounds.expanded(radius);
            let Some((t, normal)) = ray_box_entry(origin, direction, grown.min(), grown.max())
            else {
                continue;
            };
            if t > max_distance {
                continue;
            }
            if best.is_none_or(|b| t < b.distance) {
                best = Some(HitResult {
                    point: origin + direction * t,
                    normal,
                    distance: t,
                    obstacle: collider.obstacle(),
                });
            }
        }

        best
    }
}

/// How far inside a box a cast may start and still hit its entry face
const SKIN: f32 = 0.05;

/// Slab test. Returns the entry distance and the normal of the entered face.
///
/// Rays starting deeper than [`SKIN`] inside the box are ignored, so a cast
/// that begins on a surface it is leaving does not report that surface again.
/// A shallower start still moving inward hits at distance 0.
fn ray_box_entry(origin: Vec2, dir: Vec2, min: Vec2, max: Vec2) -> Option<(f32, Vec2)> {
    let o = origin.to_array();
    let d = dir.to_array();
    let lo = min.to_array();
    let hi = max.to_array();
    let axes = [Vec2::X, Vec2::Y];

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        if d[axis].abs() < 1e-8 {
            if o[axis] < lo[axis] || o[axis] > hi[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d[axis];
        let t_lo = (lo[axis] - o[axis]) * inv;
        let t_hi = (hi[axis] - o[axis]) * inv;
        // Moving toward +axis enters through the low face
        let (near, far, face_normal) = if t_lo < t_hi {
            (t_lo, t_hi, -axes[axis])
        } else {
            (t_hi, t_lo, axes[axis])
        };
        if near > t_enter {
            t_enter = near;
            normal = face_normal;
        }
        t_exit = t_exit.min(far);
    }

    if t_enter > t_exit || t_exit < 0.0 || t_enter < -SKIN {
        return None;
    }
    Some((t_enter.max(0.0), normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walled_box() -> BoxWorld {
        let mut world = BoxWorld::new();
        world.add(
            ObstacleKind::Wall,
            Bounds::new(Vec2::new(-5.5, 0.0), Vec2::new(1.0, 12.0)),
        );
        world.add(
            ObstacleKind::Wall,
            Bounds::new(Vec2::new(5.5, 0.0), Vec2::new(1.0, 12.0)),
        );
        world.add(
            ObstacleKind::Wall,
            Bounds::new(Vec2::new(0.0, 5.5), Vec2::new(12.0, 1.0)),
        );
        world.add(
            ObstacleKind::Baseline,
            Bounds::new(Vec2::new(0.0, -5.5), Vec2::new(12.0, 1.0)),
        );
        world
    }

    #[test]
    fn test_reflect() {
        let reflected = reflect(Vec2::new(1.0, -1.0), Vec2::Y);
        assert!((reflected - Vec2::new(1.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_cast_hits_nearest_surface() {
        let world = walled_box();
        let hit = world.cast(Vec2::ZERO, 0.5, Vec2::X, 100.0).unwrap();
        // right wall inner face at x = 5, grown by the radius
        assert!((hit.point.x - 4.5).abs() < 1e-5);
        assert!((hit.distance - 4.5).abs() < 1e-5);
        assert_eq!(hit.normal, -Vec2::X);
        assert_eq!(hit.obstacle.kind, ObstacleKind::Wall);
    }

    #[test]
    fn test_cast_down_reaches_baseline() {
        let world = walled_box();
        let hit = world.cast(Vec2::new(1.0, 2.0), 0.5, -Vec2::Y, 100.0).unwrap();
        assert!(hit.obstacle.is_paddle_plane());
        assert_eq!(hit.normal, Vec2::Y);
        assert!((hit.point.y - (-4.5)).abs() < 1e-5);
    }

    #[test]
    fn test_cast_respects_max_distance() {
        let world = walled_box();
        assert!(world.cast(Vec2::ZERO, 0.5, Vec2::X, 1.0).is_none());
    }

    #[test]
    fn test_cast_ignores_box_containing_origin() {
        let mut world = BoxWorld::new();
        world.add(ObstacleKind::Brick, Bounds::new(Vec2::ZERO, Vec2::splat(2.0)));
        assert!(world.cast(Vec2::ZERO, 0.1, Vec2::X, 10.0).is_none());
    }

    #[test]
    fn test_cast_starting_just_inside_hits_at_zero() {
        let world = walled_box();
        // grown right wall starts at x = 4.5
        let hit = world
            .cast(Vec2::new(4.52, 0.0), 0.5, Vec2::X, 100.0)
            .unwrap();
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.normal, -Vec2::X);

        // leaving the same wall reports the far one instead
        let hit = world
            .cast(Vec2::new(4.52, 0.0), 0.5, -Vec2::X, 100.0)
            .unwrap();
        assert!((hit.point.x - (-4.5)).abs() < 1e-5);
    }

    #[test]
    fn test_remove_collider() {
        let mut world = walled_box();
        let id = world.add(ObstacleKind::Brick, Bounds::new(Vec2::new(2.0, 0.0), Vec2::ONE));
        assert_eq!(world.count(ObstacleKind::Brick), 1);
        let hit = world.cast(Vec2::ZERO, 0.1, Vec2::X, 100.0).unwrap();
        assert_eq!(hit.obstacle.id, id);

        assert!(world.remove(id).is_some());
        assert_eq!(world.count(ObstacleKind::Brick), 0);
        let hit = world.cast(Vec2::ZERO, 0.1, Vec2::X, 100.0).unwrap();
        assert_eq!(hit.obstacle.kind, ObstacleKind::Wall);
    }

    #[test]
    fn test_closure_caster() {
        let floor = |origin: Vec2, radius: f32, _dir: Vec2, _max: f32| {
            Some(HitResult {
                point: Vec2::new(origin.x, radius),
                normal: Vec2::Y,
                distance: origin.y - radius,
                obstacle: Obstacle {
                    id: 7,
                    kind: ObstacleKind::Baseline,
                },
            })
        };
        let hit = floor.cast(Vec2::new(1.0, 3.0), 0.5, -Vec2::Y, 10.0).unwrap();
        assert_eq!(hit.obstacle.id, 7);
        assert_eq!(hit.point, Vec2::new(1.0, 0.5));
    }
}
