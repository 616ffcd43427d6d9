//! Play-field dimensions derived from the boundary obstacles
//!
//! The field is assumed centered on x = 0, so paddle positions range over
//! `[-width / 2, width / 2]`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Axis-aligned box: center and full size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec2,
    pub size: Vec2,
}

impl Bounds {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self { center, size }
    }

    #[inline]
    pub fn half_size(&self) -> Vec2 {
        self.size * 0.5
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.center - self.half_size()
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.center + self.half_size()
    }

    /// Same center, grown by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            center: self.center,
            size: self.size + Vec2::splat(2.0 * margin),
        }
    }
}

/// Scene obstacles the field dimensions are measured from.
///
/// Any of them may be missing while a scene is still being assembled;
/// [`FieldGeometry::from_obstacles`] refuses to run until all are present.
#[derive(Debug, Clone, Default)]
pub struct FieldObstacles {
    pub left_wall: Option<Bounds>,
    pub right_wall: Option<Bounds>,
    pub top_wall: Option<Bounds>,
    pub paddle: Option<Bounds>,
    pub ball: Option<Bounds>,
}

/// Usable play-field extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    /// Horizontal range the paddle center can cover
    pub width: f32,
    /// Vertical range the ball center can cover above the paddle
    pub height: f32,
    /// `sqrt(width² + height²)`, the longest straight run inside the field
    pub diagonal: f32,
}

impl FieldGeometry {
    /// Build from explicit dimensions
    pub fn new(width: f32, height: f32) -> Result<Self, GeometryError> {
        if !(width > 0.0 && height > 0.0) {
            return Err(GeometryError::NonPositiveDimension { width, height });
        }
        Ok(Self {
            width,
            height,
            diagonal: (width * width + height * height).sqrt(),
        })
    }

    /// Measure the field between the walls, the paddle and the ceiling.
    ///
    /// Width is the gap between the walls minus one paddle width; height is
    /// the gap between the paddle and the ceiling minus one ball diameter.
    pub fn from_obstacles(obstacles: &FieldObstacles) -> Result<Self, GeometryError> {
        let left = obstacles
            .left_wall
            .ok_or(GeometryError::MissingObstacle("left wall"))?;
        let right = obstacles
            .right_wall
            .ok_or(GeometryError::MissingObstacle("right wall"))?;
        let top = obstacles
            .top_wall
            .ok_or(GeometryError::MissingObstacle("top wall"))?;
        let paddle = obstacles
            .paddle
            .ok_or(GeometryError::MissingObstacle("paddle"))?;
        let ball = obstacles
            .ball
            .ok_or(GeometryError::MissingObstacle("ball"))?;

        let width = right.center.x
            - left.center.x
            - (right.size.x + left.size.x) / 2.0
            - paddle.size.x;
        let height =
            top.center.y - paddle.center.y - (top.size.y + paddle.size.y) / 2.0 - ball.size.x;

        Self::new(width, height)
    }

    /// Clamp a paddle x into the reachable range
    #[inline]
    pub fn clamp_x(&self, x: f32) -> f32 {
        x.clamp(-self.width / 2.0, self.width / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obstacles() -> FieldObstacles {
        FieldObstacles {
            left_wall: Some(Bounds::new(Vec2::new(-10.5, 0.0), Vec2::new(1.0, 20.0))),
            right_wall: Some(Bounds::new(Vec2::new(10.5, 0.0), Vec2::new(1.0, 20.0))),
            top_wall: Some(Bounds::new(Vec2::new(0.0, 8.5), Vec2::new(22.0, 1.0))),
            paddle: Some(Bounds::new(Vec2::new(0.0, -7.0), Vec2::new(2.0, 0.5))),
            ball: Some(Bounds::new(Vec2::ZERO, Vec2::splat(0.5))),
        }
    }

    #[test]
    fn test_from_obstacles() {
        let field = FieldGeometry::from_obstacles(&obstacles()).unwrap();
        // 21 - 1 - 2
        assert!((field.width - 18.0).abs() < 1e-5);
        // 15.5 - 0.75 - 0.5
        assert!((field.height - 14.25).abs() < 1e-5);
        let expected = (field.width.powi(2) + field.height.powi(2)).sqrt();
        assert!((field.diagonal - expected).abs() < 1e-5);
    }

    #[test]
    fn test_missing_obstacle() {
        let mut obs = obstacles();
        obs.top_wall = None;
        assert_eq!(
            FieldGeometry::from_obstacles(&obs),
            Err(GeometryError::MissingObstacle("top wall"))
        );
    }

    #[test]
    fn test_collapsed_field_rejected() {
        let mut obs = obstacles();
        obs.paddle = Some(Bounds::new(Vec2::new(0.0, -7.0), Vec2::new(30.0, 0.5)));
        assert!(matches!(
            FieldGeometry::from_obstacles(&obs),
            Err(GeometryError::NonPositiveDimension { .. })
        ));
        assert!(FieldGeometry::new(f32::NAN, 1.0).is_err());
    }

    #[test]
    fn test_clamp_x() {
        let field = FieldGeometry::new(10.0, 5.0).unwrap();
        assert_eq!(field.clamp_x(7.0), 5.0);
        assert_eq!(field.clamp_x(-7.0), -5.0);
        assert_eq!(field.clamp_x(1.0), 1.0);
    }
}
