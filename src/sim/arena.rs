//! Headless breakout arena
//!
//! Walls on three sides, a brick grid in the upper half, a paddle sliding
//! along the bottom and a baseline sensor under it. The ball moves in
//! straight lines between bounces at constant speed; reaching the baseline
//! loses it and it respawns resting on the paddle.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::cast::{BoxWorld, CircleCast, HitResult, ObstacleKind};
use super::field::{Bounds, FieldGeometry, FieldObstacles};
use super::predictor::{CAST_CLEARANCE, bounce_direction};
use super::state::{BallState, PaddleState};
use crate::consts::*;
use crate::control::Simulation;
use crate::error::GeometryError;
use crate::settings::Settings;

/// Ball lifecycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BallPhase {
    /// Sitting on the paddle, launching when the timer runs out
    Resting { remaining: f32 },
    Free,
}

pub struct Arena {
    world: BoxWorld,
    field: FieldGeometry,
    paddle_id: u32,
    paddle_x: f32,
    ball: BallState,
    phase: BallPhase,
    rng: Pcg32,
    ball_speed: f32,
    /// Launch angle spread either side of vertical (radians)
    launch_aperture: f32,
    respawn_delay: f32,
    bricks_cleared: u32,
    balls_lost: u32,
}

impl Arena {
    pub fn new(settings: &Settings, seed: u64) -> Result<Self, GeometryError> {
        let outer_half = ARENA_HALF_WIDTH + WALL_THICKNESS / 2.0;
        let bottom = PADDLE_Y - PADDLE_HEIGHT / 2.0 - BASELINE_THICKNESS;
        let top = ARENA_TOP + WALL_THICKNESS;
        let wall_size = Vec2::new(WALL_THICKNESS, top - bottom);
        let wall_y = (top + bottom) / 2.0;

        let left_wall = Bounds::new(Vec2::new(-outer_half, wall_y), wall_size);
        let right_wall = Bounds::new(Vec2::new(outer_half, wall_y), wall_size);
        let top_wall = Bounds::new(
            Vec2::new(0.0, ARENA_TOP + WALL_THICKNESS / 2.0),
            Vec2::new(2.0 * (ARENA_HALF_WIDTH + WALL_THICKNESS), WALL_THICKNESS),
        );
        let paddle = Bounds::new(
            Vec2::new(0.0, PADDLE_Y),
            Vec2::new(PADDLE_WIDTH, PADDLE_HEIGHT),
        );
        // sensor strip directly under the paddle, wall to wall
        let baseline = Bounds::new(
            Vec2::new(0.0, PADDLE_Y - PADDLE_HEIGHT / 2.0 - BASELINE_THICKNESS / 2.0),
            Vec2::new(2.0 * ARENA_HALF_WIDTH, BASELINE_THICKNESS),
        );

        let field = FieldGeometry::from_obstacles(&FieldObstacles {
            left_wall: Some(left_wall),
            right_wall: Some(right_wall),
            top_wall: Some(top_wall),
            paddle: Some(paddle),
            ball: Some(Bounds::new(Vec2::ZERO, Vec2::splat(BALL_DIAMETER))),
        })?;

        let mut world = BoxWorld::new();
        world.add(ObstacleKind::Wall, left_wall);
        world.add(ObstacleKind::Wall, right_wall);
        world.add(ObstacleKind::Wall, top_wall);
        let paddle_id = world.add(ObstacleKind::Paddle, paddle);
        world.add(ObstacleKind::Baseline, baseline);

        let mut arena = Self {
            world,
            field,
            paddle_id,
            paddle_x: 0.0,
            ball: BallState::new(Vec2::ZERO, Vec2::ZERO, BALL_DIAMETER / 2.0),
            phase: BallPhase::Free,
            rng: Pcg32::seed_from_u64(seed),
            ball_speed: settings.ball_speed,
            launch_aperture: settings.ball_start_max_angle_deg.to_radians(),
            respawn_delay: settings.respawn_delay_secs,
            bricks_cleared: 0,
            balls_lost: 0,
        };
        arena.lay_bricks();
        arena.respawn();

        log::info!(
            "Arena ready: field {:.2} x {:.2}, {} bricks",
            field.width,
            field.height,
            arena.bricks_remaining()
        );
        Ok(arena)
    }

    pub fn field(&self) -> FieldGeometry {
        self.field
    }

    pub fn phase(&self) -> BallPhase {
        self.phase
    }

    pub fn world(&self) -> &BoxWorld {
        &self.world
    }

    pub fn bricks_remaining(&self) -> usize {
        self.world.count(ObstacleKind::Brick)
    }

    pub fn bricks_cleared(&self) -> u32 {
        self.bricks_cleared
    }

    pub fn balls_lost(&self) -> u32 {
        self.balls_lost
    }

    /// Put the ball in play at `pos` moving with `vel`
    pub fn serve(&mut self, pos: Vec2, vel: Vec2) {
        self.ball.pos = pos;
        self.ball.vel = vel;
        self.phase = BallPhase::Free;
    }

    /// Fill the upper half of the field with bricks, leaving a one-brick
    /// border free on every side of the grid.
    fn lay_bricks(&mut self) {
        let inner_width = 2.0 * ARENA_HALF_WIDTH;
        let region_height = (ARENA_TOP - (PADDLE_Y + PADDLE_HEIGHT / 2.0)) / 2.0;

        let columns = ((inner_width + BRICK_MARGIN) / (BRICK_WIDTH + BRICK_MARGIN)).floor() as i32;
        let rows = ((region_height + BRICK_MARGIN) / (BRICK_HEIGHT + BRICK_MARGIN)).floor() as i32;
        let side_margin = (inner_width
            - columns as f32 * BRICK_WIDTH
            - (columns - 1) as f32 * BRICK_MARGIN)
            / 2.0;
        let top_margin = (region_height
            - rows as f32 * BRICK_HEIGHT
            - (rows - 1) as f32 * BRICK_MARGIN)
            / 2.0;

        let start_x = -ARENA_HALF_WIDTH + side_margin + BRICK_WIDTH / 2.0;
        let start_y = ARENA_TOP - top_margin - BRICK_HEIGHT / 2.0;
        let size = Vec2::new(BRICK_WIDTH, BRICK_HEIGHT);

        for i in 1..columns - 1 {
            let x = start_x + i as f32 * (BRICK_WIDTH + BRICK_MARGIN);
            for j in 1..rows - 1 {
                let y = start_y - j as f32 * (BRICK_HEIGHT + BRICK_MARGIN);
                self.world
                    .add(ObstacleKind::Brick, Bounds::new(Vec2::new(x, y), size));
            }
        }
    }

    /// Park the ball on the paddle until the respawn timer runs out
    fn respawn(&mut self) {
        self.ball.vel = Vec2::ZERO;
        self.ball.pos = self.paddle().contact_point(self.ball.radius);
        self.phase = BallPhase::Resting {
            remaining: self.respawn_delay,
        };
    }

    fn launch(&mut self) {
        let spread = self
            .rng
            .random_range(-self.launch_aperture..=self.launch_aperture);
        let angle = std::f32::consts::FRAC_PI_2 + spread;
        self.ball.vel = Vec2::from_angle(angle) * self.ball_speed;
        self.phase = BallPhase::Free;
        log::debug!("Ball launched at {:.1}°", angle.to_degrees());
    }

    fn move_paddle(&mut self, dx: f32) {
        self.paddle_x = self.field.clamp_x(self.paddle_x + dx);
        let x = self.paddle_x;
        if let Some(paddle) = self.world.get_mut(self.paddle_id) {
            paddle.bounds.center.x = x;
        }
    }

    /// Move the ball its per-step distance, bouncing along the way
    fn advance_ball(&mut self, dt: f32) {
        let speed = self.ball.vel.length();
        let Some(mut dir) = self.ball.vel.try_normalize() else {
            return;
        };
        let mut remaining = speed * dt;

        for _ in 0..MAX_BOUNCES_PER_STEP {
            let Some(hit) = self
                .world
                .cast(self.ball.pos, self.ball.radius, dir, remaining)
            else {
                self.ball.pos += dir * remaining;
                break;
            };

            self.ball.pos = hit.point;
            remaining = (remaining - hit.distance).max(0.0);

            match hit.obstacle.kind {
                ObstacleKind::Baseline => {
                    self.balls_lost += 1;
                    log::info!("Ball lost at x = {:.2}", hit.point.x);
                    self.respawn();
                    return;
                }
                ObstacleKind::Brick => {
                    self.world.remove(hit.obstacle.id);
                    self.bricks_cleared += 1;
                }
                ObstacleKind::Wall | ObstacleKind::Paddle => {}
            }

            dir = bounce_direction(dir, hit.normal);
            self.ball.pos += dir * CAST_CLEARANCE;
        }

        self.ball.vel = dir * speed;

        if self.bricks_remaining() == 0 {
            log::info!("All bricks cleared; laying a new wall");
            self.lay_bricks();
            self.respawn();
        }
    }
}

impl CircleCast for Arena {
    fn cast(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
    ) -> Option<HitResult> {
        self.world.cast(origin, radius, direction, max_distance)
    }
}

impl Simulation for Arena {
    fn step(&mut self, dt: f32, paddle_velocity: f32) {
        self.move_paddle(paddle_velocity * dt);

        match self.phase {
            BallPhase::Resting { remaining } => {
                self.ball.pos = self.paddle().contact_point(self.ball.radius);
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    self.launch();
                } else {
                    self.phase = BallPhase::Resting { remaining };
                }
            }
            BallPhase::Free => self.advance_ball(dt),
        }
    }

    fn ball(&self) -> BallState {
        self.ball
    }

    fn paddle(&self) -> PaddleState {
        PaddleState::new(self.paddle_x, PADDLE_Y, PADDLE_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        Arena::new(&Settings::default(), 7).unwrap()
    }

    #[test]
    fn test_new_arena_layout() {
        let arena = arena();
        let field = arena.field();
        assert!((field.width - (2.0 * ARENA_HALF_WIDTH - PADDLE_WIDTH)).abs() < 1e-4);
        assert!(field.height > 0.0);
        assert!(arena.bricks_remaining() > 0);
        assert!(matches!(arena.phase(), BallPhase::Resting { .. }));
        assert!(arena.ball().is_stationary());
        assert_eq!(arena.ball().pos, arena.paddle().contact_point(BALL_DIAMETER / 2.0));
    }

    #[test]
    fn test_bricks_inside_upper_half() {
        let arena = arena();
        for brick in arena
            .world()
            .colliders()
            .iter()
            .filter(|c| c.kind == ObstacleKind::Brick)
        {
            assert!(brick.bounds.min().x > -ARENA_HALF_WIDTH);
            assert!(brick.bounds.max().x < ARENA_HALF_WIDTH);
            assert!(brick.bounds.max().y < ARENA_TOP);
            assert!(brick.bounds.min().y > 0.0);
        }
    }

    #[test]
    fn test_resting_ball_follows_paddle_then_launches() {
        let mut arena = arena();
        arena.step(0.1, 10.0);
        assert!((arena.paddle().x - 1.0).abs() < 1e-5);
        assert!((arena.ball().pos.x - 1.0).abs() < 1e-5);

        let settings = Settings::default();
        let steps = (settings.respawn_delay_secs / SIM_DT).ceil() as usize + 1;
        for _ in 0..steps {
            arena.step(SIM_DT, 0.0);
        }
        assert_eq!(arena.phase(), BallPhase::Free);
        let vel = arena.ball().vel;
        assert!(vel.y > 0.0);
        assert!((vel.length() - settings.ball_speed).abs() < 1e-3);
        let max_tilt = settings.ball_start_max_angle_deg.to_radians();
        assert!(vel.x.abs() <= vel.length() * max_tilt.sin() + 1e-4);
    }

    #[test]
    fn test_paddle_clamped_to_field() {
        let mut arena = arena();
        for _ in 0..100 {
            arena.step(0.1, 50.0);
        }
        assert!((arena.paddle().x - arena.field().width / 2.0).abs() < 1e-5);
        for _ in 0..200 {
            arena.step(0.1, -50.0);
        }
        assert!((arena.paddle().x + arena.field().width / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_ball_lost_on_baseline() {
        let mut arena = arena();
        // far from the centered paddle, heading straight down
        arena.serve(Vec2::new(-6.0, -3.0), Vec2::new(0.0, -10.0));
        for _ in 0..60 {
            arena.step(SIM_DT, 0.0);
        }
        assert_eq!(arena.balls_lost(), 1);
        assert!(matches!(arena.phase(), BallPhase::Resting { .. }));
    }

    #[test]
    fn test_paddle_returns_ball() {
        let mut arena = arena();
        arena.serve(Vec2::new(0.0, -3.0), Vec2::new(0.0, -10.0));
        for _ in 0..30 {
            arena.step(SIM_DT, 0.0);
        }
        assert_eq!(arena.balls_lost(), 0);
        assert!(arena.ball().vel.y > 0.0);
    }

    #[test]
    fn test_brick_removed_on_hit() {
        let mut arena = arena();
        let before = arena.bricks_remaining();
        arena.serve(Vec2::new(0.3, -2.0), Vec2::new(0.0, 10.0));
        for _ in 0..240 {
            arena.step(SIM_DT, 0.0);
        }
        assert!(arena.bricks_cleared() >= 1);
        assert_eq!(arena.bricks_remaining(), before - arena.bricks_cleared() as usize);
    }

    #[test]
    fn test_ball_stays_inside_walls() {
        let mut arena = arena();
        arena.serve(Vec2::new(0.0, -2.0), Vec2::new(7.0, 7.0));
        for _ in 0..2000 {
            arena.step(SIM_DT, 0.0);
            let pos = arena.ball().pos;
            assert!(pos.x.abs() <= ARENA_HALF_WIDTH);
            assert!(pos.y <= ARENA_TOP);
        }
    }

    #[test]
    fn test_same_seed_same_launch() {
        let mut a = Arena::new(&Settings::default(), 42).unwrap();
        let mut b = Arena::new(&Settings::default(), 42).unwrap();
        for _ in 0..400 {
            a.step(SIM_DT, 0.0);
            b.step(SIM_DT, 0.0);
        }
        assert_eq!(a.ball(), b.ball());
    }
}
