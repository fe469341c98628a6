/// Entities: Player, Enemy, Collectible, Gate.
///
/// Positions and velocities live in each entity's `Body`, which only the
/// collision world moves. Everything else here is gameplay state that the
/// controller, wind effect and enemy AI mutate.

use glam::Vec2;

use crate::config::{EnemyConfig, MovementConfig};
use super::physics::{Body, Rect};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Which branch of the jump state machine fired.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpKind {
    Ground,
    Double,
    Wall,
}

/// Frame input, sampled once per tick.
/// Held fields are continuous; `*_pressed` fields are edge-triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub jump_pressed: bool,
    pub jump_held: bool,
    pub crouch: bool,
    pub restart_pressed: bool,
    pub debug_toggle_pressed: bool,
    pub skip_level_pressed: bool,
    pub clear_collectibles_pressed: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    pub facing: Facing,
    pub walking: bool,

    // ── Jump state ──
    pub jump_count: u32,
    pub is_jumping: bool,
    pub jump_start_ms: u64,
    pub is_wall_jumping: bool,
    /// -1 = launch right (wall on the left), 1 = launch left, 0 = none.
    pub wall_jump_direction: i8,
    pub allow_wall_jump: bool,

    // ── Crouch ──
    pub is_crouching: bool,
    pub standing_height: f32,

    // ── Fan ──
    pub fan_effect_active: bool,
    pub fan_effect_ms: u64,
    pub fan_effect_power: f32,
}

impl Player {
    pub fn new(center: Vec2, tuning: &MovementConfig, allow_wall_jump: bool) -> Self {
        let mut body = Body::new(center, Vec2::new(tuning.player_width, tuning.player_height));
        body.gravity = tuning.gravity;
        body.drag_x = tuning.drag;
        body.max_vel = Vec2::new(tuning.max_speed_x, tuning.max_fall_speed);
        Player {
            body,
            facing: Facing::Right,
            walking: false,
            jump_count: 0,
            is_jumping: false,
            jump_start_ms: 0,
            is_wall_jumping: false,
            wall_jump_direction: 0,
            allow_wall_jump,
            is_crouching: false,
            standing_height: tuning.player_height,
            fan_effect_active: false,
            fan_effect_ms: 0,
            fan_effect_power: 0.0,
        }
    }

    pub fn grounded(&self) -> bool {
        self.body.blocked.down
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: usize,
    pub body: Body,
    pub speed: f32,
    /// +1 right, -1 left.
    pub dir: f32,
    pub spawn: Vec2,
}

impl Enemy {
    pub fn new(id: usize, spawn: Vec2, tuning: &EnemyConfig) -> Self {
        let mut body = Body::new(spawn, Vec2::new(tuning.width, tuning.height));
        body.gravity = tuning.gravity;
        body.bounce_y = tuning.bounce;
        body.vel.x = tuning.speed;
        Enemy { id, body, speed: tuning.speed, dir: 1.0, spawn }
    }

    /// Point the patrol and apply the constant speed.
    pub fn head(&mut self, dir: f32) {
        self.dir = dir.signum();
        self.body.vel.x = self.dir * self.speed;
    }
}

/// A static pickup. Lives in the `CollectibleSet` until collected.
#[derive(Clone, Debug, PartialEq)]
pub struct Collectible {
    pub id: usize,
    pub rect: Rect,
}

/// The level exit.
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    pub rect: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_spawns_centered_with_tuning() {
        let tuning = MovementConfig::default();
        let p = Player::new(Vec2::new(70.0, 345.0), &tuning, true);
        assert_eq!(p.body.center(), Vec2::new(70.0, 345.0));
        assert_eq!(p.body.max_vel.y, 800.0);
        assert_eq!(p.jump_count, 0);
        assert!(p.allow_wall_jump);
        assert!(!p.grounded());
    }

    #[test]
    fn enemy_starts_walking_right() {
        let e = Enemy::new(0, Vec2::new(200.0, 300.0), &EnemyConfig::default());
        assert_eq!(e.body.vel.x, 100.0);
        assert_eq!(e.dir, 1.0);
    }

    #[test]
    fn enemy_heading_keeps_constant_speed() {
        let mut e = Enemy::new(0, Vec2::ZERO, &EnemyConfig::default());
        e.body.vel.x = 0.0; // wall contact zeroes it
        e.head(-1.0);
        assert_eq!(e.body.vel.x, -100.0);
        e.head(3.0);
        assert_eq!(e.body.vel.x, 100.0);
    }
}
