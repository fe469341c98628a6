/// Player controller: the movement / jump / crouch / wall-jump state machine.
///
/// Runs once per Playing frame, before wind and before integration. It reads
/// the contact flags the collision world left on the body last frame and
/// writes acceleration, velocity and jump state. It never moves the body
/// (crouch resizes it, feet anchored).
///
/// Jump states:
///
/// ```text
///   Grounded ──press──▶ Airborne₀ (count 1, sustain armed)
///   Airborne₀ ──press──▶ Airborne₁ (count 2)
///   Airborne₁ ──press──▶ (no-op)
///   Airborne* ──wall + away key──▶ WallJumping ──press──▶ Airborne* (count unchanged)
///   any ──blocked.down──▶ Grounded
/// ```

use glam::Vec2;
use tracing::debug;

use crate::config::MovementConfig;
use super::entity::{Facing, FrameInput, JumpKind, Player};
use super::map::TileMap;
use super::physics::Rect;

/// What the controller did this frame, for event emission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlOutcome {
    pub jump: Option<JumpKind>,
    pub walk_changed: Option<bool>,
    pub crouch_changed: Option<bool>,
    pub wall_jump_toggled: Option<bool>,
}

pub fn control(
    player: &mut Player,
    map: &TileMap,
    input: &FrameInput,
    now_ms: u64,
    tuning: &MovementConfig,
) -> ControlOutcome {
    let mut out = ControlOutcome::default();

    if player.grounded() {
        settle_on_ground(player);
    }

    // ── Horizontal ──
    if input.left {
        player.body.accel_x = -tuning.acceleration;
        player.facing = Facing::Left;
    } else if input.right {
        player.body.accel_x = tuning.acceleration;
        player.facing = Facing::Right;
    } else {
        player.body.accel_x = 0.0;
    }
    let walking = input.left || input.right;
    if walking != player.walking {
        player.walking = walking;
        out.walk_changed = Some(walking);
    }

    if input.debug_toggle_pressed {
        player.allow_wall_jump = !player.allow_wall_jump;
        debug!(enabled = player.allow_wall_jump, "wall jump toggled");
        out.wall_jump_toggled = Some(player.allow_wall_jump);
    }

    if player.allow_wall_jump {
        detect_wall_jump(player, map, input, tuning.wall_probe_width);
    }

    // ── Jump ──
    if input.jump_pressed {
        out.jump = try_jump(player, now_ms, tuning);
    }

    // Variable height: keep the launch speed while held, inside the window.
    if player.is_jumping {
        let elapsed = now_ms.saturating_sub(player.jump_start_ms);
        if input.jump_held && elapsed < tuning.max_jump_duration_ms {
            player.body.vel.y = tuning.jump_velocity;
        } else {
            player.is_jumping = false;
        }
    }

    // ── Crouch ──
    // Standing back up waits until there is headroom.
    if input.crouch != player.is_crouching && (input.crouch || standing_fits(player, map)) {
        player.is_crouching = input.crouch;
        let scale = if input.crouch { tuning.crouch_scale } else { 1.0 };
        player.body.set_height(player.standing_height * scale);
        out.crouch_changed = Some(input.crouch);
    }

    out
}

/// Ground contact replenishes the jump budget. Also called right after
/// integration so a landing frame ends with the budget already reset.
pub fn settle_on_ground(player: &mut Player) {
    player.is_jumping = false;
    player.jump_start_ms = 0;
    player.jump_count = 0;
    player.is_wall_jumping = false;
}

/// Clamp vertical speed to the rise/fall caps. Runs after every other
/// vertical write of the frame (controller, wind).
pub fn clamp_vertical(player: &mut Player, tuning: &MovementConfig) {
    let v = &mut player.body.vel.y;
    *v = v.clamp(-tuning.max_rise_speed, tuning.max_fall_speed);
}

/// Would the full-height body, feet where they are now, stay clear of solids?
fn standing_fits(player: &Player, map: &TileMap) -> bool {
    let b = &player.body;
    let standing = Rect::new(
        Vec2::new(b.pos.x, b.bottom() - player.standing_height),
        Vec2::new(b.size.x, player.standing_height),
    );
    !map.tiles_within(&standing).iter().any(|(_, _, t)| t.is_solid())
}

fn try_jump(player: &mut Player, now_ms: u64, tuning: &MovementConfig) -> Option<JumpKind> {
    let jv = tuning.jump_velocity;

    if player.is_wall_jumping {
        player.body.vel.y = jv * tuning.wall_jump_multiplier_y;
        player.body.vel.x = player.wall_jump_direction as f32 * (jv * tuning.wall_jump_multiplier_x);
        player.is_wall_jumping = false;
        debug!(dir = player.wall_jump_direction, "wall jump");
        return Some(JumpKind::Wall);
    }

    if player.jump_count >= tuning.max_jumps {
        return None;
    }

    let kind = if player.jump_count == 0 {
        player.body.vel.y = jv;
        player.jump_start_ms = now_ms;
        player.is_jumping = true;
        JumpKind::Ground
    } else {
        player.body.vel.y = jv * tuning.double_jump_multiplier;
        // The sustain would otherwise overwrite the boosted speed.
        player.is_jumping = false;
        JumpKind::Double
    };
    player.jump_count += 1;
    debug!(count = player.jump_count, ?kind, "jump");
    Some(kind)
}

/// Arm a wall jump when airborne against a wall with the away key held.
fn detect_wall_jump(player: &mut Player, map: &TileMap, input: &FrameInput, probe_w: f32) {
    if player.grounded() { return; }

    let r = player.body.rect();
    let left_probe = Rect::new(r.pos - Vec2::new(probe_w, 0.0), Vec2::new(probe_w, r.size.y));
    let right_probe = Rect::new(Vec2::new(r.right(), r.top()), Vec2::new(probe_w, r.size.y));

    let touching = |probe: &Rect| map.tiles_within(probe).iter().any(|(_, _, t)| t.is_wall());

    if touching(&left_probe) && input.right {
        player.is_wall_jumping = true;
        player.wall_jump_direction = -1;
    } else if touching(&right_probe) && input.left {
        player.is_wall_jumping = true;
        player.wall_jump_direction = 1;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
