/// Wind zones: fan tiles push the player upward.
///
/// The column under the player's horizontal centre is scanned from the
/// feet down to the bottom of the map. The nearest fan found lifts the
/// player unless a colliding or one-way tile sits between the fan and the
/// player's feet. Once no fan is found, the last lift fades linearly to 0
/// over the decay window.

use tracing::trace;

use crate::config::RulesConfig;
use super::entity::Player;
use super::map::TileMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Wind {
    /// Fan below, clear path. Carries the applied lift.
    Lifting(f32),
    /// Fan below, blocked by a tile. Nothing applied.
    Obstructed,
    /// No fan below, previous lift still fading. Carries the applied speed.
    Decaying(f32),
    Calm,
}

/// Apply the wind override to the player's vertical velocity.
pub fn apply_wind(player: &mut Player, map: &TileMap, now_ms: u64, rules: &RulesConfig) -> Wind {
    match find_fan(player, map) {
        Some((fan_ty, power)) => {
            if obstructed(player, map, fan_ty) {
                return Wind::Obstructed;
            }
            let power = power.unwrap_or(rules.fan_default_power);
            player.body.vel.y = -power;
            player.fan_effect_active = true;
            player.fan_effect_ms = now_ms;
            player.fan_effect_power = power;
            trace!(power, "fan lift");
            Wind::Lifting(power)
        }
        None => decay(player, now_ms, rules.fan_decay_ms),
    }
}

/// Nearest fan tile under the player: its row and authored power.
fn find_fan(player: &Player, map: &TileMap) -> Option<(i32, Option<f32>)> {
    let tx = map.tile_x(player.body.center().x);
    let start = map.tile_y(player.body.bottom()).max(0);
    (start..map.height as i32)
        .find_map(|ty| map.tile(tx, ty).filter(|t| t.fan).map(|t| (ty, t.fan_power)))
}

/// Any wind-blocking tile in the rows between the player's feet and the fan?
fn obstructed(player: &Player, map: &TileMap, fan_ty: i32) -> bool {
    let tx = map.tile_x(player.body.center().x);
    let feet = player.body.bottom();
    let first = (feet / map.tile_size.y).ceil() as i32;
    (first.max(0)..fan_ty)
        .rev()
        .any(|ty| map.tile(tx, ty).is_some_and(|t| t.obstructs_wind()))
}

fn decay(player: &mut Player, now_ms: u64, window_ms: u64) -> Wind {
    if !player.fan_effect_active {
        return Wind::Calm;
    }
    let elapsed = now_ms.saturating_sub(player.fan_effect_ms);
    if window_ms == 0 || elapsed >= window_ms {
        player.fan_effect_active = false;
        return Wind::Calm;
    }
    let t = elapsed as f32 / window_ms as f32;
    let v = -(player.fan_effect_power * (1.0 - t));
    player.body.vel.y = v;
    Wind::Decaying(v)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
