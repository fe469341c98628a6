/// Enemy AI: constant-speed patrol with wall and ledge turnaround.
///
/// Enemies never chase. Each frame, before integration:
///   1. **Walls**: blocked left ⇒ head right; blocked right ⇒ head left.
///   2. **Ledges**: grounded and not against a wall: probe just under each
///      bottom corner. No tile under the left corner ⇒ head right; none
///      under the right corner ⇒ head left.
///   3. Otherwise keep heading, re-applying the patrol speed.
///
/// Contact flags are last frame's. Any present tile under a corner counts
/// as ground, decoration included.

use glam::Vec2;

use super::entity::Enemy;
use super::map::TileMap;

/// How far below the feet the ledge probe samples.
const LEDGE_PROBE_DEPTH: f32 = 1.0;

/// Why an enemy turned this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    Wall,
    Ledge,
}

pub fn patrol(enemy: &mut Enemy, map: &TileMap) -> Option<Turn> {
    let before = enemy.dir;
    match decide(enemy, map) {
        Some((dir, reason)) => {
            enemy.head(dir);
            (enemy.dir != before).then_some(reason)
        }
        None => {
            enemy.head(before);
            None
        }
    }
}

/// The heading this frame's contacts call for, with the reason.
/// `None` when nothing asks for a change.
fn decide(enemy: &Enemy, map: &TileMap) -> Option<(f32, Turn)> {
    let blocked = enemy.body.blocked;
    if blocked.left {
        return Some((1.0, Turn::Wall));
    }
    if blocked.right {
        return Some((-1.0, Turn::Wall));
    }
    if !blocked.down {
        return None;
    }
    match ground_under_corners(enemy, map) {
        (false, _) => Some((1.0, Turn::Ledge)),
        (_, false) => Some((-1.0, Turn::Ledge)),
        _ => None,
    }
}

fn ground_under_corners(enemy: &Enemy, map: &TileMap) -> (bool, bool) {
    let r = enemy.body.rect();
    let y = r.bottom() + LEDGE_PROBE_DEPTH;
    let left = map.tile_at_world(Vec2::new(r.left(), y)).is_some();
    let right = map.tile_at_world(Vec2::new(r.right(), y)).is_some();
    (left, right)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnemyConfig;
    use crate::domain::physics::step_body;
    use crate::domain::platform::PlatformPolicy;
    use crate::domain::tile::Tile;

    const TS: f32 = 18.0;

    fn map_from(rows: &[&str]) -> TileMap {
        let cells = rows.iter().map(|row| {
            row.chars().map(|ch| match ch {
                '#' => Some(Tile::SOLID),
                '~' => Some(Tile::DECOR),
                _ => None,
            }).collect()
        }).collect();
        TileMap::new(cells, Vec2::splat(TS))
    }

    /// Enemy standing on row `floor` with its left edge at `left`.
    fn enemy_on(left: f32, floor: usize) -> Enemy {
        let center = Vec2::new(left + 9.0, floor as f32 * TS - 9.0);
        let mut e = Enemy::new(0, center, &EnemyConfig::default());
        e.body.blocked.down = true;
        e
    }

    #[test]
    fn leading_foot_over_ledge_flips_heading() {
        let m = map_from(&["      ", "      ", "###   "]);
        // Right edge at x = 54 probes column 3, which is empty.
        let mut e = enemy_on(2.0 * TS, 2);
        assert_eq!(e.body.vel.x, 100.0);
        assert_eq!(patrol(&mut e, &m), Some(Turn::Ledge));
        assert_eq!(e.dir, -1.0);
        assert_eq!(e.body.vel.x, -100.0);
    }

    #[test]
    fn trailing_foot_over_ledge_sends_enemy_right() {
        let m = map_from(&["      ", "      ", "   ###"]);
        let mut e = enemy_on(3.0 * TS - 4.0, 2);
        e.head(-1.0);
        assert_eq!(patrol(&mut e, &m), Some(Turn::Ledge));
        assert_eq!(e.body.vel.x, 100.0);
    }

    #[test]
    fn solid_ground_keeps_heading() {
        let m = map_from(&["      ", "      ", "######"]);
        let mut e = enemy_on(TS, 2);
        assert_eq!(patrol(&mut e, &m), None);
        assert_eq!(e.body.vel.x, 100.0);
    }

    #[test]
    fn decoration_counts_as_ground() {
        let m = map_from(&["      ", "      ", "##~~##"]);
        let mut e = enemy_on(2.0 * TS, 2);
        assert_eq!(patrol(&mut e, &m), None);
    }

    #[test]
    fn wall_contact_reverses() {
        let m = map_from(&["      ", "      ", "######"]);
        let mut e = enemy_on(TS, 2);
        e.body.blocked.right = true;
        assert_eq!(patrol(&mut e, &m), Some(Turn::Wall));
        assert_eq!(e.body.vel.x, -100.0);

        e.body.blocked = Default::default();
        e.body.blocked.left = true;
        assert_eq!(patrol(&mut e, &m), Some(Turn::Wall));
        assert_eq!(e.body.vel.x, 100.0);
    }

    #[test]
    fn airborne_enemy_does_not_probe_ledges() {
        let m = map_from(&["      ", "      ", "      "]);
        let mut e = enemy_on(TS, 1);
        e.body.blocked.down = false;
        assert_eq!(patrol(&mut e, &m), None);
        assert_eq!(e.dir, 1.0);
    }

    #[test]
    fn no_reason_is_given_without_a_wall_or_ledge() {
        let m = map_from(&["      ", "      ", "######"]);
        let mut e = enemy_on(TS, 2);
        assert_eq!(decide(&e, &m), None);
        e.body.blocked.down = false;
        assert_eq!(decide(&e, &m), None);

        // Already heading away from the wall: a reason, but no turn.
        e.body.blocked.left = true;
        assert_eq!(decide(&e, &m), Some((1.0, Turn::Wall)));
        assert_eq!(patrol(&mut e, &m), None);
    }

    #[test]
    fn patrol_stays_on_a_floating_ledge() {
        let m = map_from(&["        ", "        ", "  ####  ", "        "]);
        let mut e = Enemy::new(0, Vec2::new(3.0 * TS, TS), &EnemyConfig::default());
        let mut policy = PlatformPolicy::new(&m);
        for _ in 0..600 {
            patrol(&mut e, &m);
            step_body(&mut e.body, &m, &mut policy, 1.0 / 60.0);
            assert!(e.body.pos.y < 2.0 * TS, "enemy fell off the ledge");
        }
    }
}
