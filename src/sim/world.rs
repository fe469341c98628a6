/// WorldState: the complete snapshot of a running level instance.
///
/// ## Ownership
///
/// `WorldState` owns every piece of mutable gameplay state. Only `step()`
/// and `restart_level()` mutate it; the frontend reads it for display.
///
/// ## Level instances
///
/// `level` is the definition as loaded and is never mutated. Everything
/// else (player, enemies, collectibles, score) is rebuilt wholesale from it
/// on restart, and `generation` is bumped so timers from the previous
/// instance are recognised as stale.

use glam::Vec2;

use crate::config::SimConfig;
use crate::domain::entity::{Collectible, Enemy, Gate, Player};
use crate::domain::map::TileMap;
use crate::domain::physics::Rect;
use crate::domain::pickup::CollectibleSet;
use crate::domain::platform::PlatformPolicy;
use super::level::LevelDef;
use super::timer::Timers;

/// Game mode. Dead and Won only leave through a full restart.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Dead,
    Won,
}

#[derive(Clone, Debug)]
pub struct WorldState {
    // ── Level ──
    pub level: LevelDef,
    pub policy: PlatformPolicy,

    // ── Entities ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub collectibles: CollectibleSet,
    pub gate: Gate,

    // ── Meta ──
    pub phase: Phase,
    pub score: u32,
    /// Simulation clock in ms. Advances every frame, in every phase.
    pub clock_ms: u64,
    /// Level instance id. Bumped on every restart.
    pub generation: u64,
    pub timers: Timers,
    pub pickup_effect_active: bool,

    // ── Tuning ──
    pub config: SimConfig,
}

impl WorldState {
    pub fn new(level: LevelDef, config: SimConfig) -> Self {
        let policy = PlatformPolicy::new(&level.map);
        WorldState {
            player: spawn_player(&level, &config),
            enemies: spawn_enemies(&level, &config),
            collectibles: spawn_collectibles(&level, &config),
            gate: spawn_gate(&level, &config),
            level,
            policy,
            phase: Phase::Playing,
            score: 0,
            clock_ms: 0,
            generation: 0,
            timers: Timers::default(),
            pickup_effect_active: false,
            config,
        }
    }

    pub fn map(&self) -> &TileMap {
        &self.level.map
    }

    /// Rebuild every per-instance entity from the level definition.
    pub fn respawn_entities(&mut self) {
        self.player = spawn_player(&self.level, &self.config);
        self.enemies = spawn_enemies(&self.level, &self.config);
        self.collectibles = spawn_collectibles(&self.level, &self.config);
        self.gate = spawn_gate(&self.level, &self.config);
    }

    /// Has the player's centre dropped past the fall margin below the level?
    pub fn player_out_of_bounds(&self) -> bool {
        self.player.body.center().y > self.map().height_px() + self.config.rules.fall_margin
    }
}

fn spawn_player(level: &LevelDef, config: &SimConfig) -> Player {
    Player::new(level.player_spawn, &config.movement, config.rules.allow_wall_jump)
}

fn spawn_enemies(level: &LevelDef, config: &SimConfig) -> Vec<Enemy> {
    level.enemy_spawns.iter()
        .enumerate()
        .map(|(id, &at)| Enemy::new(id, at, &config.enemy))
        .collect()
}

fn spawn_collectibles(level: &LevelDef, config: &SimConfig) -> CollectibleSet {
    let size = Vec2::splat(config.rules.pickup_size);
    CollectibleSet::new(
        level.collectibles.iter()
            .enumerate()
            .map(|(id, &at)| Collectible { id, rect: Rect::from_center(at, size) })
            .collect(),
    )
}

fn spawn_gate(level: &LevelDef, config: &SimConfig) -> Gate {
    Gate { rect: Rect::from_center(level.gate, Vec2::splat(config.rules.pickup_size)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::parse_text_level;

    fn world() -> WorldState {
        let def = parse_text_level("# T\n.........\n.P.$.E.D.\n=========\n").unwrap();
        WorldState::new(def, SimConfig::default())
    }

    #[test]
    fn new_world_starts_playing_with_spawned_entities() {
        let w = world();
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.collectibles.remaining(), 1);
        assert_eq!(w.enemies.len(), 1);
        assert_eq!(w.player.body.center(), Vec2::new(27.0, 27.0));
        assert_eq!(w.policy.platform_count(), 9);
    }

    #[test]
    fn respawn_restores_collectibles_and_player() {
        let mut w = world();
        w.collectibles.clear();
        w.player.body.pos.x += 50.0;
        w.respawn_entities();
        assert_eq!(w.collectibles.remaining(), 1);
        assert_eq!(w.player.body.center(), Vec2::new(27.0, 27.0));
    }

    #[test]
    fn out_of_bounds_uses_centre_and_margin() {
        let mut w = world();
        let limit = w.map().height_px() + 500.0;
        w.player.body.pos.y = limit - 9.0;
        assert!(!w.player_out_of_bounds());
        w.player.body.pos.y += 1.0;
        assert!(w.player_out_of_bounds());
    }
}
