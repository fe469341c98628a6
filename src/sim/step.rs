/// The step function: advances the world by one frame.
///
/// Processing order while Playing:
///   1. Restart / debug cheats
///   2. Player controller (ground reset, horizontal, wall-jump, jump, crouch)
///   3. Wind override
///   4. Vertical clamp
///   5. Enemy patrol
///   6. Integration (player, then enemies); landing resets the jump budget
///   7. Overlaps: enemy contact → death, collectibles, gate
///   8. Out-of-bounds fall → death
///
/// Dead ignores input entirely. Won only listens for restart.
/// Timers run last in every phase, against the advanced clock.

use tracing::{debug, info};

use crate::domain::ai;
use crate::domain::controller;
use crate::domain::entity::FrameInput;
use crate::domain::physics::{overlapping, step_body};
use crate::domain::pickup::{add_score, gate_passable};
use crate::domain::wind;
use super::event::{DeathCause, GameEvent};
use super::timer::TimerKind;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput, dt_ms: u64) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    world.clock_ms = world.clock_ms.saturating_add(dt_ms);

    match world.phase {
        Phase::Playing => play_frame(world, &input, dt_ms, &mut events),
        Phase::Won => {
            if input.restart_pressed {
                restart_level(world, &mut events);
            }
        }
        Phase::Dead => {}
    }

    resolve_timers(world, &mut events);
    events
}

fn play_frame(world: &mut WorldState, input: &FrameInput, dt_ms: u64, events: &mut Vec<GameEvent>) {
    if input.restart_pressed {
        restart_level(world, events);
        return;
    }
    if resolve_cheats(world, input, events) { return; }

    let now = world.clock_ms;
    resolve_control(world, input, now, events);

    wind::apply_wind(&mut world.player, &world.level.map, now, &world.config.rules);
    controller::clamp_vertical(&mut world.player, &world.config.movement);

    for enemy in &mut world.enemies {
        if let Some(turn) = ai::patrol(enemy, &world.level.map) {
            debug!(id = enemy.id, ?turn, dir = enemy.dir, "enemy turned");
        }
    }

    resolve_integration(world, dt_ms as f32 / 1000.0);

    if resolve_enemy_contact(world, events) { return; }
    resolve_collectibles(world, events);
    if resolve_gate(world, events) { return; }
    resolve_fall(world, events);
}

// ══════════════════════════════════════════════════════════════
// Frame stages
// ══════════════════════════════════════════════════════════════

fn resolve_control(world: &mut WorldState, input: &FrameInput, now: u64, events: &mut Vec<GameEvent>) {
    let out = controller::control(&mut world.player, &world.level.map, input, now, &world.config.movement);
    if let Some(active) = out.walk_changed {
        events.push(GameEvent::WalkStateChanged { active });
    }
    if let Some(enabled) = out.wall_jump_toggled {
        events.push(GameEvent::WallJumpToggled { enabled });
    }
    if let Some(kind) = out.jump {
        events.push(GameEvent::JumpPerformed { kind });
    }
    if let Some(crouching) = out.crouch_changed {
        events.push(GameEvent::CrouchChanged { crouching });
    }
}

fn resolve_integration(world: &mut WorldState, dt: f32) {
    step_body(&mut world.player.body, &world.level.map, &mut world.policy, dt);
    if world.player.grounded() {
        controller::settle_on_ground(&mut world.player);
    }
    for enemy in &mut world.enemies {
        step_body(&mut enemy.body, &world.level.map, &mut world.policy, dt);
    }
}

/// Returns true if the player died.
fn resolve_enemy_contact(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let rect = world.player.body.rect();
    let hit = overlapping(&rect, world.enemies.iter().map(|e| e.body.rect()));
    match hit.first() {
        Some(&i) => {
            let id = world.enemies[i].id;
            player_die(world, DeathCause::Enemy { id }, events);
            true
        }
        None => false,
    }
}

fn resolve_collectibles(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let rect = world.player.body.rect();
    for id in world.collectibles.touching(&rect) {
        if !world.collectibles.collect(id) { continue; }
        world.score = add_score(world.score, world.config.rules.score_per_collectible);
        events.push(GameEvent::CollectibleCollected { id, score: world.score });

        world.pickup_effect_active = true;
        world.timers.schedule(
            TimerKind::PickupEffect,
            world.clock_ms,
            world.config.rules.pickup_effect_ms,
            world.generation,
        );
    }
}

/// Returns true if the level was won.
fn resolve_gate(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let rect = world.player.body.rect();
    if gate_passable(&world.gate, &rect, &world.collectibles) {
        win(world, events);
        return true;
    }
    false
}

fn resolve_fall(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.player_out_of_bounds() {
        player_die(world, DeathCause::FellOut, events);
    }
}

/// Debug cheats. Returns true if the frame should stop here.
fn resolve_cheats(world: &mut WorldState, input: &FrameInput, events: &mut Vec<GameEvent>) -> bool {
    if !world.config.rules.debug_cheats { return false; }

    if input.clear_collectibles_pressed {
        let removed = world.collectibles.clear();
        debug!(removed, "cheat: collectibles cleared");
    }
    if input.skip_level_pressed {
        debug!("cheat: level skipped");
        win(world, events);
        return true;
    }
    false
}

// ══════════════════════════════════════════════════════════════
// Timers
// ══════════════════════════════════════════════════════════════

fn resolve_timers(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for timer in world.timers.drain_due(world.clock_ms, world.generation) {
        // A restart fired earlier in this loop makes the rest stale.
        if timer.generation != world.generation { continue; }

        match timer.kind {
            TimerKind::RestartAfterDeath => {
                if world.phase == Phase::Dead {
                    restart_level(world, events);
                }
            }
            TimerKind::PickupEffect => {
                if !world.timers.is_pending(TimerKind::PickupEffect) && world.pickup_effect_active {
                    world.pickup_effect_active = false;
                    events.push(GameEvent::PickupEffectEnded);
                }
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Transitions
// ══════════════════════════════════════════════════════════════

fn win(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.phase != Phase::Playing { return; }
    world.phase = Phase::Won;
    info!(score = world.score, level = %world.level.name, "level won");
    events.push(GameEvent::GateReached);
    events.push(GameEvent::LevelWon);
}

/// Playing → Dead. A no-op in any other phase.
pub fn player_die(world: &mut WorldState, cause: DeathCause, events: &mut Vec<GameEvent>) {
    if world.phase != Phase::Playing { return; }
    world.phase = Phase::Dead;
    world.player.body.vel = glam::Vec2::ZERO;
    world.player.body.accel_x = 0.0;
    info!(?cause, "player died");
    events.push(GameEvent::PlayerDied { cause });
    world.timers.schedule(
        TimerKind::RestartAfterDeath,
        world.clock_ms,
        world.config.rules.death_restart_ms,
        world.generation,
    );
}

/// Full reinitialisation of the level instance. Pending timers are
/// cancelled and the generation moves on.
pub fn restart_level(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    world.generation += 1;
    world.timers.cancel_all();
    world.respawn_entities();
    world.score = 0;
    world.pickup_effect_active = false;
    world.phase = Phase::Playing;
    info!(generation = world.generation, level = %world.level.name, "level restarted");
    events.push(GameEvent::LevelRestarted);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::domain::entity::JumpKind;
    use crate::sim::level::{builtin_level, parse_text_level};

    const DT: u64 = 16;

    fn world_from(rows: &str) -> WorldState {
        WorldState::new(parse_text_level(rows).unwrap(), SimConfig::default())
    }

    fn run(world: &mut WorldState, input: FrameInput, frames: usize) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..frames {
            all.extend(step(world, input, DT));
        }
        all
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    fn count(events: &[GameEvent], wanted: &GameEvent) -> usize {
        events.iter().filter(|e| *e == wanted).count()
    }

    const FLAT: &str = "\
..........
..........
.P......D.
##########
";

    #[test]
    fn player_settles_on_the_floor() {
        let mut w = world_from(FLAT);
        run(&mut w, idle(), 30);
        assert!(w.player.grounded());
        assert_eq!(w.player.body.bottom(), 54.0);
        assert_eq!(w.player.jump_count, 0);
    }

    #[test]
    fn jump_from_ground_emits_event_and_counts() {
        let mut w = world_from(FLAT);
        run(&mut w, idle(), 30);
        let jump = FrameInput { jump_pressed: true, jump_held: true, ..idle() };
        let ev = step(&mut w, jump, DT);
        assert!(ev.contains(&GameEvent::JumpPerformed { kind: JumpKind::Ground }));
        assert_eq!(w.player.jump_count, 1);
        assert!(w.player.body.vel.y < 0.0);
        assert!(!w.player.grounded());
    }

    #[test]
    fn walking_emits_state_changes_on_edges_only() {
        let mut w = world_from(FLAT);
        let right = FrameInput { right: true, ..idle() };
        let ev = run(&mut w, right, 5);
        assert_eq!(count(&ev, &GameEvent::WalkStateChanged { active: true }), 1);
        let ev = run(&mut w, idle(), 5);
        assert_eq!(count(&ev, &GameEvent::WalkStateChanged { active: false }), 1);
    }

    #[test]
    fn collectible_is_collected_once_and_gate_then_wins_once() {
        let mut w = world_from("\
..........
..........
.P.$....D.
##########
");
        let right = FrameInput { right: true, ..idle() };
        let mut events = vec![];
        for _ in 0..600 {
            events.extend(step(&mut w, right, DT));
            if w.phase != Phase::Playing { break; }
        }
        assert_eq!(count(&events, &GameEvent::CollectibleCollected { id: 0, score: 1 }), 1);
        assert_eq!(w.score, 1);
        assert_eq!(w.phase, Phase::Won);
        assert_eq!(count(&events, &GameEvent::GateReached), 1);
        assert_eq!(count(&events, &GameEvent::LevelWon), 1);

        let more = run(&mut w, right, 30);
        assert!(!more.contains(&GameEvent::LevelWon));
    }

    #[test]
    fn gate_stays_shut_while_collectibles_remain() {
        let mut w = world_from("\
..........
.....$....
.P......D.
##########
");
        let right = FrameInput { right: true, ..idle() };
        let ev = run(&mut w, right, 600);
        assert_eq!(w.phase, Phase::Playing);
        assert!(!ev.contains(&GameEvent::GateReached));
        assert_eq!(w.collectibles.remaining(), 1);
    }

    #[test]
    fn enemy_contact_kills_and_restart_follows_after_delay() {
        let mut w = world_from("\
..........
..........
.P.E....D.
##########
");
        // The enemy walks right, turns at the world edge and comes back.
        let mut events = vec![];
        for _ in 0..400 {
            events.extend(step(&mut w, idle(), DT));
            if w.phase == Phase::Dead { break; }
        }
        assert_eq!(w.phase, Phase::Dead);
        assert!(events.contains(&GameEvent::PlayerDied { cause: DeathCause::Enemy { id: 0 } }));

        // Dead ignores every input, restart included.
        let restart = FrameInput { restart_pressed: true, jump_pressed: true, ..idle() };
        let ev = run(&mut w, restart, 10);
        assert!(ev.is_empty());
        assert_eq!(w.phase, Phase::Dead);

        let ev = run(&mut w, idle(), (5000 / DT as usize) + 1);
        assert_eq!(count(&ev, &GameEvent::LevelRestarted), 1);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.generation, 1);
    }

    #[test]
    fn repeated_death_is_a_no_op() {
        let mut w = world_from(FLAT);
        let mut ev = vec![];
        player_die(&mut w, DeathCause::FellOut, &mut ev);
        player_die(&mut w, DeathCause::FellOut, &mut ev);
        assert_eq!(ev.len(), 1);
        assert_eq!(w.timers.len(), 1);
    }

    #[test]
    fn stale_death_timer_never_fires_after_restart() {
        let mut w = world_from(FLAT);
        let mut ev = vec![];
        player_die(&mut w, DeathCause::FellOut, &mut ev);
        restart_level(&mut w, &mut ev);

        // Die again 3 s later; the first timer would have fired at 5 s.
        run(&mut w, idle(), 3000 / DT as usize);
        player_die(&mut w, DeathCause::FellOut, &mut ev);
        let ev = run(&mut w, idle(), 2500 / DT as usize);
        assert!(!ev.contains(&GameEvent::LevelRestarted));
        assert_eq!(w.phase, Phase::Dead);
    }

    #[test]
    fn falling_out_of_the_level_kills() {
        let mut w = world_from("\
..........
.P......D.
###..#####
");
        w.player.body.pos.x = 3.0 * 18.0 + 1.0;
        let mut events = vec![];
        for _ in 0..300 {
            events.extend(step(&mut w, idle(), DT));
            if w.phase == Phase::Dead { break; }
        }
        assert!(events.contains(&GameEvent::PlayerDied { cause: DeathCause::FellOut }));
    }

    #[test]
    fn restart_resets_score_collectibles_and_flags() {
        let mut w = world_from("\
..........
..........
.P$.....D.
##########
");
        run(&mut w, FrameInput { right: true, crouch: true, ..idle() }, 40);
        assert_eq!(w.score, 1);
        w.player.allow_wall_jump = false;

        let ev = step(&mut w, FrameInput { restart_pressed: true, ..idle() }, DT);
        assert!(ev.contains(&GameEvent::LevelRestarted));
        assert_eq!(w.score, 0);
        assert_eq!(w.collectibles.remaining(), 1);
        assert!(w.player.allow_wall_jump);
        assert!(!w.player.is_crouching);
        assert!(!w.timers.is_pending(TimerKind::PickupEffect));
    }

    #[test]
    fn pickup_effect_ends_after_its_window() {
        let mut w = world_from("\
..........
..........
.P$.....D.
##########
");
        let ev = run(&mut w, FrameInput { right: true, ..idle() }, 20);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::CollectibleCollected { .. })));
        assert!(w.pickup_effect_active);
        let ev = run(&mut w, idle(), 1000 / DT as usize + 1);
        assert_eq!(count(&ev, &GameEvent::PickupEffectEnded), 1);
        assert!(!w.pickup_effect_active);
    }

    #[test]
    fn won_screen_restarts_on_request() {
        let mut w = world_from(FLAT);
        let mut ev = vec![];
        win(&mut w, &mut ev);
        assert!(run(&mut w, FrameInput { right: true, jump_pressed: true, ..idle() }, 5).is_empty());
        let ev = step(&mut w, FrameInput { restart_pressed: true, ..idle() }, DT);
        assert_eq!(ev, vec![GameEvent::LevelRestarted]);
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn cheats_are_off_unless_enabled() {
        let skip = FrameInput { skip_level_pressed: true, clear_collectibles_pressed: true, ..idle() };
        let rows = ".P.$....D.\n##########\n";

        let mut w = world_from(rows);
        step(&mut w, skip, DT);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.collectibles.remaining(), 1);

        let mut cfg = SimConfig::default();
        cfg.rules.debug_cheats = true;
        let mut w = WorldState::new(parse_text_level(rows).unwrap(), cfg);
        let ev = step(&mut w, skip, DT);
        assert_eq!(w.phase, Phase::Won);
        assert_eq!(w.collectibles.remaining(), 0);
        assert!(ev.contains(&GameEvent::LevelWon));
    }

    #[test]
    fn player_lands_on_one_way_platform_after_jumping_through() {
        let mut w = world_from("\
..........
..........
..........
..===.....
..........
...P....D.
##########
");
        run(&mut w, idle(), 30);
        let jump = FrameInput { jump_pressed: true, jump_held: true, ..idle() };
        step(&mut w, jump, DT);
        let hold = FrameInput { jump_held: true, ..idle() };
        let mut landed_on_platform = false;
        for _ in 0..120 {
            step(&mut w, hold, DT);
            if w.player.grounded() && w.player.body.bottom() == 3.0 * 18.0 {
                landed_on_platform = true;
                break;
            }
        }
        assert!(landed_on_platform);
    }

    #[test]
    fn crouch_jump_into_a_block_drops_back_under_it() {
        let mut w = world_from("\
..........
..........
..####....
..........
..........
...P....D.
##########
");
        run(&mut w, idle(), 30);
        let block_bottom = 3.0 * 18.0;
        let crouch_jump = FrameInput { crouch: true, jump_pressed: true, jump_held: true, ..idle() };
        step(&mut w, crouch_jump, DT);
        let mut hit = false;
        for _ in 0..60 {
            step(&mut w, FrameInput { crouch: true, jump_held: true, ..idle() }, DT);
            if w.player.body.blocked.up { hit = true; break; }
        }
        assert!(hit);
        assert_eq!(w.player.body.rect().top(), block_bottom);

        for _ in 0..90 {
            step(&mut w, idle(), DT);
            assert!(w.player.body.rect().top() >= block_bottom, "player went into the block");
        }
        assert!(w.player.grounded());
        assert_eq!(w.player.body.bottom(), 6.0 * 18.0);
        assert!(!w.player.is_crouching);
    }

    #[test]
    fn fan_lifts_player_off_the_ground() {
        let mut w = world_from("\
..........
..........
..........
.P......D.
#F########
");
        let bottom = w.player.body.bottom();
        run(&mut w, idle(), 10);
        assert!(w.player.body.bottom() < bottom);
        assert!(w.player.fan_effect_active);
    }

    // ── Frame invariants ──

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn input_from(bits: (bool, bool, bool, bool, bool, u8)) -> FrameInput {
            let (left, right, jump_pressed, jump_held, crouch, roll) = bits;
            FrameInput {
                left,
                right,
                jump_pressed,
                jump_held: jump_held || jump_pressed,
                crouch,
                restart_pressed: roll == 0,
                debug_toggle_pressed: roll == 1,
                ..FrameInput::default()
            }
        }

        proptest! {
            #[test]
            fn frame_invariants_hold(
                frames in proptest::collection::vec(
                    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), 0u8..60),
                    1..400,
                )
            ) {
                let mut w = WorldState::new(builtin_level().unwrap(), SimConfig::default());
                let max_jumps = w.config.movement.max_jumps;

                for bits in frames {
                    let before = (w.phase, w.collectibles.remaining());
                    let events = step(&mut w, input_from(bits), DT);
                    let restarted = events.contains(&GameEvent::LevelRestarted);

                    let vy = w.player.body.vel.y;
                    prop_assert!((-800.0..=800.0).contains(&vy), "vy = {}", vy);
                    prop_assert!(w.player.jump_count <= max_jumps);

                    if w.phase == Phase::Playing && w.player.grounded() {
                        prop_assert_eq!(w.player.jump_count, 0);
                    }
                    if before.0 == Phase::Playing && !restarted {
                        prop_assert!(w.collectibles.remaining() <= before.1);
                    }
                    if w.phase == Phase::Won {
                        prop_assert_eq!(w.collectibles.remaining(), 0);
                    }
                }
            }
        }
    }
}
