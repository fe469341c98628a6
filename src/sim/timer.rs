/// One-shot timers on the simulation clock.
///
/// Every timer is stamped with the level generation it was scheduled
/// under. `restart_level` bumps the generation and cancels the queue;
/// `drain_due` additionally drops anything whose stamp no longer matches,
/// so a callback from a previous level instance can never fire.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Dead → Playing after the death delay.
    RestartAfterDeath,
    /// Transient pickup effect finished.
    PickupEffect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub due_ms: u64,
    pub generation: u64,
}

#[derive(Clone, Debug, Default)]
pub struct Timers {
    pending: Vec<Timer>,
}

impl Timers {
    pub fn schedule(&mut self, kind: TimerKind, now_ms: u64, delay_ms: u64, generation: u64) {
        self.pending.push(Timer { kind, due_ms: now_ms.saturating_add(delay_ms), generation });
    }

    /// Remove and return timers due at `now_ms` that belong to `generation`,
    /// earliest first. Stale timers are discarded.
    pub fn drain_due(&mut self, now_ms: u64, generation: u64) -> Vec<Timer> {
        let mut due = vec![];
        self.pending.retain(|t| {
            if t.generation != generation { return false; }
            if t.due_ms <= now_ms {
                due.push(*t);
                return false;
            }
            true
        });
        due.sort_by_key(|t| t.due_ms);
        due
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|t| t.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_when_due() {
        let mut t = Timers::default();
        t.schedule(TimerKind::PickupEffect, 100, 1000, 0);
        assert!(t.drain_due(1099, 0).is_empty());
        let fired = t.drain_due(1100, 0);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, TimerKind::PickupEffect);
        assert!(t.drain_due(5000, 0).is_empty());
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut t = Timers::default();
        t.schedule(TimerKind::RestartAfterDeath, 0, 5000, 3);
        assert!(t.drain_due(6000, 4).is_empty());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn due_timers_come_out_in_order() {
        let mut t = Timers::default();
        t.schedule(TimerKind::RestartAfterDeath, 0, 50, 1);
        t.schedule(TimerKind::PickupEffect, 0, 10, 1);
        let fired = t.drain_due(100, 1);
        assert_eq!(fired[0].kind, TimerKind::PickupEffect);
        assert_eq!(fired[1].kind, TimerKind::RestartAfterDeath);
    }

    #[test]
    fn cancel_clears_everything() {
        let mut t = Timers::default();
        t.schedule(TimerKind::PickupEffect, 0, 10, 0);
        t.cancel_all();
        assert!(!t.is_pending(TimerKind::PickupEffect));
    }
}
