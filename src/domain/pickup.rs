/// Collectible tracking and the level gate.
///
/// Collectibles are removed from the set on pickup, never hidden, so the
/// set only shrinks while a level instance is running. Removing an id that
/// is already gone is a no-op. The gate opens once the set is empty.

use tracing::debug;

use super::entity::{Collectible, Gate};
use super::physics::{overlapping, Rect};

#[derive(Clone, Debug, Default)]
pub struct CollectibleSet {
    items: Vec<Collectible>,
}

impl CollectibleSet {
    pub fn new(items: Vec<Collectible>) -> Self {
        CollectibleSet { items }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collectible> {
        self.items.iter()
    }

    /// Ids of collectibles the rectangle overlaps.
    pub fn touching(&self, rect: &Rect) -> Vec<usize> {
        overlapping(rect, self.items.iter().map(|c| c.rect))
            .into_iter()
            .map(|i| self.items[i].id)
            .collect()
    }

    /// Remove `id`. Returns false if it was already collected.
    pub fn collect(&mut self, id: usize) -> bool {
        match self.items.iter().position(|c| c.id == id) {
            Some(i) => {
                self.items.swap_remove(i);
                debug!(id, left = self.items.len(), "collectible removed");
                true
            }
            None => false,
        }
    }

    /// Remove everything. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }
}

/// Score after one pickup. Saturates instead of wrapping.
pub fn add_score(score: u32, step: u32) -> u32 {
    score.saturating_add(step)
}

/// The gate only lets the player through once every collectible is gone.
pub fn gate_passable(gate: &Gate, player: &Rect, collectibles: &CollectibleSet) -> bool {
    collectibles.is_empty() && gate.rect.overlaps(player)
}
