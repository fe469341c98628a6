/// One-way platform collision policy.
///
/// A `platform` tile collides only while the mover is descending
/// (`vy > 0`), which lets bodies jump up through it and land on top.
/// Every other tile uses its authored `collides` flag unmodified.
///
/// The per-tile "down" bit lives here as an override grid rather than on
/// the tile itself. `refresh()` recomputes it for the current mover right
/// before the collision world resolves vertical contacts, so nothing is
/// carried from one frame (or one body) to the next.
///
/// `vy == 0` is the boundary: the override is off and the mover passes.
/// Resting bodies never sit there in practice because gravity is applied
/// before contacts are resolved.

use super::map::TileMap;

#[derive(Clone, Debug, Default)]
pub struct PlatformPolicy {
    /// Coordinates of every one-way tile, gathered once at load.
    platforms: Vec<(usize, usize)>,
    /// `down_enabled[y][x]`: only ever written at `platforms` coords.
    down_enabled: Vec<Vec<bool>>,
}

impl PlatformPolicy {
    pub fn new(map: &TileMap) -> Self {
        let mut platforms = vec![];
        for (y, row) in map.cells.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if cell.is_some_and(|t| t.is_one_way()) {
                    platforms.push((x, y));
                }
            }
        }
        PlatformPolicy {
            platforms,
            down_enabled: vec![vec![false; map.width]; map.height],
        }
    }

    /// Re-evaluate every one-way tile for a mover with vertical velocity `vy`.
    pub fn refresh(&mut self, vy: f32) {
        let descending = vy > 0.0;
        for &(x, y) in &self.platforms {
            self.down_enabled[y][x] = descending;
        }
    }

    /// Does tile (tx, ty) currently collide?
    pub fn collides(&self, map: &TileMap, tx: i32, ty: i32) -> bool {
        match map.tile(tx, ty) {
            None => false,
            Some(t) if t.is_one_way() => self.down_enabled[ty as usize][tx as usize],
            Some(t) => t.collides,
        }
    }

    pub fn platform_count(&self) -> usize {
        self.platforms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::Tile;
    use glam::Vec2;

    fn map() -> TileMap {
        let mut m = TileMap::empty(3, 2, Vec2::splat(16.0));
        m.cells[0][0] = Some(Tile::PLATFORM);
        m.cells[0][1] = Some(Tile::SOLID);
        m.cells[0][2] = Some(Tile::DECOR);
        m.cells[1][0] = Some(Tile::PLATFORM);
        m
    }

    #[test]
    fn collects_platforms_at_load() {
        assert_eq!(PlatformPolicy::new(&map()).platform_count(), 2);
    }

    #[test]
    fn platform_passes_while_rising() {
        let m = map();
        let mut p = PlatformPolicy::new(&m);
        p.refresh(-300.0);
        assert!(!p.collides(&m, 0, 0));
        assert!(!p.collides(&m, 0, 1));
    }

    #[test]
    fn platform_blocks_while_descending() {
        let m = map();
        let mut p = PlatformPolicy::new(&m);
        p.refresh(50.0);
        assert!(p.collides(&m, 0, 0));
        assert!(p.collides(&m, 0, 1));
    }

    #[test]
    fn zero_velocity_is_the_pass_side_of_the_boundary() {
        let m = map();
        let mut p = PlatformPolicy::new(&m);
        p.refresh(50.0);
        p.refresh(0.0);
        assert!(!p.collides(&m, 0, 0));
    }

    #[test]
    fn other_tiles_use_authored_flag() {
        let m = map();
        let mut p = PlatformPolicy::new(&m);
        for vy in [-100.0, 0.0, 100.0] {
            p.refresh(vy);
            assert!(p.collides(&m, 1, 0));
            assert!(!p.collides(&m, 2, 0));
            assert!(!p.collides(&m, 2, 1));
            assert!(!p.collides(&m, -1, 0));
        }
    }
}
