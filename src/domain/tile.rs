/// Tile flags and their derived properties.
///
/// A tile carries only its authored flags. Cells without a tile are
/// represented as `None` by the map, which is how ledge probes tell
/// "nothing here" apart from a decorative tile with no flags.
/// Properties are queried via methods so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Tile {
    pub collides: bool,
    /// One-way: blocks from above only.
    pub platform: bool,
    pub fan: bool,
    /// Authored lift; `None` = use the configured default.
    pub fan_power: Option<f32>,
}

impl Tile {
    /// Present but without any gameplay flag (background art).
    pub const DECOR: Tile = Tile { collides: false, platform: false, fan: false, fan_power: None };
    pub const SOLID: Tile = Tile { collides: true, platform: false, fan: false, fan_power: None };
    pub const PLATFORM: Tile = Tile { collides: false, platform: true, fan: false, fan_power: None };

    /// A solid fan block. `power = None` defers to the configured default.
    pub fn fan(power: Option<f32>) -> Tile {
        Tile { collides: true, platform: false, fan: true, fan_power: power }
    }

    /// Blocks movement from every side?
    pub fn is_solid(self) -> bool {
        self.collides && !self.platform
    }

    /// Blocks only from above, and only while the mover descends?
    pub fn is_one_way(self) -> bool {
        self.platform
    }

    /// Counts as a wall for wall-jump probes.
    pub fn is_wall(self) -> bool {
        self.collides
    }

    /// Cuts off a fan's airflow when sitting between fan and player.
    pub fn obstructs_wind(self) -> bool {
        self.collides || self.platform
    }

    pub fn lift(self, default_power: f32) -> f32 {
        self.fan_power.unwrap_or(default_power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_way_tile_is_not_solid_even_if_flagged_collides() {
        let t = Tile { collides: true, platform: true, fan: false, fan_power: None };
        assert!(!t.is_solid());
        assert!(t.is_one_way());
        assert!(t.obstructs_wind());
    }

    #[test]
    fn fan_power_falls_back_to_default() {
        assert_eq!(Tile::fan(None).lift(200.0), 200.0);
        assert_eq!(Tile::fan(Some(300.0)).lift(200.0), 300.0);
    }

    #[test]
    fn decor_has_no_gameplay_effect() {
        let t = Tile::DECOR;
        assert!(!t.is_solid() && !t.is_one_way() && !t.is_wall() && !t.obstructs_wind());
    }
}
