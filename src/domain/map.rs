/// Static tile grid in world-pixel space.
///
/// `cells[y][x]` holds `Some(tile)` or `None` (no tile). The grid is never
/// mutated after load; the only runtime tile state is the one-way override
/// owned by `PlatformPolicy`.
///
/// Coordinates:
///   - tile coords are `i32` so probes left of / above the map are expressible
///   - anything outside the grid reads as `None`

use glam::Vec2;

use super::physics::Rect;
use super::tile::Tile;

#[derive(Clone, Debug)]
pub struct TileMap {
    pub cells: Vec<Vec<Option<Tile>>>,
    pub width: usize,
    pub height: usize,
    pub tile_size: Vec2,
}

impl TileMap {
    pub fn new(cells: Vec<Vec<Option<Tile>>>, tile_size: Vec2) -> Self {
        let height = cells.len();
        let width = cells.first().map_or(0, |r| r.len());
        TileMap { cells, width, height, tile_size }
    }

    /// An all-empty map, handy for tests and as a placeholder before load.
    pub fn empty(width: usize, height: usize, tile_size: Vec2) -> Self {
        TileMap::new(vec![vec![None; width]; height], tile_size)
    }

    pub fn width_px(&self) -> f32 {
        self.width as f32 * self.tile_size.x
    }

    pub fn height_px(&self) -> f32 {
        self.height as f32 * self.tile_size.y
    }

    #[inline]
    pub fn tile(&self, tx: i32, ty: i32) -> Option<Tile> {
        if tx < 0 || ty < 0 { return None; }
        let (x, y) = (tx as usize, ty as usize);
        if x >= self.width || y >= self.height { return None; }
        self.cells[y][x]
    }

    #[inline]
    pub fn tile_x(&self, world_x: f32) -> i32 {
        (world_x / self.tile_size.x).floor() as i32
    }

    #[inline]
    pub fn tile_y(&self, world_y: f32) -> i32 {
        (world_y / self.tile_size.y).floor() as i32
    }

    pub fn tile_at_world(&self, world: Vec2) -> Option<Tile> {
        self.tile(self.tile_x(world.x), self.tile_y(world.y))
    }

    /// World-space rectangle covered by tile (tx, ty).
    pub fn tile_rect(&self, tx: i32, ty: i32) -> Rect {
        Rect::new(
            Vec2::new(tx as f32 * self.tile_size.x, ty as f32 * self.tile_size.y),
            self.tile_size,
        )
    }

    /// Tile-coordinate span `[min, max]` covered by a rectangle.
    /// Edges exactly on a tile boundary do not count as inside the next tile.
    pub fn span(&self, rect: &Rect) -> (i32, i32, i32, i32) {
        let x0 = self.tile_x(rect.left());
        let y0 = self.tile_y(rect.top());
        let x1 = (rect.right() / self.tile_size.x).ceil() as i32 - 1;
        let y1 = (rect.bottom() / self.tile_size.y).ceil() as i32 - 1;
        (x0, y0, x1.max(x0), y1.max(y0))
    }

    /// All present tiles overlapping `rect`, with their tile coordinates.
    pub fn tiles_within(&self, rect: &Rect) -> Vec<(i32, i32, Tile)> {
        let (x0, y0, x1, y1) = self.span(rect);
        let mut found = vec![];
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                if let Some(t) = self.tile(tx, ty) {
                    found.push((tx, ty, t));
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> TileMap {
        let mut m = TileMap::empty(4, 3, Vec2::splat(10.0));
        m.cells[2][1] = Some(Tile::SOLID);
        m.cells[1][3] = Some(Tile::PLATFORM);
        m
    }

    #[test]
    fn out_of_bounds_is_absent() {
        let m = map();
        assert_eq!(m.tile(-1, 0), None);
        assert_eq!(m.tile(4, 0), None);
        assert_eq!(m.tile(0, 3), None);
    }

    #[test]
    fn world_lookup_floors_to_cell() {
        let m = map();
        assert_eq!(m.tile_at_world(Vec2::new(19.9, 20.0)), Some(Tile::SOLID));
        assert_eq!(m.tile_at_world(Vec2::new(20.0, 20.0)), None);
        assert_eq!(m.tile_x(-0.5), -1);
    }

    #[test]
    fn span_excludes_touching_edges() {
        let m = map();
        let r = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0));
        assert_eq!(m.span(&r), (1, 1, 1, 1));
    }

    #[test]
    fn tiles_within_reports_coordinates() {
        let m = map();
        let r = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(40.0, 30.0));
        let found = m.tiles_within(&r);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&(1, 2, Tile::SOLID)));
        assert!(found.contains(&(3, 1, Tile::PLATFORM)));
    }

    #[test]
    fn pixel_extent() {
        let m = map();
        assert_eq!(m.width_px(), 40.0);
        assert_eq!(m.height_px(), 30.0);
    }
}
