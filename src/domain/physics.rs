/// Arcade collision world: the single place positions change.
///
/// ## Model
///
/// Bodies are axis-aligned rectangles (top-left `pos` + `size`). Each step:
///   1. Velocity: horizontal acceleration, or drag toward 0 when there is
///      none; gravity on Y; both axes clamped to the body's `max_vel`.
///   2. Move X, resolve against solid tiles and the side world bounds.
///   3. Move Y, resolve against solid tiles, one-way tiles (through the
///      `PlatformPolicy`) and the top world bound.
///
/// Moves are split into sub-moves no longer than half a tile so fast
/// bodies cannot skip over a tile.
///
/// ## Contacts
///
/// `Body::blocked` is rewritten by every step and is what the controller
/// and enemy AI poll on the following frame. A body resting on the ground
/// reports `blocked.down` every frame because gravity pushes it a little
/// into the floor before resolution.
///
/// ## World bounds
///
/// Left, right and top edges block. The bottom is open: falling out of the
/// level is detected by the out-of-bounds rule, not stopped here.

use glam::Vec2;

use super::map::TileMap;
use super::platform::PlatformPolicy;

/// How far above a one-way tile's top the previous bottom edge may be
/// and still count as "came from above".
const ONE_WAY_SNAP: f32 = 0.5;

// ══════════════════════════════════════════════════════════════
// Geometry
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Rect { pos, size }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Rect { pos: center - size * 0.5, size }
    }

    pub fn left(&self) -> f32 { self.pos.x }
    pub fn right(&self) -> f32 { self.pos.x + self.size.x }
    pub fn top(&self) -> f32 { self.pos.y }
    pub fn bottom(&self) -> f32 { self.pos.y + self.size.y }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Strict overlap: touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

// ══════════════════════════════════════════════════════════════
// Bodies
// ══════════════════════════════════════════════════════════════

/// Per-axis contact flags from the most recent step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blocked {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Clone, Debug)]
pub struct Body {
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    pub accel_x: f32,
    /// Applied only while `accel_x == 0`.
    pub drag_x: f32,
    pub gravity: f32,
    pub max_vel: Vec2,
    /// Fraction of downward speed reflected on landing.
    pub bounce_y: f32,
    pub blocked: Blocked,
}

impl Body {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Body {
            pos: center - size * 0.5,
            size,
            vel: Vec2::ZERO,
            accel_x: 0.0,
            drag_x: 0.0,
            gravity: 0.0,
            max_vel: Vec2::splat(10_000.0),
            bounce_y: 0.0,
            blocked: Blocked::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    /// Resize vertically with the bottom edge fixed (crouching).
    pub fn set_height(&mut self, height: f32) {
        let bottom = self.bottom();
        self.size.y = height;
        self.pos.y = bottom - height;
    }

    pub fn clamp_velocity(&mut self) {
        self.vel.x = self.vel.x.clamp(-self.max_vel.x, self.max_vel.x);
        self.vel.y = self.vel.y.clamp(-self.max_vel.y, self.max_vel.y);
    }
}

// ══════════════════════════════════════════════════════════════
// Integration
// ══════════════════════════════════════════════════════════════

/// Advance one body by `dt` seconds against the tile map.
pub fn step_body(body: &mut Body, map: &TileMap, policy: &mut PlatformPolicy, dt: f32) {
    body.blocked = Blocked::default();

    // ── Velocity ──
    if body.accel_x != 0.0 {
        body.vel.x += body.accel_x * dt;
    } else if body.drag_x > 0.0 {
        let d = body.drag_x * dt;
        body.vel.x = if body.vel.x > d {
            body.vel.x - d
        } else if body.vel.x < -d {
            body.vel.x + d
        } else {
            0.0
        };
    }
    body.vel.y += body.gravity * dt;
    body.clamp_velocity();

    let max_sub = (map.tile_size.x.min(map.tile_size.y) * 0.5).max(1.0);

    // ── X ──
    let dx = body.vel.x * dt;
    for part in split(dx, max_sub) {
        body.pos.x += part;
        if resolve_x(body, map, part) { break; }
    }
    clamp_sides(body, map.width_px());

    // ── Y ──
    // The one-way override is evaluated for this mover, now, with the
    // velocity gravity has just produced.
    policy.refresh(body.vel.y);
    let dy = body.vel.y * dt;
    for part in split(dy, max_sub) {
        let prev_bottom = body.bottom();
        body.pos.y += part;
        if resolve_y(body, map, policy, part, prev_bottom) { break; }
    }
    if body.pos.y < 0.0 {
        body.pos.y = 0.0;
        body.blocked.up = true;
        body.vel.y = body.vel.y.max(0.0);
    }
}

/// Split a displacement into equal parts no longer than `max`.
fn split(d: f32, max: f32) -> Vec<f32> {
    if d == 0.0 || !d.is_finite() { return vec![]; }
    let n = (d.abs() / max).ceil().max(1.0) as usize;
    vec![d / n as f32; n]
}

/// Push the body out of solid tiles along X. Returns true on contact.
fn resolve_x(body: &mut Body, map: &TileMap, dx: f32) -> bool {
    let hits: Vec<f32> = map.tiles_within(&body.rect()).into_iter()
        .filter(|(_, _, t)| t.is_solid())
        .map(|(tx, ty, _)| {
            let r = map.tile_rect(tx, ty);
            if dx > 0.0 { r.left() } else { r.right() }
        })
        .collect();
    if hits.is_empty() { return false; }

    if dx > 0.0 {
        let wall = hits.iter().copied().fold(f32::INFINITY, f32::min);
        body.pos.x = wall - body.size.x;
        body.blocked.right = true;
    } else {
        let wall = hits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        body.pos.x = wall;
        body.blocked.left = true;
    }
    body.vel.x = 0.0;
    true
}

fn clamp_sides(body: &mut Body, world_w: f32) {
    if body.pos.x < 0.0 {
        body.pos.x = 0.0;
        body.blocked.left = true;
        body.vel.x = body.vel.x.max(0.0);
    } else if world_w > 0.0 && body.pos.x + body.size.x > world_w {
        body.pos.x = world_w - body.size.x;
        body.blocked.right = true;
        body.vel.x = body.vel.x.min(0.0);
    }
}

/// Push the body out of tiles along Y. Returns true on contact.
fn resolve_y(
    body: &mut Body,
    map: &TileMap,
    policy: &PlatformPolicy,
    dy: f32,
    prev_bottom: f32,
) -> bool {
    let tiles = map.tiles_within(&body.rect());

    if dy > 0.0 {
        let floor = tiles.iter()
            .filter(|(tx, ty, t)| {
                // Only tiles the feet were above count as floor; anything the
                // body already overlaps is not landed on.
                let top = map.tile_rect(*tx, *ty).top();
                let from_above = prev_bottom <= top + ONE_WAY_SNAP;
                if t.is_one_way() {
                    policy.collides(map, *tx, *ty) && from_above
                } else {
                    t.is_solid() && from_above
                }
            })
            .map(|(tx, ty, _)| map.tile_rect(*tx, *ty).top())
            .fold(f32::INFINITY, f32::min);
        if !floor.is_finite() { return false; }

        body.pos.y = floor - body.size.y;
        body.blocked.down = true;
        body.vel.y = if body.bounce_y > 0.0 { -body.vel.y * body.bounce_y } else { 0.0 };
        true
    } else {
        let ceiling = tiles.iter()
            .filter(|(_, _, t)| t.is_solid())
            .map(|(tx, ty, _)| map.tile_rect(*tx, *ty).bottom())
            .fold(f32::NEG_INFINITY, f32::max);
        if !ceiling.is_finite() { return false; }

        body.pos.y = ceiling;
        body.blocked.up = true;
        body.vel.y = 0.0;
        true
    }
}

// ══════════════════════════════════════════════════════════════
// Queries
// ══════════════════════════════════════════════════════════════

/// Indices of the group members whose rectangles overlap `rect`.
pub fn overlapping<I>(rect: &Rect, group: I) -> Vec<usize>
where
    I: IntoIterator<Item = Rect>,
{
    group.into_iter()
        .enumerate()
        .filter(|(_, r)| rect.overlaps(r))
        .map(|(i, _)| i)
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
