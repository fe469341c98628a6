/// Terminal frontend: raw-mode session plus a character-cell view of the world.
///
/// One character cell per tile. The viewport follows the player and the
/// bottom rows hold a status readout. Everything is redrawn every frame;
/// the level sizes this draws are small enough that diffing isn't worth it.

use std::io::{self, BufWriter, Stdout, Write};

use crossterm::{
    cursor,
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Print, ResetColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::map::TileMap;
use crate::domain::tile::Tile;
use crate::sim::world::{Phase, WorldState};

const STATUS_ROWS: usize = 4;

pub struct Terminal {
    writer: BufWriter<Stdout>,
    enhanced: bool,
}

impl Terminal {
    pub fn new() -> Self {
        Terminal {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            enhanced: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the terminal
    /// reports key releases, which `InputState::honor_release` should follow.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced = true;
        }
        Ok(self.enhanced)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn draw(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let view_w = tw as usize;
        let view_h = (th as usize).saturating_sub(STATUS_ROWS);

        let rows = render_view(world, view_w, view_h);
        for (y, line) in rows.iter().enumerate() {
            queue!(self.writer, cursor::MoveTo(0, y as u16), Print(line), Clear(ClearType::UntilNewLine))?;
        }

        for (i, line) in status_lines(world).iter().enumerate() {
            let y = (view_h + i) as u16;
            queue!(self.writer, cursor::MoveTo(0, y), Print(line), Clear(ClearType::UntilNewLine))?;
        }
        self.writer.flush()
    }
}

// ══════════════════════════════════════════════════════════════
// View composition (pure, testable)
// ══════════════════════════════════════════════════════════════

fn tile_glyph(tile: Option<Tile>) -> char {
    match tile {
        None => ' ',
        Some(t) if t.fan => '^',
        Some(t) if t.collides => '#',
        Some(t) if t.platform => '=',
        Some(_) => '~',
    }
}

/// Top-left tile of a `view`-sized window centred on `focus`, clamped to the map.
fn camera_origin(focus: i32, view: usize, extent: usize) -> i32 {
    if extent <= view {
        return 0;
    }
    (focus - view as i32 / 2).clamp(0, (extent - view) as i32)
}

fn render_view(world: &WorldState, view_w: usize, view_h: usize) -> Vec<String> {
    let map: &TileMap = world.map();
    let centre = world.player.body.center();
    let ox = camera_origin(map.tile_x(centre.x), view_w, map.width);
    let oy = camera_origin(map.tile_y(centre.y), view_h, map.height);
    let cols = view_w.min(map.width);
    let rows = view_h.min(map.height);

    let mut grid: Vec<Vec<char>> = (0..rows)
        .map(|y| (0..cols).map(|x| tile_glyph(map.tile(ox + x as i32, oy + y as i32))).collect())
        .collect();

    let mut plot = |at: glam::Vec2, ch: char| {
        let x = map.tile_x(at.x) - ox;
        let y = map.tile_y(at.y) - oy;
        if x >= 0 && y >= 0 && (x as usize) < cols && (y as usize) < rows {
            grid[y as usize][x as usize] = ch;
        }
    };

    plot(world.gate.rect.center(), 'D');
    for c in world.collectibles.iter() {
        plot(c.rect.center(), '$');
    }
    for e in &world.enemies {
        plot(e.body.center(), 'E');
    }
    let player_glyph = match world.phase {
        Phase::Dead => 'x',
        _ if world.player.is_crouching => 'p',
        _ => 'P',
    };
    plot(centre, player_glyph);

    grid.into_iter().map(|r| r.into_iter().collect()).collect()
}

fn status_lines(world: &WorldState) -> [String; STATUS_ROWS] {
    let p = &world.player;
    let c = p.body.center();
    let phase = match world.phase {
        Phase::Playing => "PLAYING",
        Phase::Dead => "DEAD",
        Phase::Won => "CLEARED",
    };
    let hint = match world.phase {
        Phase::Won => "[R/Q] Restart  [Esc] Quit",
        _ => "[←→] Move [↑/Space] Jump [↓/C] Crouch [R] Restart [G] Wall jump [Esc] Quit",
    };
    [
        String::new(),
        format!(
            " {}  {}  Score {}  Left {}",
            world.level.name,
            phase,
            world.score,
            world.collectibles.remaining(),
        ),
        format!(
            " pos ({:.0},{:.0}) vel ({:.0},{:.0}) facing {:?} jumps {}/{} wall-jump {}",
            c.x,
            c.y,
            p.body.vel.x,
            p.body.vel.y,
            p.facing,
            p.jump_count,
            world.config.movement.max_jumps,
            if p.allow_wall_jump { "on" } else { "off" },
        ),
        format!(" {hint}"),
    ]
}
