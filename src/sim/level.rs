/// Level loading: text levels, Tiled JSON maps, and the built-in level.
///
/// ## Sources (priority order):
///   1. `general.level` from config (`.txt` or Tiled `.json` / `.tmj`)
///   2. Built-in embedded level
///
/// ## Text format (`.txt`):
///   ```
///   # Level Name          (optional, first non-blank line only)
///   @name Level Name      (optional, same effect, any header line)
///   @tile 18x18           (optional, default 18x18)
///   @fan_power 250        (optional, lift for 'F'; default from config)
///   <map rows>
///   ```
///   Headers are only recognised before the first map row. A `# ` first
///   line made only of legend characters is a map row, not a name, so
///   bordered levels keep their top wall. Short rows are padded with empty
///   cells; trailing blank lines are dropped.
///
/// ## Tile legend:
///   '#' = Solid             '=' = One-way platform
///   'F' = Fan (solid)       '1'..'9' = Fan with lift n·100
///   '~' = Decoration        '$' = Collectible
///   'P' = Player start      'D' = Gate
///   'E' = Enemy spawn       ' ' / '.' = Empty
///
/// Spawn markers sit at the centre of their cell and leave the cell empty.
///
/// ## Tiled format:
///   - tile layer `BaseLayer`; per-tile properties `collides`, `platform`,
///     `fan`, `fanPower` from an embedded tileset
///   - object layer `Coins`: objects named `coin` (collectibles) and `door`
///     (the gate)
///   - objects named `enemy` / `player` in any object layer; when absent
///     the fixed spawn coordinates below are used

use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::map::TileMap;
use crate::domain::tile::Tile;

const DEFAULT_TILE: Vec2 = Vec2::new(18.0, 18.0);

/// Every character a text-level map row may contain.
const LEGEND: &str = " .#=~F123456789$PDE";

const TILED_BASE_LAYER: &str = "BaseLayer";
const TILED_PICKUP_LAYER: &str = "Coins";
const TILED_FALLBACK_PLAYER: Vec2 = Vec2::new(70.0, 345.0);
const TILED_FALLBACK_ENEMIES: [Vec2; 4] = [
    Vec2::new(200.0, 300.0),
    Vec2::new(425.0, 0.0),
    Vec2::new(800.0, 0.0),
    Vec2::new(1100.0, 300.0),
];

/// Tiled stores flip flags in the top bits of every gid.
const GID_MASK: u32 = 0x1FFF_FFFF;

/// Everything needed to (re)build a level instance. Never mutated after load;
/// restart rebuilds the world from it.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub map: TileMap,
    pub player_spawn: Vec2,
    pub enemy_spawns: Vec<Vec2>,
    pub collectibles: Vec<Vec2>,
    pub gate: Vec2,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read level {}: {source}", path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("malformed Tiled JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported level format: {0}")]
    UnsupportedFormat(String),
    #[error("level has no map rows")]
    EmptyGrid,
    #[error("unknown tile '{ch}' at row {row}, column {col}")]
    UnknownTile { ch: char, row: usize, col: usize },
    #[error("bad header line {line}: {text}")]
    BadHeader { line: usize, text: String },
    #[error("level has no player start")]
    MissingPlayer,
    #[error("level has no gate")]
    MissingGate,
    #[error("map has no layer named {0}")]
    MissingLayer(&'static str),
    #[error("layer {layer} holds {found} tiles, expected {expected}")]
    LayerSize { layer: String, expected: usize, found: usize },
    #[error("tile size {width}x{height} must be positive")]
    BadTileSize { width: f32, height: f32 },
    #[error("external tileset {0} is not supported; embed it in the map")]
    ExternalTileset(String),
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load a level file, picking the parser by extension.
pub fn load_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LevelError::Io { path: path.to_path_buf(), source })?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let def = match ext.to_ascii_lowercase().as_str() {
        "txt" => parse_text_level(&content)?,
        "json" | "tmj" => parse_tiled_level(&content)?,
        _ => return Err(LevelError::UnsupportedFormat(path.display().to_string())),
    };
    info!(
        level = %def.name,
        width = def.map.width,
        height = def.map.height,
        collectibles = def.collectibles.len(),
        enemies = def.enemy_spawns.len(),
        "level loaded"
    );
    Ok(def)
}

/// The level shipped inside the binary.
pub fn builtin_level() -> Result<LevelDef, LevelError> {
    parse_text_level(BUILTIN_LEVEL)
}

// ══════════════════════════════════════════════════════════════
// Text levels
// ══════════════════════════════════════════════════════════════

pub fn parse_text_level(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut tile_size = DEFAULT_TILE;
    let mut fan_power: Option<f32> = None;
    let mut rows: Vec<&str> = vec![];

    let mut first = true;

    for (i, line) in content.lines().enumerate() {
        if rows.is_empty() {
            if line.trim().is_empty() { continue; }
            let at_top = std::mem::replace(&mut first, false);
            if let Some(rest) = line.strip_prefix("# ") {
                if at_top && !is_map_row(line) {
                    name = rest.trim().to_string();
                    continue;
                }
            } else if let Some(rest) = line.strip_prefix("@name") {
                name = rest.trim().to_string();
                continue;
            } else if let Some(rest) = line.strip_prefix('@') {
                parse_header(rest, i + 1, &mut tile_size, &mut fan_power)?;
                continue;
            }
        }
        rows.push(line);
    }

    while rows.last().is_some_and(|r| r.trim().is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(LevelError::EmptyGrid);
    }

    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let height = rows.len();
    let mut cells = vec![vec![None; width]; height];
    let mut player = None;
    let mut gate = None;
    let mut enemy_spawns = vec![];
    let mut collectibles = vec![];

    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let centre = Vec2::new((x as f32 + 0.5) * tile_size.x, (y as f32 + 0.5) * tile_size.y);
            cells[y][x] = match ch {
                ' ' | '.' => None,
                '#' => Some(Tile::SOLID),
                '=' => Some(Tile::PLATFORM),
                '~' => Some(Tile::DECOR),
                'F' => Some(Tile::fan(fan_power)),
                '1'..='9' => {
                    let n = ch.to_digit(10).unwrap_or(1) as f32;
                    Some(Tile::fan(Some(n * 100.0)))
                }
                'P' => { player = Some(centre); None }
                'D' => { gate = Some(centre); None }
                'E' => { enemy_spawns.push(centre); None }
                '$' => { collectibles.push(centre); None }
                _ => return Err(LevelError::UnknownTile { ch, row: y, col: x }),
            };
        }
    }

    if name.is_empty() {
        name = "Unnamed Level".to_string();
    }

    Ok(LevelDef {
        name,
        map: TileMap::new(cells, tile_size),
        player_spawn: player.ok_or(LevelError::MissingPlayer)?,
        enemy_spawns,
        collectibles,
        gate: gate.ok_or(LevelError::MissingGate)?,
    })
}

fn is_map_row(line: &str) -> bool {
    line.chars().all(|c| LEGEND.contains(c))
}

fn parse_header(
    rest: &str,
    line: usize,
    tile_size: &mut Vec2,
    fan_power: &mut Option<f32>,
) -> Result<(), LevelError> {
    let bad = || LevelError::BadHeader { line, text: format!("@{rest}") };
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("tile"), Some(size)) => {
            let (w, h) = size.split_once('x').ok_or_else(bad)?;
            let w: f32 = w.parse().map_err(|_| bad())?;
            let h: f32 = h.parse().map_err(|_| bad())?;
            if w <= 0.0 || h <= 0.0 { return Err(bad()); }
            *tile_size = Vec2::new(w, h);
        }
        (Some("fan_power"), Some(p)) => {
            *fan_power = Some(p.parse().map_err(|_| bad())?);
        }
        _ => return Err(bad()),
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Tiled JSON
// ══════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct TiledMap {
    width: usize,
    height: usize,
    tilewidth: f32,
    tileheight: f32,
    #[serde(default)]
    layers: Vec<TiledLayer>,
    #[serde(default)]
    tilesets: Vec<TiledTileset>,
}

#[derive(Deserialize, Debug)]
struct TiledLayer {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Vec<u32>,
    #[serde(default)]
    objects: Vec<TiledObject>,
}

#[derive(Deserialize, Debug)]
struct TiledObject {
    #[serde(default)]
    name: String,
    x: f32,
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    gid: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct TiledTileset {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    tiles: Vec<TiledTile>,
}

#[derive(Deserialize, Debug)]
struct TiledTile {
    id: u32,
    #[serde(default)]
    properties: Vec<TiledProperty>,
}

#[derive(Deserialize, Debug)]
struct TiledProperty {
    name: String,
    value: serde_json::Value,
}

impl TiledObject {
    /// Centre in world space. Tile objects are anchored bottom-left.
    fn centre(&self) -> Vec2 {
        let half = Vec2::new(self.width, self.height) * 0.5;
        if self.gid.is_some() {
            Vec2::new(self.x + half.x, self.y - half.y)
        } else {
            Vec2::new(self.x, self.y) + half
        }
    }
}

pub fn parse_tiled_level(content: &str) -> Result<LevelDef, LevelError> {
    let raw: TiledMap = serde_json::from_str(content)?;
    if !(raw.tilewidth > 0.0 && raw.tileheight > 0.0) {
        return Err(LevelError::BadTileSize { width: raw.tilewidth, height: raw.tileheight });
    }
    if let Some(ts) = raw.tilesets.iter().find_map(|t| t.source.clone()) {
        return Err(LevelError::ExternalTileset(ts));
    }

    let base = raw.layers.iter()
        .find(|l| l.kind == "tilelayer" && l.name == TILED_BASE_LAYER)
        .ok_or(LevelError::MissingLayer(TILED_BASE_LAYER))?;
    let expected = raw.width * raw.height;
    if base.data.len() != expected {
        return Err(LevelError::LayerSize {
            layer: base.name.clone(),
            expected,
            found: base.data.len(),
        });
    }
    if expected == 0 {
        return Err(LevelError::EmptyGrid);
    }

    let cells = base.data
        .chunks(raw.width)
        .map(|row| row.iter().map(|&gid| tile_for_gid(&raw.tilesets, gid)).collect())
        .collect();
    let map = TileMap::new(cells, Vec2::new(raw.tilewidth, raw.tileheight));

    let pickups = raw.layers.iter()
        .find(|l| l.kind == "objectgroup" && l.name == TILED_PICKUP_LAYER)
        .ok_or(LevelError::MissingLayer(TILED_PICKUP_LAYER))?;
    let collectibles: Vec<Vec2> = pickups.objects.iter()
        .filter(|o| o.name == "coin")
        .map(TiledObject::centre)
        .collect();
    let gate = pickups.objects.iter()
        .find(|o| o.name == "door")
        .map(TiledObject::centre)
        .ok_or(LevelError::MissingGate)?;

    let objects = || raw.layers.iter().filter(|l| l.kind == "objectgroup").flat_map(|l| l.objects.iter());
    let player_spawn = objects()
        .find(|o| o.name == "player")
        .map(TiledObject::centre)
        .unwrap_or(TILED_FALLBACK_PLAYER);
    let mut enemy_spawns: Vec<Vec2> = objects()
        .filter(|o| o.name == "enemy")
        .map(TiledObject::centre)
        .collect();
    if enemy_spawns.is_empty() {
        debug!("no enemy objects, using fixed spawns");
        enemy_spawns = TILED_FALLBACK_ENEMIES.to_vec();
    }

    Ok(LevelDef {
        name: "Tiled Level".to_string(),
        map,
        player_spawn,
        enemy_spawns,
        collectibles,
        gate,
    })
}

/// Resolve a layer gid to tile flags. 0 is "no tile".
fn tile_for_gid(tilesets: &[TiledTileset], gid: u32) -> Option<Tile> {
    let gid = gid & GID_MASK;
    if gid == 0 { return None; }

    let mut tile = Tile::DECOR;
    let owner = tilesets.iter()
        .filter(|t| t.firstgid <= gid)
        .max_by_key(|t| t.firstgid);
    let Some(ts) = owner else { return Some(tile) };
    let local = gid - ts.firstgid;
    let Some(def) = ts.tiles.iter().find(|t| t.id == local) else { return Some(tile) };

    for p in &def.properties {
        match p.name.as_str() {
            "collides" => tile.collides = p.value.as_bool().unwrap_or(false),
            "platform" => tile.platform = p.value.as_bool().unwrap_or(false),
            "fan" => tile.fan = p.value.as_bool().unwrap_or(false),
            "fanPower" => tile.fan_power = p.value.as_f64().map(|v| v as f32),
            _ => {}
        }
    }
    Some(tile)
}

// ══════════════════════════════════════════════════════════════
// Embedded level
// ══════════════════════════════════════════════════════════════

const BUILTIN_LEVEL: &str = "\
# Windy Hollow
@tile 18x18
########################################
#......................................#
#......................................#
#..........$..............$............#
#......======..........=====.....$.....#
#...............................####...#
#....$.........E.......................#
#..=====....#######...........$........#
#.....................=====...........D#
#..P.........................E.....#####
#######..###########..#########...######
#######..#######################..######
#######FF#######################..######
################################..######
";

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
