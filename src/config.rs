/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to the built-in tuning if the file is missing or incomplete;
/// every key is optional.
///
/// The defaults reproduce the canonical gameplay variant: +1 per collectible,
/// wall-jump enabled, wall-jump lift of 1.35x, fan lift decaying over 500ms.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub general: GeneralConfig,
    pub sim: SimConfig,
    pub gamepad: GamepadConfig,
    /// Problems met while loading; logged once the subscriber is up.
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    /// Level file (`.txt` or Tiled `.json`). `None` = built-in level.
    pub level_path: Option<PathBuf>,
    pub frame_ms: u64,
    pub log_file: PathBuf,
    pub log_filter: String,
}

/// Everything the simulation core reads. Owned by `WorldState`.
#[derive(Clone, Debug, Default)]
pub struct SimConfig {
    pub movement: MovementConfig,
    pub rules: RulesConfig,
    pub enemy: EnemyConfig,
}

#[derive(Clone, Debug)]
pub struct MovementConfig {
    pub acceleration: f32,
    pub drag: f32,
    pub max_speed_x: f32,
    pub gravity: f32,
    pub jump_velocity: f32,          // negative = up
    pub max_jump_duration_ms: u64,   // variable-height sustain window
    pub max_jumps: u32,
    pub double_jump_multiplier: f32,
    pub wall_jump_multiplier_x: f32,
    pub wall_jump_multiplier_y: f32,
    pub max_fall_speed: f32,
    pub max_rise_speed: f32,
    pub crouch_scale: f32,
    pub wall_probe_width: f32,
    pub player_width: f32,
    pub player_height: f32,
}

#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub score_per_collectible: u32,
    pub allow_wall_jump: bool,
    pub fan_default_power: f32,
    pub fan_decay_ms: u64,         // 0 = no decay
    pub death_restart_ms: u64,
    pub pickup_effect_ms: u64,
    pub fall_margin: f32,          // px below the level before the player dies
    pub pickup_size: f32,          // collectible and gate hitbox edge
    pub debug_cheats: bool,
}

#[derive(Clone, Debug)]
pub struct EnemyConfig {
    pub speed: f32,
    pub gravity: f32,
    pub bounce: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub crouch: Vec<String>,
    pub restart: Vec<String>,
    pub debug_toggle: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    movement: TomlMovement,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    enemy: TomlEnemy,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    level: Option<String>,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_filter")]
    log_filter: String,
}

#[derive(Deserialize, Debug)]
struct TomlMovement {
    #[serde(default = "default_acceleration")]
    acceleration: f32,
    #[serde(default = "default_drag")]
    drag: f32,
    #[serde(default = "default_max_speed_x")]
    max_speed_x: f32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_jump_velocity")]
    jump_velocity: f32,
    #[serde(default = "default_max_jump_duration")]
    max_jump_duration_ms: u64,
    #[serde(default = "default_max_jumps")]
    max_jumps: u32,
    #[serde(default = "default_double_jump_mult")]
    double_jump_multiplier: f32,
    #[serde(default = "default_wall_jump_mult_x")]
    wall_jump_multiplier_x: f32,
    #[serde(default = "default_wall_jump_mult_y")]
    wall_jump_multiplier_y: f32,
    #[serde(default = "default_max_vertical_speed")]
    max_fall_speed: f32,
    #[serde(default = "default_max_vertical_speed")]
    max_rise_speed: f32,
    #[serde(default = "default_crouch_scale")]
    crouch_scale: f32,
    #[serde(default = "default_wall_probe")]
    wall_probe_width: f32,
    #[serde(default = "default_body_size")]
    player_width: f32,
    #[serde(default = "default_body_size")]
    player_height: f32,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_score_step")]
    score_per_collectible: u32,
    #[serde(default = "default_true")]
    allow_wall_jump: bool,
    #[serde(default = "default_fan_power")]
    fan_default_power: f32,
    #[serde(default = "default_fan_decay")]
    fan_decay_ms: u64,
    #[serde(default = "default_death_restart")]
    death_restart_ms: u64,
    #[serde(default = "default_pickup_effect")]
    pickup_effect_ms: u64,
    #[serde(default = "default_fall_margin")]
    fall_margin: f32,
    #[serde(default = "default_body_size")]
    pickup_size: f32,
    #[serde(default)]
    debug_cheats: bool,
}

#[derive(Deserialize, Debug)]
struct TomlEnemy {
    #[serde(default = "default_enemy_speed")]
    speed: f32,
    #[serde(default = "default_enemy_gravity")]
    gravity: f32,
    #[serde(default = "default_enemy_bounce")]
    bounce: f32,
    #[serde(default = "default_body_size")]
    width: f32,
    #[serde(default = "default_body_size")]
    height: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_jump")]
    jump: Vec<String>,
    #[serde(default = "default_pad_crouch")]
    crouch: Vec<String>,
    #[serde(default = "default_pad_restart")]
    restart: Vec<String>,
    #[serde(default = "default_pad_debug")]
    debug_toggle: Vec<String>,
}

// ── Defaults ──

fn default_frame_ms() -> u64 { 16 }
fn default_log_file() -> String { "tilehop.log".into() }
fn default_log_filter() -> String { "tilehop=info".into() }

fn default_acceleration() -> f32 { 400.0 }
fn default_drag() -> f32 { 900.0 }
fn default_max_speed_x() -> f32 { 10_000.0 }
fn default_gravity() -> f32 { 3000.0 }
fn default_jump_velocity() -> f32 { -475.0 }
fn default_max_jump_duration() -> u64 { 180 }
fn default_max_jumps() -> u32 { 2 }
fn default_double_jump_mult() -> f32 { 1.25 }
fn default_wall_jump_mult_x() -> f32 { 0.95 }
fn default_wall_jump_mult_y() -> f32 { 1.35 }
fn default_max_vertical_speed() -> f32 { 800.0 }
fn default_crouch_scale() -> f32 { 0.5 }
fn default_wall_probe() -> f32 { 10.0 }
fn default_body_size() -> f32 { 18.0 }

fn default_score_step() -> u32 { 1 }
fn default_true() -> bool { true }
fn default_fan_power() -> f32 { 200.0 }
fn default_fan_decay() -> u64 { 500 }
fn default_death_restart() -> u64 { 5000 }
fn default_pickup_effect() -> u64 { 1000 }
fn default_fall_margin() -> f32 { 500.0 }

fn default_enemy_speed() -> f32 { 100.0 }
fn default_enemy_gravity() -> f32 { 6000.0 } // world 3000 + per-body 3000
fn default_enemy_bounce() -> f32 { 0.2 }

fn default_pad_jump() -> Vec<String> { vec!["A".into()] }
fn default_pad_crouch() -> Vec<String> { vec!["B".into(), "L1".into()] }
fn default_pad_restart() -> Vec<String> { vec!["Start".into()] }
fn default_pad_debug() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            level: None,
            frame_ms: default_frame_ms(),
            log_file: default_log_file(),
            log_filter: default_log_filter(),
        }
    }
}

impl Default for TomlMovement {
    fn default() -> Self {
        TomlMovement {
            acceleration: default_acceleration(),
            drag: default_drag(),
            max_speed_x: default_max_speed_x(),
            gravity: default_gravity(),
            jump_velocity: default_jump_velocity(),
            max_jump_duration_ms: default_max_jump_duration(),
            max_jumps: default_max_jumps(),
            double_jump_multiplier: default_double_jump_mult(),
            wall_jump_multiplier_x: default_wall_jump_mult_x(),
            wall_jump_multiplier_y: default_wall_jump_mult_y(),
            max_fall_speed: default_max_vertical_speed(),
            max_rise_speed: default_max_vertical_speed(),
            crouch_scale: default_crouch_scale(),
            wall_probe_width: default_wall_probe(),
            player_width: default_body_size(),
            player_height: default_body_size(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            score_per_collectible: default_score_step(),
            allow_wall_jump: default_true(),
            fan_default_power: default_fan_power(),
            fan_decay_ms: default_fan_decay(),
            death_restart_ms: default_death_restart(),
            pickup_effect_ms: default_pickup_effect(),
            fall_margin: default_fall_margin(),
            pickup_size: default_body_size(),
            debug_cheats: false,
        }
    }
}

impl Default for TomlEnemy {
    fn default() -> Self {
        TomlEnemy {
            speed: default_enemy_speed(),
            gravity: default_enemy_gravity(),
            bounce: default_enemy_bounce(),
            width: default_body_size(),
            height: default_body_size(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_pad_jump(),
            crouch: default_pad_crouch(),
            restart: default_pad_restart(),
            debug_toggle: default_pad_debug(),
        }
    }
}

// ── Schema → public structs ──

impl From<TomlMovement> for MovementConfig {
    fn from(t: TomlMovement) -> Self {
        MovementConfig {
            acceleration: t.acceleration,
            drag: t.drag,
            max_speed_x: t.max_speed_x,
            gravity: t.gravity,
            jump_velocity: t.jump_velocity,
            max_jump_duration_ms: t.max_jump_duration_ms,
            max_jumps: t.max_jumps,
            double_jump_multiplier: t.double_jump_multiplier,
            wall_jump_multiplier_x: t.wall_jump_multiplier_x,
            wall_jump_multiplier_y: t.wall_jump_multiplier_y,
            max_fall_speed: t.max_fall_speed.abs(),
            max_rise_speed: t.max_rise_speed.abs(),
            crouch_scale: t.crouch_scale,
            wall_probe_width: t.wall_probe_width,
            player_width: t.player_width,
            player_height: t.player_height,
        }
    }
}

impl From<TomlRules> for RulesConfig {
    fn from(t: TomlRules) -> Self {
        RulesConfig {
            score_per_collectible: t.score_per_collectible,
            allow_wall_jump: t.allow_wall_jump,
            fan_default_power: t.fan_default_power,
            fan_decay_ms: t.fan_decay_ms,
            death_restart_ms: t.death_restart_ms,
            pickup_effect_ms: t.pickup_effect_ms,
            fall_margin: t.fall_margin,
            pickup_size: t.pickup_size,
            debug_cheats: t.debug_cheats,
        }
    }
}

impl From<TomlEnemy> for EnemyConfig {
    fn from(t: TomlEnemy) -> Self {
        EnemyConfig {
            speed: t.speed.abs(),
            gravity: t.gravity,
            bounce: t.bounce,
            width: t.width,
            height: t.height,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self { TomlMovement::default().into() }
}

impl Default for RulesConfig {
    fn default() -> Self { TomlRules::default().into() }
}

impl Default for EnemyConfig {
    fn default() -> Self { TomlEnemy::default().into() }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        let mut cfg = Self::from_toml(toml_cfg, &search_dirs);
        cfg.warnings = warnings;
        cfg
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Relative level paths resolve against the first search dir that has them
        let level_path = toml_cfg.general.level.as_deref().map(|p| {
            let path = PathBuf::from(p);
            if path.is_absolute() {
                path
            } else {
                search_dirs.iter()
                    .map(|d| d.join(&path))
                    .find(|candidate| candidate.is_file())
                    .unwrap_or(path)
            }
        });

        GameConfig {
            general: GeneralConfig {
                level_path,
                frame_ms: toml_cfg.general.frame_ms.max(1),
                log_file: PathBuf::from(toml_cfg.general.log_file),
                log_filter: toml_cfg.general.log_filter,
            },
            sim: SimConfig {
                movement: toml_cfg.movement.into(),
                rules: toml_cfg.rules.into(),
                enemy: toml_cfg.enemy.into(),
            },
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                crouch: toml_cfg.gamepad.crouch,
                restart: toml_cfg.gamepad.restart,
                debug_toggle: toml_cfg.gamepad.debug_toggle,
            },
            warnings: vec![],
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
/// Runs before logging is configured, so problems are collected, not logged.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => return parse_toml(&text, warnings),
            Err(e) => warnings.push(format!("could not read {}: {e}", path.display())),
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("config.toml parse error: {e}; using default settings"));
            TomlConfig::default()
        }
    }
}
