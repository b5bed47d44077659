/// External configuration loader.
///
/// Reads `config.toml` from an explicit path, or searches the executable's
/// directory and then the CWD. Missing file or missing keys fall back to
/// defaults; a parse error is reported and the defaults are used.
///
/// Loading happens before the file logger exists, so messages are
/// collected in a `LoadReport` and replayed by the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::domain::input::InputChannel;
use crate::domain::movement::MovementParams;
use crate::domain::quiz::{LevelTable, DEFAULT_MAX_SCORE, DEFAULT_QUESTIONS_PER_LEVEL};
use crate::error::{GameError, GameResult};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tick_rate_ms: u64,
    pub movement: MovementParams,
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub input: InputConfig,
    pub quiz: QuizConfig,
    pub panels: PanelConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub questions_file: PathBuf,
    pub log_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct InputConfig {
    pub channel: InputChannel,
    pub legacy_sensitivity: f32,
}

#[derive(Clone, Debug)]
pub struct QuizConfig {
    pub max_score: u32,
    pub table: LevelTable,
    /// Levels whose stored scores feed the average-score panel.
    pub average_levels: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct PanelConfig {
    pub popup_ticks: u32,
    pub start_scale: f32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

impl GameConfig {
    /// Fixed simulation step in seconds, derived from the tick rate.
    pub fn dt(&self) -> f32 {
        self.tick_rate_ms as f32 / 1000.0
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[], &mut LoadReport::default())
    }
}

/// What `GameConfig::load` found: the file it used and any warnings.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    movement: TomlMovement,
    #[serde(default)]
    input: TomlInput,
    #[serde(default)]
    quiz: TomlQuiz,
    #[serde(default)]
    panels: TomlPanels,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlMovement {
    #[serde(default = "default_max_speed")]
    max_speed: f32,
    #[serde(default = "default_takeoff")]
    jump_takeoff_speed: f32,
    #[serde(default = "default_jump_modifier")]
    jump_modifier: f32,
    #[serde(default = "default_jump_deceleration")]
    jump_deceleration: f32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_terminal_velocity")]
    terminal_velocity: f32,
}

#[derive(Deserialize, Debug)]
struct TomlInput {
    #[serde(default)]
    channel: InputChannel,
    #[serde(default = "default_legacy_sensitivity")]
    legacy_sensitivity: f32,
}

#[derive(Deserialize, Debug)]
struct TomlQuiz {
    #[serde(default = "default_max_score")]
    max_score: u32,
    #[serde(default = "default_questions")]
    default_questions: u32,
    /// Level index (as a string key) → question count, merged over the
    /// built-in table.
    #[serde(default)]
    levels: HashMap<String, u32>,
    #[serde(default = "default_average_levels")]
    average_levels: Vec<usize>,
}

#[derive(Deserialize, Debug)]
struct TomlPanels {
    #[serde(default = "default_popup_ticks")]
    popup_ticks: u32,
    #[serde(default = "default_start_scale")]
    start_scale: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump_buttons")]
    jump: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_questions_file")]
    questions_file: String,
    #[serde(default)]
    log_file: Option<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 40 }
fn default_max_speed() -> f32 { 7.0 }
fn default_takeoff() -> f32 { 7.0 }
fn default_jump_modifier() -> f32 { 1.5 }
fn default_jump_deceleration() -> f32 { 0.5 }
fn default_gravity() -> f32 { 24.0 }
fn default_terminal_velocity() -> f32 { 18.0 }
fn default_legacy_sensitivity() -> f32 { 6.0 }
fn default_max_score() -> u32 { DEFAULT_MAX_SCORE }
fn default_questions() -> u32 { DEFAULT_QUESTIONS_PER_LEVEL }
fn default_average_levels() -> Vec<usize> { vec![1, 2] }
fn default_popup_ticks() -> u32 { 12 }
fn default_start_scale() -> f32 { 0.1 }
fn default_jump_buttons() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "levels".into() }
fn default_questions_file() -> String { "questions.toml".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlMovement {
    fn default() -> Self {
        TomlMovement {
            max_speed: default_max_speed(),
            jump_takeoff_speed: default_takeoff(),
            jump_modifier: default_jump_modifier(),
            jump_deceleration: default_jump_deceleration(),
            gravity: default_gravity(),
            terminal_velocity: default_terminal_velocity(),
        }
    }
}

impl Default for TomlInput {
    fn default() -> Self {
        TomlInput {
            channel: InputChannel::default(),
            legacy_sensitivity: default_legacy_sensitivity(),
        }
    }
}

impl Default for TomlQuiz {
    fn default() -> Self {
        TomlQuiz {
            max_score: default_max_score(),
            default_questions: default_questions(),
            levels: HashMap::new(),
            average_levels: default_average_levels(),
        }
    }
}

impl Default for TomlPanels {
    fn default() -> Self {
        TomlPanels {
            popup_ticks: default_popup_ticks(),
            start_scale: default_start_scale(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump_buttons(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            questions_file: default_questions_file(),
            log_file: None,
        }
    }
}

// ── Loading ──

const MAX_TICK_MS: u64 = 1000;
const MAX_SPEED: f32 = 100.0;
const MAX_JUMP_MODIFIER: f32 = 10.0;
const MAX_GRAVITY: f32 = 500.0;

impl GameConfig {
    /// Load config from `explicit` if given, otherwise search for
    /// `config.toml` in the exe directory and then the CWD.
    pub fn load(explicit: Option<&Path>) -> (Self, LoadReport) {
        let search_dirs = candidate_dirs();
        let mut report = LoadReport::default();

        let toml_cfg = match explicit {
            Some(path) => match read_toml(path) {
                Ok(cfg) => {
                    report.source = Some(path.to_path_buf());
                    cfg
                }
                Err(e) => {
                    report.warnings.push(format!("{e}; using default settings"));
                    TomlConfig::default()
                }
            },
            None => search_toml(&search_dirs, &mut report),
        };

        let config = GameConfig::from_toml(toml_cfg, &search_dirs, &mut report);
        (config, report)
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf], report: &mut LoadReport) -> Self {
        let mut table = LevelTable::default().with_fallback(cfg.quiz.default_questions);
        for (key, count) in &cfg.quiz.levels {
            match key.trim().parse::<usize>() {
                Ok(level) => table.set(level, *count),
                Err(_) => report
                    .warnings
                    .push(format!("config: ignoring non-numeric level key {key:?}")),
            }
        }

        let m = &cfg.movement;
        let mut bounded = |name: &str, value: f32, limit: f32, fallback: f32| {
            if !value.is_finite() {
                report.warnings.push(format!("config: {name} = {value} is not finite"));
                return fallback;
            }
            value.abs().min(limit)
        };
        let movement = MovementParams {
            max_speed: bounded("max_speed", m.max_speed, MAX_SPEED, default_max_speed()),
            jump_takeoff_speed: bounded(
                "jump_takeoff_speed",
                m.jump_takeoff_speed,
                MAX_SPEED,
                default_takeoff(),
            ),
            jump_modifier: bounded(
                "jump_modifier",
                m.jump_modifier,
                MAX_JUMP_MODIFIER,
                default_jump_modifier(),
            ),
            jump_deceleration: bounded(
                "jump_deceleration",
                m.jump_deceleration,
                1.0,
                default_jump_deceleration(),
            ),
        };
        let gravity = bounded("gravity", m.gravity, MAX_GRAVITY, default_gravity());
        let terminal_velocity = bounded(
            "terminal_velocity",
            m.terminal_velocity,
            MAX_SPEED,
            default_terminal_velocity(),
        );

        GameConfig {
            tick_rate_ms: cfg.speed.tick_rate_ms.clamp(1, MAX_TICK_MS),
            movement,
            gravity,
            terminal_velocity,
            input: InputConfig {
                channel: cfg.input.channel,
                legacy_sensitivity: if cfg.input.legacy_sensitivity.is_finite() {
                    cfg.input.legacy_sensitivity.max(0.1)
                } else {
                    default_legacy_sensitivity()
                },
            },
            quiz: QuizConfig {
                max_score: cfg.quiz.max_score,
                table,
                average_levels: cfg.quiz.average_levels,
            },
            panels: PanelConfig {
                popup_ticks: cfg.panels.popup_ticks,
                start_scale: cfg.panels.start_scale.clamp(0.0, 1.0),
            },
            gamepad: GamepadConfig {
                jump: cfg.gamepad.jump,
                confirm: cfg.gamepad.confirm,
                cancel: cfg.gamepad.cancel,
            },
            levels_dir: resolve_dir(&cfg.general.levels_dir, search_dirs),
            questions_file: resolve_file(&cfg.general.questions_file, search_dirs),
            log_file: cfg.general.log_file.map(PathBuf::from),
        }
    }
}

impl FromStr for GameConfig {
    type Err = GameError;

    fn from_str(text: &str) -> GameResult<Self> {
        let cfg = toml::from_str::<TomlConfig>(text).map_err(|source| GameError::Toml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Ok(GameConfig::from_toml(cfg, &[], &mut LoadReport::default()))
    }
}

/// Candidate directories: exe dir, then CWD (deduplicated).
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

fn read_toml(path: &Path) -> GameResult<TomlConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| GameError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<TomlConfig>(&text).map_err(|source| GameError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn search_toml(search_dirs: &[PathBuf], report: &mut LoadReport) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match read_toml(&path) {
            Ok(cfg) => {
                report.source = Some(path);
                return cfg;
            }
            Err(e @ GameError::Toml { .. }) => {
                report.warnings.push(format!("{e}; using default settings"));
                return TomlConfig::default();
            }
            Err(e) => report.warnings.push(e.to_string()),
        }
    }
    TomlConfig::default()
}

fn resolve_dir(value: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(value))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

fn resolve_file(value: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(value))
        .find(|p| p.is_file())
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = "".parse::<GameConfig>().unwrap();
        assert_eq!(cfg.tick_rate_ms, 40);
        assert_eq!(cfg.quiz.max_score, 100);
        assert_eq!(cfg.quiz.table.questions_for(2), 10);
        assert_eq!(cfg.quiz.table.questions_for(4), 15);
        assert_eq!(cfg.quiz.table.questions_for(99), 5);
        assert_eq!(cfg.input.channel, InputChannel::Legacy);
        assert!((cfg.movement.jump_modifier - 1.5).abs() < f32::EPSILON);
        assert!((cfg.movement.jump_deceleration - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
            [movement]
            max_speed = 9.0

            [input]
            channel = "action"

            [quiz]
            max_score = 60
            levels = { "1" = 3, "7" = 12 }
        "#;
        let cfg: GameConfig = text.parse().unwrap();
        assert!((cfg.movement.max_speed - 9.0).abs() < f32::EPSILON);
        assert!((cfg.movement.jump_takeoff_speed - 7.0).abs() < f32::EPSILON);
        assert_eq!(cfg.input.channel, InputChannel::Action);
        assert_eq!(cfg.quiz.max_score, 60);
        assert_eq!(cfg.quiz.table.questions_for(1), 3);
        assert_eq!(cfg.quiz.table.questions_for(7), 12);
        // Unlisted levels keep their built-in quota.
        assert_eq!(cfg.quiz.table.questions_for(2), 10);
        assert_eq!(cfg.quiz.table.questions_for(4), 15);
        assert_eq!(cfg.quiz.table.questions_for(8), 5);
    }

    #[test]
    fn zero_tick_rate_is_clamped() {
        let cfg: GameConfig = "[speed]\ntick_rate_ms = 0\n".parse().unwrap();
        assert_eq!(cfg.tick_rate_ms, 1);
        assert!(cfg.dt() > 0.0);
    }

    #[test]
    fn huge_and_non_finite_speeds_are_bounded() {
        let text = r#"
            [speed]
            tick_rate_ms = 99999999

            [movement]
            jump_takeoff_speed = 1e30
            max_speed = -1e30
            jump_modifier = inf
            gravity = nan
        "#;
        let cfg: GameConfig = text.parse().unwrap();
        assert_eq!(cfg.tick_rate_ms, MAX_TICK_MS);
        assert_eq!(cfg.movement.jump_takeoff_speed, MAX_SPEED);
        assert_eq!(cfg.movement.max_speed, MAX_SPEED);
        assert!((cfg.movement.jump_modifier - 1.5).abs() < f32::EPSILON);
        assert!((cfg.gravity - 24.0).abs() < f32::EPSILON);
    }

    #[test]
    fn shipped_config_keeps_every_level_quota() {
        let cfg: GameConfig = include_str!("../config.toml").parse().unwrap();
        for (level, count) in [(1, 5), (2, 10), (3, 5), (4, 15), (5, 5)] {
            assert_eq!(cfg.quiz.table.questions_for(level), count, "level {level}");
        }
    }

    #[test]
    fn load_reports_instead_of_logging() {
        let dir = std::env::temp_dir().join(format!("quizrunner_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[quiz.levels]\n\"two\" = 3\n").unwrap();

        let (cfg, report) = GameConfig::load(Some(&path));
        assert_eq!(report.source.as_deref(), Some(path.as_path()));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("two"));
        assert_eq!(cfg.quiz.table.questions_for(2), 10);

        let (_, report) = GameConfig::load(Some(&dir.join("missing.toml")));
        assert!(report.source.is_none());
        assert_eq!(report.warnings.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(
            "[speed\n".parse::<GameConfig>(),
            Err(GameError::Toml { .. })
        ));
    }
}
