/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/level{N}.txt` files in the configured directory
///   2. Built-in embedded levels (1 and 2)
///
/// A file for an embedded index replaces it; other indices extend the set.
///
/// ## File format (`level{N}.txt`):
///   Line 1: `# Level Name`
///   Optional: `@ study material text` (one line each, in order)
///   Lines: map rows
///
/// ## Tile legend:
///   '#' = Ground        '=' = Platform
///   'P' = Player spawn  '?' = Quiz checkpoint
///   'F' = Finish flag   ' ' = Empty
///
/// Checkpoints are numbered in reading order (top row first, left to
/// right) and the k-th one asks the k-th question of the level.

use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};

use crate::domain::tile::Tile;
use crate::domain::trigger::{FinishTrigger, QuizTrigger};
use crate::error::{GameError, GameResult};
use crate::sim::world::{Phase, WorldState};

/// Level text as authored.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub material: Vec<String>,
    pub rows: Vec<String>,
}

/// Parsed grid plus the marker positions pulled out of it.
#[derive(Clone, Debug)]
pub struct Layout {
    pub tiles: Vec<Vec<Tile>>,
    pub width: usize,
    pub height: usize,
    pub spawn: (usize, usize),
    pub checkpoints: Vec<(usize, usize)>,
    pub finish: (usize, usize),
}

// ══════════════════════════════════════════════════════════════
// Level set
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct LevelSet {
    levels: BTreeMap<usize, LevelDef>,
}

impl LevelSet {
    pub fn embedded() -> Self {
        LevelSet { levels: embedded_levels().into_iter().collect() }
    }

    /// Embedded levels overlaid with any `level{N}.txt` in `dir`.
    /// Unreadable or invalid files are skipped with a warning.
    pub fn load(dir: &Path) -> Self {
        let mut set = LevelSet::embedded();
        for (index, result) in load_from_directory(dir) {
            match result {
                Ok(def) => {
                    info!("levels: level {index} from {}", dir.display());
                    set.insert(index, def);
                }
                Err(e) => warn!("{e}"),
            }
        }
        set
    }

    pub fn insert(&mut self, index: usize, def: LevelDef) {
        self.levels.insert(index, def);
    }

    pub fn get(&self, index: usize) -> Option<&LevelDef> {
        self.levels.get(&index)
    }

    pub fn exists(&self, index: usize) -> bool {
        self.levels.contains_key(&index)
    }

    /// Highest level index, 0 if the set is empty.
    pub fn last(&self) -> usize {
        self.levels.keys().next_back().copied().unwrap_or(0)
    }

    /// Next existing level after `index`.
    pub fn next_after(&self, index: usize) -> Option<usize> {
        self.levels.range(index + 1..).next().map(|(&i, _)| i)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load level `index` into the world: layout, triggers, question
/// assignment and a fresh quiz quota. Ends on the study-material panel.
pub fn load_level(world: &mut WorldState, levels: &LevelSet, index: usize) -> GameResult<()> {
    let def = levels.get(index).ok_or_else(|| GameError::Level {
        name: index.to_string(),
        reason: "no such level".into(),
    })?;
    let layout = build_layout(def)?;

    let mut quizzes = Vec::with_capacity(layout.checkpoints.len());
    for (k, &(x, y)) in layout.checkpoints.iter().enumerate() {
        let question = world.bank.index_for(index, k).ok_or_else(|| GameError::Level {
            name: def.name.clone(),
            reason: "question bank is empty".into(),
        })?;
        quizzes.push(QuizTrigger::new(x, y, question));
    }

    world.session.configure_level(index);
    let quota = world.session.total_questions();
    if quizzes.len() as u32 != quota {
        warn!(
            "level {index} has {} checkpoints but a quota of {quota} questions",
            quizzes.len()
        );
    }

    world.level = index;
    world.level_name = def.name.clone();
    world.material = def.material.clone();
    world.tiles = layout.tiles;
    world.width = layout.width;
    world.height = layout.height;
    world.spawn = layout.spawn;
    world.quizzes = quizzes;
    world.finish = Some(FinishTrigger::new(layout.finish.0, layout.finish.1));
    world.current_question = None;
    world.answer_cursor = 0;
    world.last_result = None;
    world.tick = 0;
    world.respawn();
    world.set_phase(Phase::Material);
    world.set_message(&def.name, 80);
    Ok(())
}

/// Turn level text into a tile grid and marker positions.
pub fn build_layout(def: &LevelDef) -> GameResult<Layout> {
    let invalid = |reason: &str| GameError::Level { name: def.name.clone(), reason: reason.into() };

    let height = def.rows.len();
    let width = def.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    if height == 0 || width == 0 {
        return Err(invalid("empty map"));
    }

    let mut tiles = vec![vec![Tile::Empty; width]; height];
    let mut spawn = None;
    let mut finish = None;
    let mut checkpoints = vec![];

    for (y, row) in def.rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            tiles[y][x] = Tile::from_char(ch);
            match ch {
                'P' => {
                    if spawn.replace((x, y)).is_some() {
                        return Err(invalid("more than one spawn 'P'"));
                    }
                }
                'F' => {
                    if finish.replace((x, y)).is_some() {
                        return Err(invalid("more than one finish flag 'F'"));
                    }
                }
                '?' => checkpoints.push((x, y)),
                _ => {}
            }
        }
    }

    Ok(Layout {
        tiles,
        width,
        height,
        spawn: spawn.ok_or_else(|| invalid("no spawn 'P'"))?,
        checkpoints,
        finish: finish.ok_or_else(|| invalid("no finish flag 'F'"))?,
    })
}

// ══════════════════════════════════════════════════════════════
// Single-level file parsing
// ══════════════════════════════════════════════════════════════

/// Parse a level file. `fallback_name` is used when there is no name line.
pub fn parse_level_file(content: &str, fallback_name: &str) -> GameResult<LevelDef> {
    let mut name = String::new();
    let mut material = vec![];
    let mut rows = vec![];

    for line in content.lines() {
        if rows.is_empty() && name.is_empty() && line.starts_with('#') && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if let Some(text) = line.strip_prefix('@') {
            material.push(text.trim().to_string());
        } else {
            rows.push(line.trim_end_matches('\r').to_string());
        }
    }

    while rows.first().map_or(false, |r| r.trim().is_empty()) {
        rows.remove(0);
    }
    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if name.is_empty() {
        name = fallback_name.to_string();
    }
    if rows.is_empty() {
        return Err(GameError::Level { name, reason: "no map rows".into() });
    }

    Ok(LevelDef { name, material, rows })
}

/// Distinguish `# Level Name` from `#####` (level data).
fn is_name_line(line: &str) -> bool {
    line[1..].chars().any(|c| c.is_alphabetic())
}

/// `level12.txt` → 12
fn level_index_from_filename(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix("level")?
        .strip_suffix(".txt")?
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
}

// ══════════════════════════════════════════════════════════════
// Directory loading
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<(usize, GameResult<LevelDef>)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return results,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let file_name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let Some(index) = level_index_from_filename(&file_name) else { continue };

        let parsed = std::fs::read_to_string(&path)
            .map_err(|source| GameError::Read { path: path.clone(), source })
            .and_then(|content| parse_level_file(&content, &format!("Level {index}")))
            .and_then(|def| build_layout(&def).map(|_| def));
        results.push((index, parsed));
    }

    results.sort_by_key(|(index, _)| *index);
    results
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

fn embedded_levels() -> Vec<(usize, LevelDef)> {
    vec![
        (1, make_embedded(
            "Level 1 - Number Meadow",
            &[
                "Fractions: to add 1/2 and 1/4, write both over 4: 2/4 + 1/4 = 3/4.",
                "Area of a rectangle is width times height.",
                "A prime has exactly two divisors: 1 and itself.",
                "25% means 25 out of every 100, a quarter of the whole.",
                "Multiply before you add: 3 + 4 x 2 = 3 + 8.",
            ],
            &[
                "                                                            ",
                "                                                            ",
                "                                  ===                       ",
                "                                                            ",
                "                     ===                      ==            ",
                "                                                            ",
                " P       ?         #      ?          ?     #      ?      ? F",
                "##############  #######  ##################  ###############",
                "##############  #######  ##################  ###############",
            ],
        )),
        (2, make_embedded(
            "Level 2 - Science Ridge",
            &[
                "Water boils at 100 C at sea level; ice melts from solid to liquid.",
                "Mercury is the closest planet to the Sun. The Moon reflects sunlight.",
                "Plants take in carbon dioxide and are producers in a food chain.",
                "Iron is magnetic. Light is fastest in a vacuum.",
                "An adult has 206 bones and a four-chambered heart.",
            ],
            &[
                "                                                                                          ",
                "                                                                                          ",
                "                                                                                          ",
                "                      ====                                  ====                          ",
                "                                     ===                                                  ",
                "            ?                  ?                ?                    ?                    ",
                " P    ?           #     ?     #            #        ?    #       ?         ?     ?      F ",
                "############   ########################  ##########   #################  #################",
                "############   ########################  ##########   #################  #################",
            ],
        )),
    ]
}

fn make_embedded(name: &str, material: &[&str], map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        material: material.iter().map(|s| s.to_string()).collect(),
        rows: map.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::question::QuestionBank;
    use crate::domain::quiz::{LevelTable, QuizSession};

    fn world() -> WorldState {
        WorldState::new(&GameConfig::default(), QuestionBank::embedded())
    }

    #[test]
    fn embedded_levels_match_default_quotas() {
        let set = LevelSet::embedded();
        let table = LevelTable::default();
        for index in [1, 2] {
            let layout = build_layout(set.get(index).unwrap()).unwrap();
            assert_eq!(layout.checkpoints.len() as u32, table.questions_for(index));
        }
        assert_eq!(set.last(), 2);
        assert_eq!(set.next_after(1), Some(2));
        assert_eq!(set.next_after(2), None);
    }

    #[test]
    fn demo_level_matches_shipped_quota() {
        let config: GameConfig = include_str!("../../config.toml").parse().unwrap();
        let def = parse_level_file(include_str!("../../demos/levels/level3.txt"), "level3").unwrap();
        assert_eq!(def.name, "Level 3 - History Hill");
        let layout = build_layout(&def).unwrap();
        assert_eq!(layout.checkpoints.len() as u32, config.quiz.table.questions_for(3));

        let mut session = QuizSession::new(config.quiz.table.clone(), config.quiz.max_score);
        session.configure_level(3);
        for _ in &layout.checkpoints {
            session.submit_answer(true);
        }
        assert!(session.all_answered());
        assert!(session.is_perfect());
    }

    #[test]
    fn parses_name_material_and_rows() {
        let text = "# Tiny\n@ Read this first.\n@ And this.\n\n P ? F\n######\n\n";
        let def = parse_level_file(text, "fallback").unwrap();
        assert_eq!(def.name, "Tiny");
        assert_eq!(def.material, vec!["Read this first.", "And this."]);
        assert_eq!(def.rows.len(), 2);

        let layout = build_layout(&def).unwrap();
        assert_eq!(layout.spawn, (1, 0));
        assert_eq!(layout.checkpoints, vec![(3, 0)]);
        assert_eq!(layout.finish, (5, 0));
        assert_eq!(layout.tiles[0][5], Tile::Flag);
        assert!(layout.tiles[1][0].is_solid());
    }

    #[test]
    fn data_row_starting_with_hash_is_not_a_name() {
        let def = parse_level_file("######\n P  F \n######", "Unnamed").unwrap();
        assert_eq!(def.name, "Unnamed");
        assert_eq!(def.rows.len(), 3);
    }

    #[test]
    fn layout_requires_spawn_and_flag() {
        let no_spawn = parse_level_file("# A\n   F\n####", "").unwrap();
        assert!(matches!(build_layout(&no_spawn), Err(GameError::Level { .. })));
        let two_flags = parse_level_file("# B\nP F F\n#####", "").unwrap();
        assert!(build_layout(&two_flags).is_err());
    }

    #[test]
    fn filename_to_index() {
        assert_eq!(level_index_from_filename("level3.txt"), Some(3));
        assert_eq!(level_index_from_filename("level0.txt"), None);
        assert_eq!(level_index_from_filename("levelx.txt"), None);
        assert_eq!(level_index_from_filename("notes.txt"), None);
    }

    #[test]
    fn directory_files_override_and_extend() {
        let dir = std::env::temp_dir().join(format!("quizrunner_levels_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("level1.txt"), "# Short One\nP ?  F\n######\n").unwrap();
        std::fs::write(dir.join("level3.txt"), "# Third\nP F\n###\n").unwrap();
        std::fs::write(dir.join("level4.txt"), "# Broken\n   \n###\n").unwrap();

        let set = LevelSet::load(&dir);
        assert_eq!(set.get(1).unwrap().name, "Short One");
        assert!(set.exists(2));
        assert!(set.exists(3));
        assert!(!set.exists(4));
        assert_eq!(set.len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_level_configures_session_and_triggers() {
        let mut w = world();
        load_level(&mut w, &LevelSet::embedded(), 2).unwrap();
        assert_eq!(w.phase, Phase::Material);
        assert_eq!(w.session.total_questions(), 10);
        assert_eq!(w.session.level(), 2);
        assert_eq!(w.quizzes.len(), 10);
        assert!(w.quizzes.iter().all(|q| w.bank.get(q.question).map(|b| b.level) == Some(2)));
        assert!(w.finish.is_some());
        assert!(w.body.grounded);
        assert_eq!((w.body.x, w.body.y), (1.0, 6.0));
    }

    #[test]
    fn missing_level_is_an_error() {
        let mut w = world();
        assert!(load_level(&mut w, &LevelSet::embedded(), 9).is_err());
        assert_eq!(w.phase, Phase::Title);
    }
}
