/// Persistent preferences: a flat key → integer store.
///
/// ## Keys
///
///   `Level{N}Score`    : final score recorded for level N
///   `LastUnlockedLevel`: highest level reachable from the main menu
///
/// ## File format
///   `key=value` lines in `prefs.dat`. Unknown or unparsable lines are
///   skipped with a warning; a missing file is an empty store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{GameError, GameResult};

pub const PREFS_FILE: &str = "prefs.dat";
pub const LAST_UNLOCKED_LEVEL: &str = "LastUnlockedLevel";

pub fn level_score_key(level: usize) -> String {
    format!("Level{level}Score")
}

/// Storage seam used by progress code, so tests can run without a disk.
pub trait PrefsStore {
    fn get_int(&self, key: &str) -> Option<i64>;
    fn set_int(&mut self, key: &str, value: i64);
    fn delete_key(&mut self, key: &str);
    /// Flush pending writes.
    fn save(&mut self) -> GameResult<()>;

    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

/// Directory for prefs and the log file: exe dir if writable, then
/// `~/.local/share/quizrunner`, then the CWD.
pub fn data_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/games/ are not writable
            let test_path = parent.join(".write_test_quizrunner");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/quizrunner");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// File-backed store
// ══════════════════════════════════════════════════════════════

pub struct Prefs {
    path: PathBuf,
    values: BTreeMap<String, i64>,
    dirty: bool,
}

impl Prefs {
    /// Open the default prefs file in `data_dir()`.
    pub fn open_default() -> Self {
        Prefs::open(data_dir().join(PREFS_FILE))
    }

    /// Open `path`. Read failures other than "not found" are logged and
    /// yield an empty store.
    pub fn open(path: PathBuf) -> Self {
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => parse_prefs(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                warn!("{}", GameError::Read { path: path.clone(), source });
                BTreeMap::new()
            }
        };
        Prefs { path, values, dirty: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PrefsStore for Prefs {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn delete_key(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    fn save(&mut self) -> GameResult<()> {
        if !self.dirty {
            return Ok(());
        }
        std::fs::write(&self.path, serialize(&self.values)).map_err(|source| GameError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        info!("prefs: saved {}", self.path.display());
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════
// In-memory store
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
#[derive(Default, Debug)]
pub struct MemoryPrefs {
    values: BTreeMap<String, i64>,
    pub saves: u32,
}

#[cfg(test)]
impl PrefsStore for MemoryPrefs {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn delete_key(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn save(&mut self) -> GameResult<()> {
        self.saves += 1;
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn serialize(values: &BTreeMap<String, i64>) -> String {
    let mut out = String::with_capacity(values.len() * 24);
    for (key, value) in values {
        out.push_str(&format!("{key}={value}\n"));
    }
    out
}

fn parse_prefs(content: &str) -> BTreeMap<String, i64> {
    let mut values = BTreeMap::new();
    for (n, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed = line
            .split_once('=')
            .and_then(|(k, v)| Some((k.trim(), v.trim().parse::<i64>().ok()?)))
            .filter(|(k, _)| !k.is_empty());
        match parsed {
            Some((key, value)) => {
                values.insert(key.to_string(), value);
            }
            None => warn!("prefs: skipping line {}: {line:?}", n + 1),
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quizrunner_{tag}_{}.dat", std::process::id()))
    }

    #[test]
    fn file_store_round_trip() {
        let path = temp_path("roundtrip");
        let _ = std::fs::remove_file(&path);

        let mut prefs = Prefs::open(path.clone());
        assert_eq!(prefs.get_int(LAST_UNLOCKED_LEVEL), None);
        prefs.set_int(&level_score_key(1), 80);
        prefs.set_int(LAST_UNLOCKED_LEVEL, 2);
        prefs.save().unwrap();

        let reopened = Prefs::open(path.clone());
        assert_eq!(reopened.get_int("Level1Score"), Some(80));
        assert_eq!(reopened.get_int_or(LAST_UNLOCKED_LEVEL, 1), 2);

        let mut again = reopened;
        again.delete_key(LAST_UNLOCKED_LEVEL);
        again.save().unwrap();
        assert_eq!(Prefs::open(path.clone()).get_int(LAST_UNLOCKED_LEVEL), None);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_empty_store() {
        let prefs = Prefs::open(temp_path("does_not_exist"));
        assert_eq!(prefs.get_int("Level1Score"), None);
        assert_eq!(prefs.get_int_or("Level1Score", 0), 0);
    }

    #[test]
    fn bad_lines_are_skipped() {
        let values = parse_prefs("Level1Score=60\ngarbage\nLevel2Score=abc\n=4\n# note\nLastUnlockedLevel = 3\n");
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("Level1Score"), Some(&60));
        assert_eq!(values.get(LAST_UNLOCKED_LEVEL), Some(&3));
    }

    #[test]
    fn memory_store_counts_saves() {
        let mut m = MemoryPrefs::default();
        m.set_int("k", 1);
        m.save().unwrap();
        m.delete_key("k");
        assert_eq!(m.get_int("k"), None);
        assert_eq!(m.saves, 1);
    }
}
