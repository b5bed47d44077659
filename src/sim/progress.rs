/// Level completion bookkeeping on top of the prefs store.
///
/// Scores are stored per level; `LastUnlockedLevel` only ever moves up.

use log::info;

use crate::domain::quiz::QuizSession;
use crate::error::GameResult;
use crate::sim::save::{level_score_key, PrefsStore, LAST_UNLOCKED_LEVEL};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelResult {
    pub level: usize,
    pub score: u32,
    pub max_score: u32,
    pub perfect: bool,
    pub unlocked_level: usize,
}

impl LevelResult {
    /// Result as the session stands, without touching storage.
    pub fn from_session(session: &QuizSession) -> Self {
        LevelResult {
            level: session.level(),
            score: session.score(),
            max_score: session.max_score(),
            perfect: session.is_perfect(),
            unlocked_level: session.level() + 1,
        }
    }
}

/// Record the session's score for its level, raise the watermark to the
/// following level and flush.
pub fn finish_level(session: &QuizSession, store: &mut dyn PrefsStore) -> GameResult<LevelResult> {
    let mut result = LevelResult::from_session(session);
    store.set_int(&level_score_key(result.level), i64::from(result.score));
    result.unlocked_level = raise_watermark(store, result.level + 1);
    store.save()?;
    info!(
        "level {} finished with {}/{} (unlocked {})",
        result.level, result.score, result.max_score, result.unlocked_level
    );
    Ok(result)
}

/// Unlock the level after `finished` (Next Level button), then flush.
/// Returns the stored watermark.
pub fn unlock_after(store: &mut dyn PrefsStore, finished: usize) -> GameResult<usize> {
    let stored = raise_watermark(store, finished + 1);
    store.save()?;
    Ok(stored)
}

fn raise_watermark(store: &mut dyn PrefsStore, level: usize) -> usize {
    let existing = store.get_int_or(LAST_UNLOCKED_LEVEL, 0).max(0) as usize;
    let stored = existing.max(level);
    if stored != existing {
        store.set_int(LAST_UNLOCKED_LEVEL, stored as i64);
    }
    stored
}

/// Level the Play button should start: the watermark if that level
/// exists, otherwise level 1.
pub fn resume_level(store: &dyn PrefsStore, exists: impl Fn(usize) -> bool) -> usize {
    match store.get_int(LAST_UNLOCKED_LEVEL) {
        Some(n) if n > 0 && exists(n as usize) => n as usize,
        _ => 1,
    }
}

pub fn stored_score(store: &dyn PrefsStore, level: usize) -> i64 {
    store.get_int_or(&level_score_key(level), 0)
}

/// Mean of the stored scores for `levels`; a missing score counts as 0.
pub fn average_score(store: &dyn PrefsStore, levels: &[usize]) -> f32 {
    if levels.is_empty() {
        return 0.0;
    }
    let total: i64 = levels.iter().map(|&l| stored_score(store, l)).sum();
    total as f32 / levels.len() as f32
}

/// Remove every stored score in `1..=max_level` and the watermark.
pub fn reset_progress(store: &mut dyn PrefsStore, max_level: usize) -> GameResult<()> {
    for level in 1..=max_level {
        store.delete_key(&level_score_key(level));
    }
    store.delete_key(LAST_UNLOCKED_LEVEL);
    store.save()
}
