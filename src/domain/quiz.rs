/// Quiz session: score, answered count and per-level quota.
///
/// One session lives for the whole process and is reset by
/// `configure_level` at every level (re)entry. State changes return
/// their notifications instead of calling observers, so the caller
/// decides delivery order.

use std::collections::BTreeMap;

use log::info;

pub const DEFAULT_MAX_SCORE: u32 = 100;
pub const DEFAULT_QUESTIONS_PER_LEVEL: u32 = 5;

/// Level index → number of quiz checkpoints in that level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelTable {
    counts: BTreeMap<usize, u32>,
    default_count: u32,
}

impl LevelTable {
    pub fn with_default(default_count: u32) -> Self {
        LevelTable { counts: BTreeMap::new(), default_count }
    }

    pub fn set(&mut self, level: usize, count: u32) {
        self.counts.insert(level, count);
    }

    pub fn questions_for(&self, level: usize) -> u32 {
        self.counts.get(&level).copied().unwrap_or(self.default_count)
    }

    /// Same per-level counts, different count for unlisted levels.
    pub fn with_fallback(mut self, default_count: u32) -> Self {
        self.default_count = default_count;
        self
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        let mut table = LevelTable::with_default(DEFAULT_QUESTIONS_PER_LEVEL);
        for (level, count) in [(1, 5), (2, 10), (3, 5), (4, 15), (5, 5)] {
            table.set(level, count);
        }
        table
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QuizNotification {
    ScoreChanged(u32),
    AllAnswered,
}

#[derive(Clone, Debug)]
pub struct QuizSession {
    table: LevelTable,
    max_score: u32,
    level: usize,
    current_score: u32,
    answered_count: u32,
    total_questions: u32,
    score_per_correct_answer: u32,
}

impl QuizSession {
    pub fn new(table: LevelTable, max_score: u32) -> Self {
        let mut session = QuizSession {
            table,
            max_score,
            level: 0,
            current_score: 0,
            answered_count: 0,
            total_questions: DEFAULT_QUESTIONS_PER_LEVEL,
            score_per_correct_answer: 0,
        };
        session.set_total_questions(DEFAULT_QUESTIONS_PER_LEVEL);
        session
    }

    /// Load the quota for `level`, recompute the per-answer score and
    /// reset the counters. Called once per level load.
    pub fn configure_level(&mut self, level: usize) {
        self.level = level;
        self.set_total_questions(self.table.questions_for(level));
        self.reset();
        info!(
            "level {level} has {} quizzes, each correct answer is worth {} points",
            self.total_questions, self.score_per_correct_answer
        );
    }

    fn set_total_questions(&mut self, total: u32) {
        self.total_questions = total;
        self.score_per_correct_answer = self.max_score.checked_div(total).unwrap_or(0);
    }

    pub fn reset(&mut self) {
        self.current_score = 0;
        self.answered_count = 0;
    }

    /// Record one answer. No de-duplication: every call counts.
    pub fn submit_answer(&mut self, is_correct: bool) -> Vec<QuizNotification> {
        if is_correct {
            self.current_score = self
                .current_score
                .saturating_add(self.score_per_correct_answer)
                .min(self.max_score);
        }
        self.answered_count = self.answered_count.saturating_add(1);

        let mut out = vec![QuizNotification::ScoreChanged(self.current_score)];
        if self.answered_count == self.total_questions {
            out.push(QuizNotification::AllAnswered);
        }
        out
    }

    // ── Reads ──

    pub fn score(&self) -> u32 { self.current_score }
    pub fn answered_count(&self) -> u32 { self.answered_count }
    pub fn total_questions(&self) -> u32 { self.total_questions }
    pub fn score_per_correct_answer(&self) -> u32 { self.score_per_correct_answer }
    pub fn max_score(&self) -> u32 { self.max_score }
    pub fn level(&self) -> usize { self.level }

    /// Has every checkpoint of this level been answered?
    pub fn all_answered(&self) -> bool {
        self.answered_count >= self.total_questions
    }

    pub fn is_perfect(&self) -> bool {
        self.current_score == self.max_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn session_with(level: usize, count: u32) -> QuizSession {
        let mut table = LevelTable::with_default(DEFAULT_QUESTIONS_PER_LEVEL);
        table.set(level, count);
        let mut s = QuizSession::new(table, DEFAULT_MAX_SCORE);
        s.configure_level(level);
        s
    }

    #[test]
    fn fallback_only_changes_unlisted_levels() {
        let table = LevelTable::default().with_fallback(3);
        assert_eq!(table.questions_for(4), 15);
        assert_eq!(table.questions_for(6), 3);
    }

    #[test]
    fn five_correct_answers_reach_max_and_fire_all_answered_once() {
        let mut s = session_with(1, 5);
        assert_eq!(s.score_per_correct_answer(), 20);

        let mut all_answered_at = vec![];
        for i in 1..=5 {
            let notes = s.submit_answer(true);
            assert_eq!(notes[0], QuizNotification::ScoreChanged(20 * i));
            if notes.contains(&QuizNotification::AllAnswered) {
                all_answered_at.push(i);
            }
        }
        assert_eq!(s.score(), 100);
        assert_eq!(all_answered_at, vec![5]);
        assert!(s.is_perfect());
    }

    #[test]
    fn three_questions_truncate_to_ninety_nine() {
        let mut s = session_with(1, 3);
        assert_eq!(s.score_per_correct_answer(), 33);
        for _ in 0..3 {
            s.submit_answer(true);
        }
        assert_eq!(s.score(), 99);
        assert!(!s.is_perfect());
    }

    #[rstest]
    #[case(1, 5)]
    #[case(2, 10)]
    #[case(3, 5)]
    #[case(4, 15)]
    #[case(5, 5)]
    #[case(6, 5)]
    #[case(0, 5)]
    fn default_table(#[case] level: usize, #[case] expected: u32) {
        assert_eq!(LevelTable::default().questions_for(level), expected);
    }

    #[test]
    fn configure_level_is_idempotent() {
        let mut s = QuizSession::new(LevelTable::default(), DEFAULT_MAX_SCORE);
        s.configure_level(2);
        s.submit_answer(true);
        s.configure_level(2);
        assert_eq!((s.score(), s.answered_count()), (0, 0));
        s.configure_level(2);
        assert_eq!((s.score(), s.answered_count()), (0, 0));
        assert_eq!(s.total_questions(), 10);
        assert_eq!(s.score_per_correct_answer(), 10);
    }

    #[test]
    fn wrong_answers_count_but_do_not_score() {
        let mut s = session_with(1, 5);
        let notes = s.submit_answer(false);
        assert_eq!(notes, vec![QuizNotification::ScoreChanged(0)]);
        assert_eq!(s.answered_count(), 1);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn score_stays_within_bounds_after_extra_submissions() {
        let mut s = session_with(1, 3);
        let mut last = 0;
        for n in 1..=12 {
            s.submit_answer(n % 4 != 0);
            assert!(s.score() <= s.max_score());
            assert!(s.answered_count() >= last);
            last = s.answered_count();
        }
        assert_eq!(s.answered_count(), 12);
    }

    #[test]
    fn zero_questions_does_not_divide_by_zero() {
        let mut s = session_with(9, 0);
        assert_eq!(s.score_per_correct_answer(), 0);
        assert!(s.all_answered());
        s.submit_answer(true);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn all_answered_tracks_count() {
        let mut s = session_with(1, 2);
        assert!(!s.all_answered());
        s.submit_answer(false);
        assert!(!s.all_answered());
        s.submit_answer(true);
        assert!(s.all_answered());
    }
}
