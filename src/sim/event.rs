/// Events emitted during a simulation step or an answer submission.
/// The presentation layer consumes these for sound and status text.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    PlayerJumped,
    PlayerLanded,
    /// Fell below the map and was put back at the spawn point.
    PlayerRespawned,
    /// A checkpoint fired; the bank index of its question.
    QuizPresented { question: usize },
    AnswerResult { correct: bool },
    ScoreChanged(u32),
    AllAnswered,
    /// Reached the flag with checkpoints still unanswered.
    FinishBlocked { remaining: u32 },
    LevelFinished,
}
