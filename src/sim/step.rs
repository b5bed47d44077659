/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Horizontal channel selection (once per tick)
///   2. Jump / stop-jump edges → movement state machine
///   3. Movement tick against last tick's grounded fact
///   4. Body integration against the tile grid
///   5. Pit check (respawn below the map)
///   6. Trigger overlaps: quiz checkpoints, then the finish flag
///
/// Answer selection and level completion happen outside the tick, from
/// the panels, and are also here so every core state change lives in
/// one module.

use log::{debug, warn};

use crate::config::GameConfig;
use crate::domain::input::{resolve_horizontal, AxisReadings};
use crate::domain::movement::MovementEvent;
use crate::domain::quiz::QuizNotification;
use crate::domain::tile::TileMap;
use crate::sim::progress::{finish_level, LevelResult};
use crate::sim::save::PrefsStore;
use super::event::GameEvent;
use super::world::{Phase, WorldState};

/// Rows below the bottom of the map before the player counts as lost.
const FALL_MARGIN: f32 = 2.0;

/// Everything the input layer gathered for one tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub readings: AxisReadings,
    pub jump_pressed: bool,
    pub jump_released: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: &FrameInput, config: &GameConfig) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    let horizontal = resolve_horizontal(config.input.channel, &input.readings);
    if input.jump_pressed {
        world.movement.request_jump();
    }
    if input.jump_released {
        world.movement.request_stop_jump();
    }

    for e in world.movement.tick(horizontal, world.body.grounded) {
        debug!("tick {}: {e:?}", world.tick);
        events.push(match e {
            MovementEvent::PlayerJumped => GameEvent::PlayerJumped,
            MovementEvent::PlayerLanded => GameEvent::PlayerLanded,
        });
    }

    let map = TileMap::new(&world.tiles);
    world.body.integrate(&mut world.movement, &map, &world.physics, config.dt());

    if world.body.y > world.height as f32 + FALL_MARGIN {
        world.respawn();
        world.set_message("Oops! Back to the start.", 40);
        events.push(GameEvent::PlayerRespawned);
        return events;
    }

    resolve_quiz_triggers(world, &mut events);
    if world.phase == Phase::Playing {
        resolve_finish(world, &mut events);
    }

    events
}

// ══════════════════════════════════════════════════════════════
// Triggers
// ══════════════════════════════════════════════════════════════

/// At most one checkpoint per tick: the first to fire opens its panel.
fn resolve_quiz_triggers(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let player = world.body.aabb();
    let fired = world.quizzes.iter_mut().find_map(|q| q.try_fire(&player));
    if let Some(question) = fired {
        present_question(world, question);
        events.push(GameEvent::QuizPresented { question });
    }
}

fn present_question(world: &mut WorldState, question: usize) {
    world.movement.stop_moving();
    world.movement.control_enabled = false;
    world.current_question = Some(question);
    world.answer_cursor = 0;
    world.set_phase(Phase::Quiz);
}

fn resolve_finish(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let player = world.body.aabb();
    let entered = match world.finish.as_mut() {
        Some(f) => f.entered(&player),
        None => false,
    };
    if !entered { return; }

    if world.session.all_answered() {
        world.movement.stop_moving();
        world.movement.control_enabled = false;
        events.push(GameEvent::LevelFinished);
    } else {
        let remaining = world
            .session
            .total_questions()
            .saturating_sub(world.session.answered_count());
        world.set_message(&format!("Answer all checkpoints first! ({remaining} left)"), 60);
        events.push(GameEvent::FinishBlocked { remaining });
    }
}

// ══════════════════════════════════════════════════════════════
// Panel actions
// ══════════════════════════════════════════════════════════════

/// Submit answer `index` for the question on screen. Out-of-range
/// indices and calls outside the quiz panel submit nothing.
pub fn select_answer(world: &mut WorldState, index: usize) -> Vec<GameEvent> {
    if world.phase != Phase::Quiz { return vec![]; }
    let Some(correct) = world.question().and_then(|q| q.check(index)) else {
        debug!("answer index {index} rejected");
        return vec![];
    };

    let mut events = vec![GameEvent::AnswerResult { correct }];
    for n in world.session.submit_answer(correct) {
        events.push(match n {
            QuizNotification::ScoreChanged(score) => GameEvent::ScoreChanged(score),
            QuizNotification::AllAnswered => GameEvent::AllAnswered,
        });
    }
    world.set_phase(Phase::Feedback { correct });
    events
}

/// Leave a paused panel (material or feedback) and hand control back.
pub fn resume_play(world: &mut WorldState) {
    world.current_question = None;
    world.movement.control_enabled = true;
    world.set_phase(Phase::Playing);
}

/// Persist the level result and open the results panel. A storage
/// failure is logged; the panel still shows the in-memory result.
pub fn complete_level(world: &mut WorldState, store: &mut dyn PrefsStore) -> LevelResult {
    let result = match finish_level(&world.session, store) {
        Ok(r) => r,
        Err(e) => {
            warn!("{e}");
            LevelResult::from_session(&world.session)
        }
    };
    world.last_result = Some(result);
    world.set_phase(Phase::Results);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::input::{InputChannel, InputError};
    use crate::domain::movement::JumpPhase;
    use crate::domain::question::QuestionBank;
    use crate::sim::level::{load_level, parse_level_file, LevelSet};
    use crate::sim::save::{MemoryPrefs, LAST_UNLOCKED_LEVEL};

    const TEST_LEVEL: usize = 7;

    fn setup(map: &str, quota: u32) -> (WorldState, GameConfig) {
        let mut config = GameConfig::default();
        config.quiz.table.set(TEST_LEVEL, quota);
        let mut levels = LevelSet::embedded();
        levels.insert(TEST_LEVEL, parse_level_file(map, "Test").unwrap());
        let mut world = WorldState::new(&config, QuestionBank::embedded());
        load_level(&mut world, &levels, TEST_LEVEL).unwrap();
        resume_play(&mut world);
        (world, config)
    }

    fn right() -> FrameInput {
        FrameInput {
            readings: AxisReadings { legacy: 1.0, ..AxisReadings::default() },
            ..FrameInput::default()
        }
    }

    fn run_until(
        world: &mut WorldState,
        config: &GameConfig,
        input: FrameInput,
        max_ticks: usize,
        want: impl Fn(&GameEvent) -> bool,
    ) -> Option<Vec<GameEvent>> {
        for _ in 0..max_ticks {
            let events = step(world, &input, config);
            if events.iter().any(&want) {
                return Some(events);
            }
        }
        None
    }

    #[test]
    fn jump_press_launches_within_one_tick() {
        let (mut w, cfg) = setup("# Flat\n\n\n\n P      F\n#########", 0);
        assert!(w.body.grounded);

        let press = FrameInput { jump_pressed: true, ..FrameInput::default() };
        let events = step(&mut w, &press, &cfg);
        assert!(events.is_empty());
        assert_eq!(w.movement.phase(), JumpPhase::Jumping);
        assert!(!w.body.grounded);

        let events = step(&mut w, &FrameInput::default(), &cfg);
        assert_eq!(events, vec![GameEvent::PlayerJumped]);
        assert_eq!(w.movement.phase(), JumpPhase::InFlight);

        let landed = run_until(&mut w, &cfg, FrameInput::default(), 60, |e| *e == GameEvent::PlayerLanded);
        assert!(landed.is_some());
    }

    #[test]
    fn releasing_jump_shortens_the_arc() {
        let map = "# Flat\n\n\n\n\n P      F\n#########";
        let peak = |release_at: Option<usize>| {
            let (mut w, cfg) = setup(map, 0);
            let mut top = w.body.y;
            for t in 0..40 {
                let input = FrameInput {
                    jump_pressed: t == 0,
                    jump_released: Some(t) == release_at,
                    ..FrameInput::default()
                };
                step(&mut w, &input, &cfg);
                top = top.min(w.body.y);
            }
            top
        };
        assert!(peak(Some(2)) > peak(None));
    }

    #[test]
    fn checkpoint_opens_quiz_once_and_stops_player() {
        let (mut w, cfg) = setup("# One\n P ?    F \n##########", 1);
        let events = run_until(&mut w, &cfg, right(), 30, |e| matches!(e, GameEvent::QuizPresented { .. }));
        assert!(events.is_some());
        assert_eq!(w.phase, Phase::Quiz);
        assert_eq!(w.movement.horizontal_velocity(), 0.0);
        assert!(!w.movement.control_enabled);

        // Simulation is frozen while the panel is open.
        let x = w.body.x;
        assert!(step(&mut w, &right(), &cfg).is_empty());
        assert_eq!(w.body.x, x);

        // Out-of-range index submits nothing.
        assert!(select_answer(&mut w, 4).is_empty());
        assert_eq!(w.session.answered_count(), 0);

        let q = w.question().unwrap().clone();
        let events = select_answer(&mut w, q.correct_index);
        assert_eq!(events[0], GameEvent::AnswerResult { correct: true });
        assert!(events.contains(&GameEvent::ScoreChanged(100)));
        assert!(events.contains(&GameEvent::AllAnswered));
        assert_eq!(w.phase, Phase::Feedback { correct: true });

        // Second selection on the feedback panel is ignored.
        assert!(select_answer(&mut w, q.correct_index).is_empty());
        assert_eq!(w.session.answered_count(), 1);

        resume_play(&mut w);
        assert!(w.movement.control_enabled);
        let again = run_until(&mut w, &cfg, right(), 10, |e| matches!(e, GameEvent::QuizPresented { .. }));
        assert!(again.is_none());
    }

    #[test]
    fn finish_is_gated_on_all_answered() {
        let (mut w, cfg) = setup("# Gate\n P ?   F  \n##########", 2);
        run_until(&mut w, &cfg, right(), 30, |e| matches!(e, GameEvent::QuizPresented { .. })).unwrap();
        select_answer(&mut w, 0);
        resume_play(&mut w);

        let blocked = run_until(&mut w, &cfg, right(), 40, |e| matches!(e, GameEvent::FinishBlocked { .. }));
        assert!(blocked.unwrap().contains(&GameEvent::FinishBlocked { remaining: 1 }));
        assert_eq!(w.phase, Phase::Playing);
        assert!(!w.message.is_empty());
    }

    #[test]
    fn finishing_records_result() {
        let (mut w, cfg) = setup("# Done\n P ?   F  \n##########", 1);
        run_until(&mut w, &cfg, right(), 30, |e| matches!(e, GameEvent::QuizPresented { .. })).unwrap();
        let correct = w.question().unwrap().correct_index;
        select_answer(&mut w, correct);
        resume_play(&mut w);
        run_until(&mut w, &cfg, right(), 40, |e| *e == GameEvent::LevelFinished).unwrap();

        let mut store = MemoryPrefs::default();
        let result = complete_level(&mut w, &mut store);
        assert_eq!(w.phase, Phase::Results);
        assert_eq!(result.score, 100);
        assert!(result.perfect);
        assert_eq!(store.get_int(&format!("Level{TEST_LEVEL}Score")), Some(100));
        assert_eq!(store.get_int(LAST_UNLOCKED_LEVEL), Some(TEST_LEVEL as i64 + 1));
    }

    #[test]
    fn falling_into_a_pit_respawns_at_spawn() {
        let (mut w, cfg) = setup("# Pit\n  P   F\n## ####", 0);
        let events = run_until(&mut w, &cfg, FrameInput::default(), 60, |e| *e == GameEvent::PlayerRespawned);
        assert!(events.is_some());
        assert_eq!((w.body.x, w.body.y), (2.0, 0.0));
        assert_eq!(w.movement.phase(), JumpPhase::Grounded);
    }

    #[test]
    fn action_channel_failure_uses_legacy_value() {
        let (mut w, mut cfg) = setup("# Flat\n P      F\n#########", 0);
        cfg.input.channel = InputChannel::Action;
        let input = FrameInput {
            readings: AxisReadings {
                touch: -1.0,
                action: Err(InputError::Disconnected),
                legacy: 1.0,
            },
            ..FrameInput::default()
        };
        let x = w.body.x;
        step(&mut w, &input, &cfg);
        assert!(w.body.x > x);
    }
}
