/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::KeyCode;
use log::{debug, info, warn};

use config::GameConfig;
use domain::input::{AxisReadings, InputChannel, LegacyAxis};
use domain::question::{QuestionBank, ANSWER_COUNT};
use sim::event::GameEvent;
use sim::level::{load_level, LevelSet};
use sim::progress::{average_score, reset_progress, resume_level, stored_score, unlock_after};
use sim::save::{data_dir, Prefs, PrefsStore, LAST_UNLOCKED_LEVEL};
use sim::step::{self, FrameInput};
use sim::world::{MenuPanel, Phase, WorldState, MENU_ITEMS};
use ui::controls::{self, ControlButton};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "quizrunner.log";

#[derive(Parser, Debug)]
#[command(name = "quizrunner", version, about = "Terminal platformer with quiz checkpoints")]
struct Cli {
    /// Config file (default: config.toml next to the binary or in the CWD)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start at this level instead of the last unlocked one
    #[arg(long)]
    level: Option<usize>,

    /// Horizontal input channel
    #[arg(long, value_enum)]
    input: Option<InputChannel>,

    /// Delete stored scores and the unlocked-level mark, then exit
    #[arg(long)]
    reset_progress: bool,

    /// Disable sound effects
    #[arg(long)]
    no_sound: bool,
}

/// Everything the loop needs besides the world itself.
struct Ctx<'a> {
    config: &'a GameConfig,
    levels: &'a LevelSet,
    prefs: &'a mut Prefs,
    sound: Option<&'a SoundEngine>,
    start_level: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    let (mut config, report) = GameConfig::load(cli.config.as_deref());
    if let Some(channel) = cli.input {
        config.input.channel = channel;
    }
    init_logging(&config);
    match &report.source {
        Some(path) => info!("config: loaded {}", path.display()),
        None => info!("config: built-in defaults"),
    }
    for message in &report.warnings {
        warn!("{message}");
    }
    info!("input channel: {:?}, tick {} ms", config.input.channel, config.tick_rate_ms);

    let bank = load_questions(&config);
    let levels = LevelSet::load(&config.levels_dir);
    info!("{} levels, {} questions", levels.len(), bank.len());

    let mut prefs = Prefs::open_default();
    info!("progress file: {}", prefs.path().display());

    if cli.reset_progress {
        match reset_progress(&mut prefs, levels.last()) {
            Ok(()) => println!("Progress reset ({})", prefs.path().display()),
            Err(e) => eprintln!("Could not reset progress: {e}"),
        }
        return;
    }

    let mut world = WorldState::new(&config, bank);
    let mut renderer = Renderer::new(config.panels.clone(), config.input.channel);
    let honor_release = match renderer.init() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let sound = if cli.no_sound { None } else { SoundEngine::new() };
    let mut ctx = Ctx {
        config: &config,
        levels: &levels,
        prefs: &mut prefs,
        sound: sound.as_ref(),
        start_level: cli.level,
    };

    let result = game_loop(&mut world, &mut renderer, &mut ctx, honor_release);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Quiz Runner!");
}

/// The terminal belongs to the renderer, so logs go to a file.
fn init_logging(config: &GameConfig) {
    let path = config.log_file.clone().unwrap_or_else(|| data_dir().join(LOG_FILE));
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match File::create(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn load_questions(config: &GameConfig) -> QuestionBank {
    if !config.questions_file.is_file() {
        return QuestionBank::embedded();
    }
    match QuestionBank::load(&config.questions_file) {
        Ok(bank) if !bank.is_empty() => {
            info!("questions from {}", config.questions_file.display());
            bank
        }
        Ok(_) => {
            warn!("{} has no questions; using built-in set", config.questions_file.display());
            QuestionBank::embedded()
        }
        Err(e) => {
            warn!("{e}; using built-in set");
            QuestionBank::embedded()
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_JUMP: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_NEXT: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N')];
const KEYS_MENU: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('m'), KeyCode::Char('M')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_ANSWER: [KeyCode; ANSWER_COUNT] =
    [KeyCode::Char('1'), KeyCode::Char('2'), KeyCode::Char('3'), KeyCode::Char('4')];

/// Jump edges seen between two ticks.
#[derive(Default)]
struct PendingJump {
    pressed: bool,
    released: bool,
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    ctx: &mut Ctx,
    honor_release: bool,
) -> std::io::Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let mut gp = GamepadState::new();
    gp.load_button_config(&ctx.config.gamepad);
    let mut legacy = LegacyAxis::new(ctx.config.input.legacy_sensitivity);

    let tick_rate = Duration::from_millis(ctx.config.tick_rate_ms);
    let mut last_tick = Instant::now();
    let mut pending = PendingJump::default();
    let mut touch_jump_down = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        let was_playing = world.phase == Phase::Playing;
        if handle_meta(world, ctx, &kb, &gp) {
            break;
        }

        let (cols, rows) = renderer.size();
        let buttons = controls::layout(cols, rows);
        // A key that just closed a panel is not also a jump.
        if was_playing && world.phase == Phase::Playing {
            if kb.any_pressed(KEYS_JUMP) || gp.jump_pressed() {
                pending.pressed = true;
            }
            // Without release reporting a held key looks released after
            // the hold timeout, which would cut every jump short.
            if (kb.honor_release && kb.any_released(KEYS_JUMP)) || gp.jump_released() {
                pending.released = true;
            }
            if ctx.config.input.channel == InputChannel::Touch {
                let pressed = kb.mouse_pressed().and_then(|(c, r)| controls::hit_test(&buttons, c, r));
                if pressed == Some(ControlButton::Jump) {
                    pending.pressed = true;
                    touch_jump_down = true;
                }
                if touch_jump_down && kb.mouse_released() {
                    pending.released = true;
                    touch_jump_down = false;
                }
            }
        } else {
            pending = PendingJump::default();
            touch_jump_down = false;
            legacy.reset();
        }

        if last_tick.elapsed() >= tick_rate {
            world.anim_tick = world.anim_tick.wrapping_add(1);
            world.panel_tick = world.panel_tick.saturating_add(1);

            if world.phase == Phase::Playing {
                let touch = controls::axis_for(
                    kb.mouse_held().and_then(|(c, r)| controls::hit_test(&buttons, c, r)),
                );
                let target = kb.digital_axis(KEYS_LEFT, KEYS_RIGHT);
                let input = FrameInput {
                    readings: AxisReadings {
                        touch,
                        action: gp.axis(),
                        legacy: legacy.step(target, ctx.config.dt()),
                    },
                    jump_pressed: std::mem::take(&mut pending.pressed),
                    jump_released: std::mem::take(&mut pending.released),
                };
                let events = step::step(world, &input, ctx.config);
                route_events(world, ctx, &events);
            }

            world.tick_message();
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Sounds, messages and persistence for what the tick reported.
fn route_events(world: &mut WorldState, ctx: &mut Ctx, events: &[GameEvent]) {
    for event in events {
        debug!("event: {event:?}");
        match event {
            GameEvent::PlayerJumped => play(ctx, SoundEngine::play_jump),
            GameEvent::PlayerLanded => play(ctx, SoundEngine::play_land),
            GameEvent::PlayerRespawned => play(ctx, SoundEngine::play_respawn),
            GameEvent::QuizPresented { question } => {
                info!("checkpoint question {question}");
                play(ctx, SoundEngine::play_blip);
            }
            GameEvent::AnswerResult { correct: true } => play(ctx, SoundEngine::play_correct),
            GameEvent::AnswerResult { correct: false } => play(ctx, SoundEngine::play_wrong),
            GameEvent::ScoreChanged(score) => info!("score {score}"),
            GameEvent::AllAnswered => {
                world.set_message("All checkpoints answered! Head for the flag ⚑", 80);
                play(ctx, SoundEngine::play_all_answered);
            }
            GameEvent::FinishBlocked { remaining } => {
                debug!("finish blocked, {remaining} left");
                play(ctx, SoundEngine::play_wrong);
            }
            GameEvent::LevelFinished => {
                let result = step::complete_level(world, &mut *ctx.prefs);
                info!("level {} finished: {}/{}", result.level, result.score, result.max_score);
                play(ctx, SoundEngine::play_clear);
            }
        }
    }
}

fn play(ctx: &Ctx, f: fn(&SoundEngine)) {
    if let Some(sfx) = ctx.sound {
        f(sfx);
    }
}

// ── Flow ──

fn start_level(world: &mut WorldState, ctx: &Ctx, index: usize) {
    match load_level(world, ctx.levels, index) {
        Ok(()) => info!("level {index}: {}", world.level_name),
        Err(e) => {
            warn!("{e}");
            world.set_message(&format!("Could not load level {index}"), 60);
        }
    }
}

fn play_from_menu(world: &mut WorldState, ctx: &mut Ctx) {
    let index = match ctx.start_level.take() {
        Some(n) if ctx.levels.exists(n) => n,
        Some(n) => {
            warn!("no level {n}; resuming saved progress");
            resume_level(&*ctx.prefs, |n| ctx.levels.exists(n))
        }
        None => resume_level(&*ctx.prefs, |n| ctx.levels.exists(n)),
    };
    start_level(world, ctx, index);
}

fn next_level(world: &mut WorldState, ctx: &mut Ctx) {
    let current = world.session.level();
    if let Err(e) = unlock_after(&mut *ctx.prefs, current) {
        warn!("{e}");
    }
    match ctx.levels.next_after(current) {
        Some(next) => start_level(world, ctx, next),
        None => show_average(world, ctx),
    }
}

fn show_average(world: &mut WorldState, ctx: &Ctx) {
    let levels = &ctx.config.quiz.average_levels;
    let rows = levels.iter().map(|&l| (l, stored_score(&*ctx.prefs, l))).collect();
    let mean = average_score(&*ctx.prefs, levels);
    info!("average score {mean:.1}");
    world.average = Some((rows, mean));
    world.set_phase(Phase::AverageScore);
}

fn profile_lines(ctx: &Ctx) -> Vec<String> {
    let unlocked = ctx.prefs.get_int_or(LAST_UNLOCKED_LEVEL, 0);
    let mut lines = vec![if unlocked > 0 {
        format!("Unlocked up to level {unlocked}")
    } else {
        "No levels finished yet".to_string()
    }];
    lines.push(String::new());
    for level in 1..=ctx.levels.last() {
        if ctx.levels.exists(level) {
            lines.push(format!("Level {level}: {}", stored_score(&*ctx.prefs, level)));
        }
    }
    lines
}

fn return_to_title(world: &mut WorldState) {
    world.menu_panel = MenuPanel::None;
    world.current_question = None;
    world.set_phase(Phase::Title);
}

/// Per-phase key handling. Returns true to quit.
fn handle_meta(world: &mut WorldState, ctx: &mut Ctx, kb: &InputState, gp: &GamepadState) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let cancel = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();
    let up = kb.any_pressed(KEYS_UP) || gp.up_pressed();
    let down = kb.any_pressed(KEYS_DOWN) || gp.down_pressed();

    match world.phase {
        Phase::Title => {
            if world.menu_panel != MenuPanel::None {
                if confirm || cancel {
                    world.menu_panel = MenuPanel::None;
                }
                return false;
            }
            if kb.any_pressed(KEYS_QUIT) || cancel {
                return true;
            }
            if up || down {
                let n = MENU_ITEMS.len();
                world.menu_cursor = if up { (world.menu_cursor + n - 1) % n } else { (world.menu_cursor + 1) % n };
                play(ctx, SoundEngine::play_blip);
            }
            if confirm {
                match MENU_ITEMS[world.menu_cursor] {
                    "Play" => play_from_menu(world, ctx),
                    "Profile" => {
                        world.profile = profile_lines(ctx);
                        world.toggle_menu_panel(MenuPanel::Profile);
                    }
                    "Instructions" => world.toggle_menu_panel(MenuPanel::Instructions),
                    _ => return true,
                }
            }
        }
        Phase::Material => {
            if confirm {
                step::resume_play(world);
            } else if cancel {
                return_to_title(world);
            }
        }
        Phase::Playing => {
            if cancel {
                return_to_title(world);
            }
        }
        Phase::Quiz => {
            if up {
                world.answer_cursor = (world.answer_cursor + ANSWER_COUNT - 1) % ANSWER_COUNT;
            }
            if down {
                world.answer_cursor = (world.answer_cursor + 1) % ANSWER_COUNT;
            }
            let chosen = KEYS_ANSWER
                .iter()
                .position(|k| kb.was_pressed(*k))
                .or_else(|| gp.answer_pressed())
                .or_else(|| confirm.then_some(world.answer_cursor));
            if let Some(index) = chosen {
                world.answer_cursor = index;
                let events = step::select_answer(world, index);
                route_events(world, ctx, &events);
            }
        }
        Phase::Feedback { .. } => {
            if confirm {
                step::resume_play(world);
            }
        }
        Phase::Results => {
            if kb.any_pressed(KEYS_NEXT) || confirm {
                next_level(world, ctx);
            } else if kb.any_pressed(KEYS_MENU) || cancel {
                return_to_title(world);
            }
        }
        Phase::AverageScore => {
            if confirm || cancel {
                world.average = None;
                return_to_title(world);
            }
        }
    }
    false
}
