/// WorldState: everything a running game needs between frames.
///
/// ## Ownership
///
/// The world owns the level layout, the player body and its movement
/// state machine, the level's triggers and the one `QuizSession` of the
/// process. Nothing here is global; the loop passes `&mut WorldState`.
///
/// ## Camera / Viewport
///
/// World coordinates and screen coordinates are separate:
///   - `camera`: viewport into the world (top-left corner + size)
///   - Renderer maps: `screen(sx, sy) = world(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead-zone approach
///   - Maps smaller than the viewport are centered

use crate::config::GameConfig;
use crate::domain::movement::PlayerMovement;
use crate::domain::physics::{Body, PhysicsEnv};
use crate::domain::question::{QuestionBank, QuizQuestion};
use crate::domain::quiz::QuizSession;
use crate::domain::tile::{Tile, TileMap};
use crate::domain::trigger::{FinishTrigger, QuizTrigger};
use crate::sim::progress::LevelResult;

/// Which screen is up. Only `Playing` runs the simulation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Material,
    Playing,
    Quiz,
    Feedback { correct: bool },
    Results,
    AverageScore,
}

impl Phase {
    /// Screens drawn as a popup panel (and therefore animated on open).
    pub fn is_panel(self) -> bool {
        !matches!(self, Phase::Title | Phase::Playing)
    }
}

/// Side panels of the main menu. At most one is open.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MenuPanel {
    None,
    Profile,
    Instructions,
}

pub const MENU_ITEMS: [&str; 4] = ["Play", "Profile", "Instructions", "Quit"];

/// Camera: a viewport into the world.
///
/// `(x, y)` is the world coordinate of the top-left visible cell.
/// `(view_w, view_h)` is how many world cells fit in the viewport.
/// These are computed from terminal size and set during `render()`.
#[derive(Clone, Debug)]
pub struct Camera {
    pub x: i32,
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera { x: 0, y: 0, view_w: 0, view_h: 0 }
    }

    /// Follow a target with a dead zone of 20% on each side; scroll only
    /// when the target leaves the inner area.
    pub fn follow(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target_x, self.view_w, world_w);
        self.y = follow_axis(self.y, target_y, self.view_h, world_h);
    }

    /// Snap to center on a position. Used on level load and respawn.
    pub fn center_on(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target_x, self.view_w, world_w);
        self.y = center_axis(target_y, self.view_h, world_h);
    }
}

fn follow_axis(pos: i32, target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    let margin = view as i32 / 5;
    let low = pos + margin;
    let high = pos + view as i32 - margin - 1;
    let moved = if target < low {
        target - margin
    } else if target > high {
        target - view as i32 + margin + 1
    } else {
        pos
    };
    moved.max(0).min(world as i32 - view as i32)
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    (target - view as i32 / 2).max(0).min(world as i32 - view as i32)
}

pub struct WorldState {
    // ── Level layout ──
    pub tiles: Vec<Vec<Tile>>,
    pub width: usize,
    pub height: usize,
    pub spawn: (usize, usize),
    pub level: usize,
    pub level_name: String,
    pub material: Vec<String>,

    // ── Player ──
    pub body: Body,
    pub movement: PlayerMovement,
    pub physics: PhysicsEnv,

    // ── Quiz ──
    pub quizzes: Vec<QuizTrigger>,
    pub finish: Option<FinishTrigger>,
    pub session: QuizSession,
    pub bank: QuestionBank,
    /// Bank index of the question on screen (Quiz / Feedback).
    pub current_question: Option<usize>,
    pub answer_cursor: usize,
    pub last_result: Option<LevelResult>,
    /// (level, stored score) rows plus the mean, for the average panel.
    pub average: Option<(Vec<(usize, i64)>, f32)>,

    // ── Presentation ──
    pub phase: Phase,
    pub menu_cursor: usize,
    pub menu_panel: MenuPanel,
    /// Progress lines for the profile panel, filled when it opens.
    pub profile: Vec<String>,
    /// Render ticks since the current popup opened.
    pub panel_tick: u32,
    pub tick: u64,
    pub anim_tick: u32,
    pub message: String,
    pub message_timer: u32,
    pub camera: Camera,
}

// ── Construction ──

impl WorldState {
    pub fn new(config: &GameConfig, bank: QuestionBank) -> Self {
        WorldState {
            tiles: vec![],
            width: 0,
            height: 0,
            spawn: (0, 0),
            level: 0,
            level_name: String::new(),
            material: vec![],
            body: Body::new(0.0, 0.0),
            movement: PlayerMovement::new(config.movement),
            physics: PhysicsEnv {
                gravity: config.gravity,
                terminal_velocity: config.terminal_velocity,
            },
            quizzes: vec![],
            finish: None,
            session: QuizSession::new(config.quiz.table.clone(), config.quiz.max_score),
            bank,
            current_question: None,
            answer_cursor: 0,
            last_result: None,
            average: None,
            phase: Phase::Title,
            menu_cursor: 0,
            menu_panel: MenuPanel::None,
            profile: vec![],
            panel_tick: 0,
            tick: 0,
            anim_tick: 0,
            message: String::new(),
            message_timer: 0,
            camera: Camera::new(),
        }
    }
}

// ── Queries / transitions ──

impl WorldState {
    pub fn map(&self) -> TileMap<'_> {
        TileMap::new(&self.tiles)
    }

    pub fn question(&self) -> Option<&QuizQuestion> {
        self.current_question.and_then(|i| self.bank.get(i))
    }

    /// Switch screens. Panel screens restart their popup animation.
    pub fn set_phase(&mut self, phase: Phase) {
        if phase.is_panel() && phase != self.phase {
            self.panel_tick = 0;
        }
        self.phase = phase;
    }

    /// Toggle a main-menu side panel; opening one closes the other.
    pub fn toggle_menu_panel(&mut self, panel: MenuPanel) {
        if self.menu_panel == panel {
            self.menu_panel = MenuPanel::None;
        } else {
            self.menu_panel = panel;
            self.panel_tick = 0;
        }
    }

    /// Put the player back at the level spawn, at rest.
    pub fn respawn(&mut self) {
        self.body = Body::new(self.spawn.0 as f32, self.spawn.1 as f32);
        self.body.grounded = self.body.sense_ground(&TileMap::new(&self.tiles));
        self.movement.reset();
        let (cx, cy) = self.body.cell();
        self.camera.center_on(cx, cy, self.width, self.height);
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Count down the status message; clears it when the timer runs out.
    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_centers_small_maps_and_clamps_large_ones() {
        let mut cam = Camera::new();
        cam.view_w = 20;
        cam.view_h = 10;
        cam.center_on(3, 3, 10, 6);
        assert_eq!((cam.x, cam.y), (-5, -2));

        cam.center_on(2, 2, 100, 40);
        assert_eq!((cam.x, cam.y), (0, 0));
        cam.center_on(99, 39, 100, 40);
        assert_eq!((cam.x, cam.y), (80, 30));
    }

    #[test]
    fn camera_follow_has_dead_zone() {
        let mut cam = Camera::new();
        cam.view_w = 20;
        cam.view_h = 10;
        cam.center_on(10, 5, 100, 10);
        let start = cam.x;
        cam.follow(12, 5, 100, 10);
        assert_eq!(cam.x, start);
        cam.follow(30, 5, 100, 10);
        assert!(cam.x > start);
        assert_eq!(30 - cam.x, 15);
    }

    #[test]
    fn panel_phases_restart_animation() {
        let mut w = WorldState::new(&GameConfig::default(), QuestionBank::embedded());
        w.panel_tick = 9;
        w.set_phase(Phase::Playing);
        assert_eq!(w.panel_tick, 9);
        w.set_phase(Phase::Quiz);
        assert_eq!(w.panel_tick, 0);

        w.toggle_menu_panel(MenuPanel::Profile);
        assert_eq!(w.menu_panel, MenuPanel::Profile);
        w.toggle_menu_panel(MenuPanel::Instructions);
        assert_eq!(w.menu_panel, MenuPanel::Instructions);
        w.toggle_menu_panel(MenuPanel::Instructions);
        assert_eq!(w.menu_panel, MenuPanel::None);
    }
}
