/// Gamepad input tracker using gilrs. This is the "action" input channel.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Horizontal axis, menu navigation
///   A / B                 →  Jump
///   A / B / X / Y         →  Answers 1-4 on the quiz panel
///   Start                 →  Confirm
///   Select                →  Cancel / back to menu
///
/// The axis reports `InputError::Unavailable` until a pad is seen and
/// `InputError::Disconnected` after one drops, so the sim can fall back
/// to the legacy channel.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use log::{info, warn};

use crate::config::GamepadConfig;
use crate::domain::input::InputError;

const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER" => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

const BTN_COUNT: usize = 8;

/// Answer slot for each face button, in panel order.
const ANSWER_BUTTONS: [Btn; 4] = [Btn::A, Btn::B, Btn::X, Btn::Y];

/// Per-button state: held (continuous) plus press/release edges.
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
    just_released: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held { self.just_pressed = true; }
        if !held && self.held { self.just_released = true; }
        self.held = held;
    }

    fn clear_edges(&mut self) {
        self.just_pressed = false;
        self.just_released = false;
    }
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    jump: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump: vec![Btn::A, Btn::B],
            confirm: vec![Btn::Start],
            cancel: vec![Btn::Select],
        }
    }
}

/// Whether a pad has been seen, and whether it is still there.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PadLink {
    Absent,
    Connected,
    Lost,
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    dpad_up: BtnState,
    dpad_down: BtnState,
    dpad_left: BtnState,
    dpad_right: BtnState,
    stick_up: BtnState,
    stick_down: BtnState,
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,
    link: PadLink,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, link) = match Gilrs::new() {
            Ok(g) => {
                let link = if g.gamepads().next().is_some() { PadLink::Connected } else { PadLink::Absent };
                (Some(g), link)
            }
            Err(e) => {
                warn!("gamepad support unavailable: {e}");
                (None, PadLink::Absent)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let link = PadLink::Absent;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad_up: BtnState::default(),
            dpad_down: BtnState::default(),
            dpad_left: BtnState::default(),
            dpad_right: BtnState::default(),
            stick_up: BtnState::default(),
            stick_down: BtnState::default(),
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            link,
        }
    }

    /// Load button mapping from config. Empty or unknown lists keep the
    /// defaults.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        let jump = parse_list(&cfg.jump);
        if !jump.is_empty() { map.jump = jump; }
        let confirm = parse_list(&cfg.confirm);
        if !confirm.is_empty() { map.confirm = confirm; }
        let cancel = parse_list(&cfg.cancel);
        if !cancel.is_empty() { map.cancel = cancel; }
    }

    pub fn update(&mut self) {
        self.clear_edges();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();

        let (up, down) = (self.stick_y > STICK_DEADZONE, self.stick_y < -STICK_DEADZONE);
        self.stick_up.set(up);
        self.stick_down.set(down);
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = &mut self.gilrs else { return };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.link = PadLink::Connected;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.link = PadLink::Connected;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.link = PadLink::Connected;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    info!("gamepad connected");
                    self.link = PadLink::Connected;
                }
                EventType::Disconnected => {
                    warn!("gamepad disconnected");
                    self.link = PadLink::Lost;
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        match gilrs_btn {
            Button::DPadUp => self.dpad_up.set(held),
            Button::DPadDown => self.dpad_down.set(held),
            Button::DPadLeft => self.dpad_left.set(held),
            Button::DPadRight => self.dpad_right.set(held),
            other => {
                if let Some(btn) = Btn::from_gilrs(other) {
                    self.buttons[btn as usize].set(held);
                }
            }
        }
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    /// Horizontal axis of the action channel.
    pub fn axis(&self) -> Result<f32, InputError> {
        link_axis(
            self.link,
            axis_value(self.stick_x, self.dpad_left.held, self.dpad_right.held),
        )
    }

    pub fn jump_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.jump)
    }

    pub fn jump_released(&self) -> bool {
        self.action_map.jump.iter().any(|&b| self.buttons[b as usize].just_released)
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.confirm)
    }

    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cancel)
    }

    /// Answer slot of a face button pressed this frame.
    pub fn answer_pressed(&self) -> Option<usize> {
        ANSWER_BUTTONS.iter().position(|&b| self.buttons[b as usize].just_pressed)
    }

    pub fn up_pressed(&self) -> bool {
        self.dpad_up.just_pressed || self.stick_up.just_pressed
    }

    pub fn down_pressed(&self) -> bool {
        self.dpad_down.just_pressed || self.stick_down.just_pressed
    }

    // ── Internal ──

    fn clear_edges(&mut self) {
        for b in &mut self.buttons { b.clear_edges(); }
        for b in [
            &mut self.dpad_up,
            &mut self.dpad_down,
            &mut self.dpad_left,
            &mut self.dpad_right,
            &mut self.stick_up,
            &mut self.stick_down,
        ] {
            b.clear_edges();
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad_up = BtnState::default();
        self.dpad_down = BtnState::default();
        self.dpad_left = BtnState::default();
        self.dpad_right = BtnState::default();
        self.stick_up = BtnState::default();
        self.stick_down = BtnState::default();
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

/// Stick value with the deadzone applied; a held d-pad direction wins.
fn axis_value(stick_x: f32, dpad_left: bool, dpad_right: bool) -> f32 {
    match (dpad_left, dpad_right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ if stick_x.abs() < STICK_DEADZONE => 0.0,
        _ => stick_x.clamp(-1.0, 1.0),
    }
}

fn link_axis(link: PadLink, value: f32) -> Result<f32, InputError> {
    match link {
        PadLink::Connected => Ok(value),
        PadLink::Absent => Err(InputError::Unavailable),
        PadLink::Lost => Err(InputError::Disconnected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a", Some(Btn::A))]
    #[case("North", Some(Btn::Y))]
    #[case("BACK", Some(Btn::Select))]
    #[case("Turbo", None)]
    fn button_names(#[case] name: &str, #[case] expected: Option<Btn>) {
        assert_eq!(Btn::from_name(name), expected);
    }

    #[rstest]
    #[case(0.1, false, false, 0.0)]
    #[case(-0.8, false, false, -0.8)]
    #[case(0.2, true, false, -1.0)]
    #[case(-0.9, false, true, 1.0)]
    #[case(1.4, false, false, 1.0)]
    fn deadzone_and_dpad(#[case] stick: f32, #[case] l: bool, #[case] r: bool, #[case] expected: f32) {
        assert_eq!(axis_value(stick, l, r), expected);
    }

    #[test]
    fn axis_errors_follow_link_state() {
        assert_eq!(link_axis(PadLink::Connected, 0.5), Ok(0.5));
        assert_eq!(link_axis(PadLink::Absent, 0.5), Err(InputError::Unavailable));
        assert_eq!(link_axis(PadLink::Lost, 0.5), Err(InputError::Disconnected));
    }

    #[test]
    fn button_edges_fire_once() {
        let mut b = BtnState::default();
        b.set(true);
        assert!(b.just_pressed && b.held);
        b.clear_edges();
        b.set(true);
        assert!(!b.just_pressed);
        b.set(false);
        assert!(b.just_released && !b.held);
    }

    #[test]
    fn config_overrides_mapping_and_ignores_unknown_names() {
        let mut pad = GamepadState::new();
        pad.load_button_config(&GamepadConfig {
            jump: vec!["X".into()],
            confirm: vec!["nope".into()],
            cancel: vec![],
        });
        assert_eq!(pad.action_map.jump, vec![Btn::X]);
        assert_eq!(pad.action_map.confirm, vec![Btn::Start]);
        assert_eq!(pad.action_map.cancel, vec![Btn::Select]);

        pad.buttons[Btn::X as usize].set(true);
        assert!(pad.jump_pressed());
        assert_eq!(pad.answer_pressed(), Some(2));
    }
}
