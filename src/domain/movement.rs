/// Player movement and jump state machine.
///
/// One `tick` per simulation step:
///
/// | Phase         | Trigger                  | Next          |
/// |---------------|--------------------------|---------------|
/// | Grounded      | jump request             | PrepareToJump |
/// | PrepareToJump | unconditional, same tick | Jumping       |
/// | Jumping       | ground contact lost      | InFlight      |
/// | InFlight      | ground contact regained  | Landed        |
/// | Landed        | unconditional, next tick | Grounded      |
///
/// A jump request moves Grounded → PrepareToJump immediately; the next
/// `tick` turns it into Jumping and launches. A stop-jump request is
/// sampled: it cuts upward velocity once, in the velocity pass of the
/// next tick, and then clears.
///
/// Velocities are owned here. The physics body only asks this type to
/// apply gravity and to zero velocity on contact.

/// Input below this magnitude keeps the previous facing.
pub const FACING_DEAD_ZONE: f32 = 0.01;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpPhase {
    Grounded,
    PrepareToJump,
    Jumping,
    InFlight,
    Landed,
}

impl JumpPhase {
    /// Phases a single transition may lead to from `self`.
    pub fn successors(self) -> &'static [JumpPhase] {
        match self {
            JumpPhase::Grounded => &[JumpPhase::PrepareToJump],
            JumpPhase::PrepareToJump => &[JumpPhase::Jumping],
            JumpPhase::Jumping => &[JumpPhase::InFlight],
            JumpPhase::InFlight => &[JumpPhase::Landed],
            JumpPhase::Landed => &[JumpPhase::Grounded],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Discrete events for audio/animation collaborators.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MovementEvent {
    PlayerJumped,
    PlayerLanded,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementParams {
    pub max_speed: f32,
    pub jump_takeoff_speed: f32,
    pub jump_modifier: f32,
    /// Factor (< 1) applied to upward velocity on a stop-jump request.
    pub jump_deceleration: f32,
}

impl Default for MovementParams {
    fn default() -> Self {
        MovementParams {
            max_speed: 7.0,
            jump_takeoff_speed: 7.0,
            jump_modifier: 1.5,
            jump_deceleration: 0.5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlayerMovement {
    pub params: MovementParams,
    phase: JumpPhase,
    horizontal_input: f32,
    horizontal_velocity: f32,
    vertical_velocity: f32,
    facing: Facing,
    /// Raised by PrepareToJump → Jumping, consumed by the velocity pass.
    jump: bool,
    stop_jump: bool,
    pub control_enabled: bool,
}

impl PlayerMovement {
    pub fn new(params: MovementParams) -> Self {
        PlayerMovement {
            params,
            phase: JumpPhase::Grounded,
            horizontal_input: 0.0,
            horizontal_velocity: 0.0,
            vertical_velocity: 0.0,
            facing: Facing::Right,
            jump: false,
            stop_jump: false,
            control_enabled: true,
        }
    }

    // ── Reads ──

    pub fn phase(&self) -> JumpPhase { self.phase }
    pub fn facing(&self) -> Facing { self.facing }
    pub fn horizontal_input(&self) -> f32 { self.horizontal_input }
    pub fn horizontal_velocity(&self) -> f32 { self.horizontal_velocity }
    pub fn vertical_velocity(&self) -> f32 { self.vertical_velocity }

    // ── Requests (edge events from the input layer) ──

    pub fn request_jump(&mut self) {
        if self.control_enabled && self.phase == JumpPhase::Grounded {
            self.phase = JumpPhase::PrepareToJump;
        }
    }

    pub fn request_stop_jump(&mut self) {
        if self.control_enabled {
            self.stop_jump = true;
        }
    }

    /// Halt horizontal motion, e.g. when a quiz panel opens.
    pub fn stop_moving(&mut self) {
        self.horizontal_input = 0.0;
        self.horizontal_velocity = 0.0;
    }

    // ── Tick ──

    /// Advance one simulation step. `grounded` is the contact fact from
    /// the most recent physics pass.
    pub fn tick(&mut self, horizontal_input: f32, grounded: bool) -> Vec<MovementEvent> {
        if self.control_enabled {
            self.horizontal_input = if horizontal_input.is_finite() {
                horizontal_input.clamp(-1.0, 1.0)
            } else {
                0.0
            };
        }

        let before = self.phase;
        let events = self.update_phase(grounded);
        debug_assert!(self.phase == before || before.successors().contains(&self.phase));
        self.compute_velocity(grounded);
        events
    }

    fn update_phase(&mut self, grounded: bool) -> Vec<MovementEvent> {
        let mut events = Vec::new();
        self.jump = false;
        match self.phase {
            JumpPhase::Grounded => {}
            JumpPhase::PrepareToJump => {
                self.phase = JumpPhase::Jumping;
                self.jump = true;
                self.stop_jump = false;
            }
            JumpPhase::Jumping => {
                if !grounded {
                    events.push(MovementEvent::PlayerJumped);
                    self.phase = JumpPhase::InFlight;
                }
            }
            JumpPhase::InFlight => {
                if grounded {
                    events.push(MovementEvent::PlayerLanded);
                    self.phase = JumpPhase::Landed;
                }
            }
            JumpPhase::Landed => {
                self.phase = JumpPhase::Grounded;
            }
        }
        events
    }

    fn compute_velocity(&mut self, grounded: bool) {
        if self.jump && grounded {
            self.vertical_velocity = self.params.jump_takeoff_speed * self.params.jump_modifier;
            self.jump = false;
        } else if self.stop_jump {
            self.stop_jump = false;
            if self.vertical_velocity > 0.0 {
                self.vertical_velocity *= self.params.jump_deceleration;
            }
        }

        if self.horizontal_input > FACING_DEAD_ZONE {
            self.facing = Facing::Right;
        } else if self.horizontal_input < -FACING_DEAD_ZONE {
            self.facing = Facing::Left;
        }

        self.horizontal_velocity = self.horizontal_input * self.params.max_speed;
    }

    // ── Physics hooks ──

    /// Integrate gravity for `dt` seconds, capped at `terminal` fall speed.
    pub fn apply_gravity(&mut self, gravity: f32, terminal: f32, dt: f32) {
        self.vertical_velocity = (self.vertical_velocity - gravity * dt).max(-terminal);
    }

    pub fn hit_floor(&mut self) {
        if self.vertical_velocity < 0.0 {
            self.vertical_velocity = 0.0;
        }
    }

    pub fn hit_ceiling(&mut self) {
        if self.vertical_velocity > 0.0 {
            self.vertical_velocity = 0.0;
        }
    }

    pub fn hit_wall(&mut self) {
        self.horizontal_velocity = 0.0;
    }

    /// Back to rest at a spawn point.
    pub fn reset(&mut self) {
        let params = self.params;
        let control = self.control_enabled;
        *self = PlayerMovement::new(params);
        self.control_enabled = control;
    }

    #[cfg(test)]
    pub(crate) fn set_vertical_velocity(&mut self, vy: f32) {
        self.vertical_velocity = vy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> PlayerMovement {
        PlayerMovement::new(MovementParams::default())
    }

    #[test]
    fn jump_request_prepares_and_launches_on_next_tick() {
        let mut m = machine();
        m.request_jump();
        assert_eq!(m.phase(), JumpPhase::PrepareToJump);

        let events = m.tick(0.0, true);
        assert!(events.is_empty());
        assert_eq!(m.phase(), JumpPhase::Jumping);
        assert!((m.vertical_velocity() - 10.5).abs() < 1e-5);
    }

    #[test]
    fn leaving_ground_emits_jumped_then_landing_emits_landed() {
        let mut m = machine();
        m.request_jump();
        m.tick(0.0, true);

        // Still touching the ground: stays Jumping.
        assert!(m.tick(0.0, true).is_empty());
        assert_eq!(m.phase(), JumpPhase::Jumping);

        assert_eq!(m.tick(0.0, false), vec![MovementEvent::PlayerJumped]);
        assert_eq!(m.phase(), JumpPhase::InFlight);

        assert!(m.tick(0.0, false).is_empty());
        assert_eq!(m.phase(), JumpPhase::InFlight);

        assert_eq!(m.tick(0.0, true), vec![MovementEvent::PlayerLanded]);
        assert_eq!(m.phase(), JumpPhase::Landed);

        assert!(m.tick(0.0, true).is_empty());
        assert_eq!(m.phase(), JumpPhase::Grounded);
    }

    #[test]
    fn jump_request_ignored_unless_grounded_or_controlled() {
        let mut m = machine();
        m.request_jump();
        m.tick(0.0, true);
        m.request_jump();
        assert_eq!(m.phase(), JumpPhase::Jumping);

        let mut locked = machine();
        locked.control_enabled = false;
        locked.request_jump();
        assert_eq!(locked.phase(), JumpPhase::Grounded);
    }

    #[test]
    fn stop_jump_cuts_velocity_once() {
        let mut m = machine();
        m.set_vertical_velocity(10.0);
        m.request_stop_jump();
        m.tick(0.0, false);
        assert!((m.vertical_velocity() - 5.0).abs() < 1e-5);

        m.tick(0.0, false);
        assert!((m.vertical_velocity() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn stop_jump_does_not_touch_falling_velocity() {
        let mut m = machine();
        m.set_vertical_velocity(-4.0);
        m.request_stop_jump();
        m.tick(0.0, false);
        assert!((m.vertical_velocity() + 4.0).abs() < 1e-5);
    }

    #[test]
    fn stop_request_before_launch_is_discarded() {
        let mut m = machine();
        m.request_jump();
        m.request_stop_jump();
        m.tick(0.0, true);
        assert!((m.vertical_velocity() - 10.5).abs() < 1e-5);
    }

    #[test]
    fn facing_keeps_last_direction_inside_dead_zone() {
        let mut m = machine();
        m.tick(-0.5, true);
        assert_eq!(m.facing(), Facing::Left);
        m.tick(0.005, true);
        assert_eq!(m.facing(), Facing::Left);
        m.tick(0.0, true);
        assert_eq!(m.facing(), Facing::Left);
        m.tick(0.02, true);
        assert_eq!(m.facing(), Facing::Right);
    }

    #[test]
    fn horizontal_velocity_tracks_input_times_max_speed() {
        let mut m = machine();
        m.tick(0.5, true);
        assert!((m.horizontal_velocity() - 3.5).abs() < 1e-5);
        m.tick(3.0, true);
        assert!((m.horizontal_velocity() - 7.0).abs() < 1e-5);
        m.stop_moving();
        assert_eq!(m.horizontal_velocity(), 0.0);
        assert_eq!(m.horizontal_input(), 0.0);
    }

    #[test]
    fn phase_never_skips_a_state() {
        let mut m = machine();
        // Deterministic pseudo-random input pattern.
        let mut seed: u32 = 0x9e37_79b9;
        for _ in 0..2000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let before = m.phase();
            if seed & 0x1 == 0 {
                m.request_jump();
            }
            let after_request = m.phase();
            assert!(after_request == before || before.successors().contains(&after_request));

            if seed & 0x2 == 0 {
                m.request_stop_jump();
            }
            let grounded = seed & 0x4 == 0;
            m.tick(0.0, grounded);
            let after = m.phase();
            assert!(
                after == after_request || after_request.successors().contains(&after),
                "{after_request:?} -> {after:?}"
            );
            assert!(!(before == JumpPhase::Grounded && after == JumpPhase::InFlight));
        }
    }

    #[test]
    fn gravity_and_contacts() {
        let mut m = machine();
        m.apply_gravity(20.0, 5.0, 0.1);
        assert!((m.vertical_velocity() + 2.0).abs() < 1e-5);
        for _ in 0..10 {
            m.apply_gravity(20.0, 5.0, 0.1);
        }
        assert!((m.vertical_velocity() + 5.0).abs() < 1e-5);
        m.hit_floor();
        assert_eq!(m.vertical_velocity(), 0.0);

        m.set_vertical_velocity(3.0);
        m.hit_floor();
        assert!((m.vertical_velocity() - 3.0).abs() < 1e-5);
        m.hit_ceiling();
        assert_eq!(m.vertical_velocity(), 0.0);
    }
}
