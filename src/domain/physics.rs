/// Kinematic body for the player.
///
/// The body is a 1×1 box in tile units. Screen/tile y grows downward,
/// while the movement state machine treats positive vertical velocity as
/// "rising", so a step moves the box by `-vy * dt` on the y axis.
///
/// Per step:
///   1. gravity (through the state machine)
///   2. horizontal move + wall resolution
///   3. vertical move + floor/ceiling resolution
///   4. ground sensing: the "is grounded" fact for the next tick

use super::movement::PlayerMovement;
use super::tile::TileMap;

/// Overlap tolerance when mapping box edges to tile indices.
const EDGE_EPS: f32 = 1e-4;
/// A body whose feet are within this distance of a floor is grounded.
const GROUND_EPS: f32 = 0.02;
/// Largest displacement per sub-step; keeps fast bodies from tunnelling.
const MAX_SUBSTEP: f32 = 0.45;

#[derive(Clone, Copy, Debug)]
pub struct PhysicsEnv {
    pub gravity: f32,
    pub terminal_velocity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub grounded: bool,
}

/// Axis-aligned box, used for trigger overlap tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Aabb {
    pub fn cell(x: usize, y: usize) -> Self {
        Aabb { x: x as f32, y: y as f32, w: 1.0, h: 1.0 }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

impl Body {
    pub fn new(x: f32, y: f32) -> Self {
        Body { x, y, grounded: false }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb { x: self.x, y: self.y, w: 1.0, h: 1.0 }
    }

    /// Tile column the body is mostly in (for rendering).
    pub fn cell(&self) -> (i32, i32) {
        ((self.x + 0.5).floor() as i32, (self.y + 0.5).floor() as i32)
    }

    pub fn integrate(
        &mut self,
        movement: &mut PlayerMovement,
        map: &TileMap,
        env: &PhysicsEnv,
        dt: f32,
    ) {
        movement.apply_gravity(env.gravity, env.terminal_velocity, dt);

        let dx = movement.horizontal_velocity() * dt;
        let dy = -movement.vertical_velocity() * dt;
        let steps = (dx.abs().max(dy.abs()) / MAX_SUBSTEP).ceil().max(1.0) as u32;
        let (sx, sy) = (dx / steps as f32, dy / steps as f32);

        for _ in 0..steps {
            if sx != 0.0 && self.move_x(sx, map) {
                movement.hit_wall();
                break;
            }
        }
        for _ in 0..steps {
            if sy != 0.0 && self.move_y(sy, map, movement) {
                break;
            }
        }

        self.grounded = self.sense_ground(map);
    }

    /// Returns true when a wall stopped the move.
    fn move_x(&mut self, dx: f32, map: &TileMap) -> bool {
        let nx = self.x + dx;
        let (row0, row1) = span(self.y);
        if dx > 0.0 {
            let col = (nx + 1.0 - EDGE_EPS).floor() as i32;
            if (row0..=row1).any(|r| map.solid(col, r)) {
                self.x = col as f32 - 1.0;
                return true;
            }
        } else {
            let col = nx.floor() as i32;
            if (row0..=row1).any(|r| map.solid(col, r)) {
                self.x = col as f32 + 1.0;
                return true;
            }
        }
        self.x = nx;
        false
    }

    /// Returns true when a floor or ceiling stopped the move.
    fn move_y(&mut self, dy: f32, map: &TileMap, movement: &mut PlayerMovement) -> bool {
        let ny = self.y + dy;
        let (col0, col1) = span(self.x);
        if dy > 0.0 {
            let row = (ny + 1.0 - EDGE_EPS).floor() as i32;
            if (col0..=col1).any(|c| map.solid(c, row)) {
                self.y = row as f32 - 1.0;
                movement.hit_floor();
                return true;
            }
        } else {
            let row = ny.floor() as i32;
            if (col0..=col1).any(|c| map.solid(c, row)) {
                self.y = row as f32 + 1.0;
                movement.hit_ceiling();
                return true;
            }
        }
        self.y = ny;
        false
    }

    /// Solid tile directly under the feet?
    pub fn sense_ground(&self, map: &TileMap) -> bool {
        let feet = self.y + 1.0;
        let row = feet.round();
        if (feet - row).abs() > GROUND_EPS {
            return false;
        }
        let (col0, col1) = span(self.x);
        (col0..=col1).any(|c| map.solid(c, row as i32))
    }
}

/// Tile indices covered by a unit-length span starting at `start`.
fn span(start: f32) -> (i32, i32) {
    (
        (start + EDGE_EPS).floor() as i32,
        (start + 1.0 - EDGE_EPS).floor() as i32,
    )
}
