pub mod controls;
pub mod gamepad;
pub mod input;
pub mod panel;
pub mod renderer;
pub mod sound;
