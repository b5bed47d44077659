pub mod input;
pub mod movement;
pub mod physics;
pub mod question;
pub mod quiz;
pub mod tile;
pub mod trigger;
