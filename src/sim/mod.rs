pub mod event;
pub mod level;
pub mod progress;
pub mod save;
pub mod step;
pub mod world;
