pub mod event;
pub mod level;
pub mod step;
pub mod timer;
pub mod world;
