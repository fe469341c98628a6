pub mod ai;
pub mod controller;
pub mod entity;
pub mod map;
pub mod physics;
pub mod pickup;
pub mod platform;
pub mod tile;
pub mod wind;
