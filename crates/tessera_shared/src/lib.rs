pub mod block;
pub mod block_types;
pub mod brightness;
pub mod chunk;
pub mod collision;
pub mod config;
pub mod coords;
pub mod lighting;
pub mod model;
pub mod neighborhood;
pub mod orientation;
pub mod physics;
pub mod registry;
pub mod worldgen;
