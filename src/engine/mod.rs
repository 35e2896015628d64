// Engine module - character controller and the pieces it drives

pub mod animation;
pub mod camera;
pub mod components;
pub mod config;
pub mod controller;
pub mod hud;
pub mod input;
pub mod locomotion;
pub mod mining;
pub mod proximity;
pub mod scene;

// Re-export commonly used items
pub use components::*;
