//! Drag-to-spin viewer over a fixed ring of pre-rendered frames.
//!
//! - [`engine`]: rotation, input tracking, progressive loading, classification
//! - [`assets`]: frame locations and background fetching
//! - [`renderer`]: frame rasterization for the terminal
//! - [`player`]: the interactive terminal front end

pub mod assets;
pub mod config;
pub mod engine;
pub mod menubar;
pub mod player;
pub mod renderer;
pub mod types;
