// src/render/mod.rs

pub mod dump;
pub mod line_protocol;

pub use dump::dump;
pub use line_protocol::render;
