//! Paged rendering through an external engine.

mod engine;

pub use engine::{EnginePageRenderer, DEFAULT_ENGINE_ARGS};
