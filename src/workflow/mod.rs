pub mod aggregate;
pub mod classify;
pub mod collect;
pub mod engine;
pub mod resolve;
pub mod state;

pub use engine::QueryEngine;
