pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod shutdown;
pub mod sources;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
