pub mod config;
pub mod engine;
pub mod generator;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod template;
pub mod translate;
