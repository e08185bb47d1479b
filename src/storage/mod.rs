pub mod bitcask;
pub mod catalog;
pub mod engine;
pub mod memory;

pub use catalog::{Catalog, EngineCatalog};
pub use engine::{Engine, EngineStatus};
