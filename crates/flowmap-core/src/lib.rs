pub mod models;
pub mod services;
pub mod archetypes;
pub mod loader;
pub mod scorer;
pub mod refine;
pub mod dns;
pub mod report;
pub mod export;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
