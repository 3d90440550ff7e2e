pub mod config;
pub mod display;
pub mod errors;
pub mod results;
pub mod suite;
pub mod sweep;
pub mod trial;
pub mod types;
