pub mod align;
pub mod chain;
pub mod config;
pub mod intervals;
pub mod liftover;
pub mod runner;
pub mod utils;
