pub mod config;
pub mod logging;
pub mod roster;
pub mod upstream;
