pub mod config;
pub mod deploy;
pub mod log;
pub mod process;
pub mod testing;
