//! データモデル

mod config;
mod host;

pub use config::*;
pub use host::{Environment, Host, Role};
