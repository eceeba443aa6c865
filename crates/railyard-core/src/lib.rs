//! railyard コア
//!
//! デプロイ設定モデル、`deploy.kdl` のパース、ロール/ターゲット解決、
//! 設定テンプレート。ここは副作用を持たず、リモート操作は
//! `railyard-remote` と `railyard-deploy` が担う。

pub mod error;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod template;

pub use error::{CoreError, Result};
pub use model::*;
pub use parser::{parse_deploy_file, parse_deploy_str};
pub use resolver::{HostFilter, all_addresses, resolve_targets};
pub use template::{
    DatabasePassword, RenderedTemplate, render, render_database_config, render_unicorn_config,
};
