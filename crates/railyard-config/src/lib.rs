pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// デプロイファイルを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "RAILYARD_CONFIG";

const CANDIDATES: [&str; 4] = [
    "deploy.local.kdl",
    ".deploy.local.kdl",
    "deploy.kdl",
    ".deploy.kdl",
];

/// グローバル設定ディレクトリ（`~/.config/railyard`）
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("railyard"))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// カレントディレクトリ用の deploy.kdl を探す
///
/// 検索順序:
/// 1. `RAILYARD_CONFIG`（明示パス、存在必須）
/// 2. カレントディレクトリ: deploy.local.kdl, .deploy.local.kdl, deploy.kdl, .deploy.kdl
/// 3. `./.railyard/` 内の同じファイル名
/// 4. `~/.config/railyard/deploy.kdl`
pub fn find_deploy_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_deploy_file_from(&current_dir)
}

/// 指定ディレクトリを起点にした [`find_deploy_file`]
pub fn find_deploy_file_from(start: &Path) -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&config_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::ExplicitPathMissing(config_path));
    }

    if let Some(path) = first_existing(start) {
        return Ok(path);
    }

    let dot_dir = start.join(".railyard");
    if dot_dir.is_dir()
        && let Some(path) = first_existing(&dot_dir)
    {
        return Ok(path);
    }

    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join("deploy.kdl");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::DeployFileNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}
