//! ホスト・ロール・環境

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1回の実行で解決されたリモートホスト
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    /// ホスト名またはIPアドレス
    pub address: String,

    /// SSHポート
    pub port: u16,

    /// ログインユーザー
    pub user: String,

    /// オペレーターのSSHエージェントを転送
    pub forward_agent: bool,

    /// DB操作用ホスト（マイグレーションはここでのみ実行）
    pub database_ops: bool,

    /// リリースのチェックアウトを持たないホスト（リビジョン取得では除外）
    pub no_release: bool,
}

impl Host {
    /// ssh に渡す `user@address`
    pub fn ssh_target(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }

    /// ロール間の重複排除に使うキー
    pub fn key(&self) -> String {
        format!("{}@{}:{}", self.user, self.address, self.port)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == 22 {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// 同じデプロイ責務を持つホストの名前付きグループ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub hosts: Vec<Host>,
}

impl Role {
    pub const APP: &'static str = "app";
    pub const STORAGE: &'static str = "storage";
}

/// 名前付きの実行環境（`production`、`staging` など）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(String);

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Environment {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(address: &str, port: u16) -> Host {
        Host {
            address: address.to_string(),
            port,
            user: "deploy".to_string(),
            forward_agent: true,
            database_ops: false,
            no_release: false,
        }
    }

    #[test]
    fn test_host_display_hides_default_port() {
        assert_eq!(host("a1", 22).to_string(), "a1");
        assert_eq!(host("a1", 2222).to_string(), "a1:2222");
    }

    #[test]
    fn test_host_ssh_target() {
        assert_eq!(host("a1", 22).ssh_target(), "deploy@a1");
        assert_eq!(host("a1", 2222).key(), "deploy@a1:2222");
    }
}
