//! ロールとターゲットの解決

use crate::error::{CoreError, Result};
use crate::model::{Host, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// ロール解決後に適用する運用フィルタ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HostFilter {
    #[default]
    All,
    /// `database-ops` が付いたホスト
    DatabaseOps,
    /// リリースのチェックアウトを持つホスト
    Release,
}

impl HostFilter {
    pub fn matches(&self, host: &Host) -> bool {
        match self {
            HostFilter::All => true,
            HostFilter::DatabaseOps => host.database_ops,
            HostFilter::Release => !host.no_release,
        }
    }
}

impl fmt::Display for HostFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostFilter::All => write!(f, "all"),
            HostFilter::DatabaseOps => write!(f, "database-ops"),
            HostFilter::Release => write!(f, "release"),
        }
    }
}

/// ロール名を重複のないホスト一覧に解決
///
/// ホストは指定ロール全体での初出順を保つ。
/// 結果が空ならエラー。デプロイ手順が対象なしで
/// 黙って実行されることはない。
pub fn resolve_targets(roles: &[Role], names: &[&str], filter: HostFilter) -> Result<Vec<Host>> {
    let mut seen = HashSet::new();
    let mut hosts = Vec::new();

    for name in names {
        let Some(role) = roles.iter().find(|r| r.name == *name) else {
            tracing::debug!(role = %name, "role is not declared");
            continue;
        };
        for host in &role.hosts {
            if filter.matches(host) && seen.insert(host.key()) {
                hosts.push(host.clone());
            }
        }
    }

    if hosts.is_empty() {
        return Err(CoreError::NoTargets {
            roles: names.join(", "),
            filter,
        });
    }

    Ok(hosts)
}

/// 全ロールのホストアドレス（重複なし、宣言順）
pub fn all_addresses(roles: &[Role]) -> Vec<String> {
    let mut seen = HashSet::new();
    roles
        .iter()
        .flat_map(|r| r.hosts.iter())
        .filter(|h| seen.insert(h.address.clone()))
        .map(|h| h.address.clone())
        .collect()
}
