//! 設定テンプレート
//!
//! テンプレートは `$NAME` 形式のプレースホルダーを使う。置換リストにある
//! プレースホルダーだけを置換し、それ以外の `$` で始まる文字列（Rubyのグローバル変数、
//! コメント内のシェル変数）はそのまま残す。置換はテンプレートを1回走査するだけなので、
//! 挿入した値はそのまま書き出される。

use crate::error::{CoreError, Result};
use crate::model::UnicornConfig;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// 組み込みのプロセスマネージャーテンプレート
pub const DEFAULT_UNICORN_TEMPLATE: &str = include_str!("../templates/unicorn.rb");

pub const WORKER_PROCESSES: &str = "$WORKER_PROCESSES";
pub const TIMEOUT: &str = "$TIMEOUT";

/// データベースパスワードを保持する環境変数
pub const DATABASE_PASSWORD_ENV: &str = "DBPASS";

/// [`DATABASE_PASSWORD_ENV`] 未設定時のパスワード
pub const DEFAULT_DATABASE_PASSWORD: &str = "xxxx";

const DATABASE_TEMPLATE: &str = "production:
  adapter: mysql2
  encoding: utf8
  reconnect: true
  database: $APPLICATION
  pool: 5
  username: $APPLICATION
  password: $PASSWORD
  host: $DATABASE_HOST
";

/// テンプレートと固定の置換リストから生成したテキスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate(String);

impl RenderedTemplate {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderedTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 各プレースホルダーの全出現箇所を1パスで置換
///
/// 値は再走査しない。プレースホルダーを含む値もそのまま出力される。
/// プレースホルダーが重なる場合は最長のものを優先。
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> Result<RenderedTemplate> {
    let mut placeholders: Vec<&str> = substitutions
        .iter()
        .map(|(placeholder, _)| *placeholder)
        .filter(|placeholder| !placeholder.is_empty())
        .collect();
    if placeholders.is_empty() {
        return Ok(RenderedTemplate(template.to_string()));
    }
    placeholders.sort_by_key(|placeholder| std::cmp::Reverse(placeholder.len()));

    let pattern = placeholders
        .iter()
        .map(|placeholder| regex::escape(placeholder))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&pattern)
        .map_err(|e| CoreError::InvalidConfig(format!("template placeholders: {}", e)))?;

    // 重複したプレースホルダーは最初の値を使う
    let mut values: HashMap<&str, &str> = HashMap::new();
    for (placeholder, value) in substitutions {
        values.entry(*placeholder).or_insert(*value);
    }

    let rendered = re.replace_all(template, |caps: &Captures| {
        let matched = &caps[0];
        values.get(matched).copied().unwrap_or(matched).to_string()
    });
    Ok(RenderedTemplate(rendered.into_owned()))
}

/// 設定されたテンプレートから unicorn.rb を生成
pub fn render_unicorn_config(unicorn: &UnicornConfig) -> Result<RenderedTemplate> {
    let workers = unicorn.workers.to_string();
    let timeout = unicorn.timeout.to_string();
    render(
        &unicorn.template,
        &[(WORKER_PROCESSES, &workers), (TIMEOUT, &timeout)],
    )
}

/// データベースパスワードと、安全でないデフォルト値かどうか
#[derive(Clone, PartialEq, Eq)]
pub struct DatabasePassword {
    value: String,
    is_default: bool,
}

impl DatabasePassword {
    /// [`DATABASE_PASSWORD_ENV`] を読む。未設定なら [`DEFAULT_DATABASE_PASSWORD`]
    pub fn from_env() -> Self {
        match std::env::var(DATABASE_PASSWORD_ENV) {
            Ok(value) => Self {
                value,
                is_default: false,
            },
            Err(_) => {
                warn!(
                    env = DATABASE_PASSWORD_ENV,
                    "database password not set, using the placeholder default"
                );
                Self {
                    value: DEFAULT_DATABASE_PASSWORD.to_string(),
                    is_default: true,
                }
            }
        }
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_default: false,
        }
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for DatabasePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabasePassword")
            .field("value", &"<redacted>")
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// 固定形式の database.yml を生成
pub fn render_database_config(
    application: &str,
    password: &DatabasePassword,
    database_host: &str,
) -> Result<RenderedTemplate> {
    render(
        DATABASE_TEMPLATE,
        &[
            ("$APPLICATION", application),
            ("$PASSWORD", password.expose()),
            ("$DATABASE_HOST", database_host),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let template = "a=$WORKER_PROCESSES b=$TIMEOUT c=$WORKER_PROCESSES";
        let rendered = render(template, &[(WORKER_PROCESSES, "8"), (TIMEOUT, "45")]).unwrap();
        assert_eq!(rendered.as_str(), "a=8 b=45 c=8");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let template = "workers $WORKER_PROCESSES\n$stderr.puts $HOME $TIMEOUT";
        let rendered = render(template, &[(WORKER_PROCESSES, "8"), (TIMEOUT, "45")]).unwrap();
        assert_eq!(rendered.as_str(), "workers 8\n$stderr.puts $HOME 45");
    }

    #[test]
    fn test_render_is_idempotent() {
        let subs = [(WORKER_PROCESSES, "8"), (TIMEOUT, "45")];
        let once = render(DEFAULT_UNICORN_TEMPLATE, &subs).unwrap();
        let twice = render(once.as_str(), &subs).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_render_without_placeholders_is_identity() {
        let template = "listen 8080\n# $ not a placeholder";
        assert_eq!(render(template, &[(TIMEOUT, "1")]).unwrap().as_str(), template);
    }

    #[test]
    fn test_unicorn_config_substitution() {
        let unicorn = UnicornConfig {
            workers: 2,
            timeout: 10,
            ..Default::default()
        };

        let rendered = render_unicorn_config(&unicorn).unwrap();
        let expected = DEFAULT_UNICORN_TEMPLATE
            .replace(WORKER_PROCESSES, "2")
            .replace(TIMEOUT, "10");

        assert_eq!(rendered.as_str(), expected);
        assert!(rendered.as_str().contains("worker_processes 2"));
        assert!(rendered.as_str().contains("timeout 10"));
        assert!(!rendered.as_str().contains(WORKER_PROCESSES));
        assert!(!rendered.as_str().contains(TIMEOUT));
    }

    #[test]
    fn test_database_config() {
        let password = DatabasePassword::new("s3cret");
        let rendered = render_database_config("shop", &password, "db.internal").unwrap();

        assert_eq!(
            rendered.as_str(),
            "production:\n  adapter: mysql2\n  encoding: utf8\n  reconnect: true\n  database: shop\n  pool: 5\n  username: shop\n  password: s3cret\n  host: db.internal\n"
        );
    }

    #[test]
    fn test_database_config_writes_values_verbatim() {
        let password = DatabasePassword::new("pa$DATABASE_HOSTss");
        let rendered = render_database_config("$PASSWORD", &password, "db.internal").unwrap();

        assert!(rendered.as_str().contains("password: pa$DATABASE_HOSTss\n"));
        assert!(rendered.as_str().contains("database: $PASSWORD\n"));
        assert!(rendered.as_str().contains("host: db.internal\n"));
    }

    #[test]
    fn test_render_does_not_rescan_inserted_values() {
        let rendered = render("$A $B", &[("$A", "$B"), ("$B", "x")]).unwrap();
        assert_eq!(rendered.as_str(), "$B x");
    }

    #[test]
    fn test_render_prefers_longest_placeholder() {
        let rendered = render(
            "$TIMEOUT_MS $TIMEOUT",
            &[(TIMEOUT, "10"), ("$TIMEOUT_MS", "500")],
        )
        .unwrap();
        assert_eq!(rendered.as_str(), "500 10");
    }

    #[test]
    fn test_database_password_from_env() {
        temp_env::with_var(DATABASE_PASSWORD_ENV, Some("hunter2"), || {
            let password = DatabasePassword::from_env();
            assert_eq!(password.expose(), "hunter2");
            assert!(!password.is_default());
        });
    }

    #[test]
    fn test_database_password_fallback() {
        temp_env::with_var_unset(DATABASE_PASSWORD_ENV, || {
            let password = DatabasePassword::from_env();
            assert_eq!(password.expose(), DEFAULT_DATABASE_PASSWORD);
            assert!(password.is_default());
        });
    }

    #[test]
    fn test_database_password_debug_is_redacted() {
        let password = DatabasePassword::new("hunter2");
        assert!(!format!("{:?}", password).contains("hunter2"));
    }
}
