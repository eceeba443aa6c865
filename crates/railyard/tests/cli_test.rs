#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const DEPLOY_KDL: &str = r#"
application "shop"
repository "git@codebasehq.com:acme/shop/web.git"
branch "main"
environments "staging" "production"
unicorn workers=2 timeout=10
role "app" {
    server "a1.example.com" database-ops=#true
}
role "storage" {
    server "s1.example.com" port=2222
}
"#;

/// 環境変数の影響を受けない yard コマンド
fn yard() -> Command {
    let mut cmd = Command::cargo_bin("yard").unwrap();
    cmd.env_remove("RAILYARD_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// CLIヘルプにサブコマンドが表示されることを確認
#[test]
fn test_cli_help() {
    yard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("unicorn"))
        .stdout(predicate::str::contains("log"));
}

/// バージョン表示が設定ファイルなしで動作することを確認
#[test]
fn test_cli_version() {
    yard()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("railyard"));
}

/// deployコマンドのヘルプにオプションとサブコマンドが表示されることを確認
#[test]
fn test_deploy_help() {
    yard()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--migrations"))
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("upload-db-config"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    yard().arg("invalid-command").assert().failure();
}

/// deploy.kdl が見つからない場合にエラーになることを確認
#[test]
fn test_missing_deploy_file() {
    let dir = tempfile::tempdir().unwrap();
    yard()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("deploy configuration not found"));
}

/// configコマンドが解決済みの設定をJSONで出力することを確認
#[test]
fn test_config_prints_resolved_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("deploy.kdl"), DEPLOY_KDL).unwrap();

    yard()
        .current_dir(dir.path())
        .env("USER", "alice")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""deploy_to": "/opt/apps/shop""#))
        .stdout(predicate::str::contains(r#""user": "alice""#))
        .stdout(predicate::str::contains(r#""workers": 2"#))
        .stdout(predicate::str::contains(r#""port": 2222"#));
}

/// コマンドラインのオーバーライドが設定に反映されることを確認
#[test]
fn test_overrides_apply_before_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elsewhere.kdl");
    fs::write(&path, DEPLOY_KDL).unwrap();

    yard()
        .args(["config", "-c"])
        .arg(&path)
        .args(["-e", "qa", "--branch", "hotfix", "--user", "ops"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""branch": "hotfix""#))
        .stdout(predicate::str::contains(r#""user": "ops""#))
        .stdout(predicate::str::contains(r#""qa""#))
        .stdout(predicate::str::contains(r#""staging""#).not());
}

/// 必須設定が欠けた deploy.kdl がエラーとして報告されることを確認
#[test]
fn test_invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("deploy.kdl"),
        "application \"shop\"\nunicorn workers=0\n",
    )
    .unwrap();

    yard()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("repository"));
}
