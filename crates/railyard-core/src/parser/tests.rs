use super::*;
use crate::model::{ConfigOverrides, DeployConfig, Environment};

const FULL: &str = r#"
    application "shop"
    repository "git@codebasehq.com:acme/shop/web.git"
    branch "main"
    deploy-to "/srv/shop"
    user "deploy"
    ssh port=2222 forward-agent=#false
    environments "staging" "production"
    run-migrations #true
    database-host "db.internal"
    unicorn workers=8 timeout=45 sudo=#false skip=#false skip-config=#true
    tracker host="codebasehq.com" protocol="https"
    lock #true
    workers {
        start "bundle" "exec" "rake" "workers:start"
        stop "bundle" "exec" "rake" "workers:stop"
        restart "bundle" "exec" "rake" "workers:restart"
    }
    role "app" {
        server "a1" database-ops=#true
        server "a2" port=22 user="ops"
    }
    role "storage" {
        server "s1" no-release=#true
    }
"#;

#[test]
fn test_parse_full_file() {
    let file = parse_deploy_str(FULL).unwrap();

    assert_eq!(file.application.as_deref(), Some("shop"));
    assert_eq!(
        file.repository.as_deref(),
        Some("git@codebasehq.com:acme/shop/web.git")
    );
    assert_eq!(file.branch.as_deref(), Some("main"));
    assert_eq!(file.deploy_to.as_deref(), Some("/srv/shop"));
    assert_eq!(file.ssh_port, Some(2222));
    assert_eq!(file.forward_agent, Some(false));
    assert_eq!(file.environments, vec!["staging", "production"]);
    assert_eq!(file.run_migrations, Some(true));
    assert_eq!(file.database_host.as_deref(), Some("db.internal"));
    assert_eq!(file.unicorn.workers, Some(8));
    assert_eq!(file.unicorn.timeout, Some(45));
    assert_eq!(file.unicorn.sudo, Some(false));
    assert_eq!(file.unicorn.skip_config, Some(true));
    assert_eq!(file.lock, Some(true));

    let workers = file.workers.as_ref().unwrap();
    assert_eq!(workers.restart, vec!["bundle", "exec", "rake", "workers:restart"]);

    assert_eq!(file.roles.len(), 2);
    assert_eq!(file.roles[0].name, "app");
    assert_eq!(file.roles[0].servers.len(), 2);
    assert!(file.roles[0].servers[0].database_ops);
    assert_eq!(file.roles[0].servers[1].user.as_deref(), Some("ops"));
    assert!(file.roles[1].servers[0].no_release);
}

#[test]
fn test_parse_and_resolve() {
    let file = parse_deploy_str(FULL).unwrap();
    let config = DeployConfig::resolve(file, &ConfigOverrides::default()).unwrap();

    assert_eq!(config.user, "deploy");
    assert_eq!(
        config.environments,
        vec![Environment::new("staging"), Environment::new("production")]
    );

    let app = config.role("app").unwrap();
    assert_eq!(app.hosts[0].port, 2222);
    assert!(!app.hosts[0].forward_agent);
    assert_eq!(app.hosts[1].port, 22);
}

#[test]
fn test_parse_flat_option_names() {
    let kdl = r#"
        application "shop"
        repository "git@codebasehq.com:acme/shop/web.git"
        skip_unicorn #true
        unicorn_sudo #false
        unicorn_workers 2
        unicorn_timeout 10
    "#;

    let file = parse_deploy_str(kdl).unwrap();
    assert_eq!(file.unicorn.skip, Some(true));
    assert_eq!(file.unicorn.sudo, Some(false));
    assert_eq!(file.unicorn.workers, Some(2));
    assert_eq!(file.unicorn.timeout, Some(10));
}

#[test]
fn test_parse_skips_unknown_nodes() {
    let kdl = r#"
        application "shop"
        something-else "ignored"
    "#;

    let file = parse_deploy_str(kdl).unwrap();
    assert_eq!(file.application.as_deref(), Some("shop"));
}

#[test]
fn test_parse_role_without_name() {
    let kdl = r#"
        role {
            server "a1"
        }
    "#;

    assert!(parse_deploy_str(kdl).is_err());
}

#[test]
fn test_parse_negative_port_rejected() {
    let kdl = r#"ssh port=-1"#;
    assert!(parse_deploy_str(kdl).is_err());
}

#[test]
fn test_parse_invalid_kdl() {
    assert!(parse_deploy_str("application \"unterminated").is_err());
}

#[test]
fn test_parse_file_sets_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deploy.kdl");
    std::fs::write(&path, FULL).unwrap();

    let file = parse_deploy_file(&path).unwrap();
    assert_eq!(file.base_dir.as_deref(), Some(dir.path()));
}
