//! deploy.kdl パーサー
//!
//! 生の [`DeployFile`] を返す。デフォルト値は後で
//! [`DeployConfig::resolve`](crate::model::DeployConfig::resolve) が適用する。

mod role;
mod value;

use role::parse_role;
use value::{first_bool, first_string, prop_bool, prop_string, prop_u16, prop_u32, string_args};

use crate::error::Result;
use crate::model::{DeployFile, WorkersConfig};
use kdl::{KdlDocument, KdlNode};
use std::path::{Path, PathBuf};

/// deploy.kdl ファイルをパース
pub fn parse_deploy_file<P: AsRef<Path>>(path: P) -> Result<DeployFile> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let mut file = parse_deploy_str(&content)?;
    file.base_dir = path.parent().map(Path::to_path_buf);
    Ok(file)
}

/// deploy.kdl の内容をパース
pub fn parse_deploy_str(content: &str) -> Result<DeployFile> {
    let doc: KdlDocument = content.parse()?;
    let mut file = DeployFile::default();

    for node in doc.nodes() {
        match node.name().value() {
            "application" => file.application = first_string(node),
            "repository" => file.repository = first_string(node),
            "branch" => file.branch = first_string(node),
            "deploy-to" | "deploy_to" => file.deploy_to = first_string(node),
            "user" => file.user = first_string(node),
            "environment" => file.environment = first_string(node),
            "environments" => file.environments = string_args(node),
            "run-migrations" | "run_migrations" => file.run_migrations = first_bool(node),
            "database-host" | "database_host" => file.database_host = first_string(node),
            "lock" => file.lock = first_bool(node),
            "ssh" | "ssh-options" | "ssh_options" => {
                file.ssh_port = prop_u16(node, "port")?;
                file.forward_agent = prop_bool(node, "forward-agent")
                    .or_else(|| prop_bool(node, "forward_agent"));
            }
            "unicorn" => parse_unicorn(node, &mut file)?,
            // 既存レシピ向けのフラットなオプション名
            "skip-unicorn" | "skip_unicorn" | "skip-process-manager" | "skip_process_manager" => {
                file.unicorn.skip = first_bool(node)
            }
            "skip-unicorn-config" | "skip_unicorn_config" => {
                file.unicorn.skip_config = first_bool(node)
            }
            "unicorn-sudo" | "unicorn_sudo" | "process-sudo" | "process_sudo" => {
                file.unicorn.sudo = first_bool(node)
            }
            "unicorn-workers" | "unicorn_workers" => {
                file.unicorn.workers = value::first_u32(node)?
            }
            "unicorn-timeout" | "unicorn_timeout" => {
                file.unicorn.timeout = value::first_u32(node)?
            }
            "tracker" => {
                file.tracker_host = prop_string(node, "host");
                file.tracker_protocol = prop_string(node, "protocol");
            }
            "workers" => file.workers = Some(parse_workers(node)),
            "role" => file.roles.push(parse_role(node)?),
            other => {
                tracing::debug!(node = %other, "skipping unknown node");
            }
        }
    }

    Ok(file)
}

fn parse_unicorn(node: &KdlNode, file: &mut DeployFile) -> Result<()> {
    let unicorn = &mut file.unicorn;
    if let Some(workers) = prop_u32(node, "workers")? {
        unicorn.workers = Some(workers);
    }
    if let Some(timeout) = prop_u32(node, "timeout")? {
        unicorn.timeout = Some(timeout);
    }
    if let Some(sudo) = prop_bool(node, "sudo") {
        unicorn.sudo = Some(sudo);
    }
    if let Some(skip) = prop_bool(node, "skip") {
        unicorn.skip = Some(skip);
    }
    if let Some(skip_config) = prop_bool(node, "skip-config") {
        unicorn.skip_config = Some(skip_config);
    }
    if let Some(template) = prop_string(node, "template") {
        unicorn.template = Some(PathBuf::from(template));
    }
    Ok(())
}

fn parse_workers(node: &KdlNode) -> WorkersConfig {
    let mut workers = WorkersConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "start" => workers.start = string_args(child),
                "stop" => workers.stop = string_args(child),
                "restart" => workers.restart = string_args(child),
                _ => {}
            }
        }
    }

    workers
}

#[cfg(test)]
mod tests;
