//! role / server ノードのパース

use super::value::{first_string, prop_bool, prop_string, prop_u16};
use crate::error::{CoreError, Result};
use crate::model::{RoleDef, ServerDef};
use kdl::KdlNode;

/// `role` ノードと子の `server` をパース
pub fn parse_role(node: &KdlNode) -> Result<RoleDef> {
    let name = first_string(node)
        .ok_or_else(|| CoreError::InvalidConfig("role requires a name".to_string()))?;

    let mut role = RoleDef {
        name,
        servers: Vec::new(),
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "server" {
                role.servers.push(parse_server(child, &role.name)?);
            }
        }
    }

    Ok(role)
}

fn parse_server(node: &KdlNode, role: &str) -> Result<ServerDef> {
    let address = first_string(node).ok_or_else(|| {
        CoreError::InvalidConfig(format!("server in role '{}' requires an address", role))
    })?;

    Ok(ServerDef {
        address,
        port: prop_u16(node, "port")?,
        user: prop_string(node, "user"),
        database_ops: prop_bool(node, "database-ops")
            .or_else(|| prop_bool(node, "database_ops"))
            .unwrap_or(false),
        no_release: prop_bool(node, "no-release")
            .or_else(|| prop_bool(node, "no_release"))
            .unwrap_or(false),
    })
}
