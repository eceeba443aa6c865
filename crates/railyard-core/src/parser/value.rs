//! KDL値のヘルパー

use crate::error::{CoreError, Result};
use kdl::{KdlNode, KdlValue};

fn positional(node: &KdlNode) -> impl Iterator<Item = &KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
}

pub fn first_string(node: &KdlNode) -> Option<String> {
    positional(node)
        .next()
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

pub fn first_bool(node: &KdlNode) -> Option<bool> {
    positional(node).next().and_then(|v| v.as_bool())
}

pub fn first_u32(node: &KdlNode) -> Result<Option<u32>> {
    positional(node)
        .next()
        .map(|v| to_u32(node, v))
        .transpose()
}

pub fn string_args(node: &KdlNode) -> Vec<String> {
    positional(node)
        .filter_map(|v| v.as_string())
        .map(|s| s.to_string())
        .collect()
}

pub fn prop_string(node: &KdlNode, key: &str) -> Option<String> {
    node.get(key)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

pub fn prop_bool(node: &KdlNode, key: &str) -> Option<bool> {
    node.get(key).and_then(|v| v.as_bool())
}

pub fn prop_u32(node: &KdlNode, key: &str) -> Result<Option<u32>> {
    node.get(key).map(|v| to_u32(node, v)).transpose()
}

pub fn prop_u16(node: &KdlNode, key: &str) -> Result<Option<u16>> {
    node.get(key)
        .map(|v| {
            v.as_integer()
                .and_then(|i| u16::try_from(i).ok())
                .ok_or_else(|| invalid_number(node, v))
        })
        .transpose()
}

fn to_u32(node: &KdlNode, value: &KdlValue) -> Result<u32> {
    value
        .as_integer()
        .and_then(|i| u32::try_from(i).ok())
        .ok_or_else(|| invalid_number(node, value))
}

fn invalid_number(node: &KdlNode, value: &KdlValue) -> CoreError {
    CoreError::InvalidConfig(format!(
        "{}: expected a non-negative integer, got {:?}",
        node.name().value(),
        value
    ))
}
