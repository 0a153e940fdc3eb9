//! Per-node highlight state for the network graph

use crate::focus::NodeRegistry;
use crate::metrics::has_cycle;
use audit_model::{AuditResult, NodeRef};
use serde::Serialize;

/// Cycle membership of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleFlag {
    /// Engine listed the node as part of the detected cycle
    Member,
    /// No cycle, or the engine's list excludes the node
    NotMember,
    /// A cycle was flagged but the engine did not say which nodes
    Unknown,
}

/// Highlight record for one registry node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeHighlight {
    /// Node
    pub node: NodeRef,
    /// Current focus target
    pub is_target: bool,
    /// On a traversal path or named in the explanation
    pub in_path: bool,
    /// Cycle membership
    pub cycle: CycleFlag,
}

/// Highlight every registry node, in registration order
#[must_use]
pub fn highlight_nodes(
    registry: &NodeRegistry,
    result: Option<&AuditResult>,
    target: Option<&NodeRef>,
) -> Vec<NodeHighlight> {
    registry
        .nodes()
        .map(|(node, _)| NodeHighlight {
            node: node.clone(),
            is_target: target == Some(node),
            in_path: result.is_some_and(|r| in_path(r, node)),
            cycle: result.map_or(CycleFlag::NotMember, |r| cycle_flag(r, node)),
        })
        .collect()
}

fn in_path(result: &AuditResult, node: &NodeRef) -> bool {
    let on_path = result
        .mismatches
        .iter()
        .any(|m| m.traversal_path.contains(node));
    on_path || mentions(&result.explanation, &node.entity_id)
}

/// `id` occurs in `text` as a whole identifier, not as part of a longer one
fn mentions(text: &str, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    let is_id_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
    text.match_indices(id).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + id.len()..].chars().next();
        !before.is_some_and(is_id_char) && !after.is_some_and(is_id_char)
    })
}

fn cycle_flag(result: &AuditResult, node: &NodeRef) -> CycleFlag {
    if !has_cycle(result) {
        return CycleFlag::NotMember;
    }
    match &result.cycle_members {
        Some(members) if members.contains(node) => CycleFlag::Member,
        Some(_) => CycleFlag::NotMember,
        None => CycleFlag::Unknown,
    }
}
