//! Fixed node/edge appearance shared by the DOT and Mermaid exporters.

use crate::graph::{EdgeKind, NodeKind, WorkflowNode};

/// Fill for any node that failed validation, whatever its type.
pub const INVALID_COLOR: &str = "#FF1744";

pub fn node_color(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Start => "#4CAF50",
        NodeKind::End => "#F44336",
        NodeKind::Step => "#2196F3",
        NodeKind::Agent => "#9C27B0",
        NodeKind::Workflow => "#FF9800",
        NodeKind::Resource => "#607D8B",
        NodeKind::Condition => "#FFC107",
    }
}

pub fn fill_color(node: &WorkflowNode) -> &'static str {
    if node.is_invalid() {
        INVALID_COLOR
    } else {
        node_color(node.kind)
    }
}

pub fn dot_shape(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Start => "ellipse",
        NodeKind::End => "doublecircle",
        NodeKind::Step => "box",
        NodeKind::Agent => "hexagon",
        NodeKind::Workflow => "component",
        NodeKind::Resource => "cylinder",
        NodeKind::Condition => "diamond",
    }
}

pub fn dot_edge_style(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Sequence => "solid",
        EdgeKind::Dependency => "dashed",
        EdgeKind::Condition => "bold",
        EdgeKind::DataFlow => "dotted",
    }
}

/// Opening and closing brackets of a Mermaid node shape.
pub fn mermaid_brackets(kind: NodeKind) -> (&'static str, &'static str) {
    match kind {
        NodeKind::Start => ("([", "])"),
        NodeKind::End => ("((", "))"),
        NodeKind::Step => ("[", "]"),
        NodeKind::Agent => ("{{", "}}"),
        NodeKind::Workflow => ("[[", "]]"),
        NodeKind::Resource => ("[(", ")]"),
        NodeKind::Condition => ("{", "}"),
    }
}

pub fn mermaid_arrow(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Sequence | EdgeKind::Condition => "-->",
        EdgeKind::Dependency => "-.->",
        EdgeKind::DataFlow => "==>",
    }
}
