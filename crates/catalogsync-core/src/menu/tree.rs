//! Menu tree as the backend sends it, and the rendered shape consumers get.

use serde::{Deserialize, Serialize};

use crate::wire::{deserialize_flag, deserialize_optional_flag};

/// One node of the raw menu tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMenuNode {
    #[serde(default)]
    pub id: i64,
    #[serde(default, alias = "title")]
    pub label: String,
    pub icon: Option<String>,
    #[serde(alias = "url")]
    pub route: Option<String>,
    /// Absent means visible.
    #[serde(default, deserialize_with = "deserialize_optional_flag")]
    pub visible: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub disabled: bool,
    pub tooltip: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub separator: bool,
    #[serde(default)]
    pub children: Vec<RawMenuNode>,
}

impl RawMenuNode {
    fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub separator: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

/// Builds the rendered menu.
///
/// Hidden nodes are dropped with their whole subtree. A group with no route
/// whose children were all hidden is dropped as well.
pub fn render_menu(nodes: &[RawMenuNode]) -> Vec<MenuItem> {
    nodes.iter().filter_map(render_node).collect()
}

fn render_node(node: &RawMenuNode) -> Option<MenuItem> {
    if !node.is_visible() {
        return None;
    }

    if node.separator {
        return Some(MenuItem {
            id: node.id,
            label: String::new(),
            icon: None,
            route: None,
            disabled: false,
            tooltip: None,
            separator: true,
            children: Vec::new(),
        });
    }

    let children = render_menu(&node.children);
    let route = node.route.clone().filter(|r| !r.trim().is_empty());
    if route.is_none() && !node.children.is_empty() && children.is_empty() {
        return None;
    }

    Some(MenuItem {
        id: node.id,
        label: node.label.trim().to_string(),
        icon: node.icon.clone().filter(|i| !i.is_empty()),
        route,
        disabled: node.disabled,
        tooltip: node.tooltip.clone().filter(|t| !t.trim().is_empty()),
        separator: false,
        children,
    })
}

/// Total number of items, nested ones included.
pub fn count_items(items: &[MenuItem]) -> usize {
    items.iter().map(|item| 1 + count_items(&item.children)).sum()
}
