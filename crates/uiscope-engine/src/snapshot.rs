//! Accessibility snapshots reduced to "interesting" nodes.
//!
//! The raw DevTools tree contains every generic container and text fragment.
//! Only focusable nodes, controls and named leaves are kept; everything else is
//! flattened so its interesting descendants attach to the nearest kept ancestor.

use crate::backend::Backend;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::warn;
use uiscope_common::protocol::AxNodeRecord;

const CONTROL_ROLES: &[&str] = &[
    "button",
    "checkbox",
    "ColorWell",
    "combobox",
    "DisclosureTriangle",
    "listbox",
    "menu",
    "menubar",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "radio",
    "scrollbar",
    "searchbox",
    "slider",
    "spinbutton",
    "switch",
    "tab",
    "textbox",
    "tree",
    "treeitem",
];

const LEAF_ROLES: &[&str] = &[
    "doc-cover",
    "graphics-symbol",
    "img",
    "image",
    "Meter",
    "meter",
    "scrollbar",
    "slider",
    "separator",
    "progressbar",
];

const TEXT_ROLES: &[&str] = &["StaticText", "InlineTextBox", "LineBreak", "text"];

/// Boolean states reported only when set.
const FLAG_PROPERTIES: &[&str] = &[
    "disabled",
    "expanded",
    "focused",
    "modal",
    "multiline",
    "multiselectable",
    "readonly",
    "required",
    "selected",
];

/// States reported with their value, false included.
const TRISTATE_PROPERTIES: &[&str] = &["checked", "pressed"];

const VALUE_PROPERTIES: &[&str] = &[
    "level",
    "valuemin",
    "valuemax",
    "autocomplete",
    "haspopup",
    "invalid",
    "orientation",
];

/// Serialized accessibility tree, or the empty-object sentinel when capture failed.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessibilitySnapshot(Value);

impl AccessibilitySnapshot {
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Build the interesting-only tree from raw DevTools nodes.
    pub fn from_nodes(nodes: &[AxNodeRecord]) -> Self {
        AxTree::new(nodes)
            .and_then(|tree| tree.interesting_tree())
            .map(Self)
            .unwrap_or_else(Self::empty)
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_some_and(Map::is_empty)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Canonical text form: sorted keys, one property per line.
    pub fn canonical_text(&self) -> String {
        serde_json::to_string_pretty(&sorted(&self.0)).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Rebuild objects with their keys in sorted order, whatever map backs `Value`.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), sorted(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

impl Default for AccessibilitySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Capture the current page, degrading to the sentinel on any failure.
pub async fn capture<B: Backend + ?Sized>(backend: &mut B) -> AccessibilitySnapshot {
    match backend.accessibility_tree().await {
        Ok(nodes) => AccessibilitySnapshot::from_nodes(&nodes),
        Err(e) => {
            warn!("Accessibility snapshot failed, using empty snapshot: {}", e);
            AccessibilitySnapshot::empty()
        }
    }
}

struct AxTree<'a> {
    nodes: HashMap<&'a str, &'a AxNodeRecord>,
    root: &'a str,
}

impl<'a> AxTree<'a> {
    fn new(records: &'a [AxNodeRecord]) -> Option<Self> {
        let nodes: HashMap<&str, &AxNodeRecord> = records
            .iter()
            .map(|n| (n.node_id.as_str(), n))
            .collect();
        let root = records
            .iter()
            .find(|n| {
                n.parent_id
                    .as_deref()
                    .is_none_or(|p| !nodes.contains_key(p))
            })?
            .node_id
            .as_str();
        Some(Self { nodes, root })
    }

    fn children(&self, node: &'a AxNodeRecord) -> impl Iterator<Item = &'a AxNodeRecord> + '_ {
        node.child_ids
            .iter()
            .filter_map(|id| self.nodes.get(id.as_str()).copied())
    }

    /// Nodes reachable from the root in pre-order, each visited once.
    fn preorder(&self) -> Vec<&'a AxNodeRecord> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![self.nodes[self.root]];
        while let Some(node) = stack.pop() {
            if !seen.insert(node.node_id.as_str()) {
                continue;
            }
            order.push(node);
            let children: Vec<_> = self.children(node).collect();
            stack.extend(children.into_iter().rev());
        }
        order
    }

    fn interesting_tree(&self) -> Option<Value> {
        let order = self.preorder();

        let mut focusable_below: HashMap<&str, bool> = HashMap::new();
        for &node in order.iter().rev() {
            let below = self.children(node).any(|c| {
                is_focusable(c) || focusable_below.get(c.node_id.as_str()).copied().unwrap_or(false)
            });
            focusable_below.insert(node.node_id.as_str(), below);
        }

        let mut keep: HashSet<&str> = HashSet::new();
        keep.insert(self.root);
        let mut seen = HashSet::new();
        let mut stack = vec![(self.nodes[self.root], false)];
        while let Some((node, inside_control)) = stack.pop() {
            if !seen.insert(node.node_id.as_str()) {
                continue;
            }
            let has_focusable_child = focusable_below
                .get(node.node_id.as_str())
                .copied()
                .unwrap_or(false);
            if is_interesting(node, inside_control, self.is_leaf(node, has_focusable_child)) {
                keep.insert(node.node_id.as_str());
            }
            if self.is_leaf(node, has_focusable_child) {
                continue;
            }
            let inside = inside_control || is_control(node);
            for child in self.children(node) {
                stack.push((child, inside));
            }
        }

        let mut visited = HashSet::new();
        self.serialize(self.nodes[self.root], &keep, &mut visited)
            .into_iter()
            .next()
    }

    fn is_leaf(&self, node: &'a AxNodeRecord, has_focusable_child: bool) -> bool {
        if node.child_ids.is_empty() || self.children(node).next().is_none() {
            return true;
        }
        let role = node.role();
        if TEXT_ROLES.contains(&role) || is_plain_text_field(node) || LEAF_ROLES.contains(&role) {
            return true;
        }
        if has_focusable_child {
            return false;
        }
        if is_focusable(node) && !node.name().is_empty() {
            return true;
        }
        role == "heading" && !node.name().is_empty()
    }

    fn serialize(
        &self,
        node: &'a AxNodeRecord,
        keep: &HashSet<&str>,
        visited: &mut HashSet<&'a str>,
    ) -> Vec<Value> {
        if !visited.insert(node.node_id.as_str()) {
            return Vec::new();
        }
        let mut children = Vec::new();
        for child in self.children(node) {
            children.extend(self.serialize(child, keep, visited));
        }
        if !keep.contains(node.node_id.as_str()) {
            return children;
        }
        let mut value = serialize_node(node);
        if !children.is_empty() {
            value.insert("children".to_string(), Value::Array(children));
        }
        vec![Value::Object(value)]
    }
}

fn is_focusable(node: &AxNodeRecord) -> bool {
    node.property("focusable")
        .and_then(|v| v.value.as_ref())
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn is_richly_editable(node: &AxNodeRecord) -> bool {
    node.property("editable").and_then(|v| v.as_str()) == Some("richtext")
}

fn is_plain_text_field(node: &AxNodeRecord) -> bool {
    !is_richly_editable(node) && matches!(node.role(), "textbox" | "searchbox")
}

fn is_control(node: &AxNodeRecord) -> bool {
    CONTROL_ROLES.contains(&node.role())
}

fn is_interesting(node: &AxNodeRecord, inside_control: bool, leaf: bool) -> bool {
    if node.ignored || matches!(node.role(), "none" | "Ignored" | "InlineTextBox") {
        return false;
    }
    if is_focusable(node) || is_richly_editable(node) {
        return true;
    }
    if is_control(node) {
        return true;
    }
    if inside_control {
        return false;
    }
    leaf && !node.name().is_empty()
}

fn serialize_node(node: &AxNodeRecord) -> Map<String, Value> {
    let mut out = Map::new();
    let role = match node.role() {
        "StaticText" => "text",
        other => other,
    };
    out.insert("role".to_string(), Value::String(role.to_string()));
    out.insert("name".to_string(), Value::String(node.name().to_string()));

    if let Some(value) = node.value.as_ref().and_then(|v| v.value.as_ref()) {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !text.is_empty() {
            out.insert("value".to_string(), Value::String(text));
        }
    }
    if let Some(description) = node.description.as_ref().and_then(|d| d.as_str()) {
        if !description.is_empty() {
            out.insert(
                "description".to_string(),
                Value::String(description.to_string()),
            );
        }
    }

    for property in &node.properties {
        let Some(value) = property.value.value.as_ref() else {
            continue;
        };
        let name = property.name.as_str();
        if FLAG_PROPERTIES.contains(&name) {
            if value.as_bool() == Some(true) {
                out.insert(name.to_string(), Value::Bool(true));
            }
        } else if TRISTATE_PROPERTIES.contains(&name) {
            let state = match value {
                Value::String(s) if s == "mixed" => Value::String("mixed".to_string()),
                Value::String(s) => Value::Bool(s == "true"),
                other => other.clone(),
            };
            out.insert(name.to_string(), state);
        } else if VALUE_PROPERTIES.contains(&name) {
            let skip = match value {
                Value::String(s) => s.is_empty() || s == "false",
                Value::Null => true,
                _ => false,
            };
            if !skip {
                out.insert(name.to_string(), value.clone());
            }
        }
    }
    out
}
