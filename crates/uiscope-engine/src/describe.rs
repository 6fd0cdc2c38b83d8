//! Element description: display label, nearest semantic section, selector.
//!
//! Works on an [`InspectedElement`] captured by the backend, so every rule here
//! is plain data processing over the element's ancestor chain.

use uiscope_common::protocol::{ElementDescriptor, InspectedElement, InspectedNode};

/// Tags that delimit a page region.
pub const LANDMARK_TAGS: &[&str] = &["aside", "nav", "header", "footer", "main", "section"];

/// Section name used when no ancestor marks a region.
pub const PAGE_SECTION: &str = "page";

/// Label used when nothing on the element yields text.
pub const UNKNOWN_LABEL: &str = "unknown";

/// A position in an inspected element's ancestry.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    element: &'a InspectedElement,
    depth: usize,
}

impl<'a> NodeRef<'a> {
    /// The inspected element itself, if the capture is not empty.
    pub fn target(element: &'a InspectedElement) -> Option<Self> {
        if element.ancestry.is_empty() {
            None
        } else {
            Some(Self { element, depth: 0 })
        }
    }

    /// `None` once the document root has been passed.
    pub fn parent(&self) -> Option<Self> {
        let depth = self.depth + 1;
        if depth < self.element.ancestry.len() {
            Some(Self {
                element: self.element,
                depth,
            })
        } else {
            None
        }
    }

    fn node(&self) -> &'a InspectedNode {
        &self.element.ancestry[self.depth]
    }

    pub fn tag_name(&self) -> String {
        self.node().tag_name.to_ascii_lowercase()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.node().attributes.contains_key(name)
    }

    /// Attribute value, treating an empty value as absent.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node()
            .attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn text(&self) -> &'a str {
        self.node().text.trim()
    }

    /// Text of the element named by the first id in `aria-labelledby`.
    fn labelled_by_text(&self) -> Option<&'a str> {
        let first_id = self.attribute("aria-labelledby")?.split_whitespace().next()?;
        self.element
            .labelled_by
            .get(first_id)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }

    /// aria-label, then aria-labelledby, then text content, then title.
    pub fn accessible_text(&self) -> Option<&'a str> {
        self.attribute("aria-label")
            .or_else(|| self.labelled_by_text())
            .or_else(|| Some(self.text()).filter(|t| !t.is_empty()))
            .or_else(|| self.attribute("title"))
    }

    fn marks_section(&self) -> bool {
        LANDMARK_TAGS.contains(&self.tag_name().as_str())
            || self.has_attribute("role")
            || self.has_attribute("aria-label")
            || self.has_attribute("aria-labelledby")
    }
}

/// Display label of the element, falling back to id, class string and finally `"unknown"`.
pub fn resolve_label(element: &InspectedElement) -> String {
    let Some(node) = NodeRef::target(element) else {
        return UNKNOWN_LABEL.to_string();
    };
    node.accessible_text()
        .or_else(|| node.attribute("id"))
        .or_else(|| node.attribute("class"))
        .unwrap_or(UNKNOWN_LABEL)
        .to_string()
}

/// Nearest section, starting at the element itself and walking up to the root.
pub fn resolve_section(element: &InspectedElement) -> String {
    let mut current = NodeRef::target(element);
    while let Some(node) = current {
        if node.marks_section() {
            let kind = node
                .attribute("role")
                .map(str::to_string)
                .unwrap_or_else(|| node.tag_name());
            return match node.accessible_text() {
                Some(label) => format!("{}: {}", kind, label),
                None => kind,
            };
        }
        current = node.parent();
    }
    PAGE_SECTION.to_string()
}

/// `#id` when the element has one, otherwise `tag.class1.class2`.
pub fn build_selector(element: &InspectedElement) -> String {
    let Some(node) = NodeRef::target(element) else {
        return String::new();
    };
    if let Some(id) = node.attribute("id") {
        return format!("#{}", id);
    }
    let mut selector = node.tag_name();
    if let Some(class) = node.attribute("class") {
        for name in class.split_whitespace() {
            selector.push('.');
            selector.push_str(name);
        }
    }
    selector
}

pub fn describe(element: &InspectedElement) -> ElementDescriptor {
    ElementDescriptor {
        label: resolve_label(element),
        section: resolve_section(element),
        tag_name: NodeRef::target(element)
            .map(|n| n.tag_name())
            .unwrap_or_default(),
        coordinates: element.rect.center(),
        selector: build_selector(element),
    }
}
