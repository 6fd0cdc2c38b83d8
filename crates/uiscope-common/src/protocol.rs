use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Custom deserializer for HashMap<String, String> that filters out null values.
/// The inspection script reports absent attributes and unresolved ids as null.
fn deserialize_nullable_string_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: HashMap<String, Option<String>> = HashMap::deserialize(deserializer)?;
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.map(|val| (k, val)))
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Center of the box, rounded to whole pixels.
    pub fn center(&self) -> Coordinates {
        Coordinates {
            x: (self.x + self.width / 2.0).round() as i64,
            y: (self.y + self.height / 2.0).round() as i64,
        }
    }

    /// Square region of `2 * margin` pixels centered on `point`.
    pub fn around(point: Coordinates, margin: u32) -> Self {
        let margin = f64::from(margin);
        Self {
            x: point.x as f64 - margin,
            y: point.y as f64 - margin,
            width: margin * 2.0,
            height: margin * 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
}

/// One node of an inspected element's ancestry, as reported by the page.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InspectedNode {
    /// Lowercase tag name.
    pub tag_name: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string_map")]
    pub attributes: HashMap<String, String>,
    /// Trimmed `textContent`.
    #[serde(default)]
    pub text: String,
}

/// Read-only capture of a candidate element and everything the describer needs.
///
/// `ancestry[0]` is the element itself, `ancestry[i + 1]` is the parent of
/// `ancestry[i]`, and the last entry is the document root element.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InspectedElement {
    pub ancestry: Vec<InspectedNode>,
    /// Text of elements referenced through `aria-labelledby`, keyed by id.
    #[serde(default, deserialize_with = "deserialize_nullable_string_map")]
    pub labelled_by: HashMap<String, String>,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub label: String,
    pub section: String,
    pub tag_name: String,
    pub coordinates: Coordinates,
    pub selector: String,
}

/// The externally visible record produced for every clicked element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub website_section: String,
    pub state_before: String,
    pub state_after: String,
    pub change_analysis: String,
    pub element_aria_label: String,
    pub element_selector: String,
    pub element_type: String,
    pub coordinates: Coordinates,
    /// Base64 encoded PNG.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_before: Option<String>,
    /// Base64 encoded PNG.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalyzeResponse {
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// Accessibility tree records, shaped like the DevTools `Accessibility.AXNode`.

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AxValue {
    #[serde(rename = "type", default)]
    pub value_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl AxValue {
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxProperty {
    pub name: String,
    pub value: AxValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AxNodeRecord {
    pub node_id: String,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub role: Option<AxValue>,
    #[serde(default)]
    pub name: Option<AxValue>,
    #[serde(default)]
    pub description: Option<AxValue>,
    #[serde(default)]
    pub value: Option<AxValue>,
    #[serde(default)]
    pub properties: Vec<AxProperty>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
}

impl AxNodeRecord {
    pub fn role(&self) -> &str {
        self.role.as_ref().and_then(AxValue::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.name.as_ref().and_then(AxValue::as_str).unwrap_or("")
    }

    pub fn property(&self, name: &str) -> Option<&AxValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}
