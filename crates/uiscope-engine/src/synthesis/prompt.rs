//! Prompt text and response schema for the annotation request.

use serde_json::{json, Value};
use uiscope_common::protocol::ElementDescriptor;

/// JSON schema of a full annotation record.
///
/// Every field is listed so the model sees the whole shape, but only the
/// descriptive ones are read back.
pub fn annotation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "website_section": {
                "type": "string",
                "description": "The section of the website where the element is located"
            },
            "state_before": {
                "type": "string",
                "description": "Description of the UI state before the interaction"
            },
            "state_after": {
                "type": "string",
                "description": "Description of the UI state after the interaction"
            },
            "change_analysis": {
                "type": "string",
                "description": "Detailed analysis of what changed in the UI"
            },
            "element_aria_label": {
                "type": "string",
                "description": "Accessible label or text content of the element"
            },
            "element_selector": {
                "type": "string",
                "description": "CSS selector for the element"
            },
            "element_type": {
                "type": "string",
                "description": "Type of element (button, link, input, etc.)"
            },
            "coordinates": {
                "type": "object",
                "properties": {
                    "x": { "type": "number", "description": "X coordinate of the element" },
                    "y": { "type": "number", "description": "Y coordinate of the element" }
                },
                "required": ["x", "y"]
            },
            "screenshot_before": {
                "type": "string",
                "description": "Base64 encoded screenshot before interaction"
            },
            "screenshot_after": {
                "type": "string",
                "description": "Base64 encoded screenshot after interaction"
            }
        },
        "required": [
            "website_section",
            "state_before",
            "state_after",
            "change_analysis",
            "element_aria_label",
            "element_selector",
            "element_type",
            "coordinates"
        ]
    })
}

pub fn build_prompt(descriptor: &ElementDescriptor, diff_text: &str) -> String {
    format!(
        "Analyze this UI interaction:\n\n\
         Element: {} with label \"{}\"\n\
         Section: {}\n\
         Coordinates: ({}, {})\n\n\
         Accessibility changes:\n{}\n\n\
         Generate a comprehensive annotation for this interaction.",
        descriptor.tag_name,
        descriptor.label,
        descriptor.section,
        descriptor.coordinates.x,
        descriptor.coordinates.y,
        diff_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uiscope_common::protocol::Coordinates;

    #[test]
    fn test_schema_lists_screenshot_slots_as_optional() {
        let schema = annotation_schema();
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 10);
        assert!(properties.contains_key("screenshot_before"));
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(!required.contains(&"screenshot_after"));
        assert!(required.contains(&"change_analysis"));
    }

    #[test]
    fn test_prompt_carries_descriptor_and_diff() {
        let descriptor = ElementDescriptor {
            label: "Open menu".into(),
            section: "nav: Primary".into(),
            tag_name: "button".into(),
            coordinates: Coordinates { x: 40, y: 12 },
            selector: "#menu".into(),
        };
        let prompt = build_prompt(&descriptor, "+   \"expanded\": true,");
        assert!(prompt.contains("Element: button with label \"Open menu\""));
        assert!(prompt.contains("Section: nav: Primary"));
        assert!(prompt.contains("Coordinates: (40, 12)"));
        assert!(prompt.contains("\"expanded\": true"));
    }
}
