//! Catalog of CSS selectors describing "interactive element".
//!
//! The union is deliberately over-inclusive: an element that matches but does
//! nothing when clicked simply produces no visible change, while an element the
//! catalog misses is never explored at all.

/// Basic clickable elements.
pub const BASIC: &[&str] = &["button", "[role=button]", "a[href]:not([href^='#'])"];

/// Form input controls.
pub const FORM_INPUTS: &[&str] = &[
    "input[type=button]",
    "input[type=submit]",
    "input[type=reset]",
    "input[type=checkbox]",
    "input[type=radio]",
    "input[type=file]",
    "input[type=image]",
    "input[type=color]",
    "input[type=range]",
    "input[type=date]",
    "input[type=datetime-local]",
    "input[type=month]",
    "input[type=time]",
    "input[type=week]",
    "input[type=number]",
    "input[type=email]",
    "input[type=password]",
    "input[type=search]",
    "input[type=tel]",
    "input[type=text]",
    "input[type=url]",
];

/// Form elements other than inputs.
pub const FORM_ELEMENTS: &[&str] = &[
    "select",
    "textarea",
    "option",
    "optgroup",
    "datalist",
    "output",
    "fieldset",
    "legend",
    "meter",
    "progress",
];

/// Disclosure widgets, scripted canvases and media controls.
pub const INTERACTIVE_CONTENT: &[&str] = &[
    "details",
    "summary",
    "canvas[onclick]",
    "canvas[onmousedown]",
    "canvas[onmouseup]",
    "canvas[onkeydown]",
    "canvas[onkeyup]",
    "video[controls]",
    "audio[controls]",
];

/// ARIA interactive roles.
pub const ARIA_ROLES: &[&str] = &[
    "[role=button]",
    "[role=link]",
    "[role=menuitem]",
    "[role=menuitemcheckbox]",
    "[role=menuitemradio]",
    "[role=option]",
    "[role=tab]",
    "[role=tabpanel]",
    "[role=treeitem]",
    "[role=gridcell]",
    "[role=columnheader]",
    "[role=rowheader]",
    "[role=slider]",
    "[role=spinbutton]",
    "[role=switch]",
    "[role=searchbox]",
    "[role=combobox]",
    "[role=listbox]",
    "[role=textbox]",
];

/// Raw event-handler attributes.
pub const EVENT_HANDLERS: &[&str] = &[
    "[onclick]",
    "[onmousedown]",
    "[onmouseup]",
    "[ondblclick]",
    "[onkeydown]",
    "[onkeyup]",
    "[onkeypress]",
    "[onfocus]",
    "[onblur]",
    "[onchange]",
    "[oninput]",
    "[onsubmit]",
];

/// Attributes that make arbitrary elements interactive.
pub const INTERACTIVE_ATTRIBUTES: &[&str] = &[
    "[tabindex]:not([tabindex='-1'])",
    "[contenteditable='true']",
    "[contenteditable='']",
    "[draggable='true']",
];

/// Custom data hooks and conventional class names.
pub const CUSTOM_HOOKS: &[&str] = &[
    "[data-toggle]",
    "[data-action]",
    "[data-click]",
    "[data-target]",
    "[data-href]",
    ".btn",
    ".button",
    ".clickable",
    ".interactive",
    ".selectable",
];

/// Click bindings of common UI frameworks (AngularJS, Vue, Bootstrap).
pub const FRAMEWORK_HOOKS: &[&str] = &[
    "[ng-click]",
    r"[v-on\:click]",
    r"[\@click]",
    "[data-bs-toggle]",
    "[data-toggle]",
];

/// Script anchors and labels bound to form controls.
pub const LINKS_AND_LABELS: &[&str] = &[
    "a[href^='javascript:']",
    "a[href='#']",
    "label[for]",
    "label:has(input)",
    "label:has(textarea)",
    "label:has(select)",
];

const CATALOG: &[&[&str]] = &[
    BASIC,
    FORM_INPUTS,
    FORM_ELEMENTS,
    INTERACTIVE_CONTENT,
    ARIA_ROLES,
    EVENT_HANDLERS,
    INTERACTIVE_ATTRIBUTES,
    CUSTOM_HOOKS,
    FRAMEWORK_HOOKS,
    LINKS_AND_LABELS,
];

/// Every selector in catalog order, first occurrence kept.
pub fn interactive_selectors() -> Vec<&'static str> {
    let mut seen = std::collections::HashSet::new();
    CATALOG
        .iter()
        .flat_map(|group| group.iter().copied())
        .filter(|s| seen.insert(*s))
        .collect()
}

/// The whole catalog as one comma-separated selector list.
pub fn interactive_selector() -> String {
    interactive_selectors().join(",")
}
