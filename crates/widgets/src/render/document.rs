//! Strict in-memory document model.
//!
//! A [`Document`] holds the elements a page has mounted, keyed by the
//! selector widgets address them with. Applying a patch to an element the
//! page never mounted fails with [`RenderError::MissingTarget`], the way a
//! script dereferencing `querySelector(...)` on a page missing that element
//! throws.

use std::collections::{BTreeMap, BTreeSet};

use super::{Patch, RenderError, RenderSink, Target};

/// Rendered state of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    /// Markup of the element (outer HTML after a `Replace`, inner HTML after `SetInnerHtml`).
    pub html: String,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: BTreeSet<String>,
    pub styles: BTreeMap<String, String>,
    pub value: String,
    pub open: bool,
    /// Number of times the element was replaced wholesale.
    pub replacements: u32,
}

impl Node {
    /// Whether the element carries the boolean `hidden` attribute.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.attributes.contains_key("hidden")
    }

    /// Whether the element carries the boolean `disabled` attribute.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.attributes.contains_key("disabled")
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

/// A page whose mounted elements are known up front.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: BTreeMap<Target, Node>,
    url_params: BTreeMap<String, String>,
    focused: Option<Target>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount an empty element.
    #[must_use]
    pub fn with(mut self, target: Target) -> Self {
        self.mount(target, Node::default());
        self
    }

    /// Mount several empty elements.
    #[must_use]
    pub fn with_all(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        for target in targets {
            self.mount(target, Node::default());
        }
        self
    }

    /// Mount an element with initial state, replacing any existing one.
    pub fn mount(&mut self, target: Target, node: Node) {
        self.nodes.insert(target, node);
    }

    #[must_use]
    pub fn node(&self, target: &Target) -> Option<&Node> {
        self.nodes.get(target)
    }

    #[must_use]
    pub fn url_param(&self, name: &str) -> Option<&str> {
        self.url_params.get(name).map(String::as_str)
    }

    /// The element that last received focus.
    #[must_use]
    pub const fn focused(&self) -> Option<&Target> {
        self.focused.as_ref()
    }

    fn node_mut(&mut self, target: &Target) -> Result<&mut Node, RenderError> {
        self.nodes
            .get_mut(target)
            .ok_or_else(|| RenderError::MissingTarget(target.to_string()))
    }
}

impl RenderSink for Document {
    fn apply(&mut self, patch: &Patch) -> Result<(), RenderError> {
        match patch {
            Patch::Replace { target, html } => {
                let node = self.node_mut(target)?;
                node.html.clone_from(html);
                node.replacements += 1;
            }
            Patch::SetInnerHtml { target, html } => {
                self.node_mut(target)?.html.clone_from(html);
            }
            Patch::SetText { target, text } => {
                self.node_mut(target)?.text.clone_from(text);
            }
            Patch::SetAttribute {
                target,
                name,
                value,
            } => {
                self.node_mut(target)?
                    .attributes
                    .insert(name.clone(), value.clone());
            }
            Patch::RemoveAttribute { target, name } => {
                self.node_mut(target)?.attributes.remove(name);
            }
            Patch::SetClass {
                target,
                class,
                enabled,
            } => {
                let classes = &mut self.node_mut(target)?.classes;
                if *enabled {
                    classes.insert(class.clone());
                } else {
                    classes.remove(class);
                }
            }
            Patch::SetDisabled { target, disabled } => {
                toggle_attribute(self.node_mut(target)?, "disabled", *disabled);
            }
            Patch::SetHidden { target, hidden } => {
                toggle_attribute(self.node_mut(target)?, "hidden", *hidden);
            }
            Patch::SetStyle {
                target,
                property,
                value,
            } => {
                self.node_mut(target)?
                    .styles
                    .insert(property.clone(), value.clone());
            }
            Patch::SetValue { target, value } => {
                self.node_mut(target)?.value.clone_from(value);
            }
            Patch::Focus { target } => {
                self.node_mut(target)?;
                self.focused = Some(target.clone());
            }
            Patch::OpenDialog { target } => self.node_mut(target)?.open = true,
            Patch::CloseDialog { target } => self.node_mut(target)?.open = false,
            Patch::SetUrlParam { name, value } => {
                self.url_params.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}

fn toggle_attribute(node: &mut Node, name: &str, present: bool) {
    if present {
        node.attributes.insert(name.to_string(), String::new());
    } else {
        node.attributes.remove(name);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_target_is_an_error() {
        let mut doc = Document::new();
        let err = doc
            .apply(&Patch::text(Target::CART_STATUS, "1 item"))
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingTarget(sel) if sel == "#cart-status"));
    }

    #[test]
    fn test_apply_all_stops_at_first_missing() {
        let mut doc = Document::new().with(Target::CART_STATUS);
        let result = doc.apply_all(&[
            Patch::text(Target::CART_STATUS, "2 items"),
            Patch::text(Target::CART_DRAWER_TITLE, "Cart"),
            Patch::text(Target::CART_STATUS, "never"),
        ]);

        assert!(result.is_err());
        // Earlier patches stay applied
        assert_eq!(doc.node(&Target::CART_STATUS).unwrap().text, "2 items");
    }

    #[test]
    fn test_boolean_attributes_and_classes() {
        let mut doc = Document::new().with(Target::ADD_BUTTON);
        doc.apply_all(&[
            Patch::disabled(Target::ADD_BUTTON, true),
            Patch::class(Target::ADD_BUTTON, "loading", true),
        ])
        .unwrap();
        let node = doc.node(&Target::ADD_BUTTON).unwrap();
        assert!(node.is_disabled());
        assert!(node.has_class("loading"));

        doc.apply_all(&[
            Patch::disabled(Target::ADD_BUTTON, false),
            Patch::class(Target::ADD_BUTTON, "loading", false),
        ])
        .unwrap();
        let node = doc.node(&Target::ADD_BUTTON).unwrap();
        assert!(!node.is_disabled());
        assert!(!node.has_class("loading"));
    }

    #[test]
    fn test_focus_and_url_params() {
        let focus = Target::cart_focus("qty-1");
        let mut doc = Document::new().with(focus.clone());
        doc.apply_all(&[
            Patch::Focus {
                target: focus.clone(),
            },
            Patch::SetUrlParam {
                name: "variant".to_string(),
                value: "42".to_string(),
            },
        ])
        .unwrap();
        assert_eq!(doc.focused(), Some(&focus));
        assert_eq!(doc.url_param("variant"), Some("42"));
    }
}
