//! In-memory rendering backend
//!
//! Views live in a slot-map arena. Each view keeps its kind, its resolved
//! attributes and its ordered children, so tests can inspect exactly what a
//! real platform would display. Every backend call is appended to an
//! operation log.

use std::fmt::{self, Write as _};
use std::rc::Rc;

use arbor_core::{ModifierSet, Primitive, RenderingBackend};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::error::{HeadlessError, Result};
use crate::modifiers::{CornerRadius, Disabled, OnTap, Padding};
use crate::primitives::{Axis, Button, Spacer, Stack, Text};

new_key_type! {
    /// Handle of a headless view
    pub struct ViewId;
}

/// What a view displays
#[derive(Clone, Debug, PartialEq)]
pub enum ViewKind {
    Text { content: String },
    Button { label: String },
    Stack { axis: Axis, spacing: f32 },
    Spacer { min_length: f32 },
}

impl ViewKind {
    fn from_primitive(primitive: &dyn Primitive) -> Option<Self> {
        let any = primitive.as_any();
        if let Some(text) = any.downcast_ref::<Text>() {
            Some(ViewKind::Text {
                content: text.content.clone(),
            })
        } else if let Some(button) = any.downcast_ref::<Button>() {
            Some(ViewKind::Button {
                label: button.label.clone(),
            })
        } else if let Some(stack) = any.downcast_ref::<Stack>() {
            Some(ViewKind::Stack {
                axis: stack.axis,
                spacing: stack.spacing,
            })
        } else {
            any.downcast_ref::<Spacer>().map(|spacer| ViewKind::Spacer {
                min_length: spacer.min_length,
            })
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewKind::Text { .. } => "Text",
            ViewKind::Button { .. } => "Button",
            ViewKind::Stack {
                axis: Axis::Vertical,
                ..
            } => "VStack",
            ViewKind::Stack {
                axis: Axis::Horizontal,
                ..
            } => "HStack",
            ViewKind::Spacer { .. } => "Spacer",
        }
    }

    /// Text shown by the view, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            ViewKind::Text { content } => Some(content),
            ViewKind::Button { label } => Some(label),
            _ => None,
        }
    }
}

/// Attributes resolved from the modifiers applied to a view
#[derive(Clone, Default)]
pub struct Attributes {
    pub corner_radius: Option<f32>,
    pub padding: Option<f32>,
    pub disabled: bool,
    pub on_tap: Option<Rc<dyn Fn()>>,
}

impl Attributes {
    fn from_modifiers(modifiers: &ModifierSet) -> Self {
        Self {
            corner_radius: modifiers.get::<CornerRadius>().map(|radius| radius.0),
            padding: modifiers.get::<Padding>().map(|padding| padding.0),
            disabled: modifiers.get::<Disabled>().is_some_and(|disabled| disabled.0),
            on_tap: modifiers.get::<OnTap>().map(|on_tap| on_tap.0.clone()),
        }
    }

    fn describe(&self) -> Option<String> {
        let mut parts: SmallVec<[String; 4]> = SmallVec::new();
        if let Some(radius) = self.corner_radius {
            parts.push(format!("radius={radius}"));
        }
        if let Some(padding) = self.padding {
            parts.push(format!("padding={padding}"));
        }
        if self.disabled {
            parts.push("disabled".to_string());
        }
        if self.on_tap.is_some() {
            parts.push("on_tap".to_string());
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attributes")
            .field("corner_radius", &self.corner_radius)
            .field("padding", &self.padding)
            .field("disabled", &self.disabled)
            .field("on_tap", &self.on_tap.is_some())
            .finish()
    }
}

/// One unit of platform content
pub struct View {
    pub kind: ViewKind,
    pub attributes: Attributes,
    pub parent: Option<ViewId>,
    pub children: Vec<ViewId>,
    /// Button action, kept apart from the displayable kind
    action: Option<Rc<dyn Fn()>>,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("kind", &self.kind)
            .field("attributes", &self.attributes)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

/// Backend call recorded in the operation log
#[derive(Clone, Debug, PartialEq)]
pub enum ViewOp {
    Create { view: ViewId, kind: &'static str },
    Update { view: ViewId },
    Remove { view: ViewId },
}

/// Rendering backend keeping views in memory
#[derive(Default)]
pub struct HeadlessBackend {
    views: SlotMap<ViewId, View>,
    /// Views attached to no parent, in order
    top_level: Vec<ViewId>,
    log: Vec<ViewOp>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(id)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Live views attached to no parent
    pub fn top_level(&self) -> &[ViewId] {
        &self.top_level
    }

    pub fn operations(&self) -> &[ViewOp] {
        &self.log
    }

    /// Drain the operation log
    pub fn take_operations(&mut self) -> Vec<ViewOp> {
        std::mem::take(&mut self.log)
    }

    /// First view, in display order, whose text equals `text`
    pub fn find_text(&self, text: &str) -> Option<ViewId> {
        self.display_order()
            .into_iter()
            .find(|&id| self.views[id].kind.text() == Some(text))
    }

    /// Texts of all text and button views in display order
    pub fn texts(&self) -> Vec<String> {
        self.display_order()
            .into_iter()
            .filter_map(|id| self.views[id].kind.text().map(str::to_string))
            .collect()
    }

    fn display_order(&self) -> Vec<ViewId> {
        let mut out = Vec::with_capacity(self.views.len());
        let mut stack: Vec<ViewId> = self.top_level.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(view) = self.views.get(id) {
                out.push(id);
                stack.extend(view.children.iter().rev().copied());
            }
        }
        out
    }

    /// Handler a tap on `id` runs: the nearest `OnTap` at or above the view,
    /// or the action of the nearest button
    pub fn tap_handler(&self, id: ViewId) -> Result<Rc<dyn Fn()>> {
        let mut current = Some(id);
        if !self.views.contains_key(id) {
            return Err(HeadlessError::UnknownView(id));
        }

        while let Some(view_id) = current {
            let Some(view) = self.views.get(view_id) else {
                break;
            };
            let handler = view.attributes.on_tap.clone().or_else(|| view.action.clone());
            if let Some(handler) = handler {
                if view.attributes.disabled {
                    return Err(HeadlessError::Disabled(view_id));
                }
                return Ok(handler);
            }
            current = view.parent;
        }
        Err(HeadlessError::NotTappable(id))
    }

    /// Indented snapshot of every live view
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        for &id in &self.top_level {
            self.render_view(id, 0, &mut out);
        }
        out
    }

    fn render_view(&self, id: ViewId, depth: usize, out: &mut String) {
        let Some(view) = self.views.get(id) else {
            return;
        };
        let _ = write!(out, "{:indent$}{}", "", view.kind.name(), indent = depth * 2);
        match &view.kind {
            ViewKind::Text { content } => {
                let _ = write!(out, " {content:?}");
            }
            ViewKind::Button { label } => {
                let _ = write!(out, " {label:?}");
            }
            ViewKind::Stack { spacing, .. } if *spacing > 0.0 => {
                let _ = write!(out, " spacing={spacing}");
            }
            ViewKind::Spacer { min_length } if *min_length > 0.0 => {
                let _ = write!(out, " min={min_length}");
            }
            _ => {}
        }
        if let Some(attributes) = view.attributes.describe() {
            let _ = write!(out, " [{attributes}]");
        }
        out.push('\n');
        for &child in &view.children {
            self.render_view(child, depth + 1, out);
        }
    }

    fn siblings_mut(&mut self, parent: Option<ViewId>) -> Option<&mut Vec<ViewId>> {
        match parent {
            Some(parent) => self.views.get_mut(parent).map(|view| &mut view.children),
            None => Some(&mut self.top_level),
        }
    }

    fn release(&mut self, id: ViewId) {
        if let Some(view) = self.views.remove(id) {
            for child in view.children {
                self.release(child);
            }
        }
    }
}

impl RenderingBackend for HeadlessBackend {
    type Handle = ViewId;

    fn add_child(
        &mut self,
        primitive: &dyn Primitive,
        preceding: Option<&ViewId>,
        modifiers: &ModifierSet,
        parent: Option<&ViewId>,
    ) -> Option<ViewId> {
        let kind = ViewKind::from_primitive(primitive)?;
        if let Some(parent) = parent.filter(|parent| !self.views.contains_key(**parent)) {
            tracing::warn!("refusing {} under unknown parent {:?}", kind.name(), parent);
            return None;
        }
        let parent = parent.copied();
        let name = kind.name();
        let action = primitive
            .as_any()
            .downcast_ref::<Button>()
            .map(|button| button.action.clone());

        let id = self.views.insert(View {
            kind,
            attributes: Attributes::from_modifiers(modifiers),
            parent,
            children: Vec::new(),
            action,
        });
        if let Some(siblings) = self.siblings_mut(parent) {
            let position = preceding
                .and_then(|preceding| siblings.iter().position(|view| view == preceding))
                .map_or(0, |position| position + 1);
            siblings.insert(position, id);
        }

        tracing::trace!("created {} {:?}", name, id);
        self.log.push(ViewOp::Create { view: id, kind: name });
        Some(id)
    }

    fn update(&mut self, handle: &ViewId, primitive: &dyn Primitive, modifiers: &ModifierSet) {
        let Some(kind) = ViewKind::from_primitive(primitive) else {
            tracing::warn!("update of {:?} with foreign primitive ignored", handle);
            return;
        };
        let action = primitive
            .as_any()
            .downcast_ref::<Button>()
            .map(|button| button.action.clone());
        let Some(view) = self.views.get_mut(*handle) else {
            tracing::warn!("update of unknown view {:?} ignored", handle);
            return;
        };

        view.kind = kind;
        view.attributes = Attributes::from_modifiers(modifiers);
        view.action = action;
        self.log.push(ViewOp::Update { view: *handle });
    }

    fn remove_child(&mut self, handle: &ViewId, parent: Option<&ViewId>) {
        // Removing a view releases its subtree, so descendants may already be gone
        if !self.views.contains_key(*handle) {
            return;
        }
        if let Some(siblings) = self.siblings_mut(parent.copied()) {
            siblings.retain(|view| view != handle);
        }
        self.release(*handle);
        tracing::trace!("removed {:?}", handle);
        self.log.push(ViewOp::Remove { view: *handle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::HeadlessModifiers;
    use crate::primitives::{button, text, vstack};
    use arbor_core::{reduce, Element};
    use std::cell::Cell;

    fn add(
        backend: &mut HeadlessBackend,
        element: &Element,
        preceding: Option<ViewId>,
        parent: Option<ViewId>,
    ) -> ViewId {
        let (base, modifiers) = reduce(element, 16).unwrap();
        let Element::Primitive(primitive) = base else {
            panic!("expected a primitive");
        };
        backend
            .add_child(&*primitive, preceding.as_ref(), &modifiers, parent.as_ref())
            .unwrap()
    }

    #[test]
    fn test_insertion_after_preceding() {
        let mut backend = HeadlessBackend::new();
        let stack = add(&mut backend, &vstack(Vec::<Element>::new()).into(), None, None);
        let c = add(&mut backend, &text("c"), None, Some(stack));
        let a = add(&mut backend, &text("a"), None, Some(stack));
        add(&mut backend, &text("b"), Some(a), Some(stack));

        assert_eq!(backend.texts(), vec!["a", "b", "c"]);
        assert_eq!(backend.view(c).unwrap().parent, Some(stack));
    }

    #[test]
    fn test_unknown_parent_is_refused() {
        let mut backend = HeadlessBackend::new();
        let stack = add(&mut backend, &vstack(Vec::<Element>::new()).into(), None, None);
        backend.remove_child(&stack, None);

        let modifiers = ModifierSet::new();
        let orphan = Text {
            content: "orphan".to_string(),
        };
        assert!(backend
            .add_child(&orphan, None, &modifiers, Some(&stack))
            .is_none());
        assert!(backend.is_empty());
        assert!(backend.top_level().is_empty());
    }

    #[test]
    fn test_remove_releases_subtree() {
        let mut backend = HeadlessBackend::new();
        let stack = add(&mut backend, &vstack(Vec::<Element>::new()).into(), None, None);
        let child = add(&mut backend, &text("a"), None, Some(stack));

        backend.remove_child(&stack, None);
        assert!(backend.is_empty());
        // The reconciler still removes the child afterwards
        backend.remove_child(&child, Some(&stack));
        assert_eq!(backend.operations().len(), 3);
    }

    #[test]
    fn test_tap_bubbles_to_handler() {
        let mut backend = HeadlessBackend::new();
        let taps = Rc::new(Cell::new(0));
        let taps_clone = taps.clone();
        let stack = add(
            &mut backend,
            &vstack(Vec::<Element>::new()).on_tap(move || taps_clone.set(taps_clone.get() + 1)),
            None,
            None,
        );
        let label = add(&mut backend, &text("inside"), None, Some(stack));

        backend.tap_handler(label).unwrap()();
        assert_eq!(taps.get(), 1);
    }

    #[test]
    fn test_disabled_button_rejects_tap() {
        let mut backend = HeadlessBackend::new();
        let id = add(&mut backend, &button("Go", || {}).disabled(true), None, None);
        assert!(matches!(
            backend.tap_handler(id),
            Err(HeadlessError::Disabled(view)) if view == id
        ));

        let plain = add(&mut backend, &text("plain"), None, None);
        assert!(matches!(
            backend.tap_handler(plain),
            Err(HeadlessError::NotTappable(_))
        ));
    }

    #[test]
    fn test_render_tree_lists_attributes() {
        let mut backend = HeadlessBackend::new();
        let stack = add(&mut backend, &vstack(Vec::<Element>::new()).spacing(4.0).card(), None, None);
        add(&mut backend, &text("hi"), None, Some(stack));

        assert_eq!(
            backend.render_tree(),
            "VStack spacing=4 [radius=8 padding=12]\n  Text \"hi\"\n"
        );
    }
}
