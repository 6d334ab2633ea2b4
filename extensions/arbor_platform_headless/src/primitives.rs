//! Primitive vocabulary understood by the headless backend

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use arbor_core::{Element, Primitive};

/// Action run when a button is tapped
pub type Action = Rc<dyn Fn()>;

/// A run of text
#[derive(Clone, Debug, PartialEq)]
pub struct Text {
    pub content: String,
}

impl Primitive for Text {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl From<Text> for Element {
    fn from(text: Text) -> Self {
        Element::primitive(text)
    }
}

/// A labelled button
#[derive(Clone)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button").field("label", &self.label).finish()
    }
}

impl Primitive for Button {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl From<Button> for Element {
    fn from(button: Button) -> Self {
        Element::primitive(button)
    }
}

/// Stacking direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}

/// Container laying its children out along one axis
#[derive(Clone, Debug, Default)]
pub struct Stack {
    pub axis: Axis,
    pub spacing: f32,
    pub children: Vec<Element>,
}

impl Stack {
    pub fn new(axis: Axis, children: impl Into<Vec<Element>>) -> Self {
        Self {
            axis,
            spacing: 0.0,
            children: children.into(),
        }
    }

    /// Set the gap between children
    pub fn spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }
}

impl Primitive for Stack {
    fn children(&self) -> &[Element] {
        &self.children
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl From<Stack> for Element {
    fn from(stack: Stack) -> Self {
        Element::primitive(stack)
    }
}

/// Flexible empty space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spacer {
    pub min_length: f32,
}

impl Primitive for Spacer {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

pub fn text(content: impl Into<String>) -> Element {
    Text {
        content: content.into(),
    }
    .into()
}

pub fn button(label: impl Into<String>, action: impl Fn() + 'static) -> Element {
    Button {
        label: label.into(),
        action: Rc::new(action),
    }
    .into()
}

/// Vertical stack of `children`
pub fn vstack(children: impl Into<Vec<Element>>) -> Stack {
    Stack::new(Axis::Vertical, children)
}

/// Horizontal stack of `children`
pub fn hstack(children: impl Into<Vec<Element>>) -> Stack {
    Stack::new(Axis::Horizontal, children)
}

pub fn spacer() -> Element {
    Element::primitive(Spacer::default())
}
