//! Declarative element model
//!
//! An [`Element`] is an immutable description of one node of desired UI. The
//! set of element kinds is closed:
//!
//! - **Empty** renders nothing
//! - **Primitive** maps to one unit of platform content, optionally holding
//!   child elements (a stack, a list)
//! - **Modified** wraps an inner element with one modifier
//! - **Composite** computes a replacement element from its own state
//!
//! Elements are cheap to clone; payloads are reference counted.
//!
//! # Example
//!
//! ```
//! use arbor_core::{Component, Element, Primitive, State, PropertyRef, DynamicProperty};
//! use std::any::Any;
//!
//! #[derive(Debug)]
//! struct Label(String);
//!
//! impl Primitive for Label {
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct Greeting {
//!     name: State<String>,
//! }
//!
//! impl Component for Greeting {
//!     fn properties(&self) -> Vec<PropertyRef<'_>> {
//!         vec![self.name.as_property()]
//!     }
//!
//!     fn body(&self) -> Element {
//!         Element::primitive(Label(format!("Hello, {}", self.name.get())))
//!     }
//! }
//!
//! let element = Element::composite(Greeting { name: State::new("Arbor".to_string()) });
//! assert!(element.identity().name().ends_with("Greeting"));
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::modifier::{AttributeModifier, ComposedModifier, Modifier};
use crate::property::PropertyRef;

/// Type-constructor identity of an element.
///
/// The full type name with generic parameters stripped, so two elements built
/// from the same type constructor match regardless of their parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdentity(&'static str);

impl TypeIdentity {
    /// Identity shared by every empty element
    pub const EMPTY: TypeIdentity = TypeIdentity("Empty");
    /// Identity shared by every modified element
    pub const MODIFIED: TypeIdentity = TypeIdentity("Modified");

    /// Identity of a Rust type
    pub fn of<T: ?Sized>() -> Self {
        Self::from_type_name(std::any::type_name::<T>())
    }

    /// Strip the generic parameter list from a type name
    pub fn from_type_name(name: &'static str) -> Self {
        match name.find('<') {
            Some(end) => TypeIdentity(&name[..end]),
            None => TypeIdentity(name),
        }
    }

    /// The stripped type name
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A terminal element rendered directly by the rendering backend.
///
/// The backend recognizes primitives by downcasting through [`Primitive::as_any`];
/// a primitive it does not know is a configuration error.
pub trait Primitive: Any + fmt::Debug {
    /// Type-constructor identity used to match hosts across renders
    fn identity(&self) -> TypeIdentity {
        TypeIdentity::of::<Self>()
    }

    /// Child elements for container primitives
    fn children(&self) -> &[Element] {
        &[]
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Primitive {
    /// Downcast to a concrete primitive type
    pub fn downcast_ref<T: Primitive>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// An element whose content is computed by `body` from its own state.
///
/// Stateful fields are declared through [`Component::properties`], an ordered
/// list that must be the same for every value of the implementing type. State
/// is matched across renders by position in that list.
pub trait Component: Any + fmt::Debug {
    /// Type-constructor identity used to match hosts across renders
    fn identity(&self) -> TypeIdentity {
        TypeIdentity::of::<Self>()
    }

    /// Dynamic properties in declaration order
    fn properties(&self) -> Vec<PropertyRef<'_>> {
        Vec::new()
    }

    /// Compute the replacement element
    fn body(&self) -> Element;
}

/// An element wrapped in one modifier
#[derive(Debug)]
pub struct ModifiedElement {
    pub content: Element,
    pub modifier: Modifier,
}

/// The four element kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Empty,
    Primitive,
    Modified,
    Composite,
}

impl ElementKind {
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Empty => "Empty",
            ElementKind::Primitive => "Primitive",
            ElementKind::Modified => "Modified",
            ElementKind::Composite => "Composite",
        }
    }
}

/// Immutable description of one node of desired UI
#[derive(Clone, Debug, Default)]
pub enum Element {
    #[default]
    Empty,
    Primitive(Rc<dyn Primitive>),
    Modified(Rc<ModifiedElement>),
    Composite(Rc<dyn Component>),
}

impl Element {
    /// An element that renders nothing
    pub fn empty() -> Self {
        Element::Empty
    }

    pub fn primitive(primitive: impl Primitive) -> Self {
        Element::Primitive(Rc::new(primitive))
    }

    pub fn composite(component: impl Component) -> Self {
        Element::Composite(Rc::new(component))
    }

    /// Wrap this element in a modifier
    pub fn modified(self, modifier: Modifier) -> Self {
        Element::Modified(Rc::new(ModifiedElement {
            content: self,
            modifier,
        }))
    }

    /// Wrap this element in an attribute modifier
    pub fn modifier(self, modifier: impl AttributeModifier) -> Self {
        self.modified(Modifier::Attribute(Rc::new(modifier)))
    }

    /// Wrap this element in a composed modifier
    pub fn compose(self, modifier: impl ComposedModifier) -> Self {
        self.modified(Modifier::Composed(Rc::new(modifier)))
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Empty => ElementKind::Empty,
            Element::Primitive(_) => ElementKind::Primitive,
            Element::Modified(_) => ElementKind::Modified,
            Element::Composite(_) => ElementKind::Composite,
        }
    }

    /// Type-constructor identity, compared positionally by the reconciler
    pub fn identity(&self) -> TypeIdentity {
        match self {
            Element::Empty => TypeIdentity::EMPTY,
            Element::Primitive(primitive) => primitive.identity(),
            Element::Modified(_) => TypeIdentity::MODIFIED,
            Element::Composite(component) => component.identity(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Element::Empty)
    }
}

impl From<Option<Element>> for Element {
    fn from(element: Option<Element>) -> Self {
        element.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Counter, Label, Stack};

    #[test]
    fn test_identity_strips_generics() {
        assert_eq!(
            TypeIdentity::of::<Vec<u8>>(),
            TypeIdentity::of::<Vec<String>>()
        );
        assert_eq!(
            TypeIdentity::from_type_name("app::List<app::Row<u32>>").name(),
            "app::List"
        );
        assert_ne!(TypeIdentity::of::<Label>(), TypeIdentity::of::<Stack>());
    }

    #[test]
    fn test_element_kinds_and_identity() {
        let label = Element::primitive(Label::new("a"));
        assert_eq!(label.kind(), ElementKind::Primitive);
        assert_eq!(label.identity(), TypeIdentity::of::<Label>());

        let counter = Element::composite(Counter::new(0));
        assert_eq!(counter.kind(), ElementKind::Composite);
        assert_eq!(counter.identity(), TypeIdentity::of::<Counter>());

        assert_eq!(Element::empty().identity(), TypeIdentity::EMPTY);
        assert_eq!(
            Element::from(None::<Element>).kind(),
            ElementKind::Empty
        );
    }

    #[test]
    fn test_modified_elements_share_identity() {
        use crate::testing::{Radius, Tint};

        let a = Element::primitive(Label::new("a")).modifier(Radius(1.0));
        let b = Element::composite(Counter::new(0)).modifier(Tint(2));
        assert_eq!(a.identity(), TypeIdentity::MODIFIED);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_primitive_downcast() {
        let element = Element::primitive(Label::new("hi"));
        let Element::Primitive(primitive) = element else {
            panic!("expected primitive");
        };
        assert_eq!(primitive.downcast_ref::<Label>().unwrap().text, "hi");
        assert!(primitive.downcast_ref::<Stack>().is_none());
    }
}
