//! Child list builders
//!
//! Container primitives take their children as a `Vec<Element>`. Children are
//! matched by position, so conditional children should keep their slot: an
//! absent conditional child becomes [`Element::Empty`] instead of shifting its
//! later siblings.
//!
//! ```
//! use arbor_core::{elements, Children, Element};
//!
//! let show_footer = false;
//! let children = Children::new()
//!     .child(Element::empty())
//!     .child_if(show_footer, Element::empty)
//!     .build();
//! assert_eq!(children.len(), 2);
//!
//! let same: Vec<Element> = elements![Element::empty(), Element::empty()];
//! assert_eq!(same.len(), 2);
//! ```

use crate::element::Element;

/// Build a `Vec<Element>` from anything convertible into an element
#[macro_export]
macro_rules! elements {
    () => {
        ::std::vec::Vec::<$crate::Element>::new()
    };
    ($($child:expr),+ $(,)?) => {
        ::std::vec![$($crate::Element::from($child)),+]
    };
}

/// Builder for an ordered child list
#[derive(Clone, Debug, Default)]
pub struct Children {
    elements: Vec<Element>,
}

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child element
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.elements.push(child.into());
        self
    }

    /// Add a child built by `f` when `condition` holds, a placeholder otherwise
    pub fn child_if(mut self, condition: bool, f: impl FnOnce() -> Element) -> Self {
        self.elements
            .push(if condition { f() } else { Element::Empty });
        self
    }

    /// Add multiple children
    pub fn extend<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.elements.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn build(self) -> Vec<Element> {
        self.elements
    }
}

impl FromIterator<Element> for Children {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl From<Children> for Vec<Element> {
    fn from(children: Children) -> Self {
        children.elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use crate::testing::Label;

    #[test]
    fn test_conditional_child_keeps_its_slot() {
        let build = |flag: bool| {
            Children::new()
                .child(Element::primitive(Label::new("a")))
                .child_if(flag, || Element::primitive(Label::new("b")))
                .child(Element::primitive(Label::new("c")))
                .build()
        };

        let with = build(true);
        let without = build(false);
        assert_eq!(with.len(), 3);
        assert_eq!(without.len(), 3);
        assert_eq!(without[1].kind(), ElementKind::Empty);
        assert_eq!(with[2].identity(), without[2].identity());
    }

    #[test]
    fn test_extend_and_collect() {
        let children = Children::new()
            .extend(["x", "y"].map(|text| Element::primitive(Label::new(text))))
            .child(None::<Element>);
        assert_eq!(children.len(), 3);

        let collected: Children = (0..4).map(|_| Element::empty()).collect();
        assert_eq!(Vec::from(collected).len(), 4);
    }

    #[test]
    fn test_elements_macro() {
        let empty: Vec<Element> = elements![];
        assert!(empty.is_empty());

        let list = elements![Element::primitive(Label::new("a")), None::<Element>,];
        assert_eq!(list.len(), 2);
        assert!(list[1].is_empty());
    }
}
