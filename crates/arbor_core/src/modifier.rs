//! Modifiers and modifier reduction
//!
//! A modifier decorates an element without changing its identity. There are
//! two flavours:
//!
//! - **Attribute** modifiers are plain values handed to the rendering backend
//!   (corner radius, tap handler, disabled flag)
//! - **Composed** modifiers expand into further elements through `body`
//!
//! [`reduce`] unwraps every modifier layer around an element and returns the
//! innermost non-modified element together with an ordered [`ModifierSet`].

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::element::Element;
use crate::error::{ReconcileError, Result};

/// A value-like modifier passed to the rendering backend
pub trait AttributeModifier: Any + fmt::Debug {
    /// Full type name, generic parameters included
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether descendants inherit this modifier
    fn propagates(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn AttributeModifier {
    pub fn downcast_ref<T: AttributeModifier>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A modifier that expands into further elements
pub trait ComposedModifier: Any + fmt::Debug {
    fn body(&self, content: Element) -> Element;
}

/// One modifier layer of a modified element
#[derive(Clone, Debug)]
pub enum Modifier {
    Attribute(Rc<dyn AttributeModifier>),
    Composed(Rc<dyn ComposedModifier>),
}

/// Ordered set of attribute modifiers, one entry per concrete modifier type.
///
/// Inserting a modifier whose type is already present replaces the value but
/// keeps the original position. `Tagged<u8>` and `Tagged<String>` are
/// different types here.
#[derive(Clone, Debug, Default)]
pub struct ModifierSet {
    entries: IndexMap<TypeId, Rc<dyn AttributeModifier>, FxBuildHasher>,
}

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a modifier, replacing any modifier of the same type in place
    pub fn insert(&mut self, modifier: Rc<dyn AttributeModifier>) {
        self.entries.insert(modifier.as_any().type_id(), modifier);
    }

    /// Typed lookup
    pub fn get<M: AttributeModifier>(&self) -> Option<&M> {
        self.entries
            .get(&TypeId::of::<M>())
            .and_then(|modifier| modifier.downcast_ref::<M>())
    }

    pub fn contains<M: AttributeModifier>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<M>())
    }

    /// Modifiers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn AttributeModifier>> {
        self.entries.values()
    }

    /// Modifier type names in insertion order
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.values().map(|modifier| modifier.type_name())
    }

    /// Merge `other` on top of `self`; `other` wins for shared types
    pub fn merged_with(&self, other: &ModifierSet) -> ModifierSet {
        let mut merged = self.clone();
        for modifier in other.iter() {
            merged.insert(modifier.clone());
        }
        merged
    }

    /// The modifiers descendants inherit
    pub fn propagating(&self) -> ModifierSet {
        ModifierSet {
            entries: self
                .entries
                .iter()
                .filter(|(_, modifier)| modifier.propagates())
                .map(|(type_id, modifier)| (*type_id, modifier.clone()))
                .collect(),
        }
    }
}

/// Unwrap all modifier layers around `element`.
///
/// Returns the first non-modified element and the attribute modifiers found on
/// the way, outer to inner. Composed modifiers are expanded with the wrapped
/// content and reduction continues on their body. More than `max_depth` steps
/// means the chain never terminates.
pub fn reduce(element: &Element, max_depth: usize) -> Result<(Element, ModifierSet)> {
    let mut modifiers = ModifierSet::new();
    let mut current = element.clone();
    let mut steps = 0usize;

    loop {
        let next = match &current {
            Element::Modified(modified) => {
                steps += 1;
                if steps > max_depth {
                    return Err(ReconcileError::UnterminatedModifierChain(max_depth));
                }
                match &modified.modifier {
                    Modifier::Attribute(modifier) => {
                        modifiers.insert(modifier.clone());
                        modified.content.clone()
                    }
                    Modifier::Composed(modifier) => modifier.body(modified.content.clone()),
                }
            }
            _ => break,
        };
        current = next;
    }

    Ok((current, modifiers))
}
