//! Rendering backend contract

use std::fmt;

use crate::element::Primitive;
use crate::modifier::ModifierSet;

/// Platform rendering backend
///
/// Implemented once per platform. The reconciler calls it synchronously from
/// within host render, update and dismantle; it never inspects the platform
/// content behind a handle.
pub trait RenderingBackend {
    /// Handle to one unit of platform content
    type Handle: Clone + fmt::Debug + PartialEq;

    /// Create platform content for a primitive and attach it to `parent`.
    ///
    /// The new content goes directly after `preceding`, or first within the
    /// parent when `preceding` is `None`. Returning `None` means the primitive
    /// is not part of this backend's vocabulary.
    fn add_child(
        &mut self,
        primitive: &dyn Primitive,
        preceding: Option<&Self::Handle>,
        modifiers: &ModifierSet,
        parent: Option<&Self::Handle>,
    ) -> Option<Self::Handle>;

    /// Refresh existing content from a new primitive value and modifier set
    fn update(&mut self, handle: &Self::Handle, primitive: &dyn Primitive, modifiers: &ModifierSet);

    /// Detach content from its parent and release it
    fn remove_child(&mut self, handle: &Self::Handle, parent: Option<&Self::Handle>);
}
