//! Arbor Core Runtime
//!
//! This crate provides the retained-mode core of the Arbor UI framework:
//!
//! - **Element Model**: Declarative, immutable element trees with modifiers
//! - **Dynamic Properties**: Host-owned state and observed publishers
//! - **Host Tree**: Live, identity-preserving counterparts of mounted elements
//! - **Reconciler**: Mount, update and dismantle against a rendering backend
//! - **Update Scheduler**: Coalesces state changes into one flush per turn
//!
//! Platforms plug in through [`RenderingBackend`] and a scheduling hook that
//! runs a closure on the next main-loop turn.
//!
//! # Example
//!
//! ```rust
//! use arbor_core::prelude::*;
//! use std::any::Any;
//!
//! #[derive(Debug)]
//! struct Text(String);
//!
//! impl Primitive for Text {
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! struct Log(Vec<String>);
//!
//! impl RenderingBackend for Log {
//!     type Handle = usize;
//!
//!     fn add_child(
//!         &mut self,
//!         primitive: &dyn Primitive,
//!         _preceding: Option<&usize>,
//!         _modifiers: &ModifierSet,
//!         _parent: Option<&usize>,
//!     ) -> Option<usize> {
//!         let text = primitive.downcast_ref::<Text>()?;
//!         self.0.push(text.0.clone());
//!         Some(self.0.len() - 1)
//!     }
//!
//!     fn update(&mut self, handle: &usize, primitive: &dyn Primitive, _modifiers: &ModifierSet) {
//!         if let Some(text) = primitive.downcast_ref::<Text>() {
//!             self.0[*handle] = text.0.clone();
//!         }
//!     }
//!
//!     fn remove_child(&mut self, _handle: &usize, _parent: Option<&usize>) {}
//! }
//!
//! // Run scheduled flushes immediately
//! let reconciler = Reconciler::new(Log(Vec::new()), |flush: Box<dyn FnOnce()>| flush());
//! reconciler.mount(Element::primitive(Text("hello".into())), None).unwrap();
//! reconciler.render(Element::primitive(Text("world".into()))).unwrap();
//! assert_eq!(reconciler.with_backend(|log| log.0.clone()).unwrap(), vec!["world"]);
//! ```

pub mod backend;
pub mod builder;
pub mod config;
pub mod element;
pub mod error;
pub mod host;
pub mod modifier;
pub mod property;
pub mod reconciler;
pub mod scheduler;
pub mod tree;

#[cfg(test)]
mod testing;

pub use backend::RenderingBackend;
pub use builder::Children;
pub use config::ReconcilerConfig;
pub use element::{Component, Element, ElementKind, ModifiedElement, Primitive, TypeIdentity};
pub use error::{ReconcileError, Result};
pub use host::{Host, RenderOutput};
pub use modifier::{reduce, AttributeModifier, ComposedModifier, Modifier, ModifierSet};
pub use property::{
    extract_and_bind, ChangeCallback, DynamicProperty, Listener, ListenerId, Observable, Observed,
    PropertyDescriptor, PropertyKind, PropertyRef, Publisher, State, StateRecord, Subscription,
};
pub use reconciler::{FlushReport, ReconcileStats, Reconciler};
pub use scheduler::{SchedulerHook, UpdateScheduler};
pub use tree::{HostId, HostNode, HostTree, RenderContext};

/// Everything needed to author elements and drive a reconciler
pub mod prelude {
    pub use crate::elements;
    pub use crate::{
        AttributeModifier, Children, Component, ComposedModifier, DynamicProperty, Element,
        ModifierSet, Observable, Observed, Primitive, PropertyRef, Publisher, Reconciler,
        ReconcilerConfig, RenderingBackend, State,
    };
}
