//! Hosts - live counterparts of mounted elements
//!
//! One host variant exists per element kind. Every variant renders to the same
//! normalized [`RenderOutput`]: an optional platform handle, the child elements
//! to reconcile, and the modifier set handed to those children.
//!
//! | Host      | Handle | Children                   | Outgoing modifiers         |
//! |-----------|--------|----------------------------|----------------------------|
//! | Empty     | none   | none                       | inherited                  |
//! | Modified  | none   | the reduced inner element  | inherited merged with own  |
//! | Composite | none   | the body                   | inherited                  |
//! | Primitive | own    | container children, if any | inherited, propagating only|

use std::fmt;
use std::rc::Rc;

use crate::backend::RenderingBackend;
use crate::config::ReconcilerConfig;
use crate::element::{Component, Element, ElementKind, ModifiedElement, Primitive, TypeIdentity};
use crate::error::{ReconcileError, Result};
use crate::modifier::{reduce, ModifierSet};
use crate::property::{extract_and_bind, ChangeCallback, StateRecord};
use crate::tree::RenderContext;

/// Normalized result of rendering one host
#[derive(Debug)]
pub struct RenderOutput<H> {
    /// Platform content created or refreshed by this host
    pub handle: Option<H>,
    /// Elements to reconcile as this host's children
    pub children: Vec<Element>,
    /// Modifiers inherited by the children
    pub modifiers: ModifierSet,
}

/// Everything a host may touch while rendering
pub struct HostContext<'a, B: RenderingBackend> {
    pub backend: &'a mut B,
    pub inherited: &'a RenderContext<B::Handle>,
    /// Platform content the new content goes after; only used on render
    pub preceding: Option<&'a B::Handle>,
    pub config: &'a ReconcilerConfig,
}

/// Host for an empty element
#[derive(Debug, Default)]
pub struct EmptyHost;

impl EmptyHost {
    fn output<H>(&self, inherited: &RenderContext<H>) -> RenderOutput<H> {
        RenderOutput {
            handle: None,
            children: Vec::new(),
            modifiers: inherited.modifiers.clone(),
        }
    }
}

/// Host for a primitive element, owning its platform handle
pub struct PrimitiveHost<B: RenderingBackend> {
    element: Rc<dyn Primitive>,
    handle: Option<B::Handle>,
}

impl<B: RenderingBackend> PrimitiveHost<B> {
    fn render(&mut self, cx: HostContext<'_, B>) -> Result<RenderOutput<B::Handle>> {
        let handle = cx
            .backend
            .add_child(
                &*self.element,
                cx.preceding,
                &cx.inherited.modifiers,
                cx.inherited.parent.as_ref(),
            )
            .ok_or(ReconcileError::UnrecognizedPrimitive(
                self.element.identity().name(),
            ))?;
        self.handle = Some(handle.clone());
        Ok(self.output(handle, cx.inherited))
    }

    fn update(&mut self, cx: HostContext<'_, B>) -> Result<RenderOutput<B::Handle>> {
        let handle = self
            .handle
            .clone()
            .ok_or(ReconcileError::MissingHandle(self.element.identity().name()))?;
        cx.backend
            .update(&handle, &*self.element, &cx.inherited.modifiers);
        Ok(self.output(handle, cx.inherited))
    }

    fn dismantle(&mut self, backend: &mut B, inherited: &RenderContext<B::Handle>) {
        if let Some(handle) = self.handle.take() {
            backend.remove_child(&handle, inherited.parent.as_ref());
        }
    }

    fn output(
        &self,
        handle: B::Handle,
        inherited: &RenderContext<B::Handle>,
    ) -> RenderOutput<B::Handle> {
        RenderOutput {
            handle: Some(handle),
            children: self.element.children().to_vec(),
            modifiers: inherited.modifiers.propagating(),
        }
    }
}

/// Pass-through host for a modified element
pub struct ModifiedHost {
    element: Rc<ModifiedElement>,
}

impl ModifiedHost {
    fn render<H: Clone>(
        &self,
        inherited: &RenderContext<H>,
        config: &ReconcilerConfig,
    ) -> Result<RenderOutput<H>> {
        let (base, own) = reduce(
            &Element::Modified(self.element.clone()),
            config.max_modifier_depth,
        )?;
        Ok(RenderOutput {
            handle: None,
            children: vec![base],
            modifiers: inherited.modifiers.merged_with(&own),
        })
    }
}

/// Host for a composite element, owning its state record
pub struct CompositeHost {
    element: Rc<dyn Component>,
    record: StateRecord,
    on_change: ChangeCallback,
}

impl CompositeHost {
    fn render<H: Clone>(&mut self, inherited: &RenderContext<H>) -> Result<RenderOutput<H>> {
        extract_and_bind(&*self.element, &mut self.record, &self.on_change)?;
        let body = self.element.body();
        Ok(RenderOutput {
            handle: None,
            children: vec![body],
            modifiers: inherited.modifiers.clone(),
        })
    }

    pub fn record(&self) -> &StateRecord {
        &self.record
    }
}

/// Live, stateful counterpart of one mounted element
pub enum Host<B: RenderingBackend> {
    Empty(EmptyHost),
    Primitive(PrimitiveHost<B>),
    Modified(ModifiedHost),
    Composite(CompositeHost),
}

impl<B: RenderingBackend> Host<B> {
    /// Create the host variant matching the element's kind.
    ///
    /// `on_change` is wired into composite state and subscriptions; other
    /// variants ignore it.
    pub fn new(element: Element, on_change: ChangeCallback) -> Self {
        match element {
            Element::Empty => Host::Empty(EmptyHost),
            Element::Primitive(element) => Host::Primitive(PrimitiveHost {
                element,
                handle: None,
            }),
            Element::Modified(element) => Host::Modified(ModifiedHost { element }),
            Element::Composite(element) => Host::Composite(CompositeHost {
                element,
                record: StateRecord::new(),
                on_change,
            }),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Host::Empty(_) => ElementKind::Empty,
            Host::Primitive(_) => ElementKind::Primitive,
            Host::Modified(_) => ElementKind::Modified,
            Host::Composite(_) => ElementKind::Composite,
        }
    }

    /// The element this host currently renders
    pub fn element(&self) -> Element {
        match self {
            Host::Empty(_) => Element::Empty,
            Host::Primitive(host) => Element::Primitive(host.element.clone()),
            Host::Modified(host) => Element::Modified(host.element.clone()),
            Host::Composite(host) => Element::Composite(host.element.clone()),
        }
    }

    pub fn identity(&self) -> TypeIdentity {
        match self {
            Host::Empty(_) => TypeIdentity::EMPTY,
            Host::Primitive(host) => host.element.identity(),
            Host::Modified(_) => TypeIdentity::MODIFIED,
            Host::Composite(host) => host.element.identity(),
        }
    }

    /// Platform content owned by this host; only primitive hosts have one
    pub fn handle(&self) -> Option<&B::Handle> {
        match self {
            Host::Primitive(host) => host.handle.as_ref(),
            _ => None,
        }
    }

    /// State record of a composite host
    pub fn state(&self) -> Option<&StateRecord> {
        match self {
            Host::Composite(host) => Some(host.record()),
            _ => None,
        }
    }

    /// Swap in a new element of the same kind, keeping host state
    pub fn replace_element(&mut self, element: Element) -> Result<()> {
        match (self, element) {
            (Host::Empty(_), Element::Empty) => {}
            (Host::Primitive(host), Element::Primitive(element)) => host.element = element,
            (Host::Modified(host), Element::Modified(element)) => host.element = element,
            (Host::Composite(host), Element::Composite(element)) => host.element = element,
            (host, element) => {
                return Err(ReconcileError::KindMismatch {
                    host: host.kind().name(),
                    element: element.identity().name(),
                })
            }
        }
        Ok(())
    }

    /// First render after mount
    pub fn render(&mut self, cx: HostContext<'_, B>) -> Result<RenderOutput<B::Handle>> {
        match self {
            Host::Empty(host) => Ok(host.output(cx.inherited)),
            Host::Primitive(host) => host.render(cx),
            Host::Modified(host) => host.render(cx.inherited, cx.config),
            Host::Composite(host) => host.render(cx.inherited),
        }
    }

    /// Re-render in place
    pub fn update(&mut self, cx: HostContext<'_, B>) -> Result<RenderOutput<B::Handle>> {
        match self {
            Host::Empty(host) => Ok(host.output(cx.inherited)),
            Host::Primitive(host) => host.update(cx),
            Host::Modified(host) => host.render(cx.inherited, cx.config),
            Host::Composite(host) => host.render(cx.inherited),
        }
    }

    /// Release platform content and state; children are dismantled by the caller
    pub fn dismantle(&mut self, backend: &mut B, inherited: &RenderContext<B::Handle>) {
        match self {
            Host::Empty(_) | Host::Modified(_) => {}
            Host::Primitive(host) => host.dismantle(backend, inherited),
            Host::Composite(host) => host.record = StateRecord::new(),
        }
    }
}

impl<B: RenderingBackend> fmt::Debug for Host<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct(self.kind().name());
        debug.field("identity", &self.identity().name());
        match self {
            Host::Primitive(host) => {
                debug.field("handle", &host.handle);
            }
            Host::Composite(host) => {
                debug.field("record", &host.record);
            }
            _ => {}
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Counter, Label, RecordingBackend, Radius, Stack, Tint, Unknown};

    fn noop() -> ChangeCallback {
        Rc::new(|| {})
    }

    fn context(parent: Option<u32>, modifiers: ModifierSet) -> RenderContext<u32> {
        RenderContext { parent, modifiers }
    }

    #[test]
    fn test_empty_host_outputs_nothing() {
        let mut backend = RecordingBackend::default();
        let config = ReconcilerConfig::default();
        let inherited = context(Some(1), ModifierSet::new());
        let mut host = Host::<RecordingBackend>::new(Element::empty(), noop());

        let output = host
            .render(HostContext {
                backend: &mut backend,
                inherited: &inherited,
                preceding: None,
                config: &config,
            })
            .unwrap();
        assert!(output.handle.is_none());
        assert!(output.children.is_empty());
        assert!(backend.ops.is_empty());
    }

    #[test]
    fn test_modified_host_merges_with_inherited() {
        let mut backend = RecordingBackend::default();
        let config = ReconcilerConfig::default();
        let mut inherited_modifiers = ModifierSet::new();
        inherited_modifiers.insert(Rc::new(Tint(1)));
        let inherited = context(None, inherited_modifiers);

        let element = Element::primitive(Label::new("x"))
            .modifier(Radius(3.0))
            .modifier(Tint(2));
        let mut host = Host::<RecordingBackend>::new(element, noop());
        let output = host
            .render(HostContext {
                backend: &mut backend,
                inherited: &inherited,
                preceding: None,
                config: &config,
            })
            .unwrap();

        assert!(output.handle.is_none());
        assert_eq!(output.children.len(), 1);
        assert_eq!(output.children[0].kind(), ElementKind::Primitive);
        assert_eq!(output.modifiers.get::<Tint>(), Some(&Tint(2)));
        assert_eq!(output.modifiers.get::<Radius>(), Some(&Radius(3.0)));
    }

    #[test]
    fn test_composite_host_yields_body() {
        let mut backend = RecordingBackend::default();
        let config = ReconcilerConfig::default();
        let inherited = context(None, ModifierSet::new());
        let mut host = Host::<RecordingBackend>::new(Element::composite(Counter::new(4)), noop());

        let output = host
            .render(HostContext {
                backend: &mut backend,
                inherited: &inherited,
                preceding: None,
                config: &config,
            })
            .unwrap();
        assert_eq!(output.children.len(), 1);
        assert_eq!(host.state().unwrap().store().read::<i32>(0), Some(4));
    }

    #[test]
    fn test_primitive_host_lifecycle() {
        let mut backend = RecordingBackend::default();
        let config = ReconcilerConfig::default();
        let inherited = context(Some(0), ModifierSet::new());
        let stack = Stack::new(vec![
            Element::primitive(Label::new("a")),
            Element::primitive(Label::new("b")),
        ]);
        let mut host = Host::<RecordingBackend>::new(Element::primitive(stack), noop());

        let output = host
            .render(HostContext {
                backend: &mut backend,
                inherited: &inherited,
                preceding: None,
                config: &config,
            })
            .unwrap();
        let handle = output.handle.unwrap();
        assert_eq!(output.children.len(), 2);
        assert_eq!(host.handle(), Some(&handle));

        host.update(HostContext {
            backend: &mut backend,
            inherited: &inherited,
            preceding: None,
            config: &config,
        })
        .unwrap();
        host.dismantle(&mut backend, &inherited);
        assert!(host.handle().is_none());
        assert_eq!(backend.op_names(), vec!["add Stack", "update Stack", "remove Stack"]);
    }

    #[test]
    fn test_unrecognized_primitive_is_fatal() {
        let mut backend = RecordingBackend::default();
        let config = ReconcilerConfig::default();
        let inherited = context(None, ModifierSet::new());
        let mut host = Host::<RecordingBackend>::new(Element::primitive(Unknown), noop());

        let err = host
            .render(HostContext {
                backend: &mut backend,
                inherited: &inherited,
                preceding: None,
                config: &config,
            })
            .unwrap_err();
        assert!(matches!(err, ReconcileError::UnrecognizedPrimitive(name) if name.ends_with("Unknown")));
    }

    #[test]
    fn test_replace_element_rejects_other_kinds() {
        let mut host = Host::<RecordingBackend>::new(Element::primitive(Label::new("a")), noop());
        assert!(host
            .replace_element(Element::primitive(Label::new("b")))
            .is_ok());
        assert!(matches!(
            host.replace_element(Element::composite(Counter::new(0))),
            Err(ReconcileError::KindMismatch { host: "Primitive", .. })
        ));
    }
}
