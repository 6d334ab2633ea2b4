//! Arbor Headless Platform
//!
//! An in-memory platform for the Arbor reconciler: a rendering backend that
//! keeps views in an arena, a small primitive vocabulary, modifiers, and a
//! cooperative main loop that serves as the scheduling hook.
//!
//! Useful for tests, snapshotting and driving components without a window.
//!
//! # Example
//!
//! ```
//! use arbor_core::prelude::*;
//! use arbor_platform_headless::prelude::*;
//!
//! #[derive(Debug)]
//! struct Counter {
//!     count: State<i32>,
//! }
//!
//! impl Component for Counter {
//!     fn properties(&self) -> Vec<PropertyRef<'_>> {
//!         vec![self.count.as_property()]
//!     }
//!
//!     fn body(&self) -> Element {
//!         let count = self.count.clone();
//!         vstack([
//!             text(format!("Count: {}", self.count.get())),
//!             button("+", move || count.update(|n| n + 1)),
//!         ])
//!         .into()
//!     }
//! }
//!
//! let app = HeadlessApp::new();
//! app.mount(Element::composite(Counter { count: State::new(0) })).unwrap();
//! app.tap_text("+").unwrap();
//! app.run_until_idle();
//! assert_eq!(app.texts().unwrap(), vec!["Count: 1", "+"]);
//! ```

pub mod backend;
pub mod error;
pub mod main_loop;
pub mod modifiers;
pub mod primitives;

pub use backend::{Attributes, HeadlessBackend, View, ViewId, ViewKind, ViewOp};
pub use error::{HeadlessError, Result};
pub use main_loop::MainLoop;
pub use modifiers::{Card, CornerRadius, Disabled, HeadlessModifiers, OnTap, Padding};
pub use primitives::{button, hstack, spacer, text, vstack, Axis, Button, Spacer, Stack, Text};

use arbor_core::{Element, HostId, Reconciler, ReconcilerConfig};

/// A reconciler wired to a headless backend and main loop
pub struct HeadlessApp {
    main_loop: MainLoop,
    reconciler: Reconciler<HeadlessBackend>,
}

impl HeadlessApp {
    pub fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        let main_loop = MainLoop::new();
        let reconciler = Reconciler::with_config(HeadlessBackend::new(), config, main_loop.hook());
        tracing::debug!("headless app created");
        Self {
            main_loop,
            reconciler,
        }
    }

    /// Mount `element` as the root of the app
    pub fn mount(&self, element: Element) -> Result<HostId> {
        Ok(self.reconciler.mount(element, None)?)
    }

    /// Reconcile the root against a new root element
    pub fn render(&self, element: Element) -> Result<HostId> {
        Ok(self.reconciler.render(element)?)
    }

    pub fn unmount(&self) -> Result<()> {
        Ok(self.reconciler.unmount()?)
    }

    /// Dispatch a tap to `view`.
    ///
    /// Runs the handler synchronously; state changes it makes are applied on
    /// the next main-loop turn.
    pub fn tap(&self, view: ViewId) -> Result<()> {
        let handler = self
            .reconciler
            .with_backend(|backend| backend.tap_handler(view))??;
        tracing::debug!("tap on {:?}", view);
        handler();
        Ok(())
    }

    /// Tap the first view displaying `text`
    pub fn tap_text(&self, text: &str) -> Result<()> {
        let view = self
            .reconciler
            .with_backend(|backend| backend.find_text(text))?
            .ok_or_else(|| HeadlessError::TextNotFound(text.to_string()))?;
        self.tap(view)
    }

    /// Run main-loop turns until no task is left
    pub fn run_until_idle(&self) -> usize {
        self.main_loop.run_until_idle()
    }

    /// Indented snapshot of the displayed views
    pub fn render_tree(&self) -> Result<String> {
        Ok(self.reconciler.with_backend(HeadlessBackend::render_tree)?)
    }

    /// Displayed texts in order
    pub fn texts(&self) -> Result<Vec<String>> {
        Ok(self.reconciler.with_backend(HeadlessBackend::texts)?)
    }

    pub fn main_loop(&self) -> &MainLoop {
        &self.main_loop
    }

    pub fn reconciler(&self) -> &Reconciler<HeadlessBackend> {
        &self.reconciler
    }
}

impl Default for HeadlessApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Commonly used headless types and builders
pub mod prelude {
    pub use crate::{
        button, hstack, spacer, text, vstack, Axis, HeadlessApp, HeadlessError,
        HeadlessModifiers, MainLoop, ViewId,
    };
}
