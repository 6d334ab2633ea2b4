//! Shared fixtures for unit tests: a recording backend, a manual main loop and
//! a handful of sample elements and modifiers.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::backend::RenderingBackend;
use crate::element::{Component, Element, Primitive};
use crate::modifier::{AttributeModifier, ComposedModifier, ModifierSet};
use crate::property::{DynamicProperty, Observable, Observed, PropertyRef, State};

fn short_name(name: &'static str) -> &'static str {
    name.rsplit("::").next().unwrap_or(name)
}

// =============================================================================
// MAIN LOOP
// =============================================================================

/// Task queue standing in for a platform main loop
#[derive(Clone, Default)]
pub struct ManualLoop {
    tasks: Rc<RefCell<VecDeque<Box<dyn FnOnce()>>>>,
}

impl ManualLoop {
    pub fn hook(&self) -> impl Fn(Box<dyn FnOnce()>) + 'static {
        let tasks = self.tasks.clone();
        move |task| tasks.borrow_mut().push_back(task)
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn run_until_idle(&self) {
        loop {
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

// =============================================================================
// BACKEND
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Add {
        handle: u32,
        name: &'static str,
        preceding: Option<u32>,
        parent: Option<u32>,
    },
    Update {
        handle: u32,
        name: &'static str,
    },
    Remove {
        handle: u32,
        name: &'static str,
        parent: Option<u32>,
    },
}

/// Backend that records every call and keeps a model of the platform layout
#[derive(Default)]
pub struct RecordingBackend {
    pub ops: Vec<Op>,
    next: u32,
    layout: FxHashMap<Option<u32>, Vec<u32>>,
    names: FxHashMap<u32, &'static str>,
    descriptions: FxHashMap<u32, String>,
    modifiers: FxHashMap<u32, Vec<&'static str>>,
}

impl RecordingBackend {
    pub fn op_names(&self) -> Vec<String> {
        self.ops
            .iter()
            .map(|op| match op {
                Op::Add { name, .. } => format!("add {name}"),
                Op::Update { name, .. } => format!("update {name}"),
                Op::Remove { name, .. } => format!("remove {name}"),
            })
            .collect()
    }

    /// Labels render as their text, everything else as its type name
    fn describe(primitive: &dyn Primitive) -> String {
        match primitive.downcast_ref::<Label>() {
            Some(label) => label.text.clone(),
            None => short_name(primitive.identity().name()).to_string(),
        }
    }

    fn modifier_names(modifiers: &ModifierSet) -> Vec<&'static str> {
        modifiers
            .type_names()
            .map(short_name)
            .collect()
    }

    pub fn handle_of(&self, description: &str) -> Option<u32> {
        let mut matches: Vec<u32> = self
            .descriptions
            .iter()
            .filter(|(_, text)| text.as_str() == description)
            .map(|(handle, _)| *handle)
            .collect();
        matches.sort_unstable();
        matches.first().copied()
    }

    pub fn modifiers_of(&self, description: &str) -> Option<Vec<&'static str>> {
        self.handle_of(description)
            .and_then(|handle| self.modifiers.get(&handle).cloned())
    }

    /// Depth-first descriptions of live content under `parent`
    pub fn outline(&self, parent: Option<u32>) -> Vec<String> {
        let mut lines = Vec::new();
        self.outline_into(parent, 0, &mut lines);
        lines
    }

    fn outline_into(&self, parent: Option<u32>, depth: usize, lines: &mut Vec<String>) {
        for handle in self.layout.get(&parent).into_iter().flatten() {
            let description = self.descriptions.get(handle).map_or("?", String::as_str);
            lines.push(format!("{:indent$}{}", "", description, indent = depth * 2));
            self.outline_into(Some(*handle), depth + 1, lines);
        }
    }
}

impl RenderingBackend for RecordingBackend {
    type Handle = u32;

    fn add_child(
        &mut self,
        primitive: &dyn Primitive,
        preceding: Option<&u32>,
        modifiers: &ModifierSet,
        parent: Option<&u32>,
    ) -> Option<u32> {
        if primitive.downcast_ref::<Unknown>().is_some() {
            return None;
        }

        self.next += 1;
        let handle = self.next;
        let siblings = self.layout.entry(parent.copied()).or_default();
        let position = preceding
            .and_then(|preceding| siblings.iter().position(|h| h == preceding))
            .map_or(0, |position| position + 1);
        siblings.insert(position, handle);

        let name = short_name(primitive.identity().name());
        self.names.insert(handle, name);
        self.descriptions.insert(handle, Self::describe(primitive));
        self.modifiers.insert(handle, Self::modifier_names(modifiers));
        self.ops.push(Op::Add {
            handle,
            name,
            preceding: preceding.copied(),
            parent: parent.copied(),
        });
        Some(handle)
    }

    fn update(&mut self, handle: &u32, primitive: &dyn Primitive, modifiers: &ModifierSet) {
        self.descriptions.insert(*handle, Self::describe(primitive));
        self.modifiers.insert(*handle, Self::modifier_names(modifiers));
        self.ops.push(Op::Update {
            handle: *handle,
            name: short_name(primitive.identity().name()),
        });
    }

    fn remove_child(&mut self, handle: &u32, parent: Option<&u32>) {
        if let Some(siblings) = self.layout.get_mut(&parent.copied()) {
            siblings.retain(|h| h != handle);
        }
        self.layout.remove(&Some(*handle));
        self.descriptions.remove(handle);
        self.ops.push(Op::Remove {
            handle: *handle,
            name: self.names.get(handle).copied().unwrap_or("?"),
            parent: parent.copied(),
        });
    }
}

// =============================================================================
// PRIMITIVES
// =============================================================================

#[derive(Debug)]
pub struct Label {
    pub text: String,
}

impl Label {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl Primitive for Label {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct Stack {
    children: Vec<Element>,
}

impl Stack {
    pub fn new(children: Vec<Element>) -> Self {
        Self { children }
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

/// A primitive no backend knows how to render
#[derive(Debug)]
pub struct Unknown;

impl Primitive for Unknown {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// COMPOSITES
// =============================================================================

#[derive(Debug)]
pub struct Counter {
    pub count: State<i32>,
}

impl Counter {
    pub fn new(initial: i32) -> Self {
        Self {
            count: State::new(initial),
        }
    }
}

impl Component for Counter {
    fn properties(&self) -> Vec<PropertyRef<'_>> {
        vec![self.count.as_property()]
    }

    fn body(&self) -> Element {
        Element::primitive(Label::new(&self.count.get().to_string()))
    }
}

#[derive(Debug)]
pub struct Profile {
    pub name: State<String>,
    pub model: Observed<Observable<u32>>,
}

impl Profile {
    pub fn new(name: &str, model: Observable<u32>) -> Self {
        Self {
            name: State::new(name.to_string()),
            model: Observed::new(model),
        }
    }
}

impl Component for Profile {
    fn properties(&self) -> Vec<PropertyRef<'_>> {
        vec![self.name.as_property(), self.model.as_property()]
    }

    fn body(&self) -> Element {
        Element::primitive(Label::new(&format!(
            "{}:{}",
            self.name.get(),
            self.model.get()
        )))
    }
}

/// Stateless composite rendering the element it was built with
#[derive(Debug)]
pub struct Wrapper {
    content: Element,
}

impl Wrapper {
    pub fn new(content: Element) -> Self {
        Self { content }
    }
}

impl Component for Wrapper {
    fn body(&self) -> Element {
        self.content.clone()
    }
}

/// Renders a label with its tick and a counter declared with that tick
#[derive(Debug)]
pub struct Holder {
    pub tick: State<i32>,
}

impl Holder {
    pub fn new(tick: i32) -> Self {
        Self {
            tick: State::new(tick),
        }
    }
}

impl Component for Holder {
    fn properties(&self) -> Vec<PropertyRef<'_>> {
        vec![self.tick.as_property()]
    }

    fn body(&self) -> Element {
        let tick = self.tick.get();
        Element::primitive(Stack::new(vec![
            Element::primitive(Label::new(&tick.to_string())),
            Element::composite(Counter::new(tick)),
        ]))
    }
}

#[derive(Debug)]
pub struct List {
    pub items: State<Vec<String>>,
}

impl List {
    pub fn new(items: &[&str]) -> Self {
        Self {
            items: State::new(items.iter().map(|item| item.to_string()).collect()),
        }
    }
}

impl Component for List {
    fn properties(&self) -> Vec<PropertyRef<'_>> {
        vec![self.items.as_property()]
    }

    fn body(&self) -> Element {
        Element::primitive(Stack::new(
            self.items
                .get()
                .iter()
                .map(|item| Element::primitive(Label::new(item)))
                .collect(),
        ))
    }
}

/// Label when on, a counter when off
#[derive(Debug)]
pub struct Switch {
    pub on: State<bool>,
}

impl Switch {
    pub fn new(on: bool) -> Self {
        Self { on: State::new(on) }
    }
}

impl Component for Switch {
    fn properties(&self) -> Vec<PropertyRef<'_>> {
        vec![self.on.as_property()]
    }

    fn body(&self) -> Element {
        if self.on.get() {
            Element::primitive(Label::new("on"))
        } else {
            Element::composite(Counter::new(0))
        }
    }
}

/// Bumps its own count from `body` until it reaches `limit`
#[derive(Debug)]
pub struct Eager {
    pub count: State<i32>,
    limit: i32,
}

impl Eager {
    pub fn new(initial: i32, limit: i32) -> Self {
        Self {
            count: State::new(initial),
            limit,
        }
    }
}

impl Component for Eager {
    fn properties(&self) -> Vec<PropertyRef<'_>> {
        vec![self.count.as_property()]
    }

    fn body(&self) -> Element {
        let value = self.count.get();
        if value < self.limit {
            self.count.set(value + 1);
        }
        Element::primitive(Label::new(&value.to_string()))
    }
}

// =============================================================================
// MODIFIERS
// =============================================================================

#[derive(Debug, PartialEq)]
pub struct Tint(pub u32);

impl AttributeModifier for Tint {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, PartialEq)]
pub struct Radius(pub f32);

impl AttributeModifier for Radius {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Applies to the element it wraps only
#[derive(Debug, PartialEq)]
pub struct Local;

impl AttributeModifier for Local {
    fn propagates(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Composed modifier expanding to a corner radius
#[derive(Debug)]
pub struct Padded(pub f32);

impl ComposedModifier for Padded {
    fn body(&self, content: Element) -> Element {
        content.modifier(Radius(self.0))
    }
}

/// Composed modifier that never terminates
#[derive(Debug)]
pub struct Forever;

impl ComposedModifier for Forever {
    fn body(&self, content: Element) -> Element {
        content.compose(Forever)
    }
}
