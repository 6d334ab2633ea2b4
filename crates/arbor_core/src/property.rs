//! Dynamic properties and the property extractor
//!
//! Composites declare their stateful fields explicitly through
//! [`Component::properties`](crate::Component::properties), an ordered list of
//! [`PropertyRef`]s. Two kinds exist:
//!
//! - [`State<T>`] owns a value. Its backing cell lives in the host's
//!   [`StateRecord`] and survives re-renders of the same host; writes schedule
//!   a re-render.
//! - [`Observed<P>`] wraps an external [`Publisher`]. The value stays in the
//!   publisher; any change schedules a re-render.
//!
//! [`extract_and_bind`] runs before every body evaluation. It seeds storage
//! cells on their first appearance only, points every `State` getter at its
//! cell, binds setters once, and rebuilds observed subscriptions from scratch.
//!
//! ```
//! use arbor_core::{Observable, Publisher, Subscription};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let model = Observable::new(1);
//! let hits = Rc::new(Cell::new(0));
//! let hits_clone = hits.clone();
//! let subscription = model.subscribe(Rc::new(move || hits_clone.set(hits_clone.get() + 1)));
//!
//! model.set(2);
//! assert_eq!(hits.get(), 1);
//!
//! drop(subscription);
//! model.set(3);
//! assert_eq!(hits.get(), 1);
//! ```

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::element::Component;
use crate::error::{ReconcileError, Result};

/// Callback invoked when a dynamic property changes.
///
/// Wired by the reconciler to enqueue the owning host; it never renders
/// synchronously.
pub type ChangeCallback = Rc<dyn Fn()>;

/// Listener registered with a [`Publisher`]
pub type Listener = Rc<dyn Fn()>;

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// Kind of a dynamic property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Storage,
    Observed,
}

/// A discovered dynamic property
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Position in the component's property list
    pub index: usize,
    /// Position among properties of the same kind; storage slots index the
    /// host's state cells
    pub slot: usize,
    pub kind: PropertyKind,
}

/// Borrowed view of one declared dynamic property
#[derive(Clone, Copy)]
pub enum PropertyRef<'a> {
    Storage(&'a dyn StorageProperty),
    Observed(&'a dyn ObservedProperty),
}

impl PropertyRef<'_> {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyRef::Storage(_) => PropertyKind::Storage,
            PropertyRef::Observed(_) => PropertyKind::Observed,
        }
    }
}

impl fmt::Debug for PropertyRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyRef::Storage(storage) => f
                .debug_tuple("Storage")
                .field(&storage.value_type_name())
                .finish(),
            PropertyRef::Observed(_) => f.write_str("Observed"),
        }
    }
}

/// Types usable as a declared dynamic property
pub trait DynamicProperty {
    fn as_property(&self) -> PropertyRef<'_>;
}

/// A property owning a value stored in the host's state record
pub trait StorageProperty {
    /// Value the cell is seeded with on first render
    fn initial_value(&self) -> Box<dyn Any>;

    fn value_type(&self) -> TypeId;

    fn value_type_name(&self) -> &'static str;

    /// Point the property at its backing cell.
    ///
    /// Rebinding to the record the property is already bound to is a no-op for
    /// the setter. Returns `false`, leaving the property untouched, when it is
    /// bound to a different record that is still alive.
    fn bind(&self, binding: StorageBinding) -> bool;
}

/// A property that subscribes to an external publisher
pub trait ObservedProperty {
    fn subscribe(&self, on_change: ChangeCallback) -> Subscription;
}

// =============================================================================
// STATE RECORD
// =============================================================================

/// Indexable storage cells owned by one composite host
#[derive(Default)]
pub struct StateStore {
    cells: RefCell<Vec<Box<dyn Any>>>,
}

impl StateStore {
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }

    fn push(&self, value: Box<dyn Any>) {
        self.cells.borrow_mut().push(value);
    }

    fn holds(&self, slot: usize, value_type: TypeId) -> bool {
        self.cells
            .borrow()
            .get(slot)
            .is_some_and(|cell| Any::type_id(&**cell) == value_type)
    }

    /// Read a cell, `None` if the slot is missing or holds another type
    pub fn read<T: Clone + 'static>(&self, slot: usize) -> Option<T> {
        self.cells
            .borrow()
            .get(slot)
            .and_then(|cell| cell.downcast_ref::<T>().cloned())
    }

    fn write(&self, slot: usize, value: Box<dyn Any>) -> bool {
        match self.cells.borrow_mut().get_mut(slot) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }
}

/// Per-host dynamic property state: storage cells plus the subscriptions of
/// the latest render
#[derive(Default)]
pub struct StateRecord {
    store: Rc<StateStore>,
    subscriptions: SmallVec<[Subscription; 2]>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Number of live observed subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl fmt::Debug for StateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRecord")
            .field("cells", &self.store.len())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

/// Link from a [`State`] to its backing cell
#[derive(Clone)]
pub struct StorageBinding {
    store: Weak<StateStore>,
    slot: usize,
    on_change: ChangeCallback,
}

impl StorageBinding {
    pub fn slot(&self) -> usize {
        self.slot
    }

    fn is_live(&self) -> bool {
        self.store.strong_count() > 0
    }
}

/// Bind a composite's dynamic properties to its host's state record.
///
/// Storage slot `i` is seeded from the declared initial value only when the
/// record holds exactly `i` cells; otherwise the existing cell is reused.
/// Subscriptions from the previous render are discarded before observed
/// properties subscribe again.
pub fn extract_and_bind(
    component: &dyn Component,
    record: &mut StateRecord,
    on_change: &ChangeCallback,
) -> Result<Vec<PropertyDescriptor>> {
    let properties = component.properties();
    let mut descriptors = Vec::with_capacity(properties.len());
    let mut storage_slot = 0usize;
    let mut observed_slot = 0usize;

    record.subscriptions.clear();

    for (index, property) in properties.into_iter().enumerate() {
        match property {
            PropertyRef::Storage(storage) => {
                let slot = storage_slot;
                storage_slot += 1;

                if record.store.len() == slot {
                    tracing::trace!(
                        "seeding slot {} of {} with {}",
                        slot,
                        component.identity(),
                        storage.value_type_name()
                    );
                    record.store.push(storage.initial_value());
                } else if !record.store.holds(slot, storage.value_type()) {
                    return Err(ReconcileError::PropertyTypeMismatch {
                        component: component.identity().name(),
                        slot,
                        expected: storage.value_type_name(),
                    });
                }

                let bound = storage.bind(StorageBinding {
                    store: Rc::downgrade(&record.store),
                    slot,
                    on_change: on_change.clone(),
                });
                if !bound {
                    return Err(ReconcileError::StateAlreadyOwned {
                        component: component.identity().name(),
                        slot,
                    });
                }
                descriptors.push(PropertyDescriptor {
                    index,
                    slot,
                    kind: PropertyKind::Storage,
                });
            }
            PropertyRef::Observed(observed) => {
                let slot = observed_slot;
                observed_slot += 1;

                record.subscriptions.push(observed.subscribe(on_change.clone()));
                descriptors.push(PropertyDescriptor {
                    index,
                    slot,
                    kind: PropertyKind::Observed,
                });
            }
        }
    }

    Ok(descriptors)
}

// =============================================================================
// STATE
// =============================================================================

struct CellRef {
    store: Weak<StateStore>,
    slot: usize,
}

struct StateInner<T> {
    initial: T,
    reader: RefCell<Option<CellRef>>,
    writer: RefCell<Option<StorageBinding>>,
}

/// Value storage owned by the host of the declaring composite.
///
/// Before the first render, and after the host is dismantled, reads return the
/// declared initial value and writes are ignored.
///
/// `State` is a cheap handle: clones refer to the same binding, so event
/// handlers built in `body` can capture a clone and write to it later.
pub struct State<T> {
    inner: Rc<StateInner<T>>,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> State<T> {
    /// Declare a state property with its initial value
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(StateInner {
                initial,
                reader: RefCell::new(None),
                writer: RefCell::new(None),
            }),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        let reader = self.inner.reader.borrow();
        reader
            .as_ref()
            .and_then(|cell| {
                cell.store
                    .upgrade()
                    .and_then(|store| store.read::<T>(cell.slot))
            })
            .unwrap_or_else(|| self.inner.initial.clone())
    }

    /// Write a new value and schedule a re-render of the owning host
    pub fn set(&self, value: T) {
        let binding = self.inner.writer.borrow().clone();
        let Some(binding) = binding else {
            tracing::warn!(
                "State<{}> written before its composite was rendered; ignored",
                std::any::type_name::<T>()
            );
            return;
        };
        let Some(store) = binding.store.upgrade() else {
            tracing::warn!(
                "State<{}> written after its host was dismantled; ignored",
                std::any::type_name::<T>()
            );
            return;
        };
        if store.write(binding.slot, Box::new(value)) {
            drop(store);
            (binding.on_change)();
        }
    }

    /// Update the value using a function
    pub fn update(&self, f: impl FnOnce(T) -> T) {
        self.set(f(self.get()));
    }

    /// Whether writes currently reach a live host
    pub fn is_bound(&self) -> bool {
        self.inner
            .writer
            .borrow()
            .as_ref()
            .is_some_and(StorageBinding::is_live)
    }
}

impl<T: Clone + 'static> StorageProperty for State<T> {
    fn initial_value(&self) -> Box<dyn Any> {
        Box::new(self.inner.initial.clone())
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn bind(&self, binding: StorageBinding) -> bool {
        let mut writer = self.inner.writer.borrow_mut();
        match writer.as_ref() {
            // Owned by another mounted host
            Some(current) if current.is_live() && !Weak::ptr_eq(&current.store, &binding.store) => {
                return false;
            }
            Some(current) if current.is_live() => {}
            // A writer bound to a dismantled host is as good as unbound
            _ => *writer = Some(binding.clone()),
        }

        *self.inner.reader.borrow_mut() = Some(CellRef {
            store: binding.store,
            slot: binding.slot,
        });
        true
    }
}

impl<T: Clone + 'static> DynamicProperty for State<T> {
    fn as_property(&self) -> PropertyRef<'_> {
        PropertyRef::Storage(self)
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &self.get())
            .field("bound", &self.is_bound())
            .finish()
    }
}

// =============================================================================
// OBSERVED
// =============================================================================

/// Handle to a publisher registration; unsubscribes when dropped
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel
    pub fn detached() -> Self {
        Self { cancel: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// An external object that notifies listeners when it changes
pub trait Publisher {
    fn subscribe(&self, listener: Listener) -> Subscription;
}

impl<P: Publisher + ?Sized> Publisher for Rc<P> {
    fn subscribe(&self, listener: Listener) -> Subscription {
        (**self).subscribe(listener)
    }
}

/// Observed subscription to an external publisher.
///
/// Dereferences to the publisher; values are always read from it directly.
pub struct Observed<P> {
    publisher: P,
}

impl<P: Publisher> Observed<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }
}

impl<P> Deref for Observed<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.publisher
    }
}

impl<P: Publisher> ObservedProperty for Observed<P> {
    fn subscribe(&self, on_change: ChangeCallback) -> Subscription {
        self.publisher.subscribe(on_change)
    }
}

impl<P: Publisher> DynamicProperty for Observed<P> {
    fn as_property(&self) -> PropertyRef<'_> {
        PropertyRef::Observed(self)
    }
}

impl<P: fmt::Debug> fmt::Debug for Observed<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observed").field(&self.publisher).finish()
    }
}

new_key_type! {
    /// Key of a listener registered with an [`Observable`]
    pub struct ListenerId;
}

struct ObservableInner<T> {
    value: RefCell<T>,
    listeners: RefCell<SlotMap<ListenerId, Listener>>,
}

/// A shared value that notifies its listeners on every write
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                listeners: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Read the value without cloning
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Mutate in place and notify once
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.notify();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn notify(&self) {
        // Listeners may subscribe or unsubscribe while being notified
        let listeners: SmallVec<[Listener; 4]> =
            self.inner.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }
}

impl<T: 'static> Publisher for Observable<T> {
    fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.inner.listeners.borrow_mut().insert(listener);
        let inner = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.borrow_mut().remove(id);
            }
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.inner.value.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}
