use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Platform-assigned identity of a host record.
///
/// This is the identifier space the tree view uses internally: it is stable
/// for the record's lifetime and unique across unrelated batches, unlike the
/// business node id stored in the record's attributes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Mints a fresh random identifier (used for synthetic roots).
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps a raw 128-bit value, e.g. a numeric host GUID.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An opaque record owned by the host platform.
///
/// The tree only keeps transient clones of records (typically cheap handles),
/// so `Clone` is expected to be inexpensive.
pub trait HostRecord: Clone {
    /// Returns the record's stable platform identity.
    fn record_id(&self) -> RecordId;
}

/// Load status reported by the host for data sources and attribute values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Loading,
    Available,
    Unavailable,
}

/// Identity token of a data-source value.
///
/// Hosts hand out a new generation whenever the underlying collection is
/// replaced; the refresh coordinator compares generations instead of
/// pointer identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceGeneration(pub u64);

impl SourceGeneration {
    /// Returns the generation that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Read-only view of the host's list data source.
pub trait DataSource<R> {
    /// Current load status.
    fn status(&self) -> LoadStatus;
    /// Identity of the current collection.
    fn generation(&self) -> SourceGeneration;
    /// Records in host order; only meaningful while `Available`.
    fn items(&self) -> &[R];
}

/// A plain owned data-source value.
#[derive(Clone, Debug, Default)]
pub struct ListSnapshot<R> {
    pub generation: SourceGeneration,
    pub status: LoadStatus,
    pub items: Vec<R>,
}

impl<R> ListSnapshot<R> {
    /// Creates a snapshot that is still loading.
    pub const fn loading(generation: SourceGeneration) -> Self {
        Self {
            generation,
            status: LoadStatus::Loading,
            items: Vec::new(),
        }
    }

    /// Creates an available snapshot holding `items`.
    pub const fn available(generation: SourceGeneration, items: Vec<R>) -> Self {
        Self {
            generation,
            status: LoadStatus::Available,
            items,
        }
    }
}

impl<R> DataSource<R> for ListSnapshot<R> {
    fn status(&self) -> LoadStatus {
        self.status
    }

    fn generation(&self) -> SourceGeneration {
        self.generation
    }

    fn items(&self) -> &[R] {
        &self.items
    }
}

/// A per-record attribute or expression value with its load status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeValue<T> {
    pub status: LoadStatus,
    pub value: Option<T>,
}

impl<T> AttributeValue<T> {
    pub const fn available(value: T) -> Self {
        Self {
            status: LoadStatus::Available,
            value: Some(value),
        }
    }

    pub const fn empty() -> Self {
        Self {
            status: LoadStatus::Available,
            value: None,
        }
    }

    pub const fn loading() -> Self {
        Self {
            status: LoadStatus::Loading,
            value: None,
        }
    }

    pub const fn unavailable() -> Self {
        Self {
            status: LoadStatus::Unavailable,
            value: None,
        }
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }
}

/// Value of a node-id / parent-id attribute: text or a large integer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyValue {
    Text(String),
    Integer(i128),
}

impl KeyValue {
    /// Renders the value as the join key used during materialization.
    pub fn to_key(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Integer(i128::from(value))
    }
}

/// Accessor for one attribute (or expression) over host records.
pub trait ListAttribute<R> {
    type Value;

    fn get(&self, record: &R) -> AttributeValue<Self::Value>;
}

impl<R, V, F> ListAttribute<R> for F
where
    F: Fn(&R) -> AttributeValue<V>,
{
    type Value = V;

    #[inline]
    fn get(&self, record: &R) -> AttributeValue<V> {
        self(record)
    }
}

/// Boxed node-id / parent-id accessor.
pub type KeyAttribute<R> = Box<dyn ListAttribute<R, Value = KeyValue>>;
/// Shared caption accessor; shared because every descriptor defers to it.
pub type CaptionAttribute<R> = Rc<dyn ListAttribute<R, Value = String>>;
/// Boxed folder-flag accessor.
pub type FlagAttribute<R> = Box<dyn ListAttribute<R, Value = bool>>;

/// Resolves configured attribute names to accessors.
pub trait AttributeResolver<R> {
    fn key_attribute(&self, name: &str) -> Option<KeyAttribute<R>>;
    fn text_expression(&self, name: &str) -> Option<CaptionAttribute<R>>;
    fn flag_expression(&self, name: &str) -> Option<FlagAttribute<R>>;
}

/// Host delegate that turns a record into renderable content.
pub trait ContentRenderer<R> {
    type Content;

    fn content(&self, record: &R) -> Option<Self::Content>;
}

impl<R, C, F> ContentRenderer<R> for F
where
    F: Fn(&R) -> Option<C>,
{
    type Content = C;

    #[inline]
    fn content(&self, record: &R) -> Option<C> {
        self(record)
    }
}

/// Selection cardinality of the host binding.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Single,
    Multiple,
}

/// Selection pushed into the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionValue<R> {
    Single(Option<R>),
    Multiple(Vec<R>),
}

impl<R> SelectionValue<R> {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(record) => record.is_none(),
            Self::Multiple(records) => records.is_empty(),
        }
    }
}

/// Write side of the host's selection binding.
pub trait HostSelection<R> {
    fn mode(&self) -> SelectionMode;
    fn set_selection(&mut self, selection: SelectionValue<R>);
    /// Fires the host's "selection changed" notification.
    fn notify_changed(&mut self);
}

/// Optional host action executed after every selection change.
pub trait HostAction {
    fn can_execute(&self) -> bool {
        true
    }

    fn execute(&mut self);
}

/// Placeholder for views without an on-change action.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAction;

impl HostAction for NoAction {
    fn can_execute(&self) -> bool {
        false
    }

    fn execute(&mut self) {}
}

impl<F: FnMut()> HostAction for F {
    fn execute(&mut self) {
        self();
    }
}
