//! Fake host types shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::host::{
    AttributeResolver, AttributeValue, CaptionAttribute, FlagAttribute, HostRecord,
    HostSelection, KeyAttribute, KeyValue, RecordId, SelectionMode, SelectionValue,
};
use crate::projection::AttributeMapping;

#[derive(Clone, Debug)]
pub struct Row {
    id: RecordId,
    node_id: Option<KeyValue>,
    parent: Option<KeyValue>,
    folder: bool,
    caption: Rc<RefCell<AttributeValue<String>>>,
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Row {}

impl Row {
    pub fn new(id: u128, node_id: &str, parent: Option<&str>) -> Self {
        Self {
            id: RecordId::from_u128(id),
            node_id: Some(KeyValue::from(node_id)),
            parent: parent.map(KeyValue::from),
            folder: false,
            caption: Rc::new(RefCell::new(AttributeValue::available(node_id.to_owned()))),
        }
    }

    pub fn folder(mut self) -> Self {
        self.folder = true;
        self
    }

    pub fn numeric_id(mut self, value: i64) -> Self {
        self.node_id = Some(KeyValue::from(value));
        self
    }

    pub fn caption_loading(self) -> Self {
        *self.caption.borrow_mut() = AttributeValue::loading();
        self
    }

    pub fn set_caption(&self, caption: &str) {
        *self.caption.borrow_mut() = AttributeValue::available(caption.to_owned());
    }
}

impl HostRecord for Row {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

pub fn row(id: u128, node_id: &str, parent: Option<&str>) -> Row {
    Row::new(id, node_id, parent)
}

fn node_id_attr() -> KeyAttribute<Row> {
    Box::new(|row: &Row| match &row.node_id {
        Some(value) => AttributeValue::available(value.clone()),
        None => AttributeValue::empty(),
    })
}

fn parent_attr() -> KeyAttribute<Row> {
    Box::new(|row: &Row| match &row.parent {
        Some(value) => AttributeValue::available(value.clone()),
        None => AttributeValue::empty(),
    })
}

fn caption_attr() -> CaptionAttribute<Row> {
    Rc::new(|row: &Row| row.caption.borrow().clone())
}

fn folder_attr() -> FlagAttribute<Row> {
    Box::new(|row: &Row| AttributeValue::available(row.folder))
}

pub fn mapping() -> AttributeMapping<Row> {
    AttributeMapping::new(node_id_attr(), parent_attr(), caption_attr(), Some(folder_attr()))
}

/// Knows the attributes `Code`, `ParentCode`, `Name` and `IsFolder`.
pub struct RowResolver;

impl AttributeResolver<Row> for RowResolver {
    fn key_attribute(&self, name: &str) -> Option<KeyAttribute<Row>> {
        match name {
            "Code" => Some(node_id_attr()),
            "ParentCode" => Some(parent_attr()),
            _ => None,
        }
    }

    fn text_expression(&self, name: &str) -> Option<CaptionAttribute<Row>> {
        (name == "Name").then(caption_attr)
    }

    fn flag_expression(&self, name: &str) -> Option<FlagAttribute<Row>> {
        (name == "IsFolder").then(folder_attr)
    }
}

/// Records every selection push and notification.
pub struct FakeSelection {
    pub mode: SelectionMode,
    pub pushed: Vec<SelectionValue<Row>>,
    pub notifications: usize,
}

impl FakeSelection {
    pub const fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            pushed: Vec::new(),
            notifications: 0,
        }
    }

    pub fn last(&self) -> Option<&SelectionValue<Row>> {
        self.pushed.last()
    }
}

impl HostSelection<Row> for FakeSelection {
    fn mode(&self) -> SelectionMode {
        self.mode
    }

    fn set_selection(&mut self, selection: SelectionValue<Row>) {
        self.pushed.push(selection);
    }

    fn notify_changed(&mut self) {
        self.notifications += 1;
    }
}

/// Counts executions through a shared cell so tests can keep a handle.
pub fn counting_action() -> (impl FnMut(), Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    let handle = Rc::clone(&count);
    (move || count.set(count.get() + 1), handle)
}
