// Minimal example: a flat record list joined into a tree and rendered once.
use std::rc::Rc;

use ratatui::layout::Rect;
use ratatui::prelude::Buffer;

use tui_recordtree::{
    AttributeMapping, AttributeNames, AttributeValue, HostRecord, KeyValue, ListSnapshot,
    RecordId, RecordTreeView, SourceGeneration, TreeViewConfig, TreeViewStyle,
};

// Host-side record: platform identity plus business attributes.
#[derive(Clone)]
struct Item {
    id: RecordId,
    code: &'static str,
    parent: Option<&'static str>,
    name: &'static str,
}

impl HostRecord for Item {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

fn item(id: u128, code: &'static str, parent: Option<&'static str>, name: &'static str) -> Item {
    Item {
        id: RecordId::from_u128(id),
        code,
        parent,
        name,
    }
}

fn main() {
    // Accessors for node id, parent id and caption; no folder flag.
    let mapping = AttributeMapping::<Item>::new(
        Box::new(|item: &Item| AttributeValue::available(KeyValue::from(item.code))),
        Box::new(|item: &Item| match item.parent {
            Some(parent) => AttributeValue::available(KeyValue::from(parent)),
            None => AttributeValue::empty(),
        }),
        Rc::new(|item: &Item| AttributeValue::available(item.name.to_owned())),
        None,
    );
    let config =
        TreeViewConfig::new(AttributeNames::new("Code", "ParentCode", "Name")).open_expanded(true);
    let Ok(mut view) = RecordTreeView::new(config, mapping) else {
        return;
    };

    let items = vec![
        item(1, "fruit", None, "Fruit"),
        item(2, "apple", Some("fruit"), "Apple"),
        item(3, "pear", Some("fruit"), "Pear"),
        item(4, "bread", None, "Bread"),
    ];
    view.on_source_update(&ListSnapshot::available(SourceGeneration(1), items));

    // Render into an in-memory buffer (no terminal required for the example).
    let area = Rect::new(0, 0, 40, 8);
    let mut buffer = Buffer::empty(area);
    view.render(area, &mut buffer, &TreeViewStyle::default());
}
