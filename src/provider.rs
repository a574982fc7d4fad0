use std::borrow::Cow;

use crate::host::{ContentRenderer, RecordId};
use crate::index::TreeIndex;
use crate::model::TreeDataLoader;
use crate::projection::NodeDescriptor;

/// Result of an identifier lookup.
pub enum TreeItem<'a, R> {
    /// The synthetic root.
    Root { children: &'a [RecordId] },
    /// A record-backed node with its effective folder flag.
    Node {
        descriptor: &'a NodeDescriptor<R>,
        is_folder: bool,
        children: &'a [RecordId],
    },
    /// Unknown identifier; renders as a "not found" leaf.
    Placeholder(RecordId),
}

impl<R> Clone for TreeItem<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for TreeItem<'_, R> {}

impl<'a, R> TreeItem<'a, R> {
    pub const fn is_folder(&self) -> bool {
        match *self {
            Self::Root { .. } => true,
            Self::Node { is_folder, .. } => is_folder,
            Self::Placeholder(_) => false,
        }
    }

    pub const fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    pub const fn descriptor(&self) -> Option<&'a NodeDescriptor<R>> {
        match *self {
            Self::Node { descriptor, .. } => Some(descriptor),
            _ => None,
        }
    }

    pub const fn children(&self) -> &'a [RecordId] {
        match *self {
            Self::Root { children } | Self::Node { children, .. } => children,
            Self::Placeholder(_) => &[],
        }
    }

    /// Caption if resolved, otherwise the node id, otherwise a marker.
    pub fn name(&self) -> Cow<'a, str> {
        match *self {
            Self::Root { .. } => Cow::Borrowed("root"),
            Self::Node { descriptor, .. } => {
                match descriptor.caption().value.filter(|caption| !caption.is_empty()) {
                    Some(caption) => Cow::Owned(caption),
                    None if !descriptor.node_id().is_empty() => {
                        Cow::Borrowed(descriptor.node_id())
                    }
                    None => Cow::Owned(format!("item_{}", descriptor.uuid())),
                }
            }
            Self::Placeholder(id) => Cow::Owned(format!("item_not_found_{id}")),
        }
    }
}

/// Read-only, pull-based access to one materialized index.
pub struct TreeDataProvider<R> {
    index: TreeIndex<R>,
}

impl<R> TreeDataProvider<R> {
    pub const fn new(index: TreeIndex<R>) -> Self {
        Self { index }
    }

    pub const fn index(&self) -> &TreeIndex<R> {
        &self.index
    }

    pub const fn root_item_id(&self) -> RecordId {
        self.index.root()
    }

    /// Looks up an item; unknown ids yield [`TreeItem::Placeholder`].
    pub fn get_item(&self, id: RecordId) -> TreeItem<'_, R> {
        let Some(node) = self.index.get(id) else {
            return TreeItem::Placeholder(id);
        };
        match node.descriptor() {
            Some(descriptor) => TreeItem::Node {
                descriptor,
                is_folder: node.is_folder(),
                children: node.children(),
            },
            None => TreeItem::Root {
                children: node.children(),
            },
        }
    }

    /// Host record behind an item, `None` for the root and placeholders.
    pub fn resolve_host_record<'a>(&self, item: &TreeItem<'a, R>) -> Option<&'a R> {
        item.descriptor().map(NodeDescriptor::host_ref)
    }

    /// Host record for an engine identifier.
    pub fn resolve(&self, id: RecordId) -> Option<&R> {
        self.index
            .get(id)
            .and_then(|node| node.descriptor())
            .map(NodeDescriptor::host_ref)
    }

    /// Asks the host delegate for display content.
    ///
    /// `None` tells the caller to fall back to the caption.
    pub fn get_content<C>(&self, item: &TreeItem<'_, R>, renderer: &C) -> Option<C::Content>
    where
        C: ContentRenderer<R> + ?Sized,
    {
        self.resolve_host_record(item)
            .and_then(|record| renderer.content(record))
    }
}

impl<R> TreeDataLoader for TreeDataProvider<R> {
    type Id = RecordId;

    fn root_item_id(&self) -> RecordId {
        self.index.root()
    }

    fn children(&self, id: RecordId) -> &[RecordId] {
        self.index.children(id)
    }

    fn contains(&self, id: RecordId) -> bool {
        self.index.contains(id)
    }

    fn is_folder(&self, id: RecordId) -> bool {
        self.index.get(id).is_some_and(|node| node.is_folder())
    }

    fn item_name(&self, id: RecordId) -> Cow<'_, str> {
        self.get_item(id).name()
    }

    fn size_hint(&self) -> usize {
        self.index.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::OrphanPolicy;
    use crate::projection::project;
    use crate::testing::{Row, mapping, row};

    fn provider(rows: &[Row]) -> TreeDataProvider<Row> {
        TreeDataProvider::new(TreeIndex::materialize(
            RecordId::from_u128(0),
            project(rows, &mapping()),
            OrphanPolicy::Drop,
        ))
    }

    #[test]
    fn root_lists_top_level_uuids() {
        let loader = provider(&[
            row(1, "A", None),
            row(2, "B", Some("A")),
            row(3, "C", Some("Z")),
        ]);

        let root = loader.root_item_id();
        assert_eq!(TreeDataLoader::children(&loader, root), &[RecordId::from_u128(1)]);
        assert!(matches!(loader.get_item(root), TreeItem::Root { .. }));
        assert!(loader.is_folder(root));
        assert!(loader.is_folder(RecordId::from_u128(1)));
        assert!(!loader.is_folder(RecordId::from_u128(2)));
    }

    #[test]
    fn unknown_ids_degrade_to_placeholders() {
        let loader = provider(&[row(1, "A", None)]);
        let missing = RecordId::from_u128(99);

        let item = loader.get_item(missing);
        assert!(item.is_placeholder());
        assert!(!item.is_folder());
        assert!(item.name().starts_with("item_not_found_"));
        assert!(TreeDataLoader::children(&loader, missing).is_empty());
        assert!(loader.resolve_host_record(&item).is_none());
        assert!(loader.resolve(missing).is_none());
    }

    #[test]
    fn content_comes_from_the_host_delegate() {
        let loader = provider(&[row(1, "A", None)]);
        let renderer = |record: &Row| (record == &row(1, "", None)).then(|| "content".to_owned());

        let item = loader.get_item(RecordId::from_u128(1));
        assert_eq!(loader.get_content(&item, &renderer).as_deref(), Some("content"));

        let root = loader.get_item(loader.root_item_id());
        assert_eq!(loader.get_content(&root, &renderer), None);
    }

    #[test]
    fn names_fall_back_from_caption_to_node_id() {
        let rows = vec![Row::new(1, "A", None).caption_loading(), row(2, "B", None)];
        let loader = provider(&rows);

        assert_eq!(loader.item_name(RecordId::from_u128(1)), "A");
        rows[1].set_caption("Bravo");
        assert_eq!(loader.item_name(RecordId::from_u128(2)), "Bravo");
    }
}
