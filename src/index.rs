use rustc_hash::{FxBuildHasher, FxHashMap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::host::RecordId;
use crate::projection::NodeDescriptor;

/// What happens to a node whose parent key matches nothing in the batch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Keep the node indexed but attach it nowhere.
    #[default]
    Drop,
    /// Attach the node under the synthetic root.
    AttachToRoot,
}

/// One entry of the index; the root entry carries no descriptor.
pub struct IndexedNode<R> {
    pub(crate) descriptor: Option<NodeDescriptor<R>>,
    pub(crate) children: Vec<RecordId>,
    pub(crate) is_folder: bool,
}

impl<R> IndexedNode<R> {
    pub const fn descriptor(&self) -> Option<&NodeDescriptor<R>> {
        self.descriptor.as_ref()
    }

    pub fn children(&self) -> &[RecordId] {
        &self.children
    }

    /// Effective folder flag: declared, or promoted by having children.
    pub const fn is_folder(&self) -> bool {
        self.is_folder
    }
}

/// Materialized tree for one batch.
///
/// Entries are keyed by host identity; the business node id is kept only as a
/// join index for resolving parent references.
pub struct TreeIndex<R> {
    root: RecordId,
    nodes: FxHashMap<RecordId, IndexedNode<R>>,
    by_node_id: FxHashMap<String, RecordId>,
    dangling: Vec<RecordId>,
}

impl<R> TreeIndex<R> {
    /// An index holding only the synthetic root.
    pub fn empty(root: RecordId) -> Self {
        let mut nodes = FxHashMap::with_capacity_and_hasher(1, FxBuildHasher);
        nodes.insert(root, Self::root_entry());
        Self {
            root,
            nodes,
            by_node_id: FxHashMap::default(),
            dangling: Vec::new(),
        }
    }

    /// Builds a fresh index from an ordered batch of descriptors.
    pub fn materialize(
        root: RecordId,
        descriptors: Vec<NodeDescriptor<R>>,
        orphans: OrphanPolicy,
    ) -> Self {
        let capacity = descriptors.len() + 1;
        let mut nodes: FxHashMap<RecordId, IndexedNode<R>> =
            FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher);
        let mut by_node_id: FxHashMap<String, RecordId> =
            FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher);
        nodes.insert(root, Self::root_entry());

        // (child, parent key) in batch order; resolved once every key is known.
        let mut links: Vec<(RecordId, Option<String>)> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let uuid = descriptor.uuid;
            if uuid == root || nodes.contains_key(&uuid) {
                tracing::debug!(record = %uuid, "duplicate record identity skipped");
                continue;
            }
            if !descriptor.node_id.is_empty() {
                by_node_id
                    .entry(descriptor.node_id.clone())
                    .or_insert(uuid);
            }
            links.push((uuid, descriptor.parent_node_id.clone()));
            let is_folder = descriptor.is_folder;
            nodes.insert(
                uuid,
                IndexedNode {
                    descriptor: Some(descriptor),
                    children: Vec::new(),
                    is_folder,
                },
            );
        }

        let mut dangling = Vec::new();
        for (uuid, parent_key) in links {
            let parent = match parent_key {
                None => Some(root),
                Some(key) => match by_node_id.get(&key).copied() {
                    Some(parent) if parent != uuid => Some(parent),
                    _ => {
                        tracing::info!(record = %uuid, parent = %key, "parent not found in batch");
                        dangling.push(uuid);
                        match orphans {
                            OrphanPolicy::Drop => None,
                            OrphanPolicy::AttachToRoot => Some(root),
                        }
                    }
                },
            };
            if let Some(parent) = parent
                && let Some(entry) = nodes.get_mut(&parent)
            {
                entry.children.push(uuid);
                entry.is_folder = true;
            }
        }

        Self {
            root,
            nodes,
            by_node_id,
            dangling,
        }
    }

    const fn root_entry() -> IndexedNode<R> {
        IndexedNode {
            descriptor: None,
            children: Vec::new(),
            is_folder: true,
        }
    }

    pub const fn root(&self) -> RecordId {
        self.root
    }

    pub fn get(&self, id: RecordId) -> Option<&IndexedNode<R>> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Children of `id`, empty when unknown.
    pub fn children(&self, id: RecordId) -> &[RecordId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Host identity registered for a business node id.
    pub fn lookup_node_id(&self, node_id: &str) -> Option<RecordId> {
        self.by_node_id.get(node_id).copied()
    }

    /// Nodes whose parent key did not resolve, in batch order.
    pub fn dangling(&self) -> &[RecordId] {
        &self.dangling
    }

    /// Number of record-backed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates record-backed nodes in arbitrary order.
    pub fn descriptors(&self) -> impl Iterator<Item = &NodeDescriptor<R>> {
        self.nodes.values().filter_map(IndexedNode::descriptor)
    }
}
