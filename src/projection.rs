use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::AttributeNames;
use crate::error::{ConfigError, Result};
use crate::host::{
    AttributeResolver, AttributeValue, CaptionAttribute, FlagAttribute, HostRecord, KeyAttribute,
    RecordId,
};

/// The four host accessors a projection reads.
pub struct AttributeMapping<R> {
    node_id: KeyAttribute<R>,
    parent_id: KeyAttribute<R>,
    caption: CaptionAttribute<R>,
    is_folder: Option<FlagAttribute<R>>,
}

impl<R> AttributeMapping<R> {
    pub fn new(
        node_id: KeyAttribute<R>,
        parent_id: KeyAttribute<R>,
        caption: CaptionAttribute<R>,
        is_folder: Option<FlagAttribute<R>>,
    ) -> Self {
        Self {
            node_id,
            parent_id,
            caption,
            is_folder,
        }
    }

    /// Looks up every configured attribute name through the host resolver.
    pub fn resolve<A>(names: &AttributeNames, resolver: &A) -> Result<Self>
    where
        A: AttributeResolver<R>,
    {
        names.validate()?;
        let node_id = resolver
            .key_attribute(&names.node_id)
            .ok_or_else(|| ConfigError::unknown("node id", &names.node_id))?;
        let parent_id = resolver
            .key_attribute(&names.parent_id)
            .ok_or_else(|| ConfigError::unknown("parent id", &names.parent_id))?;
        let caption = resolver
            .text_expression(&names.caption)
            .ok_or_else(|| ConfigError::unknown("caption", &names.caption))?;
        let is_folder = match names.is_folder.as_deref() {
            Some(name) => Some(
                resolver
                    .flag_expression(name)
                    .ok_or_else(|| ConfigError::unknown("folder flag", name))?,
            ),
            None => None,
        };
        Ok(Self::new(node_id, parent_id, caption, is_folder))
    }
}

/// Normalized, tree-relevant view of one host record.
#[derive(Clone)]
pub struct NodeDescriptor<R> {
    pub(crate) node_id: String,
    pub(crate) parent_node_id: Option<String>,
    pub(crate) is_folder: bool,
    caption: CaptionAttribute<R>,
    pub(crate) host_ref: R,
    pub(crate) uuid: RecordId,
}

impl<R> NodeDescriptor<R> {
    /// Business identifier read from the node-id attribute (may be empty).
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Parent business identifier, `None` for root-level nodes.
    pub fn parent_node_id(&self) -> Option<&str> {
        self.parent_node_id.as_deref()
    }

    /// Folder flag as read from the host attribute.
    ///
    /// The index may still promote the node to a folder when it has children;
    /// ask the provider for the effective value.
    pub const fn declared_folder(&self) -> bool {
        self.is_folder
    }

    /// Evaluates the caption now. The value may still be loading.
    pub fn caption(&self) -> AttributeValue<String> {
        self.caption.get(&self.host_ref)
    }

    pub const fn host_ref(&self) -> &R {
        &self.host_ref
    }

    pub const fn uuid(&self) -> RecordId {
        self.uuid
    }
}

impl<R> fmt::Debug for NodeDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("node_id", &self.node_id)
            .field("parent_node_id", &self.parent_node_id)
            .field("is_folder", &self.is_folder)
            .field("uuid", &self.uuid)
            .finish_non_exhaustive()
    }
}

/// Projects one host record.
pub fn project_record<R: HostRecord>(
    record: &R,
    mapping: &AttributeMapping<R>,
) -> NodeDescriptor<R> {
    let node_id = mapping
        .node_id
        .get(record)
        .value
        .map(|value| value.to_key())
        .unwrap_or_default();
    if node_id.is_empty() {
        tracing::debug!(record = %record.record_id(), "record has no node id");
    }
    let parent_node_id = mapping
        .parent_id
        .get(record)
        .value
        .map(|value| value.to_key())
        .filter(|key| !key.is_empty());
    let is_folder = mapping
        .is_folder
        .as_ref()
        .and_then(|attr| attr.get(record).value)
        .unwrap_or(false);

    NodeDescriptor {
        node_id,
        parent_node_id,
        is_folder,
        caption: mapping.caption.clone(),
        host_ref: record.clone(),
        uuid: record.record_id(),
    }
}

/// Projects a whole batch, preserving host order.
pub fn project<R: HostRecord>(
    records: &[R],
    mapping: &AttributeMapping<R>,
) -> Vec<NodeDescriptor<R>> {
    records
        .iter()
        .map(|record| project_record(record, mapping))
        .collect()
}

/// Sibling ordering applied to the projected batch before materialization.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortPolicy {
    /// Keep host order.
    Unsorted,
    /// Group by parent key, folders before leaves.
    #[default]
    FoldersFirst,
    /// Group by parent key, leaves before folders.
    LeavesFirst,
}

/// Stable-sorts descriptors; only sibling order changes, never topology.
pub fn sort_descriptors<R>(descriptors: &mut [NodeDescriptor<R>], policy: SortPolicy) {
    let folder_rank: fn(bool) -> u8 = match policy {
        SortPolicy::Unsorted => return,
        SortPolicy::FoldersFirst => |is_folder: bool| u8::from(!is_folder),
        SortPolicy::LeavesFirst => |is_folder: bool| u8::from(is_folder),
    };
    descriptors.sort_by(|a, b| {
        compare_parent_keys(a.parent_node_id(), b.parent_node_id())
            .then_with(|| folder_rank(a.is_folder).cmp(&folder_rank(b.is_folder)))
    });
}

fn compare_parent_keys(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}
