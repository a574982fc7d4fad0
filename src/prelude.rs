pub use crate::{
    AttributeMapping, AttributeNames, AttributeResolver, AttributeValue, ContentRenderer,
    DataSource, HostAction, HostRecord, HostSelection, KeyValue, ListSnapshot, LoadStatus,
    OrphanPolicy, RecordId, RecordLabel, RecordTreeView, RefreshOutcome, SelectionMode,
    SelectionValue, SortPolicy, SourceGeneration, TreeAction, TreeDataLoader, TreeDataProvider,
    TreeEvent, TreeGlyphs, TreeScrollPolicy, TreeView, TreeViewConfig, TreeViewState,
    TreeViewStyle,
};

#[cfg(feature = "keymap")]
pub use crate::{KeymapProfile, TreeKeyBindings};
