//! Hierarchical tree view over a flat host record list, rendered with ratatui.
//!
//! Records carry a business node id and a parent node id; the view joins them
//! into a tree under a hidden synthetic root, rebuilds it whenever the host
//! publishes a new generation of the list, and pushes selection changes back
//! into the host.
//!
//! Feature flags:
//! - `keymap`: crossterm-based key bindings and `handle_key*` helpers.
//! - `serde`: serde support for configuration and `TreeViewSnapshot`.

mod action;
mod caption;
mod config;
mod context;
mod error;
mod glyphs;
mod host;
mod index;
mod instance;
#[cfg(feature = "keymap")]
mod keymap;
mod model;
pub mod prelude;
mod projection;
mod provider;
mod refresh;
mod search;
mod selection;
mod state;
mod style;
#[cfg(test)]
mod testing;
mod widget;

pub use action::{TreeAction, TreeEvent};
pub use caption::{CaptionPoller, CaptionState, CaptionWatch};
pub use config::{AttributeNames, DEFAULT_CAPTION_POLL_MS, TreeViewConfig};
pub use context::TreeRowContext;
pub use error::{ConfigError, Result};
pub use glyphs::{
    NoContent, RecordLabel, TreeGlyphs, TreeLabelPrefix, TreeLabelProvider, TreeLabelRenderer,
    tree_label_line, tree_name_cell,
};
pub use host::{
    AttributeResolver, AttributeValue, CaptionAttribute, ContentRenderer, DataSource,
    FlagAttribute, HostAction, HostRecord, HostSelection, KeyAttribute, KeyValue, ListAttribute,
    ListSnapshot, LoadStatus, NoAction, RecordId, SelectionMode, SelectionValue,
    SourceGeneration,
};
pub use index::{IndexedNode, OrphanPolicy, TreeIndex};
pub use instance::RecordTreeView;
#[cfg(feature = "keymap")]
pub use keymap::{KeymapProfile, TreeKeyBindings};
pub use model::{TreeDataLoader, TreeFilter, TreeFilterConfig};
pub use projection::{
    AttributeMapping, NodeDescriptor, SortPolicy, project, project_record, sort_descriptors,
};
pub use provider::{TreeDataProvider, TreeItem};
pub use refresh::{
    MaterializeOptions, RefreshCoordinator, RefreshOutcome, RefreshState, RenderEngine,
};
pub use search::SearchQuery;
pub use selection::{SelectionBridge, SelectionOutcome};
pub use state::{TreeViewSnapshot, TreeViewState};
pub use style::{TreeScrollPolicy, TreeViewStyle};
pub use widget::TreeView;
