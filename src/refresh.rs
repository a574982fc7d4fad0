use crate::host::{DataSource, HostRecord, LoadStatus, RecordId, SourceGeneration};
use crate::index::{OrphanPolicy, TreeIndex};
use crate::model::TreeDataLoader;
use crate::projection::{AttributeMapping, SortPolicy, project, sort_descriptors};
use crate::provider::TreeDataProvider;

/// Imperative operations the coordinator invokes on the tree view engine.
pub trait RenderEngine<L: TreeDataLoader> {
    /// Drops cached rows and reconciles expansion/selection with `loader`.
    fn rebuild(&mut self, loader: &L);
    /// Expands every folder reachable from the root.
    fn expand_all(&mut self, loader: &L);
    /// Collapses every folder.
    fn collapse_all(&mut self);
}

/// Lifecycle of the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshState {
    /// Nothing materialized yet.
    Idle,
    /// A pass is running.
    Materializing,
    /// An index is published.
    Ready,
}

/// Result of offering a data-source value to the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The source is not available; the previous tree is kept.
    Ignored { status: LoadStatus },
    /// The source was already materialized.
    Unchanged,
    /// A new index replaced the previous one.
    Rebuilt { nodes: usize, dangling: usize },
}

/// Options applied to every materialization pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterializeOptions {
    pub sort: SortPolicy,
    pub orphans: OrphanPolicy,
    /// Expand every folder once the engine is rebuilt.
    pub open_expanded: bool,
}

/// Turns data-source updates into published indexes.
///
/// The synthetic root id is minted once and reused by every pass, so the
/// engine's expansion state for the root survives refreshes.
pub struct RefreshCoordinator<R> {
    root: RecordId,
    state: RefreshState,
    last_generation: Option<SourceGeneration>,
    provider: Option<TreeDataProvider<R>>,
    options: MaterializeOptions,
}

impl<R: HostRecord> RefreshCoordinator<R> {
    pub fn new(options: MaterializeOptions) -> Self {
        Self::with_root(RecordId::mint(), options)
    }

    /// Coordinator with a caller-chosen root id.
    pub const fn with_root(root: RecordId, options: MaterializeOptions) -> Self {
        Self {
            root,
            state: RefreshState::Idle,
            last_generation: None,
            provider: None,
            options,
        }
    }

    pub const fn state(&self) -> RefreshState {
        self.state
    }

    pub const fn root_item_id(&self) -> RecordId {
        self.root
    }

    pub const fn options(&self) -> MaterializeOptions {
        self.options
    }

    /// Published provider, `None` until the first pass.
    pub const fn provider(&self) -> Option<&TreeDataProvider<R>> {
        self.provider.as_ref()
    }

    /// Offers the current data-source value.
    ///
    /// A pass runs only when the source is available and its generation
    /// differs from the last one materialized.
    pub fn on_source_update<S, E>(
        &mut self,
        source: &S,
        mapping: &AttributeMapping<R>,
        engine: &mut E,
    ) -> RefreshOutcome
    where
        S: DataSource<R> + ?Sized,
        E: RenderEngine<TreeDataProvider<R>> + ?Sized,
    {
        let status = source.status();
        if status != LoadStatus::Available {
            tracing::debug!(?status, "data source not available, keeping current tree");
            return RefreshOutcome::Ignored { status };
        }
        let generation = source.generation();
        if self.last_generation == Some(generation) {
            return RefreshOutcome::Unchanged;
        }

        self.transition(RefreshState::Materializing);
        let mut descriptors = project(source.items(), mapping);
        sort_descriptors(&mut descriptors, self.options.sort);
        let index = TreeIndex::materialize(self.root, descriptors, self.options.orphans);
        let nodes = index.len();
        let dangling = index.dangling().len();
        tracing::info!(nodes, dangling, generation = generation.0, "tree materialized");

        self.provider = Some(TreeDataProvider::new(index));
        self.last_generation = Some(generation);
        self.transition(RefreshState::Ready);

        if let Some(provider) = self.provider.as_ref() {
            engine.rebuild(provider);
            if self.options.open_expanded {
                engine.expand_all(provider);
            }
        }
        RefreshOutcome::Rebuilt { nodes, dangling }
    }

    /// Drops the published index and returns to `Idle`.
    pub fn teardown(&mut self) {
        self.provider = None;
        self.last_generation = None;
        self.transition(RefreshState::Idle);
    }

    fn transition(&mut self, next: RefreshState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "refresh state");
            self.state = next;
        }
    }
}
