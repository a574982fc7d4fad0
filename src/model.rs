use std::borrow::Cow;
use std::hash::Hash;

/// Pull contract between a data provider and the tree view engine.
///
/// The engine calls these methods many times per frame, so implementations
/// must be cheap and free of side effects. The structure must be a proper
/// tree when walked from [`root_item_id`](Self::root_item_id):
/// - no cycles reachable from the root;
/// - each reachable item has exactly one parent;
/// - identifiers are stable between frames (for selection/expansion).
///
/// The root item itself is never displayed; its children form the top level.
pub trait TreeDataLoader {
    /// Item identifier type.
    type Id: Copy + Eq + Hash;

    /// Returns the (hidden) root item.
    fn root_item_id(&self) -> Self::Id;
    /// Returns the item's children in display order; empty for unknown ids.
    fn children(&self, id: Self::Id) -> &[Self::Id];
    /// Returns `true` if the item exists.
    fn contains(&self, id: Self::Id) -> bool;
    /// Returns `true` if the item should render as an expandable folder.
    fn is_folder(&self, id: Self::Id) -> bool {
        !self.children(id).is_empty()
    }
    /// Display name used for search matching.
    fn item_name(&self, id: Self::Id) -> Cow<'_, str>;
    /// Returns an approximate size hint (not required to be exact).
    fn size_hint(&self) -> usize {
        0
    }
}

/// Visibility filter for items (used to build a reduced list).
pub trait TreeFilter<T: TreeDataLoader> {
    /// Returns `true` if the item matches the filter criteria.
    fn is_match(&self, loader: &T, id: T::Id) -> bool;
}

impl<T, F> TreeFilter<T> for F
where
    T: TreeDataLoader,
    F: Fn(&T, T::Id) -> bool,
{
    #[inline]
    fn is_match(&self, loader: &T, id: T::Id) -> bool {
        self(loader, id)
    }
}

/// Configuration for filtered rendering.
#[derive(Clone, Copy, Debug)]
pub struct TreeFilterConfig {
    /// Enables or disables filtering.
    pub enabled: bool,
    /// Auto-expands matching paths when filtering.
    pub auto_expand: bool,
}

impl TreeFilterConfig {
    /// Creates a configuration with filtering disabled.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            auto_expand: false,
        }
    }

    /// Creates a configuration with filtering enabled and auto-expansion.
    pub const fn enabled() -> Self {
        Self {
            enabled: true,
            auto_expand: true,
        }
    }
}

impl Default for TreeFilterConfig {
    fn default() -> Self {
        Self::disabled()
    }
}
