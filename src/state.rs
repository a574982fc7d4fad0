use std::hash::Hash;

use ratatui::widgets::TableState;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::action::{TreeAction, TreeEvent};
use crate::host::SelectionMode;
use crate::model::{TreeDataLoader, TreeFilter, TreeFilterConfig};
use crate::refresh::RenderEngine;
use crate::search::SearchQuery;
use crate::style::TreeScrollPolicy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "keymap")]
use crate::keymap::TreeKeyBindings;
#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;

/// A visible row with metadata used for rendering and navigation.
#[derive(Clone)]
pub struct VisibleNode<Id> {
    pub(crate) id: Id,
    pub(crate) level: u16,
    pub(crate) parent: Option<Id>,
    pub(crate) is_folder: bool,
    pub(crate) is_tail_stack: SmallVec<[bool; 8]>,
}

/// Engine state: focus, expansion, selection, search and the row cache.
///
/// The loader's root item is never shown; its children are the level-0 rows.
pub struct TreeViewState<Id> {
    list_state: TableState,
    // Keyed by (parent, id): a reparented item starts collapsed.
    expanded: FxHashSet<(Option<Id>, Id)>,
    // Cached visible rows to avoid recomputing DFS every render.
    visible_nodes: Vec<VisibleNode<Id>>,
    // Fast lookup from item id to visible row index.
    visible_index: FxHashMap<Id, usize>,
    // Marks whether visible_nodes must be rebuilt.
    dirty: bool,
    selection_mode: SelectionMode,
    selected: Vec<Id>,
    selected_set: FxHashSet<Id>,
    search: Option<SearchQuery>,
    filter_on_search: bool,
    // Matching visible rows in display order.
    search_matches: Vec<Id>,
    search_match_set: FxHashSet<Id>,
    search_dirty: bool,
    draw_lines: bool,
    #[cfg(feature = "keymap")]
    keymap: TreeKeyBindings,
}

/// Snapshot of state (focus, expansion, selection).
///
/// With the `serde` feature enabled, this type derives `Serialize`/`Deserialize`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct TreeViewSnapshot<Id> {
    /// Expanded items as `(parent, id)` pairs.
    pub expanded: Vec<(Option<Id>, Id)>,
    /// Selected items in selection order.
    pub selected: Vec<Id>,
    /// Focused row index in the visible list.
    pub focused: Option<usize>,
    /// Scroll offset within the visible list.
    pub offset: usize,
    /// Whether guide lines were enabled.
    pub draw_lines: bool,
}

impl<Id: Copy + Eq + Hash> Default for TreeViewState<Id> {
    fn default() -> Self {
        Self::new(SelectionMode::Single)
    }
}

impl<Id: Copy + Eq + Hash> TreeViewState<Id> {
    /// Creates a new empty state with default capacity.
    pub fn new(selection_mode: SelectionMode) -> Self {
        Self::with_capacity(selection_mode, 0)
    }

    /// Creates a state with preallocated capacity for the given number of items.
    pub fn with_capacity(selection_mode: SelectionMode, capacity: usize) -> Self {
        Self {
            list_state: TableState::default(),
            expanded: FxHashSet::with_capacity_and_hasher(capacity, FxBuildHasher),
            visible_nodes: Vec::with_capacity(capacity),
            visible_index: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            dirty: true,
            selection_mode,
            selected: Vec::new(),
            selected_set: FxHashSet::default(),
            search: None,
            filter_on_search: false,
            search_matches: Vec::new(),
            search_match_set: FxHashSet::default(),
            search_dirty: true,
            draw_lines: true,
            #[cfg(feature = "keymap")]
            keymap: TreeKeyBindings::new(),
        }
    }

    #[cfg(feature = "keymap")]
    pub const fn keymap(&self) -> &TreeKeyBindings {
        &self.keymap
    }

    #[cfg(feature = "keymap")]
    /// Returns a mutable reference to the key binding set.
    pub const fn keymap_mut(&mut self) -> &mut TreeKeyBindings {
        &mut self.keymap
    }

    pub(crate) const fn list_state(&self) -> &TableState {
        &self.list_state
    }

    pub(crate) const fn list_state_mut(&mut self) -> &mut TableState {
        &mut self.list_state
    }

    pub(crate) fn visible_nodes(&self) -> &[VisibleNode<Id>] {
        &self.visible_nodes
    }

    /// Ids of the visible rows in display order.
    pub fn visible_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.visible_nodes.iter().map(|node| node.id)
    }

    fn visible_index_of(&self, id: Id) -> Option<usize> {
        self.visible_index.get(&id).copied()
    }

    pub(crate) fn is_expanded(&self, parent: Option<Id>, id: Id) -> bool {
        self.expanded.contains(&(parent, id))
    }

    /// Captures a snapshot of the current state for persistence or restore.
    pub fn snapshot(&self) -> TreeViewSnapshot<Id> {
        TreeViewSnapshot {
            expanded: self.expanded.iter().copied().collect(),
            selected: self.selected.clone(),
            focused: self.list_state.selected(),
            offset: self.list_state.offset(),
            draw_lines: self.draw_lines,
        }
    }

    /// Restores state from a previously captured snapshot.
    pub fn restore(&mut self, snapshot: TreeViewSnapshot<Id>) {
        self.expanded = snapshot.expanded.into_iter().collect();
        self.set_selected_ids(snapshot.selected);
        self.draw_lines = snapshot.draw_lines;
        *self.list_state.offset_mut() = snapshot.offset;
        self.list_state.select(snapshot.focused);
        self.dirty = true;
        self.search_dirty = true;
    }

    /// Returns whether guide lines are drawn.
    #[inline]
    pub const fn draw_lines(&self) -> bool {
        self.draw_lines
    }

    /// Enables or disables drawing of guide lines.
    pub const fn set_draw_lines(&mut self, draw: bool) {
        self.draw_lines = draw;
    }

    /// Reduces rows to matching paths while a search is open.
    pub const fn set_filter_on_search(&mut self, enabled: bool) {
        self.filter_on_search = enabled;
        self.dirty = true;
    }

    /// Marks the visible-row cache as dirty.
    pub const fn invalidate(&mut self) {
        self.dirty = true;
        self.search_dirty = true;
    }

    /// Focuses the first visible row.
    pub const fn focus_first(&mut self) {
        self.list_state.select_first();
    }

    /// Focuses the last visible row.
    pub const fn focus_last(&mut self) {
        self.list_state.select_last();
    }

    /// Scrolls the view down by the given number of rows.
    pub fn scroll_down_by(&mut self, amount: u16) {
        self.list_state.scroll_down_by(amount);
    }

    /// Scrolls the view up by the given number of rows.
    pub fn scroll_up_by(&mut self, amount: u16) {
        self.list_state.scroll_up_by(amount);
    }

    /// Moves focus to the previous visible row.
    pub fn focus_prev(&mut self) {
        if self.visible_nodes.is_empty() {
            self.list_state.select(None);
            return;
        }
        let focused = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(focused.saturating_sub(1)));
    }

    /// Moves focus to the next visible row.
    pub fn focus_next(&mut self) {
        if self.visible_nodes.is_empty() {
            self.list_state.select(None);
            return;
        }
        let focused = self.list_state.selected().unwrap_or(0);
        let next = (focused + 1).min(self.visible_nodes.len().saturating_sub(1));
        self.list_state.select(Some(next));
    }

    /// Adjusts scroll offset so the focused row is within the viewport.
    pub fn ensure_focus_visible(&mut self, viewport_height: usize) {
        self.clamp_focus();
        let Some(focused) = self.list_state.selected() else {
            return;
        };
        let viewport_height = viewport_height.max(1);
        let offset = self.list_state.offset();
        if focused < offset {
            *self.list_state.offset_mut() = focused;
        } else if focused >= offset + viewport_height {
            *self.list_state.offset_mut() = focused + 1 - viewport_height;
        }
    }

    /// Adjusts focus visibility according to the provided scroll policy.
    pub fn ensure_focus_visible_with_policy(
        &mut self,
        viewport_height: usize,
        policy: TreeScrollPolicy,
    ) {
        match policy {
            TreeScrollPolicy::KeepInView => self.ensure_focus_visible(viewport_height),
            TreeScrollPolicy::CenterOnSelect => {
                self.ensure_focus_visible_centered(viewport_height);
            }
        }
    }

    fn ensure_focus_visible_centered(&mut self, viewport_height: usize) {
        self.clamp_focus();
        let Some(focused) = self.list_state.selected() else {
            return;
        };
        let viewport_height = viewport_height.max(1);
        let total = self.visible_nodes.len();
        if total <= viewport_height {
            *self.list_state.offset_mut() = 0;
            return;
        }

        // Center focus, then clamp to valid scroll range.
        let half = viewport_height / 2;
        let max_offset = total.saturating_sub(viewport_height);
        *self.list_state.offset_mut() = focused.saturating_sub(half).min(max_offset);
    }

    /// Returns the id of the focused item, if any.
    pub fn focused_id(&self) -> Option<Id> {
        self.list_state
            .selected()
            .and_then(|idx| self.visible_nodes.get(idx).map(|node| node.id))
    }

    /// Returns the parent id of the focused item, if any.
    pub fn focused_parent_id(&self) -> Option<Id> {
        self.list_state
            .selected()
            .and_then(|idx| self.visible_nodes.get(idx).and_then(|node| node.parent))
    }

    /// Returns the number of visible rows in the current view.
    pub const fn visible_len(&self) -> usize {
        self.visible_nodes.len()
    }

    /// Returns the depth level of the focused item (top level is 0).
    pub fn focused_level(&self) -> Option<u16> {
        self.list_state
            .selected()
            .and_then(|idx| self.visible_nodes.get(idx).map(|node| node.level))
    }

    /// Returns whether the focused item is expanded (or `None` if nothing is focused).
    pub fn focused_is_expanded(&self) -> Option<bool> {
        self.list_state.selected().and_then(|idx| {
            self.visible_nodes
                .get(idx)
                .map(|node| node.is_folder && self.expanded.contains(&(node.parent, node.id)))
        })
    }

    /// Expands the tree to the item and focuses it if present.
    pub fn focus_by_id<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T, id: Id) -> bool {
        let _ = self.expand_to(loader, id);
        self.ensure_rows(loader);
        if let Some(idx) = self.visible_index_of(id) {
            self.list_state.select(Some(idx));
            true
        } else {
            false
        }
    }

    /// Expands the tree to the item and returns whether it becomes visible.
    pub fn ensure_visible_id<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T, id: Id) -> bool {
        let _ = self.expand_to(loader, id);
        self.ensure_rows(loader);
        self.visible_index.contains_key(&id)
    }

    /// Expands all ancestors of the item so it becomes visible.
    pub fn expand_to<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T, id: Id) -> bool {
        let Some(path) = Self::find_path_to(loader, id) else {
            return false;
        };
        for (parent, node) in path {
            if node != id && loader.is_folder(node) {
                self.expanded.insert((parent, node));
            }
        }
        self.invalidate();
        true
    }

    /// Expands all folders reachable from the root.
    pub fn expand_all<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T) {
        self.expanded.clear();
        let hint = loader.size_hint();
        if hint > 0 {
            let extra = hint.saturating_sub(self.expanded.capacity());
            if extra > 0 {
                self.expanded.reserve(extra);
            }
        }
        let root = loader.root_item_id();
        let mut stack = Vec::with_capacity(hint.max(1));
        stack.push((None, root));
        while let Some((parent, node)) = stack.pop() {
            if loader.is_folder(node) {
                self.expanded.insert((parent, node));
            }
            for child in loader.children(node).iter().copied() {
                stack.push((Some(node), child));
            }
        }
        self.invalidate();
    }

    /// Collapses all folders.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
        self.invalidate();
    }

    /// Drops expansion entries whose (parent, id) edge is gone and selection
    /// entries for ids the loader no longer knows, rebuilds the rows and keeps
    /// focus on the same item if it is still visible.
    pub fn reconcile<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T) {
        let focused = self.focused_id();
        self.expanded.retain(|(parent, id)| {
            loader.contains(*id)
                && parent.is_none_or(|parent| {
                    loader.contains(parent) && loader.children(parent).contains(id)
                })
        });
        let before = self.selected.len();
        self.selected.retain(|id| loader.contains(*id));
        if self.selected.len() != before {
            self.selected_set = self.selected.iter().copied().collect();
            tracing::debug!(removed = before - self.selected.len(), "pruned stale selection");
        }
        self.invalidate();
        self.ensure_rows(loader);
        match focused.and_then(|id| self.visible_index_of(id)) {
            Some(idx) => self.list_state.select(Some(idx)),
            None => self.clamp_focus(),
        }
    }

    /// Ensures the visible rows are up to date, applying the search filter
    /// when filtering is enabled and a search is open.
    pub fn ensure_rows<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T) {
        if self.dirty {
            let query = self
                .search
                .as_ref()
                .filter(|query| self.filter_on_search && !query.is_empty())
                .cloned();
            match query {
                Some(query) => {
                    self.ensure_visible_nodes_filtered(loader, &query, TreeFilterConfig::enabled());
                }
                None => self.update_visible_nodes(loader),
            }
        }
        self.ensure_search_cache(loader);
    }

    /// Ensures the visible row list is up to date (if marked dirty).
    pub fn ensure_visible_nodes<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T) {
        if !self.dirty {
            return;
        }
        self.update_visible_nodes(loader);
    }

    /// Ensures the visible row list is up to date with an active filter.
    pub fn ensure_visible_nodes_filtered<T, F>(
        &mut self,
        loader: &T,
        filter: &F,
        config: TreeFilterConfig,
    ) where
        T: TreeDataLoader<Id = Id>,
        F: TreeFilter<T>,
    {
        if !self.dirty {
            return;
        }
        if !config.enabled {
            self.update_visible_nodes(loader);
            return;
        }

        self.visible_nodes.clear();
        self.visible_index.clear();
        self.reserve_visible_capacity(loader);
        let root = loader.root_item_id();
        let memo_capacity = loader.size_hint().max(1);
        let mut memo: FxHashMap<Id, bool> =
            FxHashMap::with_capacity_and_hasher(memo_capacity, FxBuildHasher);
        let visible_top: SmallVec<[Id; 8]> = loader
            .children(root)
            .iter()
            .copied()
            .filter(|child| self.subtree_has_match(loader, *child, filter, &mut memo))
            .collect();
        let mut is_tail_stack: SmallVec<[bool; 8]> = SmallVec::new();
        for child in visible_top {
            self.build_visible_nodes_filtered(
                loader,
                child,
                0,
                Some(root),
                &mut is_tail_stack,
                filter,
                config,
                &mut memo,
            );
        }
        self.dirty = false;
        self.search_dirty = true;
        self.clamp_focus();
    }

    /// Recomputes the matching rows for the open search.
    fn ensure_search_cache<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T) {
        if !self.search_dirty {
            return;
        }
        self.search_matches.clear();
        self.search_match_set.clear();
        if let Some(query) = self.search.as_ref().filter(|query| !query.is_empty()) {
            for node in &self.visible_nodes {
                if query.is_match(loader, node.id) {
                    self.search_matches.push(node.id);
                    self.search_match_set.insert(node.id);
                }
            }
        }
        self.search_dirty = false;
    }

    /// Selection cardinality.
    pub const fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    /// Switches the selection cardinality; single mode keeps only the first
    /// selected id.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection_mode = mode;
        if mode == SelectionMode::Single && self.selected.len() > 1 {
            self.selected.truncate(1);
            self.selected_set = self.selected.iter().copied().collect();
        }
    }

    /// Selected ids in selection order.
    pub fn selected_ids(&self) -> &[Id] {
        &self.selected
    }

    #[inline]
    pub fn is_selected(&self, id: Id) -> bool {
        self.selected_set.contains(&id)
    }

    /// Replaces the selection without emitting an event.
    pub fn set_selected_ids(&mut self, ids: impl IntoIterator<Item = Id>) {
        self.selected.clear();
        self.selected_set.clear();
        for id in ids {
            if self.selected_set.insert(id) {
                self.selected.push(id);
            }
            if self.selection_mode == SelectionMode::Single {
                break;
            }
        }
    }

    /// Makes `id` the only selected item.
    pub fn select(&mut self, id: Id) {
        self.set_selected_ids([id]);
    }

    /// Adds `id` to the selection or removes it.
    ///
    /// In single mode toggling the selected item clears the selection and
    /// toggling another item replaces it.
    pub fn toggle_selected(&mut self, id: Id) {
        if self.selected_set.remove(&id) {
            self.selected.retain(|selected| *selected != id);
            return;
        }
        if self.selection_mode == SelectionMode::Single {
            self.selected.clear();
            self.selected_set.clear();
        }
        self.selected_set.insert(id);
        self.selected.push(id);
    }

    /// Deselects everything; returns whether anything was selected.
    pub fn clear_selection(&mut self) -> bool {
        let had_selection = !self.selected.is_empty();
        self.selected.clear();
        self.selected_set.clear();
        had_selection
    }

    pub const fn is_search_open(&self) -> bool {
        self.search.is_some()
    }

    /// Current search text, empty when closed.
    pub fn search_value(&self) -> &str {
        self.search.as_ref().map_or("", SearchQuery::as_str)
    }

    /// Matching visible rows in display order.
    pub fn search_matches(&self) -> &[Id] {
        &self.search_matches
    }

    #[inline]
    pub fn is_search_match(&self, id: Id) -> bool {
        self.search_match_set.contains(&id)
    }

    /// Opens the search with `initial` text.
    pub fn open_search<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T, initial: &str) {
        self.set_search(loader, SearchQuery::new(initial));
    }

    /// Replaces the search text and focuses the first matching row.
    pub fn set_search<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T, query: SearchQuery) {
        self.search = Some(query);
        self.invalidate();
        self.ensure_rows(loader);
        if let Some(first) = self.search_matches.first().copied()
            && let Some(idx) = self.visible_index_of(first)
        {
            self.list_state.select(Some(idx));
        }
    }

    /// Closes the search.
    pub fn close_search(&mut self) {
        if self.search.take().is_some() {
            self.invalidate();
        }
    }

    fn edit_search<T, E>(&mut self, loader: &T, edit: E) -> bool
    where
        T: TreeDataLoader<Id = Id>,
        E: FnOnce(&mut SearchQuery),
    {
        let Some(mut query) = self.search.clone() else {
            return false;
        };
        edit(&mut query);
        self.set_search(loader, query);
        true
    }

    /// Focuses the next matching row after the focused one.
    pub fn focus_next_match(&mut self) -> bool {
        let current = self.list_state.selected();
        let next = self
            .search_matches
            .iter()
            .filter_map(|id| self.visible_index_of(*id))
            .find(|idx| current.is_none_or(|current| *idx > current));
        if let Some(idx) = next {
            self.list_state.select(Some(idx));
        }
        next.is_some()
    }

    /// Focuses the previous matching row before the focused one.
    pub fn focus_prev_match(&mut self) -> bool {
        let Some(current) = self.list_state.selected() else {
            return false;
        };
        let prev = self
            .search_matches
            .iter()
            .rev()
            .filter_map(|id| self.visible_index_of(*id))
            .find(|idx| *idx < current);
        if let Some(idx) = prev {
            self.list_state.select(Some(idx));
        }
        prev.is_some()
    }

    /// Handles a tree action and returns the resulting event.
    pub fn handle_action<T: TreeDataLoader<Id = Id>, C>(
        &mut self,
        loader: &T,
        action: TreeAction<C>,
    ) -> TreeEvent<C> {
        self.ensure_rows(loader);
        self.handle_action_inner(loader, action)
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event into an action and handles it.
    pub fn handle_key<T: TreeDataLoader<Id = Id>>(
        &mut self,
        loader: &T,
        key: KeyEvent,
    ) -> TreeEvent<()> {
        self.ensure_rows(loader);
        let Some(action) = self.keymap.resolve(key, self.is_search_open()) else {
            return TreeEvent::Unhandled;
        };
        self.handle_action_inner(loader, action)
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event with a custom mapping and handles it.
    pub fn handle_key_with<T, C, F>(
        &mut self,
        loader: &T,
        key: KeyEvent,
        custom: F,
    ) -> TreeEvent<C>
    where
        T: TreeDataLoader<Id = Id>,
        F: Fn(KeyEvent) -> Option<C>,
    {
        self.ensure_rows(loader);
        let Some(action) = self
            .keymap
            .resolve_with(key, self.is_search_open(), custom)
        else {
            return TreeEvent::Unhandled;
        };
        self.handle_action_inner(loader, action)
    }

    fn handle_action_inner<T: TreeDataLoader<Id = Id>, C>(
        &mut self,
        loader: &T,
        action: TreeAction<C>,
    ) -> TreeEvent<C> {
        match action {
            TreeAction::Custom(_) => return TreeEvent::Action(action),
            TreeAction::OpenSearch(initial) => {
                if let Some(ch) = initial {
                    self.expand_all(loader);
                    self.open_search(loader, ch.encode_utf8(&mut [0; 4]));
                } else {
                    self.open_search(loader, "");
                }
                return TreeEvent::Handled;
            }
            TreeAction::SearchInput(ch) => {
                return handled_if(self.edit_search(loader, |query| query.push(ch)));
            }
            TreeAction::SearchBackspace => {
                return handled_if(self.edit_search(loader, SearchQuery::pop));
            }
            TreeAction::CloseSearch => {
                if !self.is_search_open() {
                    return TreeEvent::Unhandled;
                }
                self.close_search();
                return TreeEvent::Handled;
            }
            TreeAction::SubmitSearch => {
                if !self.is_search_open() {
                    return TreeEvent::Unhandled;
                }
                let focused = self.focused_id();
                self.close_search();
                self.ensure_rows(loader);
                let Some(id) = focused else {
                    return TreeEvent::Handled;
                };
                if let Some(idx) = self.visible_index_of(id) {
                    self.list_state.select(Some(idx));
                }
                self.select(id);
                return TreeEvent::SelectionChanged;
            }
            TreeAction::ClearSelection => {
                return if self.clear_selection() {
                    TreeEvent::SelectionChanged
                } else {
                    TreeEvent::Unhandled
                };
            }
            TreeAction::ExpandAll => {
                self.expand_all(loader);
                return TreeEvent::Handled;
            }
            TreeAction::CollapseAll => {
                self.collapse_all();
                return TreeEvent::Handled;
            }
            TreeAction::ToggleGuides => {
                self.draw_lines = !self.draw_lines;
                return TreeEvent::Handled;
            }
            _ => {}
        }

        if self.visible_nodes.is_empty() {
            return TreeEvent::Unhandled;
        }

        match action {
            TreeAction::FocusPrev => {
                self.focus_prev();
                TreeEvent::Handled
            }
            TreeAction::FocusNext => {
                self.focus_next();
                TreeEvent::Handled
            }
            TreeAction::FocusParent => {
                self.focus_parent();
                TreeEvent::Handled
            }
            TreeAction::FocusChild => {
                self.focus_child_with_descendants(loader);
                TreeEvent::Handled
            }
            TreeAction::FocusFirst => {
                self.focus_first();
                TreeEvent::Handled
            }
            TreeAction::FocusLast => {
                self.focus_last();
                TreeEvent::Handled
            }
            TreeAction::SearchNext => handled_if(self.focus_next_match()),
            TreeAction::SearchPrev => handled_if(self.focus_prev_match()),
            TreeAction::ToggleRecursive => {
                if let Some(focused_idx) = self.list_state.selected()
                    && let Some(node) = self.visible_nodes.get(focused_idx)
                    && node.is_folder
                {
                    let parent = node.parent;
                    let node_id = node.id;
                    let should_expand = !self.expanded.contains(&(parent, node_id));
                    self.set_expanded_recursive(loader, node_id, parent, should_expand);
                    self.invalidate();
                    return TreeEvent::Handled;
                }
                TreeEvent::Unhandled
            }
            TreeAction::ToggleNode => {
                if let Some(focused_idx) = self.list_state.selected()
                    && let Some(node) = self.visible_nodes.get(focused_idx)
                    && node.is_folder
                {
                    self.toggle(node.id, node.parent);
                    return TreeEvent::Handled;
                }
                TreeEvent::Unhandled
            }
            TreeAction::Select => match self.focused_id() {
                Some(id) => {
                    self.select(id);
                    TreeEvent::SelectionChanged
                }
                None => TreeEvent::Unhandled,
            },
            TreeAction::ToggleSelect => match self.focused_id() {
                Some(id) => {
                    self.toggle_selected(id);
                    TreeEvent::SelectionChanged
                }
                None => TreeEvent::Unhandled,
            },
            TreeAction::Custom(_)
            | TreeAction::OpenSearch(_)
            | TreeAction::SearchInput(_)
            | TreeAction::SearchBackspace
            | TreeAction::CloseSearch
            | TreeAction::SubmitSearch
            | TreeAction::ClearSelection
            | TreeAction::ExpandAll
            | TreeAction::CollapseAll
            | TreeAction::ToggleGuides => TreeEvent::Unhandled,
        }
    }

    /// Toggles expansion state for the given item.
    pub fn toggle(&mut self, node_id: Id, parent: Option<Id>) {
        let key = (parent, node_id);
        if !self.expanded.remove(&key) {
            self.expanded.insert(key);
        }
        self.invalidate();
    }

    /// Sets expansion state for the given item.
    pub fn set_expanded(&mut self, node_id: Id, parent: Option<Id>, expand: bool) {
        let key = (parent, node_id);
        if expand {
            self.expanded.insert(key);
        } else {
            self.expanded.remove(&key);
        }
        self.invalidate();
    }

    fn reserve_visible_capacity<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T) {
        let hint = loader.size_hint();
        if hint == 0 {
            return;
        }
        let node_extra = hint.saturating_sub(self.visible_nodes.capacity());
        if node_extra > 0 {
            self.visible_nodes.reserve(node_extra);
        }
        let index_extra = hint.saturating_sub(self.visible_index.capacity());
        if index_extra > 0 {
            self.visible_index.reserve(index_extra);
        }
    }

    fn update_visible_nodes<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T) {
        self.visible_nodes.clear();
        self.visible_index.clear();
        self.reserve_visible_capacity(loader);
        let root = loader.root_item_id();
        let mut is_tail_stack: SmallVec<[bool; 8]> = SmallVec::new();
        for child in loader.children(root).iter().copied() {
            self.build_visible_nodes(loader, child, 0, Some(root), &mut is_tail_stack);
        }
        self.dirty = false;
        self.search_dirty = true;
        self.clamp_focus();
    }

    fn find_path_to<T: TreeDataLoader<Id = Id>>(
        loader: &T,
        target: Id,
    ) -> Option<Vec<(Option<Id>, Id)>> {
        let mut path: Vec<(Option<Id>, Id)> = Vec::new();
        if Self::dfs_find_path(loader, loader.root_item_id(), None, target, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn dfs_find_path<T: TreeDataLoader<Id = Id>>(
        loader: &T,
        node: Id,
        parent: Option<Id>,
        target: Id,
        path: &mut Vec<(Option<Id>, Id)>,
    ) -> bool {
        path.push((parent, node));
        if node == target {
            return true;
        }
        for child in loader.children(node).iter().copied() {
            if Self::dfs_find_path(loader, child, Some(node), target, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    fn build_visible_nodes<T: TreeDataLoader<Id = Id>>(
        &mut self,
        loader: &T,
        node_id: Id,
        level: u16,
        parent: Option<Id>,
        is_tail_stack: &mut SmallVec<[bool; 8]>,
    ) {
        let is_folder = loader.is_folder(node_id);
        let idx = self.visible_nodes.len();
        self.visible_nodes.push(VisibleNode {
            id: node_id,
            level,
            parent,
            is_folder,
            is_tail_stack: is_tail_stack.clone(),
        });
        self.visible_index.insert(node_id, idx);

        let is_expanded = is_folder && self.expanded.contains(&(parent, node_id));
        if !is_expanded {
            return;
        }

        let children = loader.children(node_id);
        for (i, child) in children.iter().copied().enumerate() {
            let is_last = i == children.len().saturating_sub(1);
            is_tail_stack.push(is_last);
            self.build_visible_nodes(loader, child, level + 1, Some(node_id), is_tail_stack);
            is_tail_stack.pop();
        }
    }

    fn subtree_has_match<T, F>(
        &self,
        loader: &T,
        node_id: Id,
        filter: &F,
        memo: &mut FxHashMap<Id, bool>,
    ) -> bool
    where
        T: TreeDataLoader<Id = Id>,
        F: TreeFilter<T>,
    {
        if let Some(&cached) = memo.get(&node_id) {
            return cached;
        }

        let mut matched = filter.is_match(loader, node_id);
        if !matched {
            for child in loader.children(node_id).iter().copied() {
                if self.subtree_has_match(loader, child, filter, memo) {
                    matched = true;
                    break;
                }
            }
        }

        memo.insert(node_id, matched);
        matched
    }

    #[allow(clippy::too_many_arguments)]
    fn build_visible_nodes_filtered<T, F>(
        &mut self,
        loader: &T,
        node_id: Id,
        level: u16,
        parent: Option<Id>,
        is_tail_stack: &mut SmallVec<[bool; 8]>,
        filter: &F,
        config: TreeFilterConfig,
        memo: &mut FxHashMap<Id, bool>,
    ) -> bool
    where
        T: TreeDataLoader<Id = Id>,
        F: TreeFilter<T>,
    {
        let self_match = filter.is_match(loader, node_id);
        let children = loader.children(node_id);

        let mut visible_children: SmallVec<[Id; 8]> = SmallVec::new();
        for child in children.iter().copied() {
            if self.subtree_has_match(loader, child, filter, memo) {
                visible_children.push(child);
            }
        }

        let include_self = self_match || !visible_children.is_empty();
        if !include_self {
            return false;
        }

        let idx = self.visible_nodes.len();
        self.visible_nodes.push(VisibleNode {
            id: node_id,
            level,
            parent,
            is_folder: loader.is_folder(node_id),
            is_tail_stack: is_tail_stack.clone(),
        });
        self.visible_index.insert(node_id, idx);

        let expand_children = config.auto_expand || self.expanded.contains(&(parent, node_id));
        if expand_children && !visible_children.is_empty() {
            let last_idx = visible_children.len().saturating_sub(1);
            for (idx, child) in visible_children.iter().copied().enumerate() {
                is_tail_stack.push(idx == last_idx);
                self.build_visible_nodes_filtered(
                    loader,
                    child,
                    level + 1,
                    Some(node_id),
                    is_tail_stack,
                    filter,
                    config,
                    memo,
                );
                is_tail_stack.pop();
            }
        }

        true
    }

    const fn clamp_focus(&mut self) {
        if self.visible_nodes.is_empty() {
            self.list_state.select(None);
            return;
        }

        if let Some(focused) = self.list_state.selected()
            && focused >= self.visible_nodes.len()
        {
            self.list_state
                .select(Some(self.visible_nodes.len().saturating_sub(1)));
        }
    }

    fn focus_parent(&mut self) {
        let Some(focused_idx) = self.list_state.selected() else {
            return;
        };

        let Some(parent_id) = self
            .visible_nodes
            .get(focused_idx)
            .and_then(|node| node.parent)
        else {
            return;
        };

        // The root is hidden, so top-level rows have no visible parent.
        if let Some(parent_idx) = self.visible_index_of(parent_id) {
            self.list_state.select(Some(parent_idx));
        }
    }

    fn focus_child_with_descendants<T: TreeDataLoader<Id = Id>>(&mut self, loader: &T) {
        let Some(mut focused_idx) = self.list_state.selected() else {
            return;
        };
        let Some(focused_node) = self.visible_nodes.get(focused_idx) else {
            return;
        };
        let node_id = focused_node.id;
        let mut level = focused_node.level;
        let parent_id = focused_node.parent;

        if focused_node.is_folder {
            if self.expanded.insert((parent_id, node_id)) {
                self.invalidate();
                self.ensure_rows(loader);

                let Some(current_idx) = self.visible_index_of(node_id) else {
                    return;
                };
                focused_idx = current_idx;
                if let Some(node) = self.visible_nodes.get(current_idx) {
                    level = node.level;
                }
                self.list_state.select(Some(current_idx));
            }

            // Prefer children that are themselves folders.
            for idx in focused_idx + 1..self.visible_nodes.len() {
                let candidate = &self.visible_nodes[idx];
                if candidate.level <= level {
                    break;
                }
                if candidate.level == level + 1 && candidate.is_folder {
                    self.list_state.select(Some(idx));
                    return;
                }
            }
        }

        // Fallback: pick the next folder in the subtree.
        for idx in focused_idx + 1..self.visible_nodes.len() {
            let candidate = &self.visible_nodes[idx];
            if candidate.level < level {
                break;
            }
            if candidate.is_folder {
                self.list_state.select(Some(idx));
                return;
            }
        }
    }

    fn set_expanded_recursive<T: TreeDataLoader<Id = Id>>(
        &mut self,
        loader: &T,
        node_id: Id,
        parent: Option<Id>,
        expand: bool,
    ) {
        let key = (parent, node_id);
        if expand {
            if loader.is_folder(node_id) {
                self.expanded.insert(key);
            }
        } else {
            self.expanded.remove(&key);
        }

        for child in loader.children(node_id).iter().copied() {
            self.set_expanded_recursive(loader, child, Some(node_id), expand);
        }
    }
}

const fn handled_if<C>(handled: bool) -> TreeEvent<C> {
    if handled {
        TreeEvent::Handled
    } else {
        TreeEvent::Unhandled
    }
}

impl<T: TreeDataLoader> RenderEngine<T> for TreeViewState<T::Id> {
    fn rebuild(&mut self, loader: &T) {
        self.reconcile(loader);
    }

    fn expand_all(&mut self, loader: &T) {
        Self::expand_all(self, loader);
        self.ensure_rows(loader);
    }

    fn collapse_all(&mut self) {
        Self::collapse_all(self);
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    struct TestTree {
        children: Vec<Vec<usize>>,
        names: Vec<&'static str>,
    }

    impl TestTree {
        // 0 is the hidden root.
        fn new() -> Self {
            Self {
                children: vec![
                    vec![1, 2], // 0
                    vec![3, 4], // 1
                    vec![],     // 2
                    vec![],     // 3
                    vec![],     // 4
                ],
                names: vec!["root", "fruit", "bread", "apple", "banana"],
            }
        }
    }

    impl TreeDataLoader for TestTree {
        type Id = usize;

        fn root_item_id(&self) -> Self::Id {
            0
        }

        fn children(&self, id: Self::Id) -> &[Self::Id] {
            self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
        }

        // Blank names stand for removed items.
        fn contains(&self, id: Self::Id) -> bool {
            self.names.get(id).is_some_and(|name| !name.is_empty())
        }

        fn item_name(&self, id: Self::Id) -> Cow<'_, str> {
            Cow::Borrowed(self.names.get(id).copied().unwrap_or(""))
        }
    }

    fn ids(state: &TreeViewState<usize>) -> Vec<usize> {
        state.visible_ids().collect()
    }

    #[test]
    fn root_is_hidden_and_children_start_at_level_zero() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();

        state.set_expanded(1, Some(0), true);
        state.ensure_rows(&tree);

        let levels: Vec<_> = state.visible_nodes.iter().map(|n| n.level).collect();
        assert_eq!(ids(&state), vec![1, 3, 4, 2]);
        assert_eq!(levels, vec![0, 1, 1, 0]);
    }

    #[test]
    fn filtered_view_keeps_matching_path() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();
        let filter = |_: &TestTree, id: usize| id == 4;

        state.ensure_visible_nodes_filtered(&tree, &filter, TreeFilterConfig::enabled());

        assert_eq!(ids(&state), vec![1, 4]);
    }

    #[test]
    fn focus_prev_clears_focus_when_empty() {
        let mut state = TreeViewState::<usize>::default();
        state.list_state.select(Some(0));

        state.focus_prev();

        assert_eq!(state.list_state.selected(), None);
    }

    #[test]
    fn select_action_reports_selection_change() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();
        state.ensure_rows(&tree);
        state.focus_first();

        let event: TreeEvent = state.handle_action(&tree, TreeAction::Select);

        assert_eq!(event, TreeEvent::SelectionChanged);
        assert_eq!(state.selected_ids(), &[1]);
        assert!(state.is_selected(1));
    }

    #[test]
    fn single_mode_toggle_replaces_selection() {
        let mut state = TreeViewState::<usize>::new(SelectionMode::Single);
        state.toggle_selected(1);
        state.toggle_selected(2);
        assert_eq!(state.selected_ids(), &[2]);

        state.toggle_selected(2);
        assert!(state.selected_ids().is_empty());
    }

    #[test]
    fn multiple_mode_toggle_accumulates() {
        let mut state = TreeViewState::<usize>::new(SelectionMode::Multiple);
        state.toggle_selected(1);
        state.toggle_selected(3);
        state.toggle_selected(1);
        assert_eq!(state.selected_ids(), &[3]);
    }

    #[test]
    fn switching_to_single_mode_keeps_first_pick() {
        let mut state = TreeViewState::<usize>::new(SelectionMode::Multiple);
        state.set_selected_ids([3, 1, 2]);

        state.set_selection_mode(SelectionMode::Single);

        assert_eq!(state.selected_ids(), &[3]);
        assert!(!state.is_selected(1));
    }

    #[test]
    fn clear_selection_only_reports_real_changes() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();

        let event: TreeEvent = state.handle_action(&tree, TreeAction::ClearSelection);
        assert_eq!(event, TreeEvent::Unhandled);

        state.select(2);
        let event: TreeEvent = state.handle_action(&tree, TreeAction::ClearSelection);
        assert_eq!(event, TreeEvent::SelectionChanged);
    }

    #[test]
    fn typed_search_expands_and_focuses_first_match() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();

        let event: TreeEvent = state.handle_action(&tree, TreeAction::OpenSearch(Some('b')));

        assert_eq!(event, TreeEvent::Handled);
        assert!(state.is_search_open());
        assert_eq!(ids(&state), vec![1, 3, 4, 2]);
        // "banana" comes before "bread" in display order.
        assert_eq!(state.search_matches(), &[4, 2]);
        assert_eq!(state.focused_id(), Some(4));

        let _: TreeEvent = state.handle_action(&tree, TreeAction::SearchNext);
        assert_eq!(state.focused_id(), Some(2));
        let _: TreeEvent = state.handle_action(&tree, TreeAction::SearchPrev);
        assert_eq!(state.focused_id(), Some(4));
    }

    #[test]
    fn search_input_narrows_matches() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();
        state.expand_all(&tree);
        state.open_search(&tree, "b");

        let _: TreeEvent = state.handle_action(&tree, TreeAction::SearchInput('R'));

        assert_eq!(state.search_value(), "bR");
        assert_eq!(state.search_matches(), &[2]);
        assert_eq!(state.focused_id(), Some(2));

        let _: TreeEvent = state.handle_action(&tree, TreeAction::SearchBackspace);
        assert_eq!(state.search_matches(), &[4, 2]);
    }

    #[test]
    fn submit_search_selects_focused_and_closes() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();
        let _: TreeEvent = state.handle_action(&tree, TreeAction::OpenSearch(Some('a')));
        assert_eq!(state.focused_id(), Some(3));

        let event: TreeEvent = state.handle_action(&tree, TreeAction::SubmitSearch);

        assert_eq!(event, TreeEvent::SelectionChanged);
        assert!(!state.is_search_open());
        assert_eq!(state.selected_ids(), &[3]);
        assert!(state.search_matches().is_empty());
    }

    #[test]
    fn filter_on_search_hides_non_matching_rows() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();
        state.set_filter_on_search(true);

        state.open_search(&tree, "app");
        assert_eq!(ids(&state), vec![1, 3]);

        state.close_search();
        state.ensure_rows(&tree);
        assert_eq!(ids(&state), vec![1, 2]);
    }

    #[test]
    fn reconcile_prunes_vanished_ids_and_keeps_focus() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::new(SelectionMode::Multiple);
        state.set_expanded(1, Some(0), true);
        state.ensure_rows(&tree);
        assert!(state.focus_by_id(&tree, 4));
        state.set_selected_ids([4, 2]);

        // Drop item 2 and the fruit's first child.
        let shrunk = TestTree {
            children: vec![vec![1], vec![4], vec![], vec![], vec![]],
            names: vec!["root", "fruit", "", "", "banana"],
        };
        state.reconcile(&shrunk);

        assert_eq!(ids(&state), vec![1, 4]);
        assert_eq!(state.focused_id(), Some(4));
        assert_eq!(state.selected_ids(), &[4]);

        let tiny = TestTree {
            children: vec![vec![1], vec![]],
            names: vec!["root", "fruit"],
        };
        state.reconcile(&tiny);
        assert!(state.selected_ids().is_empty());
        assert_eq!(ids(&state), vec![1]);
        assert_eq!(state.focused_id(), Some(1));
    }

    #[test]
    fn reconcile_forgets_expansion_of_moved_items() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();
        state.set_expanded(1, Some(0), true);
        state.set_expanded(3, Some(1), true);

        // Apple moves from fruit to bread.
        let moved = TestTree {
            children: vec![vec![1, 2], vec![4], vec![3], vec![], vec![]],
            names: vec!["root", "fruit", "bread", "apple", "banana"],
        };
        state.reconcile(&moved);

        assert!(state.is_expanded(Some(0), 1));
        assert!(!state.is_expanded(Some(1), 3));
        assert_eq!(state.expanded.len(), 1);
    }

    #[test]
    fn expand_to_opens_ancestors_only() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();

        assert!(state.ensure_visible_id(&tree, 3));
        assert_eq!(ids(&state), vec![1, 3, 4, 2]);
        assert_eq!(state.focused_is_expanded(), None);
    }

    #[test]
    fn snapshot_round_trip_restores_selection() {
        let tree = TestTree::new();
        let mut state = TreeViewState::<usize>::default();
        state.set_expanded(1, Some(0), true);
        state.select(3);
        let snapshot = state.snapshot();

        let mut restored = TreeViewState::<usize>::default();
        restored.restore(snapshot);
        restored.ensure_rows(&tree);

        assert_eq!(restored.selected_ids(), &[3]);
        assert_eq!(ids(&restored), vec![1, 3, 4, 2]);
    }
}
