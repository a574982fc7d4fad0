use std::time::Instant;

use ratatui::layout::Rect;
use ratatui::prelude::Buffer;
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, StatefulWidget, Widget};

use crate::action::{TreeAction, TreeEvent};
use crate::caption::CaptionWatch;
use crate::config::TreeViewConfig;
use crate::error::Result;
use crate::glyphs::{NoContent, RecordLabel};
use crate::host::{
    AttributeResolver, ContentRenderer, DataSource, HostAction, HostRecord, HostSelection,
    NoAction, RecordId,
};
use crate::projection::{AttributeMapping, NodeDescriptor};
use crate::provider::TreeDataProvider;
use crate::refresh::{MaterializeOptions, RefreshCoordinator, RefreshOutcome, RefreshState};
use crate::selection::{SelectionBridge, SelectionOutcome};
use crate::state::TreeViewState;
use crate::style::TreeViewStyle;
use crate::widget::{TreeView, styled_block};

#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;

/// One tree view bound to a host record list.
///
/// Owns the refresh coordinator, the engine state, the selection bridge and
/// the caption pollers. Everything runs on the caller's thread.
pub struct RecordTreeView<R, A = NoAction> {
    config: TreeViewConfig,
    mapping: AttributeMapping<R>,
    coordinator: RefreshCoordinator<R>,
    state: TreeViewState<RecordId>,
    bridge: SelectionBridge<A>,
    captions: CaptionWatch,
}

impl<R: HostRecord> RecordTreeView<R> {
    pub fn new(config: TreeViewConfig, mapping: AttributeMapping<R>) -> Result<Self> {
        Self::build(config, mapping, SelectionBridge::new())
    }

    /// Resolves the configured attribute names through `resolver`.
    pub fn from_resolver<S>(config: TreeViewConfig, resolver: &S) -> Result<Self>
    where
        S: AttributeResolver<R>,
    {
        let mapping = AttributeMapping::resolve(&config.attributes, resolver)?;
        Self::new(config, mapping)
    }
}

impl<R: HostRecord, A: HostAction> RecordTreeView<R, A> {
    /// View that executes `action` after every selection change.
    pub fn with_action(
        config: TreeViewConfig,
        mapping: AttributeMapping<R>,
        action: A,
    ) -> Result<Self> {
        Self::build(config, mapping, SelectionBridge::with_action(action))
    }

    fn build(
        config: TreeViewConfig,
        mapping: AttributeMapping<R>,
        bridge: SelectionBridge<A>,
    ) -> Result<Self> {
        config.validate()?;
        let options = MaterializeOptions {
            sort: config.sort,
            orphans: config.orphans,
            open_expanded: config.open_expanded,
        };
        Ok(Self {
            coordinator: RefreshCoordinator::new(options),
            state: Self::fresh_state(&config),
            captions: CaptionWatch::new(config.caption_poll_interval()),
            config,
            mapping,
            bridge,
        })
    }

    fn fresh_state(config: &TreeViewConfig) -> TreeViewState<RecordId> {
        let mut state = TreeViewState::default();
        state.set_filter_on_search(config.filter_on_search);
        state
    }

    pub const fn config(&self) -> &TreeViewConfig {
        &self.config
    }

    pub const fn state(&self) -> &TreeViewState<RecordId> {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut TreeViewState<RecordId> {
        &mut self.state
    }

    pub const fn refresh_state(&self) -> RefreshState {
        self.coordinator.state()
    }

    pub const fn root_item_id(&self) -> RecordId {
        self.coordinator.root_item_id()
    }

    /// Published provider, `None` until the source first becomes available.
    pub const fn provider(&self) -> Option<&TreeDataProvider<R>> {
        self.coordinator.provider()
    }

    pub const fn action_mut(&mut self) -> Option<&mut A> {
        self.bridge.action_mut()
    }

    /// Offers the current data-source value; rebuilds the tree when it is a
    /// new available generation.
    pub fn on_source_update<S>(&mut self, source: &S) -> RefreshOutcome
    where
        S: DataSource<R> + ?Sized,
    {
        let outcome = self
            .coordinator
            .on_source_update(source, &self.mapping, &mut self.state);
        if matches!(outcome, RefreshOutcome::Rebuilt { .. }) {
            self.captions.clear();
        }
        outcome
    }

    /// Handles an action; selection changes are pushed into `host`.
    pub fn handle_action<S>(&mut self, action: TreeAction, host: &mut S) -> TreeEvent
    where
        S: HostSelection<R> + ?Sized,
    {
        self.state.set_selection_mode(host.mode());
        let Some(provider) = self.coordinator.provider() else {
            return TreeEvent::Unhandled;
        };
        let event = self.state.handle_action(provider, action);
        if event == TreeEvent::SelectionChanged {
            self.bridge.apply(self.state.selected_ids(), Some(provider), host);
        }
        event
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key through the state's key bindings and handles it.
    pub fn handle_key<S>(&mut self, key: KeyEvent, host: &mut S) -> TreeEvent
    where
        S: HostSelection<R> + ?Sized,
    {
        self.state.set_selection_mode(host.mode());
        let Some(provider) = self.coordinator.provider() else {
            return TreeEvent::Unhandled;
        };
        let event = self.state.handle_key(provider, key);
        if event == TreeEvent::SelectionChanged {
            self.bridge.apply(self.state.selected_ids(), Some(provider), host);
        }
        event
    }

    /// Replaces the selection with `ids` and pushes it into `host`.
    pub fn select_ids<S>(&mut self, ids: &[RecordId], host: &mut S) -> SelectionOutcome
    where
        S: HostSelection<R> + ?Sized,
    {
        self.state.set_selection_mode(host.mode());
        self.state.set_selected_ids(ids.iter().copied());
        self.bridge
            .apply(self.state.selected_ids(), self.coordinator.provider(), host)
    }

    /// Polls loading captions; returns `true` when a redraw is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(provider) = self.coordinator.provider() else {
            return false;
        };
        if self.captions.is_empty() {
            return false;
        }
        let changed = self.captions.tick(now, |id| {
            provider.get_item(id).descriptor().map(NodeDescriptor::caption)
        });
        if changed {
            // Caption text feeds search matching.
            self.state.invalidate();
        }
        changed
    }

    /// Renders the tree, or the loading text before the first materialization.
    pub fn render(&mut self, area: Rect, buf: &mut Buffer, style: &TreeViewStyle<'_>) {
        self.render_with_content(area, buf, style, &NoContent);
    }

    /// Renders with host-provided row content.
    pub fn render_with_content<C>(
        &mut self,
        area: Rect,
        buf: &mut Buffer,
        style: &TreeViewStyle<'_>,
        content: &C,
    ) where
        C: ContentRenderer<R> + ?Sized,
        C::Content: Into<Line<'static>>,
    {
        let Some(provider) = self.coordinator.provider() else {
            Paragraph::new(style.loading_text)
                .block(styled_block(style))
                .render(area, buf);
            return;
        };

        let label = RecordLabel::new(style.caption_loading_text).with_content(content);
        TreeView::new(provider, &label, style.clone())
            .show_controls(self.config.show_controls)
            .render(area, buf, &mut self.state);

        let offset = self.state.list_state().offset();
        for id in self.state.visible_ids().skip(offset).take(usize::from(area.height)) {
            let loading = provider
                .get_item(id)
                .descriptor()
                .is_some_and(|descriptor| descriptor.caption().is_loading());
            if loading {
                self.captions.watch(id);
            }
        }
    }

    /// Number of captions currently polled.
    pub fn pending_captions(&self) -> usize {
        self.captions.len()
    }

    /// Drops the tree, cancels caption polling and resets the engine state.
    pub fn teardown(&mut self) {
        self.captions.clear();
        self.coordinator.teardown();
        self.state = Self::fresh_state(&self.config);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::AttributeNames;
    use crate::host::{ListSnapshot, LoadStatus, SelectionMode, SelectionValue, SourceGeneration};
    use crate::testing::{FakeSelection, Row, RowResolver, counting_action, mapping, row};

    fn config() -> TreeViewConfig {
        TreeViewConfig::new(AttributeNames::new("Code", "ParentCode", "Name"))
    }

    fn view() -> RecordTreeView<Row> {
        RecordTreeView::new(config(), mapping()).expect("valid config")
    }

    fn rows() -> Vec<Row> {
        vec![
            row(1, "A", None).folder(),
            row(2, "B", Some("A")),
            row(3, "C", Some("Z")),
            row(4, "D", None),
        ]
    }

    fn available(generation: u64, items: Vec<Row>) -> ListSnapshot<Row> {
        ListSnapshot::available(SourceGeneration(generation), items)
    }

    fn buffer_text(buffer: &Buffer) -> String {
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = config().caption_poll_ms(0);
        assert!(RecordTreeView::new(config, mapping()).is_err());
    }

    #[test]
    fn builds_mapping_from_attribute_names() {
        let names = AttributeNames::new("Code", "ParentCode", "Name").with_folder_flag("IsFolder");
        let view = RecordTreeView::<Row>::from_resolver(TreeViewConfig::new(names), &RowResolver);
        assert!(view.is_ok());

        let unknown = AttributeNames::new("Code", "Nope", "Name");
        let view =
            RecordTreeView::<Row>::from_resolver(TreeViewConfig::new(unknown), &RowResolver);
        assert!(view.is_err());
    }

    #[test]
    fn renders_loading_text_until_available() {
        let mut view = view();
        let outcome = view.on_source_update(&ListSnapshot::<Row>::loading(SourceGeneration(1)));
        assert_eq!(outcome, RefreshOutcome::Ignored { status: LoadStatus::Loading });

        let area = Rect::new(0, 0, 30, 6);
        let mut buffer = Buffer::empty(area);
        view.render(area, &mut buffer, &TreeViewStyle::default());

        assert!(buffer_text(&buffer).contains("Loading..."));
    }

    #[test]
    fn select_pushes_record_and_notifies_once() {
        let mut view = view();
        let mut host = FakeSelection::new(SelectionMode::Single);
        view.on_source_update(&available(1, rows()));

        // Rows: A, D (dangling C dropped, B under collapsed A).
        view.handle_action(TreeAction::FocusNext, &mut host);
        let event = view.handle_action(TreeAction::Select, &mut host);

        assert_eq!(event, TreeEvent::SelectionChanged);
        assert_eq!(host.notifications, 1);
        assert_eq!(host.last(), Some(&SelectionValue::Single(Some(row(4, "D", None)))));
    }

    #[test]
    fn multiple_mode_propagates_every_selected_record() {
        let mut view = view();
        let mut host = FakeSelection::new(SelectionMode::Multiple);
        view.on_source_update(&available(1, rows()));

        view.handle_action(TreeAction::FocusFirst, &mut host);
        view.handle_action(TreeAction::ToggleSelect, &mut host);
        view.handle_action(TreeAction::FocusNext, &mut host);
        view.handle_action(TreeAction::ToggleSelect, &mut host);

        assert_eq!(host.notifications, 2);
        assert_eq!(
            host.last(),
            Some(&SelectionValue::Multiple(vec![row(1, "A", None), row(4, "D", None)]))
        );
    }

    #[test]
    fn selection_mode_follows_the_host() {
        let mut view = view();
        let mut host = FakeSelection::new(SelectionMode::Multiple);
        view.on_source_update(&available(1, rows()));

        view.handle_action(TreeAction::FocusFirst, &mut host);
        view.handle_action(TreeAction::ToggleSelect, &mut host);
        view.handle_action(TreeAction::FocusNext, &mut host);
        view.handle_action(TreeAction::ToggleSelect, &mut host);

        assert_eq!(
            host.last(),
            Some(&SelectionValue::Multiple(vec![row(1, "A", None), row(4, "D", None)]))
        );

        host.mode = SelectionMode::Single;
        view.handle_action(TreeAction::FocusFirst, &mut host);
        assert_eq!(view.state().selected_ids(), &[RecordId::from_u128(1)]);
    }

    #[test]
    fn on_change_action_runs_after_each_push() {
        let (action, count) = counting_action();
        let mut view = RecordTreeView::with_action(config(), mapping(), action)
            .expect("valid config");
        let mut host = FakeSelection::new(SelectionMode::Single);
        view.on_source_update(&available(1, rows()));

        view.select_ids(&[RecordId::from_u128(2)], &mut host);
        view.select_ids(&[], &mut host);

        assert_eq!(count.get(), 2);
        assert_eq!(host.last(), Some(&SelectionValue::Single(None)));
    }

    #[test]
    fn refresh_prunes_selection_of_vanished_records() {
        let mut view = view();
        let mut host = FakeSelection::new(SelectionMode::Multiple);
        view.on_source_update(&available(1, rows()));
        view.select_ids(&[RecordId::from_u128(1), RecordId::from_u128(4)], &mut host);

        view.on_source_update(&available(2, vec![row(4, "D", None)]));

        assert_eq!(view.state().selected_ids(), &[RecordId::from_u128(4)]);
    }

    #[test]
    fn open_expanded_shows_nested_rows() {
        let config = config().open_expanded(true);
        let mut view = RecordTreeView::new(config, mapping()).expect("valid config");
        view.on_source_update(&available(1, rows()));

        let visible: Vec<_> = view.state().visible_ids().collect();
        assert_eq!(
            visible,
            vec![RecordId::from_u128(1), RecordId::from_u128(2), RecordId::from_u128(4)]
        );
    }

    #[test]
    fn loading_captions_are_polled_until_resolved() {
        let items = vec![Row::new(1, "A", None).caption_loading(), row(2, "B", None)];
        let mut view = view();
        view.on_source_update(&available(1, items.clone()));

        let area = Rect::new(0, 0, 30, 6);
        let mut buffer = Buffer::empty(area);
        view.render(area, &mut buffer, &TreeViewStyle::default());
        assert_eq!(view.pending_captions(), 1);

        let start = Instant::now();
        assert!(!view.tick(start));
        items[0].set_caption("Alpha");
        assert!(!view.tick(start + Duration::from_millis(10)));
        assert!(view.tick(start + Duration::from_millis(300)));
        assert_eq!(view.pending_captions(), 0);

        let mut buffer = Buffer::empty(area);
        view.render(area, &mut buffer, &TreeViewStyle::default());
        assert!(buffer_text(&buffer).contains("Alpha"));
    }

    #[test]
    fn teardown_resets_everything() {
        let mut view = view();
        let mut host = FakeSelection::new(SelectionMode::Single);
        view.on_source_update(&available(1, rows()));
        view.select_ids(&[RecordId::from_u128(4)], &mut host);

        view.teardown();

        assert_eq!(view.refresh_state(), RefreshState::Idle);
        assert!(view.provider().is_none());
        assert!(view.state().selected_ids().is_empty());
        assert_eq!(view.handle_action(TreeAction::FocusNext, &mut host), TreeEvent::Unhandled);
    }
}
