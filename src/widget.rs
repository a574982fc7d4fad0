use ratatui::layout::{Constraint, Rect};
use ratatui::prelude::Buffer;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Table,
    TableState,
};

use crate::context::TreeRowContext;
use crate::glyphs::{TreeGlyphs, TreeLabelRenderer};
use crate::model::TreeDataLoader;
use crate::state::{TreeViewState, VisibleNode};
use crate::style::TreeViewStyle;

#[cfg(not(feature = "keymap"))]
const CONTROLS_HINT: &str = "+ expand all   - collapse all";

/// Tree view widget (table + stateful).
pub struct TreeView<'a, T, L>
where
    T: TreeDataLoader,
    L: TreeLabelRenderer<T>,
{
    loader: &'a T,
    label: &'a L,
    style: TreeViewStyle<'a>,
    glyphs: TreeGlyphs<'a>,
    show_controls: bool,
}

impl<'a, T, L> TreeView<'a, T, L>
where
    T: TreeDataLoader,
    L: TreeLabelRenderer<T>,
{
    pub const fn new(loader: &'a T, label: &'a L, style: TreeViewStyle<'a>) -> Self {
        Self {
            loader,
            label,
            style,
            glyphs: TreeGlyphs::unicode(),
            show_controls: true,
        }
    }

    pub const fn glyphs(mut self, glyphs: TreeGlyphs<'a>) -> Self {
        self.glyphs = glyphs;
        self
    }

    /// Shows or hides the search / expand-all / collapse-all header row.
    pub const fn show_controls(mut self, show: bool) -> Self {
        self.show_controls = show;
        self
    }

    #[inline]
    fn build_rows(
        &self,
        nodes: &[VisibleNode<T::Id>],
        state: &TreeViewState<T::Id>,
    ) -> Vec<Row<'a>> {
        let mut rows = Vec::with_capacity(nodes.len());
        for node in nodes {
            let is_selected = state.is_selected(node.id);
            let is_search_match = state.is_search_match(node.id);
            let ctx = TreeRowContext {
                level: node.level,
                is_tail_stack: node.is_tail_stack.as_slice(),
                is_expanded: node.is_folder && state.is_expanded(node.parent, node.id),
                is_folder: node.is_folder,
                is_selected,
                is_search_match,
                draw_lines: state.draw_lines(),
                line_style: self.style.line_style,
            };
            let label_cell = self.label.cell(self.loader, node.id, &ctx, &self.glyphs);
            let mut row = Row::new([label_cell]);
            match (is_selected, is_search_match) {
                (true, true) => {
                    let style = self.style.selected_style.patch(self.style.search_match_style);
                    row = row.style(style);
                }
                (true, false) => row = row.style(self.style.selected_style),
                (false, true) => row = row.style(self.style.search_match_style),
                (false, false) => {}
            }
            rows.push(row);
        }
        rows
    }

    fn controls_row(&self, state: &TreeViewState<T::Id>) -> Row<'a> {
        let line = if state.is_search_open() {
            let matches = state.search_matches().len();
            Line::from(vec![
                Span::raw("/ "),
                Span::raw(state.search_value().to_owned()),
                Span::raw(format!("  ({matches} found)")),
            ])
        } else {
            Line::raw(self.controls_hint(state))
        };
        Row::new([line]).style(self.style.controls_style)
    }

    fn controls_hint(&self, state: &TreeViewState<T::Id>) -> &'a str {
        if let Some(hint) = self.style.controls_hint {
            return hint;
        }
        #[cfg(feature = "keymap")]
        {
            state.keymap().profile().controls_hint()
        }
        #[cfg(not(feature = "keymap"))]
        {
            let _ = state;
            CONTROLS_HINT
        }
    }

    #[inline]
    fn build_table(
        &self,
        rows: Vec<Row<'a>>,
        block: Block<'a>,
        header: Option<Row<'a>>,
    ) -> Table<'a> {
        let mut table = Table::new(rows, [Constraint::Fill(1)])
            .style(self.style.block_style)
            .block(block)
            .row_highlight_style(self.style.highlight_style)
            .highlight_symbol(self.style.highlight_symbol);
        if let Some(header) = header {
            table = table.header(header);
        }
        table
    }

    #[inline]
    fn render_scrollbar(
        &self,
        area: Rect,
        buf: &mut Buffer,
        state: &TreeViewState<T::Id>,
        inner_height: usize,
        scroll_rows: usize,
    ) {
        let scroll_len = scroll_rows.saturating_add(1);
        let position = state
            .list_state()
            .offset()
            .min(scroll_len.saturating_sub(1));
        let mut scrollbar_state = ScrollbarState::new(scroll_len)
            .position(position)
            .viewport_content_length(inner_height);
        Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .render(area, buf, &mut scrollbar_state);
    }
}

/// Block with the style's borders and title.
pub(crate) fn styled_block<'a>(style: &TreeViewStyle<'a>) -> Block<'a> {
    let mut block = Block::default().borders(style.borders);
    if let Some(title) = style.title.clone() {
        block = block.title(title);
    }
    block
        .style(style.block_style)
        .border_style(style.border_style)
}

impl<T, L> StatefulWidget for TreeView<'_, T, L>
where
    T: TreeDataLoader,
    L: TreeLabelRenderer<T>,
{
    type State = TreeViewState<T::Id>;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        state.ensure_rows(self.loader);

        let header = self.show_controls.then(|| self.controls_row(state));
        let header_height = u16::from(header.is_some());

        let block = styled_block(&self.style);

        let inner_height = block.inner(area).height.saturating_sub(header_height) as usize;
        state.ensure_focus_visible_with_policy(inner_height, self.style.scroll_policy);

        let visible_nodes = state.visible_nodes();
        let total_rows = visible_nodes.len();
        let (range_start, range_end) = if self.style.virtualize_rows {
            let start = state.list_state().offset().min(total_rows);
            let end = (start + inner_height).min(total_rows);
            (start, end)
        } else {
            (0, total_rows)
        };

        let nodes = &visible_nodes[range_start..range_end];
        let rows = self.build_rows(nodes, state);

        let scroll_rows = total_rows.saturating_sub(inner_height);

        let mut local_state = if self.style.virtualize_rows {
            Some(*state.list_state())
        } else {
            None
        };
        let table_state: &mut TableState = local_state.as_mut().map_or_else(
            || state.list_state_mut(),
            |state_ref| {
                *state_ref.offset_mut() = 0;
                if let Some(focused) = state_ref.selected() {
                    if focused < range_start || focused >= range_end {
                        state_ref.select(None);
                    } else {
                        state_ref.select(Some(focused - range_start));
                    }
                }
                state_ref
            },
        );

        let (table_area, table_block, scrollbar_area) = if scroll_rows > 0 {
            let table_area = Rect {
                width: area.width.saturating_sub(1),
                ..area
            };
            let scrollbar_area = Rect {
                x: area.x + area.width.saturating_sub(1),
                y: area.y,
                width: 1,
                height: area.height,
            };
            let mut table_borders = self.style.borders;
            table_borders.remove(Borders::RIGHT);
            (table_area, block.borders(table_borders), Some(scrollbar_area))
        } else {
            (area, block, None)
        };

        let table = self.build_table(rows, table_block, header);
        table.render(table_area, buf, table_state);

        if let Some(scrollbar_area) = scrollbar_area {
            self.render_scrollbar(scrollbar_area, buf, state, inner_height, scroll_rows);
        }
    }
}
