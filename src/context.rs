use ratatui::style::Style;

/// Per-row facts handed to label renderers.
#[derive(Clone, Copy)]
pub struct TreeRowContext<'a> {
    /// Depth; top-level items are 0.
    pub level: u16,
    pub is_tail_stack: &'a [bool],
    pub is_expanded: bool,
    pub is_folder: bool,
    pub is_selected: bool,
    pub is_search_match: bool,
    pub draw_lines: bool,
    pub line_style: Style,
}
