use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Borders;

/// Scroll policy applied when focus moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeScrollPolicy {
    KeepInView,
    CenterOnSelect,
}

/// Visual settings of the tree view widget.
#[derive(Clone)]
pub struct TreeViewStyle<'a> {
    pub title: Option<Line<'a>>,
    pub block_style: Style,
    pub border_style: Style,
    /// Focused row.
    pub highlight_style: Style,
    pub selected_style: Style,
    pub search_match_style: Style,
    pub line_style: Style,
    /// Controls header (search box / hints).
    pub controls_style: Style,
    /// Overrides the key hints of the controls header; `None` follows the
    /// active keymap profile.
    pub controls_hint: Option<&'a str>,
    pub highlight_symbol: &'a str,
    /// Shown while nothing has been materialized yet.
    pub loading_text: &'a str,
    /// Label for rows whose caption is still loading.
    pub caption_loading_text: &'a str,
    pub borders: Borders,
    pub virtualize_rows: bool,
    pub scroll_policy: TreeScrollPolicy,
}

impl Default for TreeViewStyle<'_> {
    fn default() -> Self {
        Self {
            title: None,
            block_style: Style::default(),
            border_style: Style::default(),
            highlight_style: Style::default().add_modifier(Modifier::REVERSED),
            selected_style: Style::default().add_modifier(Modifier::BOLD),
            search_match_style: Style::default().add_modifier(Modifier::UNDERLINED),
            line_style: Style::default(),
            controls_style: Style::default().add_modifier(Modifier::DIM),
            controls_hint: None,
            highlight_symbol: ">> ",
            loading_text: "Loading...",
            caption_loading_text: "...",
            borders: Borders::ALL,
            virtualize_rows: false,
            scroll_policy: TreeScrollPolicy::KeepInView,
        }
    }
}
