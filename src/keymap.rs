use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::TreeAction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeymapProfile {
    /// Arrows and hjkl; `/` opens the search.
    #[default]
    Default,
    /// hjkl only; `/` opens the search.
    Vim,
    /// Arrows only; typing a letter or digit opens the search with it.
    Arrows,
}

impl KeymapProfile {
    /// Key hints shown in the controls header row.
    pub const fn controls_hint(self) -> &'static str {
        match self {
            Self::Default | Self::Vim => "/ search   + expand all   - collapse all",
            Self::Arrows => "type to search   + expand all   - collapse all",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TreeKeyBindings {
    profile: KeymapProfile,
}

impl Default for TreeKeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeKeyBindings {
    pub const fn new() -> Self {
        Self {
            profile: KeymapProfile::Default,
        }
    }

    pub const fn with_profile(profile: KeymapProfile) -> Self {
        Self { profile }
    }

    pub const fn profile(&self) -> KeymapProfile {
        self.profile
    }

    pub const fn set_profile(&mut self, profile: KeymapProfile) {
        self.profile = profile;
    }

    /// Maps a key to an action; `searching` switches to search-box bindings.
    pub fn resolve<C>(&self, key: KeyEvent, searching: bool) -> Option<TreeAction<C>> {
        if searching {
            return Self::resolve_search(key);
        }

        let nav_action = match self.profile {
            KeymapProfile::Default => self.resolve_default_nav(key),
            KeymapProfile::Vim => self.resolve_vim_nav(key),
            KeymapProfile::Arrows => self.resolve_arrow_nav(key),
        };
        if nav_action.is_some() {
            return nav_action;
        }

        let common = self.resolve_common(key);
        if common.is_some() {
            return common;
        }

        match (self.profile, key.code) {
            (KeymapProfile::Default | KeymapProfile::Vim, KeyCode::Char('/')) => {
                Some(TreeAction::OpenSearch(None))
            }
            (KeymapProfile::Arrows, KeyCode::Char(ch))
                if ch.is_alphanumeric() && !Self::has_command_modifier(key) =>
            {
                Some(TreeAction::OpenSearch(Some(ch)))
            }
            _ => None,
        }
    }

    pub fn resolve_with<C, F>(
        &self,
        key: KeyEvent,
        searching: bool,
        custom: F,
    ) -> Option<TreeAction<C>>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        if let Some(action) = custom(key) {
            return Some(TreeAction::Custom(action));
        }

        self.resolve(key, searching)
    }

    fn resolve_search<C>(key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Esc => Some(TreeAction::CloseSearch),
            KeyCode::Enter => Some(TreeAction::SubmitSearch),
            KeyCode::Up => Some(TreeAction::SearchPrev),
            KeyCode::Down => Some(TreeAction::SearchNext),
            KeyCode::Backspace => Some(TreeAction::SearchBackspace),
            KeyCode::Char(ch) if !Self::has_command_modifier(key) => {
                Some(TreeAction::SearchInput(ch))
            }
            _ => None,
        }
    }

    const fn has_command_modifier(key: KeyEvent) -> bool {
        key.modifiers
            .intersects(KeyModifiers::CONTROL.union(KeyModifiers::ALT))
    }

    const fn resolve_default_nav<C>(&self, key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(TreeAction::FocusPrev),
            KeyCode::Down | KeyCode::Char('j') => Some(TreeAction::FocusNext),
            KeyCode::Left | KeyCode::Char('h') => Some(TreeAction::FocusParent),
            KeyCode::Right | KeyCode::Char('l') => Some(TreeAction::FocusChild),
            _ => None,
        }
    }

    const fn resolve_vim_nav<C>(&self, key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Char('k') => Some(TreeAction::FocusPrev),
            KeyCode::Char('j') => Some(TreeAction::FocusNext),
            KeyCode::Char('h') => Some(TreeAction::FocusParent),
            KeyCode::Char('l') => Some(TreeAction::FocusChild),
            KeyCode::Char('n') => Some(TreeAction::SearchNext),
            KeyCode::Char('N') => Some(TreeAction::SearchPrev),
            _ => None,
        }
    }

    const fn resolve_arrow_nav<C>(&self, key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Up => Some(TreeAction::FocusPrev),
            KeyCode::Down => Some(TreeAction::FocusNext),
            KeyCode::Left => Some(TreeAction::FocusParent),
            KeyCode::Right => Some(TreeAction::FocusChild),
            _ => None,
        }
    }

    fn resolve_common<C>(&self, key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Enter => Some(TreeAction::Select),
            KeyCode::Char(' ') => Some(TreeAction::ToggleSelect),
            KeyCode::Tab => Some(TreeAction::ToggleNode),
            KeyCode::BackTab => Some(TreeAction::ToggleRecursive),
            KeyCode::Char('+') => Some(TreeAction::ExpandAll),
            KeyCode::Char('-') => Some(TreeAction::CollapseAll),
            KeyCode::Esc => Some(TreeAction::ClearSelection),
            KeyCode::Char('g') if self.profile.uses_letter_commands() => {
                Some(TreeAction::ToggleGuides)
            }
            KeyCode::Home => Some(TreeAction::FocusFirst),
            KeyCode::End => Some(TreeAction::FocusLast),
            _ => None,
        }
    }
}

impl KeymapProfile {
    // Arrows reserves letters for type-to-search.
    const fn uses_letter_commands(self) -> bool {
        !matches!(self, Self::Arrows)
    }
}
