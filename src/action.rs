/// Actions that a user or application can initiate on the tree view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeAction<Custom = ()> {
    /// Move focus to the previous visible row.
    FocusPrev,
    /// Move focus to the next visible row.
    FocusNext,
    /// Move focus to the parent item.
    FocusParent,
    /// Expand the focused folder; if possible, move to a folder below it.
    FocusChild,
    /// Move focus to the first visible row.
    FocusFirst,
    /// Move focus to the last visible row.
    FocusLast,
    /// Toggle expansion recursively for the focused subtree.
    ToggleRecursive,
    /// Toggle expansion for the focused item only.
    ToggleNode,
    /// Expand all folders in the tree.
    ExpandAll,
    /// Collapse all folders in the tree.
    CollapseAll,
    /// Replace the selection with the focused item.
    Select,
    /// Add or remove the focused item from the selection.
    ToggleSelect,
    /// Deselect everything.
    ClearSelection,
    /// Open the search box; a typed character also expands all folders first.
    OpenSearch(Option<char>),
    /// Append a character to the search text.
    SearchInput(char),
    /// Remove the last character of the search text.
    SearchBackspace,
    /// Focus the next matching row.
    SearchNext,
    /// Focus the previous matching row.
    SearchPrev,
    /// Close the search and select the focused item.
    SubmitSearch,
    /// Close the search without selecting.
    CloseSearch,
    /// Toggle drawing of guide lines.
    ToggleGuides,
    /// Custom action forwarded to the caller without internal handling.
    Custom(Custom),
}

/// Result of handling an action or key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEvent<Custom = ()> {
    /// The action was handled internally and state was updated.
    Handled,
    /// The action was ignored (e.g., nothing focused / nothing to do).
    Unhandled,
    /// The selection changed; forward `selected_ids()` to the host.
    SelectionChanged,
    /// The action is forwarded to the caller for handling.
    Action(TreeAction<Custom>),
}
