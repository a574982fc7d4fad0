use std::borrow::Cow;

use ratatui::text::{Line, Span};
use ratatui::widgets::Cell;

use crate::context::TreeRowContext;
use crate::host::{AttributeValue, ContentRenderer, RecordId};
use crate::model::TreeDataLoader;
use crate::projection::NodeDescriptor;
use crate::provider::TreeDataProvider;

#[derive(Clone, Copy)]
pub struct TreeGlyphs<'a> {
    pub indent: &'a str,
    pub branch_last: &'a str,
    pub branch: &'a str,
    pub vert: &'a str,
    pub empty: &'a str,
    pub leaf: &'a str,
    pub expanded: &'a str,
    pub collapsed: &'a str,
}

impl TreeGlyphs<'static> {
    pub const fn unicode() -> Self {
        Self {
            indent: "   ",
            branch_last: "└──",
            branch: "├──",
            vert: "│  ",
            empty: "   ",
            leaf: "•",
            expanded: "▼",
            collapsed: "▶",
        }
    }

    pub const fn ascii() -> Self {
        Self {
            indent: "   ",
            branch_last: "`--",
            branch: "|--",
            vert: "|  ",
            empty: "   ",
            leaf: "*",
            expanded: "v",
            collapsed: ">",
        }
    }
}

#[derive(Clone)]
pub struct TreeLabelPrefix<'a> {
    pub name: Line<'a>,
    pub prefix: Option<Cow<'a, str>>,
}

pub trait TreeLabelProvider<T: TreeDataLoader> {
    fn label_parts<'a>(&'a self, loader: &'a T, id: T::Id) -> TreeLabelPrefix<'a>;
}

pub trait TreeLabelRenderer<T: TreeDataLoader> {
    fn cell<'a>(
        &'a self,
        loader: &'a T,
        id: T::Id,
        ctx: &TreeRowContext,
        glyphs: &TreeGlyphs<'a>,
    ) -> Cell<'a>;
}

impl<T, P> TreeLabelRenderer<T> for P
where
    T: TreeDataLoader,
    P: TreeLabelProvider<T>,
{
    fn cell<'a>(
        &'a self,
        loader: &'a T,
        id: T::Id,
        ctx: &TreeRowContext,
        glyphs: &TreeGlyphs<'a>,
    ) -> Cell<'a> {
        let parts = self.label_parts(loader, id);
        tree_name_cell(ctx, parts, glyphs)
    }
}

/// Content renderer that never produces content.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContent;

impl<R> ContentRenderer<R> for NoContent {
    type Content = Line<'static>;

    fn content(&self, _record: &R) -> Option<Line<'static>> {
        None
    }
}

/// Labels materialized records.
///
/// Host content wins when the renderer produces some; otherwise the caption
/// is shown, `loading_text` while it is still loading, and finally the item
/// name (node id or a "not found" marker).
pub struct RecordLabel<'c, C: ?Sized = NoContent> {
    content: Option<&'c C>,
    loading_text: &'c str,
}

impl<'c> RecordLabel<'c, NoContent> {
    pub const fn new(loading_text: &'c str) -> Self {
        Self {
            content: None,
            loading_text,
        }
    }
}

impl<'c, C: ?Sized> RecordLabel<'c, C> {
    pub fn with_content<D: ?Sized>(self, renderer: &'c D) -> RecordLabel<'c, D> {
        RecordLabel {
            content: Some(renderer),
            loading_text: self.loading_text,
        }
    }
}

impl<R, C> TreeLabelProvider<TreeDataProvider<R>> for RecordLabel<'_, C>
where
    C: ContentRenderer<R> + ?Sized,
    C::Content: Into<Line<'static>>,
{
    fn label_parts<'a>(
        &'a self,
        loader: &'a TreeDataProvider<R>,
        id: RecordId,
    ) -> TreeLabelPrefix<'a> {
        let item = loader.get_item(id);
        if let Some(content) = self
            .content
            .and_then(|renderer| loader.get_content(&item, renderer))
        {
            return TreeLabelPrefix {
                name: content.into(),
                prefix: None,
            };
        }

        let name = match item.descriptor().map(NodeDescriptor::caption) {
            Some(caption) if caption.is_loading() => Cow::Borrowed(self.loading_text),
            Some(AttributeValue {
                value: Some(caption),
                ..
            }) if !caption.is_empty() => Cow::Owned(caption),
            _ => item.name(),
        };
        TreeLabelPrefix {
            name: Line::raw(name),
            prefix: None,
        }
    }
}

pub fn tree_label_line<'a>(
    ctx: &TreeRowContext<'_>,
    parts: TreeLabelPrefix<'a>,
    glyphs: &TreeGlyphs<'a>,
) -> Line<'a> {
    let TreeLabelPrefix { name, prefix: op } = parts;
    let op = op.filter(|value| !value.is_empty());
    let name_style = name.style;
    let name = name
        .spans
        .into_iter()
        .map(move |span| span.patch_style(name_style));

    let expander = if ctx.is_folder {
        if ctx.is_expanded {
            glyphs.expanded
        } else {
            glyphs.collapsed
        }
    } else {
        glyphs.leaf
    };

    if ctx.level == 0 || !ctx.draw_lines {
        let mut spans = Vec::with_capacity(ctx.level as usize + 6);
        for _ in 0..ctx.level {
            spans.push(Span::raw(glyphs.empty));
        }
        if !expander.is_empty() {
            spans.push(Span::raw(expander));
        }
        if let Some(op) = op {
            spans.push(Span::raw(op));
        }
        spans.push(Span::raw(" "));
        spans.extend(name);
        return Line::from(spans);
    }

    let mut name_spans = Vec::with_capacity(ctx.is_tail_stack.len() + 6);

    for (l, is_last) in ctx.is_tail_stack.iter().enumerate() {
        let part = if l == (ctx.level as usize) - 1 {
            if *is_last {
                glyphs.branch_last
            } else {
                glyphs.branch
            }
        } else if *is_last {
            glyphs.indent
        } else {
            glyphs.vert
        };
        name_spans.push(Span::styled(part, ctx.line_style));
    }

    if !expander.is_empty() {
        name_spans.push(Span::raw(expander));
        name_spans.push(Span::raw(" "));
    }

    if let Some(op) = op {
        name_spans.push(Span::raw(op));
        name_spans.push(Span::raw(" "));
    }

    name_spans.extend(name);
    Line::from(name_spans)
}

pub fn tree_name_cell<'a>(
    ctx: &TreeRowContext<'_>,
    parts: TreeLabelPrefix<'a>,
    glyphs: &TreeGlyphs<'a>,
) -> Cell<'a> {
    Cell::from(tree_label_line(ctx, parts, glyphs))
}

#[cfg(test)]
mod tests {
    use ratatui::style::Style;

    use super::*;
    use crate::index::{OrphanPolicy, TreeIndex};
    use crate::projection::project;
    use crate::testing::{Row, mapping, row};

    fn ctx(level: u16, is_tail_stack: &[bool], is_folder: bool) -> TreeRowContext<'_> {
        TreeRowContext {
            level,
            is_tail_stack,
            is_expanded: false,
            is_folder,
            is_selected: false,
            is_search_match: false,
            draw_lines: true,
            line_style: Style::default(),
        }
    }

    fn parts(name: &str) -> TreeLabelPrefix<'_> {
        TreeLabelPrefix {
            name: Line::raw(name),
            prefix: None,
        }
    }

    fn provider(rows: &[Row]) -> TreeDataProvider<Row> {
        TreeDataProvider::new(TreeIndex::materialize(
            RecordId::from_u128(0),
            project(rows, &mapping()),
            OrphanPolicy::Drop,
        ))
    }

    #[test]
    fn top_level_rows_have_no_connectors() {
        let glyphs = TreeGlyphs::ascii();
        let folder = tree_label_line(&ctx(0, &[], true), parts("Fruit"), &glyphs);
        let leaf = tree_label_line(&ctx(0, &[], false), parts("Bread"), &glyphs);

        assert_eq!(folder.to_string(), "> Fruit");
        assert_eq!(leaf.to_string(), "* Bread");
    }

    #[test]
    fn nested_rows_draw_branches() {
        let glyphs = TreeGlyphs::ascii();
        let middle = tree_label_line(&ctx(1, &[false], false), parts("Apple"), &glyphs);
        let last = tree_label_line(&ctx(2, &[true, true], false), parts("Seed"), &glyphs);

        assert_eq!(middle.to_string(), "|--* Apple");
        assert_eq!(last.to_string(), "   `--* Seed");
    }

    #[test]
    fn record_label_prefers_content_then_caption() {
        let rows = vec![
            row(1, "A", None),
            Row::new(2, "B", None).caption_loading(),
            row(3, "C", None),
        ];
        let loader = provider(&rows);
        let only_c = |record: &Row| (record == &rows[2]).then(|| Line::raw("custom"));
        let label = RecordLabel::new("...").with_content(&only_c);

        let name = |id: u128| {
            label
                .label_parts(&loader, RecordId::from_u128(id))
                .name
                .to_string()
        };
        assert_eq!(name(1), "A");
        assert_eq!(name(2), "...");
        assert_eq!(name(3), "custom");
        assert!(name(42).starts_with("item_not_found_"));
    }
}
