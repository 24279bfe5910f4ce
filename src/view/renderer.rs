use crate::config::RcConfig;
use crate::controller::Reveal;
use crate::document_model::{DocumentTree, Marker, Node, NodeId};
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor};
use std::io::{self, Write, stdout};
use unicode_width::UnicodeWidthStr;

#[derive(Clone, Default)]
pub struct RenderParams<'a> {
    pub reveal: Option<&'a Reveal>,
    /// Bracket markers instead of colouring them
    pub plain: bool,
}

pub struct View {
    flash_color: Color,
    pin_color: Color,
    emphasis_color: Color,
    width: usize,
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

impl View {
    pub fn new() -> Self {
        Self::from_config(&RcConfig::default())
    }

    pub fn from_config(config: &RcConfig) -> Self {
        Self {
            flash_color: config.flash_color,
            pin_color: config.pin_color,
            emphasis_color: config.emphasis_color,
            width: 80,
        }
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width.max(1);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Render the document, top-level blocks separated by a blank line.
    pub fn render<T: DocumentTree>(&self, tree: &T, params: &RenderParams) -> String {
        let blocks: Vec<String> = tree
            .children(tree.root())
            .iter()
            .map(|block| {
                let mut out = String::new();
                self.write_node(tree, *block, params, &mut out);
                out
            })
            .collect();
        blocks.join("\n\n")
    }

    pub fn print(&self, rendered: &str) -> io::Result<()> {
        let mut out = stdout();
        writeln!(out, "{rendered}")?;
        out.flush()
    }

    /// Display row (0-based) on which `marker` starts once the document is
    /// wrapped at the view width. Used to scroll a revealed marker into view.
    pub fn reveal_line<T: DocumentTree>(&self, tree: &T, marker: NodeId) -> Option<usize> {
        let mut plain = String::new();
        for (i, block) in tree.children(tree.root()).iter().enumerate() {
            if i > 0 {
                plain.push_str("\n\n");
            }
            if Self::plain_until(tree, *block, marker, &mut plain) {
                return Some(self.rows_before_end(&plain));
            }
        }
        None
    }

    fn write_node<T: DocumentTree>(
        &self,
        tree: &T,
        id: NodeId,
        params: &RenderParams,
        out: &mut String,
    ) {
        match tree.node(id) {
            Some(Node::Text(text) | Node::Fragment { text, .. }) => out.push_str(text),
            Some(Node::Marker(marker)) => {
                let revealed = params.reveal.filter(|reveal| reveal.marker == id);
                self.write_marker(marker, revealed, params.plain, out);
            }
            Some(Node::Container { .. }) => {
                for child in tree.children(id) {
                    self.write_node(tree, *child, params, out);
                }
            }
            None => {}
        }
    }

    fn write_marker(&self, marker: &Marker, reveal: Option<&Reveal>, plain: bool, out: &mut String) {
        let emphasize = reveal.is_some_and(|reveal| reveal.emphasize);

        if plain {
            if reveal.is_some() {
                out.push('>');
            }
            out.push('[');
            if let Some(pin_id) = &marker.pin_id {
                out.push_str(&format!("{pin_id}: "));
            }
            out.push_str(&marker.text);
            out.push(']');
            return;
        }

        let background = if emphasize {
            self.emphasis_color
        } else if marker.is_pinned() {
            self.pin_color
        } else {
            self.flash_color
        };
        out.push_str(&format!(
            "{}{}",
            SetBackgroundColor(background),
            SetForegroundColor(Color::Black)
        ));
        if emphasize {
            out.push_str(&format!("{}", SetAttribute(Attribute::Bold)));
        }
        out.push_str(&marker.text);
        out.push_str(&format!("{}{ResetColor}", SetAttribute(Attribute::Reset)));
    }

    /// Append the plain text of `id` up to `target`; true once it is reached.
    fn plain_until<T: DocumentTree>(tree: &T, id: NodeId, target: NodeId, out: &mut String) -> bool {
        if id == target {
            return true;
        }
        if let Some(text) = tree.node(id).and_then(Node::text) {
            out.push_str(text);
        }
        tree.children(id)
            .iter()
            .any(|child| Self::plain_until(tree, *child, target, out))
    }

    fn rows_before_end(&self, text: &str) -> usize {
        let mut lines = text.split('\n').peekable();
        let mut rows = 0;
        while let Some(line) = lines.next() {
            let width = line.width();
            if lines.peek().is_some() {
                rows += width.div_ceil(self.width).max(1);
            } else {
                rows += width / self.width;
            }
        }
        rows
    }
}
