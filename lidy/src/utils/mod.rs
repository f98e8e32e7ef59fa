use crate::{command::Command, commands};

pub mod reader;
pub mod writer;

///
/// Translates byte offsets into 1-based `(line, column)` pairs. Columns count
/// characters, not bytes, so multi-byte text lines up with what an editor
/// shows.
///
#[derive(Debug, Clone)]
pub struct LineIndex<'text> {
    text: &'text str,
    line_starts: Vec<usize>,
}

impl<'text> LineIndex<'text> {
    pub fn new(text: &'text str) -> LineIndex<'text> {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        LineIndex { text, line_starts }
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let start = self.line_starts[line - 1];
        let column = match self.text.get(start..offset) {
            Some(prefix) => prefix.chars().count(),
            None => offset - start,
        };
        (line, column + 1)
    }
}

pub fn get_lidy_commands() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(commands::parse_tree::ParseTree::new()),
        Box::new(commands::validate::Validate::new()),
        Box::new(commands::completions::Completions::new()),
    ]
}
