//! Open documents and the edits clients send for them.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("received change for unknown document {0}")]
    UnknownDocument(Url),
    #[error("invalid start position {}:{}", .0.line, .0.character)]
    InvalidStart(Position),
    #[error("invalid end position {}:{}", .0.line, .0.character)]
    InvalidEnd(Position),
    #[error("change of {length} characters at {}:{} runs past the end of the document", .start.line, .start.character)]
    OutOfRange { start: Position, length: usize },
}

/// Where a ranged change stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEnd {
    Position(Position),
    /// Number of characters replaced, counted from the start
    Length(usize),
}

/// One edit; without a range the text replaces the whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub range: Option<(Position, ChangeEnd)>,
    pub text: String,
}

impl ContentChange {
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    pub fn range(start: Position, end: Position, text: impl Into<String>) -> Self {
        Self {
            range: Some((start, ChangeEnd::Position(end))),
            text: text.into(),
        }
    }

    pub fn length(start: Position, length: usize, text: impl Into<String>) -> Self {
        Self {
            range: Some((start, ChangeEnd::Length(length))),
            text: text.into(),
        }
    }
}

impl From<TextDocumentContentChangeEvent> for ContentChange {
    /// A non-zero `range_length` takes precedence over the range end.
    fn from(event: TextDocumentContentChangeEvent) -> Self {
        let range = event.range.map(|range| {
            let end = match event.range_length {
                Some(length) if length != 0 => ChangeEnd::Length(length as usize),
                _ => ChangeEnd::Position(range.end),
            };
            (range.start, end)
        });
        Self {
            range,
            text: event.text,
        }
    }
}

/// Byte index of a 0-based (line, character) position, characters counted as
/// Unicode scalar values. The end of a line and the end of the text are valid.
pub fn byte_offset(text: &str, position: Position) -> Option<usize> {
    let mut line = 0;
    let mut character = 0;

    for (index, ch) in text.char_indices() {
        if line == position.line && character == position.character {
            return Some(index);
        }
        if line > position.line {
            return None;
        }
        if ch == '\n' {
            line += 1;
            character = 0;
        } else {
            character += 1;
        }
    }

    (line == position.line && character == position.character).then_some(text.len())
}

/// Apply one change to `text` in place.
pub fn apply_change(text: &mut String, change: &ContentChange) -> Result<(), PatchError> {
    let Some((start, end)) = change.range else {
        text.clone_from(&change.text);
        return Ok(());
    };

    let start_index = byte_offset(text, start).ok_or(PatchError::InvalidStart(start))?;
    let end_index = match end {
        ChangeEnd::Position(position) => byte_offset(text, position)
            .filter(|&index| index >= start_index)
            .ok_or(PatchError::InvalidEnd(position))?,
        ChangeEnd::Length(length) => text[start_index..]
            .char_indices()
            .map(|(index, _)| start_index + index)
            .chain(std::iter::once(text.len()))
            .nth(length)
            .ok_or(PatchError::OutOfRange { start, length })?,
    };

    trace!(start_index, end_index, inserted = change.text.len(), "apply change");
    text.replace_range(start_index..end_index, &change.text);
    Ok(())
}

/// Text of every open document, keyed by URI
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<Url, String>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, uri: Url, text: String) {
        debug!(%uri, "open document");
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri, text);
    }

    /// Replace the whole text of an open document.
    pub fn replace(&self, uri: &Url, text: String) -> Result<(), PatchError> {
        self.apply_changes(uri, [ContentChange::full(text)])
    }

    /// Apply `changes` in order, each against the result of the previous one.
    ///
    /// The stored text only changes if every edit applies.
    pub fn apply_changes(
        &self,
        uri: &Url,
        changes: impl IntoIterator<Item = ContentChange>,
    ) -> Result<(), PatchError> {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = documents
            .get_mut(uri)
            .ok_or_else(|| PatchError::UnknownDocument(uri.clone()))?;

        let mut text = stored.clone();
        for change in changes {
            apply_change(&mut text, &change)?;
        }
        *stored = text;
        Ok(())
    }

    /// Snapshot of a document's current text
    pub fn get(&self, uri: &Url) -> Option<String> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    pub fn close(&self, uri: &Url) -> bool {
        debug!(%uri, "close document");
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tower_lsp::lsp_types::Range;

    const CODE: &str = "func A() {\n\tfmt.Println(\"X\")\n\tos.Exit(0)\n}";

    fn uri() -> Url {
        Url::parse("file:///code.sol").unwrap()
    }

    fn pos(line: u32, character: u32) -> Position {
        Position::new(line, character)
    }

    fn opened(text: &str) -> DocumentStore {
        let store = DocumentStore::new();
        store.open(uri(), text.to_string());
        store
    }

    #[test]
    fn test_open_get_close() {
        let store = opened("contract A {}");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&uri()).as_deref(), Some("contract A {}"));

        assert!(store.close(&uri()));
        assert!(!store.close(&uri()));
        assert!(store.is_empty());
        assert_eq!(store.get(&uri()), None);
    }

    #[test]
    fn test_incremental_changes_apply_in_order() {
        let store = opened(CODE);
        let changes = vec![
            ContentChange::range(pos(0, 0), pos(0, 0), "X"),
            ContentChange::range(pos(0, 1), pos(0, 1), "Y"),
            ContentChange::range(pos(0, 2), pos(0, 3), "L"),
            ContentChange::range(pos(1, 13), pos(1, 16), "^Y^"),
            ContentChange::length(pos(2, 1), 2, "myos"),
        ];
        store.apply_changes(&uri(), changes).unwrap();

        assert_eq!(
            store.get(&uri()).unwrap(),
            "XYLunc A() {\n\tfmt.Println(^Y^)\n\tmyos.Exit(0)\n}"
        );
    }

    #[test]
    fn test_explicit_end_position() {
        let mut text = CODE.to_string();
        apply_change(&mut text, &ContentChange::range(pos(1, 1), pos(2, 3), "")).unwrap();
        assert_eq!(text, "func A() {\n\t.Exit(0)\n}");
    }

    #[test]
    fn test_explicit_length() {
        let mut text = CODE.to_string();
        apply_change(&mut text, &ContentChange::length(pos(0, 5), 6, "B() ")).unwrap();
        assert_eq!(text, "func B() \tfmt.Println(\"X\")\n\tos.Exit(0)\n}");
    }

    #[test]
    fn test_range_length_takes_precedence() {
        let event = TextDocumentContentChangeEvent {
            range: Some(Range::new(pos(2, 1), pos(0, 0))),
            range_length: Some(2),
            text: "myos".to_string(),
        };
        assert_eq!(ContentChange::from(event), ContentChange::length(pos(2, 1), 2, "myos"));

        let event = TextDocumentContentChangeEvent {
            range: Some(Range::new(pos(0, 1), pos(0, 4))),
            range_length: Some(0),
            text: String::new(),
        };
        assert_eq!(ContentChange::from(event), ContentChange::range(pos(0, 1), pos(0, 4), ""));

        let event = TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "all".to_string(),
        };
        assert_eq!(ContentChange::from(event), ContentChange::full("all"));
    }

    #[test]
    fn test_characters_are_not_bytes() {
        let mut text = "é = 1;\nx".to_string();
        apply_change(&mut text, &ContentChange::range(pos(0, 1), pos(0, 3), "")).unwrap();
        assert_eq!(text, "é 1;\nx");
        apply_change(&mut text, &ContentChange::length(pos(0, 0), 1, "a")).unwrap();
        assert_eq!(text, "a 1;\nx");
    }

    #[test]
    fn test_edits_at_line_and_text_end() {
        let mut text = "ab\ncd".to_string();
        apply_change(&mut text, &ContentChange::range(pos(0, 2), pos(0, 2), "!")).unwrap();
        apply_change(&mut text, &ContentChange::range(pos(1, 2), pos(1, 2), "?")).unwrap();
        assert_eq!(text, "ab!\ncd?");
    }

    #[test]
    fn test_invalid_positions() {
        let mut text = "ab\ncd".to_string();

        let err = apply_change(&mut text, &ContentChange::range(pos(0, 4), pos(0, 4), "x"));
        assert_eq!(err, Err(PatchError::InvalidStart(pos(0, 4))));

        let err = apply_change(&mut text, &ContentChange::range(pos(5, 0), pos(5, 0), "x"));
        assert_eq!(err, Err(PatchError::InvalidStart(pos(5, 0))));

        let err = apply_change(&mut text, &ContentChange::range(pos(1, 1), pos(1, 7), "x"));
        assert_eq!(err, Err(PatchError::InvalidEnd(pos(1, 7))));

        let err = apply_change(&mut text, &ContentChange::range(pos(1, 1), pos(0, 1), "x"));
        assert_eq!(err, Err(PatchError::InvalidEnd(pos(0, 1))));

        let err = apply_change(&mut text, &ContentChange::length(pos(1, 1), 2, "x"));
        assert_eq!(err, Err(PatchError::OutOfRange { start: pos(1, 1), length: 2 }));

        assert_eq!(text, "ab\ncd");
    }

    #[test]
    fn test_failed_batch_leaves_text_untouched() {
        let store = opened(CODE);
        let changes = vec![
            ContentChange::range(pos(0, 0), pos(0, 0), "X"),
            ContentChange::range(pos(9, 0), pos(9, 0), "Y"),
        ];
        let err = store.apply_changes(&uri(), changes).unwrap_err();
        assert_eq!(err, PatchError::InvalidStart(pos(9, 0)));
        assert_eq!(store.get(&uri()).unwrap(), CODE);
    }

    #[test]
    fn test_unknown_document() {
        let store = DocumentStore::new();
        let err = store.replace(&uri(), "x".to_string()).unwrap_err();
        assert_eq!(err, PatchError::UnknownDocument(uri()));
        assert_eq!(
            err.to_string(),
            "received change for unknown document file:///code.sol"
        );
    }

    #[test]
    fn test_full_replace() {
        let store = opened(CODE);
        store.replace(&uri(), "contract B {}".to_string()).unwrap();
        assert_eq!(store.get(&uri()).unwrap(), "contract B {}");
    }
}
