use serde::Serialize;

/// Zero-based character offset into a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Pos(pub usize);

impl Pos {
    pub fn new(offset: usize) -> Self {
        Self(offset)
    }

    pub fn offset(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position index built while a document is scanned.
///
/// Every consumed character is recorded once, in scan order, under the line it
/// appeared on. Newlines open a new line and are not recorded themselves, so a
/// (line, character) pair never addresses a newline. Lines and characters are
/// 1-based; offsets that were never recorded are reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    lines: Vec<Vec<Pos>>,
}

impl File {
    pub fn new() -> Self {
        Self {
            lines: vec![Vec::new()],
        }
    }

    /// Start a new line; subsequent characters belong to it.
    pub fn add_line(&mut self) {
        self.lines.push(Vec::new());
    }

    /// Record one character on the current line.
    ///
    /// Offsets must be recorded in increasing order.
    pub fn add_character(&mut self, offset: Pos) {
        if let Some(line) = self.lines.last_mut() {
            line.push(offset);
        }
    }

    /// 1-based line of a recorded offset
    pub fn line_of(&self, offset: Pos) -> Option<usize> {
        self.location(offset).map(|(line, _)| line)
    }

    /// 1-based character within its line of a recorded offset
    pub fn character_of(&self, offset: Pos) -> Option<usize> {
        self.location(offset).map(|(_, character)| character)
    }

    /// 1-based (line, character) of a recorded offset
    pub fn location(&self, offset: Pos) -> Option<(usize, usize)> {
        self.lines.iter().enumerate().find_map(|(line, chars)| {
            chars
                .binary_search(&offset)
                .ok()
                .map(|character| (line + 1, character + 1))
        })
    }

    /// Offset recorded at a 1-based (line, character) pair
    pub fn offset_of(&self, line: usize, character: usize) -> Option<Pos> {
        let chars = self.lines.get(line.checked_sub(1)?)?;
        chars.get(character.checked_sub(1)?).copied()
    }

    /// Number of lines seen so far (at least one)
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of recorded characters
    pub fn len(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(Vec::is_empty)
    }
}

impl Default for File {
    fn default() -> Self {
        Self::new()
    }
}
