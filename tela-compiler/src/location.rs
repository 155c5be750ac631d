use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identifies one parsed source file within a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

/// Byte span inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub source: SourceId,
    pub offset: usize,
    pub len: usize,
}

impl Location {
    pub fn new(source: SourceId, offset: usize, len: usize) -> Self {
        Self {
            source,
            offset,
            len,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Union span from the start of `self` to the end of `other`.
    /// Both must point into the same source.
    pub fn span_to(&self, other: &Location) -> Location {
        debug_assert_eq!(self.source, other.source);
        Location {
            source: self.source,
            offset: self.offset,
            len: other.end() - self.offset,
        }
    }
}

struct SourceFile {
    path: PathBuf,
    text: Arc<str>,
}

/// Owns the text of every file touched by one parse call (root + includes).
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<Arc<str>>) -> SourceId {
        let id = SourceId(self.files.len() as u32);
        self.files.push(SourceFile {
            path: path.into(),
            text: text.into(),
        });
        id
    }

    pub fn path(&self, id: SourceId) -> &Path {
        &self.files[id.0 as usize].path
    }

    pub fn text(&self, id: SourceId) -> &str {
        &self.files[id.0 as usize].text
    }

    pub fn shared_text(&self, id: SourceId) -> Arc<str> {
        self.files[id.0 as usize].text.clone()
    }

    pub fn slice(&self, loc: Location) -> &str {
        &self.text(loc.source)[loc.offset..loc.end()]
    }

    /// 1-based line and column for a byte offset.
    pub fn line_col(&self, source: SourceId, offset: usize) -> (usize, usize) {
        let text = self.text(source);
        let mut line = 1;
        let mut col = 1;
        for (i, ch) in text.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}
