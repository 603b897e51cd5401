// src/model.rs

use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A single commit as reported by the history backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: String,
    /// Author identity, possibly several people, e.g. `Alice <a@x.com>, Bob <b@x.com>`
    pub author: String,
    pub subject: String,
    pub timestamp: DateTime<Utc>,
    /// Repository-relative paths changed by this commit
    pub files: Vec<String>,
}

impl Commit {
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }

    pub fn touches(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }
}

/// A person credited with commits inside some query window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub name: String,
    pub count: usize,
    /// Timestamp of the first attributed commit in iteration order
    pub last_commit: DateTime<Utc>,
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A file that changed together with some anchor file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedFile {
    pub path: String,
    pub count: usize,
    pub last_commit: DateTime<Utc>,
}

/// A source file as seen by the annotator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    /// Path relative to the repository root, `/` separated
    pub rel_path: String,
    lines: Vec<String>,
}

impl File {
    pub fn from_contents(rel_path: &str, contents: &str) -> Self {
        let name = Path::new(rel_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel_path.to_string());
        Self {
            name,
            rel_path: rel_path.to_string(),
            lines: contents.lines().map(String::from).collect(),
        }
    }

    /// Reads `rel_path` below `repo_root` from the working tree.
    pub fn open(repo_root: &Path, rel_path: &str) -> std::io::Result<Self> {
        let contents = fs::read_to_string(repo_root.join(rel_path))?;
        Ok(Self::from_contents(rel_path, &contents))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Text of the 1-based line `number`
    pub fn text(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Line handle for the 1-based `number`, `None` when out of range.
    pub fn line(self: &Arc<Self>, number: usize) -> Option<Line> {
        (1..=self.len()).contains(&number).then(|| Line {
            file: Arc::clone(self),
            number,
        })
    }

    pub fn lines(self: &Arc<Self>) -> impl Iterator<Item = Line> + '_ {
        (1..=self.len()).map(move |number| Line {
            file: Arc::clone(self),
            number,
        })
    }
}

/// A 1-based line of a particular file
#[derive(Debug, Clone)]
pub struct Line {
    pub file: Arc<File>,
    pub number: usize,
}

impl Line {
    pub fn key(&self) -> LineKey {
        LineKey {
            path: self.file.rel_path.clone(),
            number: self.number,
        }
    }

    pub fn previous(&self) -> Option<Line> {
        self.number.checked_sub(1).and_then(|n| self.file.line(n))
    }

    pub fn next(&self) -> Option<Line> {
        self.number.checked_add(1).and_then(|n| self.file.line(n))
    }
}

/// Value identity of a line, used as the cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub path: String,
    pub number: usize,
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_bounds() {
        let file = Arc::new(File::from_contents("src/a.rs", "one\ntwo\nthree\n"));
        assert_eq!(file.name, "a.rs");
        assert_eq!(file.len(), 3);
        assert!(file.line(0).is_none());
        assert!(file.line(4).is_none());

        let first = file.line(1).unwrap();
        assert!(first.previous().is_none());
        assert_eq!(first.next().unwrap().number, 2);
        assert!(file.line(3).unwrap().next().is_none());
        assert_eq!(file.text(2), Some("two"));
    }

    #[test]
    fn test_neighbours_of_out_of_range_line() {
        let file = Arc::new(File::from_contents("src/a.rs", "one\n"));
        let last = Line {
            file: Arc::clone(&file),
            number: usize::MAX,
        };
        assert!(last.next().is_none());
        assert!(last.previous().is_none());

        let zero = Line { file, number: 0 };
        assert!(zero.previous().is_none());
        assert_eq!(zero.next().unwrap().number, 1);
    }

    #[test]
    fn test_key_is_value_identity() {
        let a = Arc::new(File::from_contents("src/a.rs", "x\ny\n"));
        let b = Arc::new(File::from_contents("src/a.rs", "x\ny\n"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.line(2).unwrap().key(), b.line(2).unwrap().key());
        assert_ne!(a.line(1).unwrap().key(), a.line(2).unwrap().key());
    }
}
