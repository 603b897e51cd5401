// src/annotate.rs

use crate::error::{AnnotateError, AnnotateResult};
use crate::git::HistoryBackend;
use crate::history;
use crate::model::{Commit, Contributor, File, Line, RelatedFile};
use crate::work::{resolve_items, Item, ItemServer};
use chrono::{DateTime, Months, Utc};
use std::sync::Arc;
use tracing::debug;

/// Default trailing window for file annotations
pub const DEFAULT_WINDOW_MONTHS: u32 = 12;

/// History attached to a piece of code
pub trait Annotation {
    fn commits(&self) -> &[Commit];
    fn items(&self) -> &[Item];
    fn title(&self) -> String;

    fn contributors(&self) -> Vec<Contributor> {
        history::contributors(self.commits())
    }
}

/// Recent history of a whole file
#[derive(Debug, Clone)]
pub struct FileAnnotation {
    pub file: Arc<File>,
    pub commits: Vec<Commit>,
    pub items: Vec<Item>,
}

impl FileAnnotation {
    /// Files that changed in the same commits as this one
    pub fn related_files(&self) -> Vec<RelatedFile> {
        history::related_files(&self.commits, &self.file.rel_path)
    }
}

impl Annotation for FileAnnotation {
    fn commits(&self) -> &[Commit] {
        &self.commits
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn title(&self) -> String {
        self.file.name.clone()
    }
}

/// History of one line plus a line of context on either side
#[derive(Debug, Clone)]
pub struct LineAnnotation {
    pub line: Line,
    /// First line of the queried range, 1-based
    pub start: usize,
    /// Last line of the queried range, inclusive
    pub end: usize,
    pub commits: Vec<Commit>,
    pub items: Vec<Item>,
}

impl Annotation for LineAnnotation {
    fn commits(&self) -> &[Commit] {
        &self.commits
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn title(&self) -> String {
        format!("{} Lines {}-{}", self.line.file.name, self.start, self.end)
    }
}

/// Produces annotations for files and lines.
pub trait Annotate: Send + Sync {
    fn file(&self, file: &Arc<File>) -> AnnotateResult<FileAnnotation>;
    fn line(&self, line: &Line) -> AnnotateResult<Arc<LineAnnotation>>;
}

/// The range queried for `line`: one line of context each side, kept inside the file.
pub fn line_range(line: &Line) -> (usize, usize) {
    let start = line.number.saturating_sub(1).max(1);
    let end = (line.number + 1).min(line.file.len()).max(line.number);
    (start, end)
}

/// Builds annotations straight from the backends, with no caching.
pub struct Annotator<H, I> {
    history: H,
    items: I,
    window_months: u32,
}

impl<H: HistoryBackend, I: ItemServer> Annotator<H, I> {
    pub fn new(history: H, items: I) -> Self {
        Self {
            history,
            items,
            window_months: DEFAULT_WINDOW_MONTHS,
        }
    }

    /// Changes how far back file annotations look.
    pub fn with_window(mut self, months: u32) -> Self {
        self.window_months = months;
        self
    }

    fn window_start(&self) -> DateTime<Utc> {
        Utc::now()
            .checked_sub_months(Months::new(self.window_months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn items_for(&self, commits: &[Commit]) -> AnnotateResult<Vec<Item>> {
        let ids = history::work_items(commits);
        resolve_items(&self.items, &ids).map_err(AnnotateError::items)
    }
}

impl<H: HistoryBackend, I: ItemServer> Annotate for Annotator<H, I> {
    fn file(&self, file: &Arc<File>) -> AnnotateResult<FileAnnotation> {
        let since = self.window_start();
        debug!("Annotating {} since {}", file.rel_path, since);

        let commits: Vec<Commit> = self
            .history
            .commits_since(since)
            .map_err(AnnotateError::history)?
            .into_iter()
            .filter(|c| c.touches(&file.rel_path))
            .collect();
        let items = self.items_for(&commits)?;

        Ok(FileAnnotation {
            file: Arc::clone(file),
            commits,
            items,
        })
    }

    fn line(&self, line: &Line) -> AnnotateResult<Arc<LineAnnotation>> {
        if line.number == 0 || line.number > line.file.len() {
            return Err(AnnotateError::UnknownLine {
                path: line.file.rel_path.clone(),
                number: line.number,
            });
        }

        let (start, end) = line_range(line);
        debug!("Annotating {}:{}-{}", line.file.rel_path, start, end);

        let commits = self
            .history
            .line_history(&line.file.rel_path, start, end)
            .map_err(AnnotateError::history)?;
        let items = self.items_for(&commits)?;

        Ok(Arc::new(LineAnnotation {
            line: line.clone(),
            start,
            end,
            commits,
            items,
        }))
    }
}
