// src/git.rs

use crate::model::Commit;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use git2::{Delta, DiffHunk, DiffOptions, Repository, Sort, Tree};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Source of commit history for the annotator.
///
/// Both queries return commits newest first.
pub trait HistoryBackend: Send + Sync {
    /// Every commit reachable from HEAD made at or after `since`
    fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<Commit>>;

    /// Commits that changed lines `start..=end` of `path` (line numbers as of HEAD)
    fn line_history(&self, path: &str, start: usize, end: usize) -> Result<Vec<Commit>>;
}

impl<T: HistoryBackend + ?Sized> HistoryBackend for Arc<T> {
    fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<Commit>> {
        (**self).commits_since(since)
    }

    fn line_history(&self, path: &str, start: usize, end: usize) -> Result<Vec<Commit>> {
        (**self).line_history(path, start, end)
    }
}

/// History backend reading a repository through libgit2.
///
/// The repository is reopened for each query so concurrent queries never
/// share a handle.
#[derive(Debug, Clone)]
pub struct GitHistory {
    root: PathBuf,
}

impl GitHistory {
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Failed to open git repository at {:?}", path))?;
        let root = repo
            .workdir()
            .context("Repository has no working directory (bare repo?)")?
            .to_path_buf();
        debug!("Opened git repository at {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo(&self) -> Result<Repository> {
        Repository::open(&self.root)
            .with_context(|| format!("Failed to open git repository at {:?}", self.root))
    }
}

impl HistoryBackend for GitHistory {
    fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<Commit>> {
        let repo = self.repo()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            if commit.time().seconds() < since.timestamp() {
                break; // sorted by time, nothing older is wanted
            }
            commits.push(commit_record(&repo, &commit)?);
        }

        debug!("{} commits since {}", commits.len(), since);
        Ok(commits)
    }

    fn line_history(&self, path: &str, start: usize, end: usize) -> Result<Vec<Commit>> {
        let repo = self.repo()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL)?;
        revwalk.push_head()?;
        revwalk.simplify_first_parent()?;

        let mut range = (start, end);
        let mut commits = Vec::new();

        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            let tree = commit.tree()?;
            let parent_tree = commit.parent(0).ok().map(|p| p.tree()).transpose()?;

            let mut diff_opts = DiffOptions::new();
            diff_opts.pathspec(path);
            diff_opts.disable_pathspec_match(true);
            diff_opts.context_lines(0);
            diff_opts.ignore_filemode(true);
            let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut diff_opts))?;

            let mut added = false;
            let mut hunks = Vec::new();
            diff.foreach(
                &mut |delta, _| {
                    if delta.status() == Delta::Added {
                        added = true;
                    }
                    true
                },
                None,
                Some(&mut |_, hunk| {
                    hunks.push(Hunk::from(&hunk));
                    true
                }),
                None,
            )?;

            if added || touches_range(&hunks, range) {
                commits.push(commit_record(&repo, &commit)?);
            }
            if added {
                break;
            }
            range = (parent_line(&hunks, range.0), parent_line(&hunks, range.1));
            range.1 = range.1.max(range.0);
        }

        debug!("{} commits touch {}:{}-{}", commits.len(), path, start, end);
        Ok(commits)
    }
}

/// Line counts of one zero-context diff hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hunk {
    old_start: usize,
    old_lines: usize,
    new_start: usize,
    new_lines: usize,
}

impl From<&DiffHunk<'_>> for Hunk {
    fn from(hunk: &DiffHunk<'_>) -> Self {
        Self {
            old_start: hunk.old_start() as usize,
            old_lines: hunk.old_lines() as usize,
            new_start: hunk.new_start() as usize,
            new_lines: hunk.new_lines() as usize,
        }
    }
}

fn touches_range(hunks: &[Hunk], (start, end): (usize, usize)) -> bool {
    hunks.iter().any(|h| {
        if h.new_lines == 0 {
            // pure deletion sits between new_start and new_start + 1
            h.new_start >= start && h.new_start < end
        } else {
            h.new_start <= end && start < h.new_start + h.new_lines
        }
    })
}

/// Maps a line number in the new side of a diff to the old side.
fn parent_line(hunks: &[Hunk], line: usize) -> usize {
    let mut shift: isize = 0;
    for h in hunks {
        if h.new_lines == 0 {
            if line > h.new_start {
                shift += h.old_lines as isize;
                continue;
            }
            break;
        }
        if line < h.new_start {
            break;
        }
        if line < h.new_start + h.new_lines {
            return if h.old_lines == 0 {
                h.old_start.max(1)
            } else {
                h.old_start + (line - h.new_start).min(h.old_lines - 1)
            };
        }
        shift += h.old_lines as isize - h.new_lines as isize;
    }
    (line as isize + shift).max(1) as usize
}

fn changed_files(repo: &Repository, parent: Option<&Tree<'_>>, tree: &Tree<'_>) -> Result<Vec<String>> {
    let diff = repo.diff_tree_to_tree(parent, Some(tree), None)?;
    let mut files = Vec::new();
    diff.foreach(
        &mut |delta, _| {
            let file = match delta.status() {
                Delta::Deleted => delta.old_file(),
                _ => delta.new_file(),
            };
            if let Some(path) = file.path() {
                files.push(path.to_string_lossy().replace('\\', "/"));
            }
            true
        },
        None,
        None,
        None,
    )?;
    Ok(files)
}

fn commit_record(repo: &Repository, commit: &git2::Commit<'_>) -> Result<Commit> {
    let signature = commit.author();
    let name = signature.name().unwrap_or("Unknown");
    let author = match signature.email() {
        Some(email) if !email.is_empty() => format!("{} <{}>", name, email),
        _ => name.to_string(),
    };

    let tree = commit.tree()?;
    let parent_tree = commit.parent(0).ok().map(|p| p.tree()).transpose()?;

    Ok(Commit {
        id: commit.id().to_string(),
        author,
        subject: commit.summary().unwrap_or("").to_string(),
        timestamp: Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_default(),
        files: changed_files(repo, parent_tree.as_ref(), &tree)?,
    })
}
