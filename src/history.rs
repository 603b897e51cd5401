// src/history.rs
//
// Aggregations over a commit sequence: work item references, contributors
// and co-changed files. Everything here is a pure function of its input.

use crate::model::{Commit, Contributor, RelatedFile};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn work_item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(?:S|DE|F)[0-9]{2,}").expect("valid work item regex"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r" ?<[^>]+>").expect("valid email regex"))
}

fn author_separator() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r", | ab?nd |,").expect("valid separator regex"))
}

/// Work item identifiers referenced by commit subjects, in first-seen order.
///
/// Identifiers keep the casing they were written with, so `S1234` and
/// `s1234` are reported separately.
pub fn work_items(commits: &[Commit]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for commit in commits {
        for found in work_item_pattern().find_iter(&commit.subject) {
            if seen.insert(found.as_str()) {
                items.push(found.as_str().to_string());
            }
        }
    }

    items
}

/// Splits an author field into individual names, dropping `<email>` parts.
pub fn author_names(author: &str) -> Vec<String> {
    let stripped = email_pattern().replace_all(author, "");
    author_separator()
        .split(&stripped)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Contributors in order of first appearance.
///
/// `last_commit` is taken from the commit a name is first seen on and is not
/// touched by later sightings; with newest-first history that is the most
/// recent commit.
pub fn contributors(commits: &[Commit]) -> Vec<Contributor> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut contributors: Vec<Contributor> = Vec::new();

    for commit in commits {
        for name in author_names(&commit.author) {
            match index.get(&name) {
                Some(&i) => contributors[i].count += 1,
                None => {
                    index.insert(name.clone(), contributors.len());
                    contributors.push(Contributor {
                        name,
                        count: 1,
                        last_commit: commit.timestamp,
                    });
                }
            }
        }
    }

    contributors
}

/// Files changed alongside `anchor`, most frequent first.
///
/// Ties keep first-seen order.
pub fn related_files(commits: &[Commit], anchor: &str) -> Vec<RelatedFile> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut files: Vec<RelatedFile> = Vec::new();

    for commit in commits {
        for path in commit.files.iter().filter(|p| p.as_str() != anchor) {
            match index.get(path.as_str()) {
                Some(&i) => {
                    let file = &mut files[i];
                    file.count += 1;
                    file.last_commit = file.last_commit.max(commit.timestamp);
                }
                None => {
                    index.insert(path.as_str(), files.len());
                    files.push(RelatedFile {
                        path: path.clone(),
                        count: 1,
                        last_commit: commit.timestamp,
                    });
                }
            }
        }
    }

    files.sort_by(|a, b| b.count.cmp(&a.count));
    files
}
