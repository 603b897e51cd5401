// src/testing.rs
//
// Deterministic backends for unit tests.

use crate::git::HistoryBackend;
use crate::model::{Commit, File};
use crate::work::{Item, ItemServer};
use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// A commit made yesterday.
pub(crate) fn commit(author: &str, subject: &str, files: &[&str]) -> Commit {
    Commit {
        id: format!("{:040x}", NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        author: author.to_string(),
        subject: subject.to_string(),
        timestamp: Utc::now() - Duration::days(1),
        files: files.iter().map(|f| f.to_string()).collect(),
    }
}

pub(crate) fn sample_file(rel_path: &str, lines: usize) -> Arc<File> {
    let contents: Vec<String> = (1..=lines).map(|n| format!("line {}", n)).collect();
    Arc::new(File::from_contents(rel_path, &contents.join("\n")))
}

/// Polls `done` until it holds or `timeout` passes.
pub(crate) fn wait_until(timeout: std::time::Duration, done: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(std::time::Duration::from_millis(5));
    }
    done()
}

type RangeKey = (String, usize, usize);

/// History backend returning a fixed commit list and counting queries
#[derive(Default)]
pub(crate) struct FakeHistory {
    commits: Vec<Commit>,
    delay: std::time::Duration,
    failing: Mutex<HashSet<(usize, usize)>>,
    line_calls: Mutex<HashMap<RangeKey, usize>>,
    threads: Mutex<HashSet<String>>,
    last_since: Mutex<Option<DateTime<Utc>>>,
}

impl FakeHistory {
    pub(crate) fn new(commits: Vec<Commit>) -> Self {
        Self {
            commits,
            ..Default::default()
        }
    }

    /// Makes every line query sleep for `delay`.
    pub(crate) fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes line queries over exactly `start..=end` fail.
    pub(crate) fn fail_range(&self, start: usize, end: usize) {
        self.failing.lock().unwrap().insert((start, end));
    }

    pub(crate) fn line_calls(&self, path: &str, start: usize, end: usize) -> usize {
        let calls = self.line_calls.lock().unwrap();
        calls.get(&(path.to_string(), start, end)).copied().unwrap_or(0)
    }

    pub(crate) fn total_line_calls(&self) -> usize {
        self.line_calls.lock().unwrap().values().sum()
    }

    /// Names of the threads that ran line queries.
    pub(crate) fn threads(&self) -> HashSet<String> {
        self.threads.lock().unwrap().clone()
    }

    pub(crate) fn last_since(&self) -> Option<DateTime<Utc>> {
        *self.last_since.lock().unwrap()
    }
}

impl HistoryBackend for FakeHistory {
    fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<Commit>> {
        *self.last_since.lock().unwrap() = Some(since);
        Ok(self
            .commits
            .iter()
            .filter(|c| c.timestamp >= since)
            .cloned()
            .collect())
    }

    fn line_history(&self, path: &str, start: usize, end: usize) -> Result<Vec<Commit>> {
        *self
            .line_calls
            .lock()
            .unwrap()
            .entry((path.to_string(), start, end))
            .or_default() += 1;
        let name = thread::current().name().unwrap_or("unnamed").to_string();
        self.threads.lock().unwrap().insert(name);

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.failing.lock().unwrap().contains(&(start, end)) {
            bail!("line history unavailable for {}:{}-{}", path, start, end);
        }
        Ok(self.commits.clone())
    }
}

pub(crate) struct FailingItems;

impl ItemServer for FailingItems {
    fn items(&self, _ids: &[String]) -> Result<Vec<Item>> {
        bail!("tracker offline")
    }
}
