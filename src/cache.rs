// src/cache.rs
//
// Line annotation cache.
//
// Lookups go through a bounded LRU map keyed by (path, line number). A miss
// registers an in-flight slot for its key before computing, so concurrent
// lookups for the same line wait on one computation instead of starting
// their own. Every lookup also hands neighbouring lines to a small pool of
// prefetch workers through a zero-capacity channel: producers block until a
// worker is free, which keeps the backlog bounded by the number of producer
// threads rather than by file size.

use crate::annotate::{Annotate, FileAnnotation, LineAnnotation};
use crate::error::AnnotateResult;
use crate::model::{File, Line, LineKey};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Sizing for [`CachingAnnotator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of line annotations kept; zero is treated as one
    pub capacity: usize,
    /// Prefetch workers; zero disables prefetching
    pub workers: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            workers: 3,
        }
    }
}

type Flight = Arc<OnceLock<AnnotateResult<Arc<LineAnnotation>>>>;

struct Entries {
    lru: LruCache<LineKey, Arc<LineAnnotation>>,
    in_flight: HashMap<LineKey, Flight>,
}

/// State shared between callers and prefetch workers
struct Shared<A> {
    annotate: A,
    entries: Mutex<Entries>,
}

impl<A> Shared<A> {
    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Annotate> Shared<A> {
    /// Cached annotation for `line`, computing it at most once per miss.
    fn get(&self, line: &Line) -> AnnotateResult<Arc<LineAnnotation>> {
        let key = line.key();
        let flight = {
            let mut entries = self.entries();
            if let Some(hit) = entries.lru.get(&key) {
                debug!("Cache hit for {}", key);
                return Ok(Arc::clone(hit));
            }
            Arc::clone(entries.in_flight.entry(key.clone()).or_default())
        };

        let result = flight
            .get_or_init(|| {
                debug!("Cache miss for {}", key);
                self.annotate.line(line)
            })
            .clone();

        // Whoever gets here first retires the slot; failures are not stored.
        let mut entries = self.entries();
        if entries
            .in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &flight))
        {
            entries.in_flight.remove(&key);
            if let Ok(annotation) = &result {
                entries.lru.put(key, Arc::clone(annotation));
            }
        }
        result
    }
}

/// Wraps another [`Annotate`] with a line cache and background prefetching.
///
/// File annotations are passed through uncached; asking for one queues every
/// line of the file for prefetch. Asking for a line queues its neighbours.
pub struct CachingAnnotator<A> {
    shared: Arc<Shared<A>>,
    seed: Sender<Line>,
    stop: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl<A: Annotate + 'static> CachingAnnotator<A> {
    pub fn new(annotate: A) -> Self {
        Self::with_config(annotate, CacheConfig::default())
    }

    pub fn with_config(annotate: A, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let shared = Arc::new(Shared {
            annotate,
            entries: Mutex::new(Entries {
                lru: LruCache::new(capacity),
                in_flight: HashMap::new(),
            }),
        });

        let (seed, queue) = bounded::<Line>(0);
        let (stop, stopped) = bounded::<()>(0);
        let workers: Vec<_> = (0..config.workers)
            .filter_map(|id| {
                let shared = Arc::clone(&shared);
                let queue = queue.clone();
                let stopped = stopped.clone();
                thread::Builder::new()
                    .name(format!("lore-prefetch-{}", id))
                    .spawn(move || run_worker(id, &shared, &queue, &stopped))
                    .map_err(|e| warn!("Failed to start prefetch worker {}: {}", id, e))
                    .ok()
            })
            .collect();

        info!(
            "Annotation cache ready: capacity={}, workers={}",
            capacity,
            workers.len()
        );

        Self {
            shared,
            seed,
            stop: Some(stop),
            workers,
        }
    }
}

impl<A> CachingAnnotator<A> {
    pub fn len(&self) -> usize {
        self.shared.entries().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is cached, without touching its recency.
    pub fn contains(&self, key: &LineKey) -> bool {
        self.shared.entries().lru.contains(key)
    }

    /// Stops the prefetch workers and waits for them to exit.
    ///
    /// Lookups keep working afterwards; they just stop prefetching.
    pub fn shutdown(&mut self) {
        if self.stop.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Prefetch worker panicked");
            }
        }
        info!("Annotation cache workers stopped");
    }

    fn prefetching(&self) -> bool {
        self.stop.is_some() && !self.workers.is_empty()
    }

    /// Hands `lines` to the workers from a separate thread so the caller never waits.
    fn seed(&self, lines: impl Iterator<Item = Line> + Send + 'static) {
        if !self.prefetching() {
            return;
        }
        let seed = self.seed.clone();
        let spawned = thread::Builder::new().name("lore-seed".into()).spawn(move || {
            for line in lines {
                if seed.send(line).is_err() {
                    break; // workers are gone
                }
            }
        });
        if let Err(e) = spawned {
            warn!("Skipping prefetch, could not start a seeding thread: {}", e);
        }
    }
}

impl<A> Drop for CachingAnnotator<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<A: Annotate>(id: usize, shared: &Shared<A>, queue: &Receiver<Line>, stopped: &Receiver<()>) {
    debug!("Prefetch worker {} started", id);
    loop {
        // `stopped` never carries a message, it only disconnects
        let next = select! {
            recv(stopped) -> _ => None,
            recv(queue) -> line => line.ok(),
        };
        let Some(line) = next else { break };

        if let Err(err) = shared.get(&line) {
            warn!("Prefetch of {} failed: {}", line.key(), err);
        }
    }
    debug!("Prefetch worker {} stopped", id);
}

impl<A: Annotate + 'static> Annotate for CachingAnnotator<A> {
    fn file(&self, file: &Arc<File>) -> AnnotateResult<FileAnnotation> {
        let whole = Arc::clone(file);
        self.seed((1..=whole.len()).filter_map(move |n| whole.line(n)));
        self.shared.annotate.file(file)
    }

    fn line(&self, line: &Line) -> AnnotateResult<Arc<LineAnnotation>> {
        self.seed(line.previous().into_iter().chain(line.next()));
        self.shared.get(line)
    }
}
