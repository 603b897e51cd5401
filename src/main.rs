// src/main.rs

mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use cli::{Args, Command};
use git_lore::report;
use git_lore::{
    Annotate, Annotator, CacheConfig, CachingAnnotator, File, GitHistory, ItemCatalog, ItemServer, Line,
    UnresolvedItems,
};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let start_time = Instant::now();

    let history = GitHistory::open(&args.repo)?;
    let root = history.root().to_path_buf();
    let items: Box<dyn ItemServer> = match &args.items {
        Some(path) => Box::new(ItemCatalog::load(path)?),
        None => Box::new(UnresolvedItems),
    };

    let annotator = Annotator::new(history, items).with_window(args.window_months);
    let annotate: Box<dyn Annotate> = if args.no_cache {
        Box::new(annotator)
    } else {
        Box::new(CachingAnnotator::with_config(
            annotator,
            CacheConfig {
                capacity: args.capacity,
                workers: args.workers,
            },
        ))
    };

    let now = Utc::now();
    let mut out = io::stdout().lock();

    match &args.command {
        Command::File { path } => {
            let file = open_file(&root, path)?;
            let annotation = annotate.file(&file)?;
            report::write_annotation(&mut out, &annotation, now)?;
        }
        Command::Line { path, number } => {
            let file = open_file(&root, path)?;
            let line = file
                .line(*number)
                .with_context(|| format!("{} has {} lines, no line {}", file.rel_path, file.len(), number))?;
            let annotation = annotate.line(&line)?;
            report::write_annotation(&mut out, &*annotation, now)?;
        }
        Command::Lines { path, from, to } => {
            let file = open_file(&root, path)?;
            let to = to.unwrap_or(file.len()).min(file.len());
            let lines: Vec<Line> = ((*from).max(1)..=to).filter_map(|n| file.line(n)).collect();

            let bar = ProgressBar::new(lines.len() as u64);
            bar.set_message("Annotating lines");
            let results: Vec<_> = lines
                .par_iter()
                .progress_with(bar.clone())
                .map(|line| annotate.line(line))
                .collect();
            bar.finish_and_clear();

            for (line, result) in lines.iter().zip(results) {
                match result {
                    Ok(annotation) => writeln!(out, "{}", report::line_summary(&annotation))?,
                    Err(e) => writeln!(out, "{:>5} | error: {}", line.number, e)?,
                }
            }
        }
        Command::Related { path, limit } => {
            let file = open_file(&root, path)?;
            let annotation = annotate.file(&file)?;
            let mut related = annotation.related_files();
            related.truncate(*limit);
            writeln!(out, "Files changed with {}", file.name)?;
            writeln!(out)?;
            report::write_related(&mut out, &related, now)?;
        }
    }
    out.flush()?;

    drop(annotate);
    info!("Total time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn open_file(root: &Path, path: &str) -> Result<Arc<File>> {
    let rel_path = path.trim_start_matches("./").replace('\\', "/");
    let file = File::open(root, &rel_path).with_context(|| format!("Failed to read {:?}", root.join(&rel_path)))?;
    Ok(Arc::new(file))
}
