use anyhow::{Context, Result, anyhow};
use depwalk_analyzer::{Analyzer, is_relevant_change};
use depwalk_core::{CancellationToken, Error};
use log::{debug, info, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::{
    collections::BTreeSet,
    io::{self, BufWriter},
    path::PathBuf,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use crate::{cache::save_cache, reporter};

/// Paths that changed during one debounce window, plus the token that
/// aborts their analysis once a newer batch arrives.
struct Batch {
    paths: BTreeSet<PathBuf>,
    cancel: CancellationToken,
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_))
}

/// Re-analyze `analyzer` whenever relevant files under its root change.
///
/// Runs until the file watcher shuts down.
pub fn watch(analyzer: Analyzer, debounce: Duration, cache_file: Option<PathBuf>) -> Result<()> {
    let config = analyzer.config().clone();

    let (event_tx, event_rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher =
        notify::recommended_watcher(event_tx).context("Failed to create file watcher")?;
    watcher
        .watch(&config.cwd, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", config.cwd.display()))?;
    info!("Watching {} for changes", config.cwd.display());

    let changes = analyzer.subscribe();
    thread::spawn(move || {
        let mut stdout = BufWriter::new(io::stdout());
        for event in changes {
            if let Err(e) = reporter::print_changes(&mut stdout, &event) {
                warn!("Failed to print changes: {}", e);
            }
        }
    });

    let (batch_tx, batch_rx) = mpsc::channel::<Batch>();
    let worker = thread::spawn(move || rerun_worker(analyzer, batch_rx, cache_file));

    let mut collected: BTreeSet<PathBuf> = BTreeSet::new();
    let mut in_flight = CancellationToken::new();
    loop {
        let received = if collected.is_empty() {
            event_rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            event_rx.recv_timeout(debounce)
        };
        match received {
            Ok(Ok(event)) if is_content_change(&event.kind) => {
                let relevant = event.paths.into_iter().filter(|p| is_relevant_change(&config, p));
                collected.extend(relevant);
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Watch error: {}", e),
            Err(RecvTimeoutError::Timeout) => {
                in_flight.cancel();
                in_flight = CancellationToken::new();
                debug!("Debounce window closed with {} changed paths", collected.len());
                let batch =
                    Batch { paths: std::mem::take(&mut collected), cancel: in_flight.clone() };
                if batch_tx.send(batch).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(batch_tx);
    drop(watcher);
    worker.join().map_err(|_| anyhow!("Re-analysis worker panicked"))
}

fn rerun_worker(
    mut analyzer: Analyzer,
    batches: mpsc::Receiver<Batch>,
    cache_file: Option<PathBuf>,
) {
    // Paths of cancelled runs carry over into the next one.
    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    while let Ok(batch) = batches.recv() {
        pending.extend(batch.paths);
        let mut cancel = batch.cancel;
        while let Ok(newer) = batches.try_recv() {
            pending.extend(newer.paths);
            cancel = newer.cancel;
        }

        let changed: Vec<PathBuf> = pending.iter().cloned().collect();
        match analyzer.rerun(&changed, &cancel) {
            Ok(_) => {
                pending.clear();
                if let Some(path) = &cache_file {
                    save_cache(&analyzer, path);
                }
            }
            Err(Error::Cancelled) => {
                debug!("Re-analysis superseded, keeping {} changed paths", pending.len())
            }
            Err(e) => {
                warn!("Re-analysis failed: {}", e);
                pending.clear();
            }
        }
    }
}
