use depwalk_core::{AnalysisConfig, MANIFEST_FILE_NAME, is_in_ignored_dir};
use log::trace;
use path_clean::clean;
use serde::Serialize;
use std::{
    path::Path,
    sync::{
        Mutex,
        mpsc::{self, Receiver, Sender},
    },
};

/// Whether a change to `path` can alter a graph analyzed with `config`.
///
/// Source files with a configured extension, manifests and the tsconfig
/// count. Anything inside an ignored directory does not.
pub fn is_relevant_change(config: &AnalysisConfig, path: &Path) -> bool {
    let path = clean(path);
    if path == config.tsconfig_path() {
        return true;
    }
    if is_in_ignored_dir(&config.cwd, &path, &config.ignore_dirs) {
        return false;
    }
    config.supports_file(&path) || path.file_name().is_some_and(|n| n == MANIFEST_FILE_NAME)
}

/// Emitted after a re-analysis triggered by file changes has been committed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesDetected {
    pub changed_files: Vec<String>,
    /// Configuration, aliases or manifests changed and nothing was reused.
    pub configuration_changed: bool,
    pub files_reanalyzed: usize,
    pub files_reused: usize,
    pub total_files: usize,
}

/// Fan-out of [`ChangesDetected`] events to any number of subscribers.
#[derive(Debug, Default)]
pub struct WatchEmitter {
    subscribers: Mutex<Vec<Sender<ChangesDetected>>>,
}

impl WatchEmitter {
    pub fn subscribe(&self) -> Receiver<ChangesDetected> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner()).push(tx);
        rx
    }

    /// Send `event` to every live subscriber, dropping the ones that hung up.
    pub fn emit(&self, event: &ChangesDetected) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        trace!("Delivered change event to {} subscribers", subscribers.len());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
