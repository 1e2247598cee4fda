//! Notify-backed watch source bridged into a tokio channel.
//!
//! # Design
//! - The notify callback runs on the watcher's own thread; it only converts
//!   and forwards events, never touching the filesystem.
//! - An unbounded channel is acceptable here: discovery events are tiny and
//!   the dispatcher drains them continuously.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::{WatchError, WatchResult};

/// How a path came to the pipeline's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    /// The file was newly created under the watch root.
    Created,
    /// The file was renamed or moved to this path.
    Moved,
}

/// A path that may now contain a complete media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    /// Discovered path. For renames this is the destination side.
    pub path: PathBuf,
    /// How the path was discovered.
    pub kind: DiscoveryKind,
}

/// Live watch stream over a directory tree.
///
/// Dropping the source stops the underlying platform watcher.
pub struct WatchSource {
    // Held only to keep the platform watcher registered.
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<DiscoveryEvent>,
}

impl WatchSource {
    /// Start watching `root` recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or the
    /// root cannot be registered.
    pub fn start(root: &Path) -> WatchResult<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    for discovery in convert_event(event) {
                        debug!(path = %discovery.path.display(), kind = ?discovery.kind, "discovery event");
                        if sender.send(discovery).is_err() {
                            // Receiver dropped during shutdown.
                            return;
                        }
                    }
                }
                Err(err) => error!(error = %err, "filesystem watch error"),
            },
            Config::default(),
        )
        .map_err(|source| WatchError::Create { source })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: root.to_path_buf(),
                source,
            })?;

        Ok(Self {
            _watcher: watcher,
            receiver,
        })
    }

    /// Receive the next discovery event, or `None` once the watcher thread
    /// has shut down.
    pub async fn recv(&mut self) -> Option<DiscoveryEvent> {
        self.receiver.recv().await
    }
}

/// Convert a raw notify event into zero or more discovery events.
fn convert_event(event: Event) -> Vec<DiscoveryEvent> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|path| DiscoveryEvent {
                path,
                kind: DiscoveryKind::Created,
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .into_iter()
            .map(|path| DiscoveryEvent {
                path,
                kind: DiscoveryKind::Moved,
            })
            .collect(),
        // A combined rename carries [from, to]; only the destination can
        // hold a complete file.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .into_iter()
            .last()
            .map(|path| DiscoveryEvent {
                path,
                kind: DiscoveryKind::Moved,
            })
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}
