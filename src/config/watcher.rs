//! Route file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by renaming a temporary file over the original still trigger a
//! reload. Events for other files in that directory are ignored, as are saves
//! that leave the file text unchanged.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::RouterConfig;

/// Watches one config file and forwards every valid new version of it.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<RouterConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for validated configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RouterConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, rx)
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let target = self.path.clone();
        let directory = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        // text of the last config forwarded, seeded with the file as it is now
        let last_text = Arc::new(Mutex::new(std::fs::read_to_string(&target).ok()));
        let updates = self.updates;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &target) => {
                    reload_if_changed(&target, &last_text, &updates);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p.file_name() == target.file_name())
}

fn reload_if_changed(
    target: &Path,
    last_text: &Mutex<Option<String>>,
    updates: &mpsc::UnboundedSender<RouterConfig>,
) {
    let text = match std::fs::read_to_string(target) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = ?target, error = %e, "Config file unreadable, keeping current routes");
            return;
        }
    };

    let Ok(mut last) = last_text.lock() else { return };
    if last.as_deref() == Some(text.as_str()) {
        tracing::debug!(path = ?target, "Config file saved without changes");
        return;
    }

    match parse_config(&text) {
        Ok(config) => {
            tracing::info!(path = ?target, routes = config.routes.len(), "Config file changed, reloading");
            *last = Some(text);
            let _ = updates.send(config);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current routes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    #[test]
    fn test_only_events_for_the_config_file_count() {
        let target = Path::new("/etc/router/routes.toml");
        let event = |kind, path: &str| Event::new(kind).add_path(PathBuf::from(path));

        assert!(touches(&event(EventKind::Modify(ModifyKind::Any), "/etc/router/routes.toml"), target));
        assert!(touches(&event(EventKind::Create(CreateKind::File), "/etc/router/routes.toml"), target));
        assert!(!touches(&event(EventKind::Modify(ModifyKind::Any), "/etc/router/other.toml"), target));
        assert!(!touches(&event(EventKind::Any, "/etc/router/routes.toml"), target));
    }

    #[test]
    fn test_unchanged_or_invalid_text_is_not_forwarded() {
        let dir = std::env::temp_dir().join(format!("tree-router-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let target = dir.join("routes.toml");
        let text = "[[routes]]\ntemplate = \"a/{id}\"\n";
        std::fs::write(&target, text).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let last = Mutex::new(Some(text.to_string()));
        reload_if_changed(&target, &last, &tx);
        assert!(rx.try_recv().is_err());

        std::fs::write(&target, "[[routes]]\ntemplate = \"a/{id\"\n").unwrap();
        reload_if_changed(&target, &last, &tx);
        assert!(rx.try_recv().is_err());

        std::fs::write(&target, "[[routes]]\ntemplate = \"b/{id}\"\n").unwrap();
        reload_if_changed(&target, &last, &tx);
        assert_eq!(rx.try_recv().unwrap().routes[0].template, "b/{id}");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
