use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};

#[derive(Debug)]
pub enum WatchMessage {
    Changed(String),
    Error(String),
}

/// Keeps the watcher alive alongside the channel it reports on.
pub struct DocumentWatch {
    _watcher: RecommendedWatcher,
    rx: Receiver<WatchMessage>,
}

impl DocumentWatch {
    pub fn start(path: &Path) -> notify::Result<Self> {
        let (watcher, rx) = start(path)?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Drains pending messages and returns the newest document text, if any.
    pub fn latest(&self) -> Option<String> {
        let mut latest = None;
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                WatchMessage::Changed(text) => latest = Some(text),
                WatchMessage::Error(err) => tracing::warn!(%err, "watch error"),
            }
        }
        latest
    }
}

pub fn start(path: &Path) -> notify::Result<(RecommendedWatcher, Receiver<WatchMessage>)> {
    let watched_path = path.to_path_buf();
    let (tx, rx) = mpsc::channel();

    let mut watcher = recommended_watcher(move |result: notify::Result<Event>| match result {
        Ok(event) => {
            if !is_relevant(&event.kind) {
                return;
            }

            if !event
                .paths
                .iter()
                .any(|event_path| same_file(event_path, &watched_path))
            {
                return;
            }

            match fs::read(&watched_path) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    let _ = tx.send(WatchMessage::Changed(text));
                }
                Err(err) => {
                    let _ = tx.send(WatchMessage::Error(err.to_string()));
                }
            }
        }
        Err(err) => {
            let _ = tx.send(WatchMessage::Error(err.to_string()));
        }
    })?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;
    tracing::debug!(path = %path.display(), "watching document");
    Ok((watcher, rx))
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_) | EventKind::Create(_))
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }

    let ca = canonical(a);
    let cb = canonical(b);
    ca == cb && ca.is_some()
}

fn canonical(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

    use notify::EventKind;
    use notify::event::{CreateKind, RemoveKind};

    use super::{DocumentWatch, WatchMessage, is_relevant, same_file, start};

    fn temp_path(name: &str) -> std::path::PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("mdr-watch-{name}-{stamp}.md"))
    }

    #[test]
    fn watcher_emits_changed_document() {
        let path = temp_path("emit");
        std::fs::write(&path, "old").expect("seed file");
        let (_watcher, rx) = start(&path).expect("start watcher");
        std::fs::write(&path, "new").expect("write update");

        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            if Instant::now() > deadline {
                panic!("watcher timeout");
            }

            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(WatchMessage::Changed(content)) => {
                    if content == "new" {
                        break;
                    }
                }
                Ok(WatchMessage::Error(err)) => panic!("watch error: {err}"),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(err) => panic!("channel error: {err}"),
            }
        }

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn document_watch_keeps_newest_change() {
        let path = temp_path("latest");
        std::fs::write(&path, "v0").expect("seed file");
        let watch = DocumentWatch::start(&path).expect("start watcher");
        assert_eq!(watch.latest(), None);

        std::fs::write(&path, "v1").expect("write v1");
        std::fs::write(&path, "v2").expect("write v2");

        let deadline = Instant::now() + Duration::from_secs(3);
        let mut seen = None;
        while Instant::now() < deadline {
            if let Some(text) = watch.latest() {
                seen = Some(text);
                if seen.as_deref() == Some("v2") {
                    break;
                }
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(seen.as_deref(), Some("v2"));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn start_fails_for_missing_path() {
        assert!(start(&temp_path("missing")).is_err());
    }

    #[test]
    fn relevance_and_identity_helpers() {
        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
        assert!(!is_relevant(&EventKind::Remove(RemoveKind::File)));

        let path = temp_path("same");
        assert!(same_file(&path, &path));
        assert!(!same_file(&path, &temp_path("other")));
    }
}
