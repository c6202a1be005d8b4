//! Dev session state machine
//!
//! One tokio task owns all server state. Everything else (the watcher
//! thread, per-connection socket tasks, debounce timers, the reconnect tick)
//! talks to it through [`Event`] values over a channel, so the client set,
//! the pending-change set, and the debounce counter are only ever touched
//! from one place.
//!
//! Debounce is a sliding window: every qualifying change schedules a timer
//! and bumps a counter; a firing timer decrements it and only the one that
//! brings it to zero flushes. Changes that land while no client is attached
//! skip the timers entirely and are pushed as a backlog to the first client
//! that connects.

use crate::config::{DevServerConfig, ServerMode};
use crate::protocol::{Payload, ServerMessage};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Identifier handed to each accepted connection
pub type ClientId = usize;

/// Inputs to the session loop
#[derive(Debug)]
pub enum Event {
    /// A connection completed its handshake
    Connected {
        id: ClientId,
        tx: mpsc::UnboundedSender<Payload>,
    },
    /// A connection closed (cleanly or not)
    Disconnected { id: ClientId },
    /// A message arrived from a connected client
    Incoming { id: ClientId, payload: Payload },
    /// The watcher observed a filesystem change
    FileChanged { path: PathBuf },
    /// A debounce timer elapsed
    FlushTimer,
    /// Periodic tick used to restore adb port forwarding while disconnected
    ReconnectTick,
}

/// All state of a running dev server
pub struct DevSession {
    mode: ServerMode,
    port: u16,
    adb_reverse: bool,
    source_root: PathBuf,
    reload_delay: std::time::Duration,
    watch_extensions: Vec<String>,
    clients: HashMap<ClientId, mpsc::UnboundedSender<Payload>>,
    pending: HashSet<PathBuf>,
    pending_timers: usize,
    flushing: bool,
    events: mpsc::Sender<Event>,
}

impl DevSession {
    /// Build a session plus the channel feeding it
    pub fn new(config: &DevServerConfig) -> (Self, mpsc::Sender<Event>, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(256);
        let session = Self {
            mode: config.mode,
            port: config.port,
            adb_reverse: config.adb_reverse,
            source_root: config.source_root.clone(),
            reload_delay: config.reload_delay,
            watch_extensions: config.watch_extensions.clone(),
            clients: HashMap::new(),
            pending: HashSet::new(),
            pending_timers: 0,
            flushing: false,
            events: tx.clone(),
        };
        (session, tx, rx)
    }

    /// Drive the session until every event sender is gone
    pub async fn run(mut self, mut rx: mpsc::Receiver<Event>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Apply one event to the session state
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected { id, tx } => self.on_connected(id, tx),
            Event::Disconnected { id } => self.on_disconnected(id),
            Event::Incoming { id, payload } => self.on_incoming(id, payload),
            Event::FileChanged { path } => self.on_file_changed(path),
            Event::FlushTimer => self.on_flush_timer(),
            Event::ReconnectTick => self.on_reconnect_tick(),
        }
    }

    fn on_connected(&mut self, id: ClientId, tx: mpsc::UnboundedSender<Payload>) {
        tracing::info!("client {} connected", id);
        self.clients.insert(id, tx);
        self.pending_timers = 0;

        // Changes that piled up while nobody was attached go out right away.
        if !self.pending.is_empty() {
            self.flush();
        }
    }

    fn on_disconnected(&mut self, id: ClientId) {
        if self.clients.remove(&id).is_some() {
            tracing::info!("client {} left", id);
        }
    }

    fn on_incoming(&mut self, id: ClientId, payload: Payload) {
        match self.mode {
            ServerMode::Forwarding => {
                let failed: Vec<ClientId> = self
                    .clients
                    .iter()
                    .filter(|(other, _)| **other != id)
                    .filter_map(|(other, tx)| tx.send(payload.clone()).is_err().then_some(*other))
                    .collect();
                for other in failed {
                    self.on_disconnected(other);
                }
            }
            ServerMode::Normal => match payload {
                Payload::Text(text) => tracing::info!("client {}: {}", id, text),
                Payload::Binary(bytes) => {
                    tracing::debug!("client {} sent {} bytes", id, bytes.len());
                }
            },
        }
    }

    fn on_file_changed(&mut self, path: PathBuf) {
        if !self.is_watched(&path) {
            return;
        }
        if self.clients.is_empty() {
            tracing::debug!("{} changed, waiting for a client", path.display());
            self.pending.insert(path);
            return;
        }
        tracing::debug!("{} changed", path.display());
        self.pending.insert(path);

        self.pending_timers += 1;
        let events = self.events.clone();
        let delay = self.reload_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::FlushTimer).await;
        });
    }

    fn on_flush_timer(&mut self) {
        self.pending_timers = self.pending_timers.saturating_sub(1);
        if self.pending_timers > 0 {
            // More changes arrived inside the window; their timer flushes.
            return;
        }
        if self.flushing {
            return;
        }
        self.flush();
    }

    /// Read every pending file and push one reload message to all clients.
    ///
    /// The pending set clears unconditionally: with no clients attached the
    /// changes are dropped, not replayed later. Unreadable files are skipped
    /// without aborting the push.
    fn flush(&mut self) {
        self.flushing = true;

        let mut files = BTreeMap::new();
        for path in std::mem::take(&mut self.pending) {
            match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    let key = path
                        .strip_prefix(&self.source_root)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .into_owned();
                    files.insert(key, contents);
                }
                Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
            }
        }

        if !files.is_empty() && !self.clients.is_empty() {
            tracing::info!(
                "reloading: {}",
                files.keys().cloned().collect::<Vec<_>>().join(", ")
            );
            let payload = Payload::Text(ServerMessage::Reload { files }.to_json());
            let failed: Vec<ClientId> = self
                .clients
                .iter()
                .filter_map(|(id, tx)| tx.send(payload.clone()).is_err().then_some(*id))
                .collect();
            for id in failed {
                self.on_disconnected(id);
            }
        }

        self.flushing = false;
    }

    fn on_reconnect_tick(&self) {
        if !self.adb_reverse || !self.clients.is_empty() {
            return;
        }
        let port = self.port;
        tokio::task::spawn_blocking(move || {
            // Best effort; there may simply be no device attached yet.
            let _ = pynative_android::adb::reverse(port);
        });
    }

    fn is_watched(&self, path: &std::path::Path) -> bool {
        path.extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .is_some_and(|ext| self.watch_extensions.contains(&ext))
    }

    /// Number of currently connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    fn test_config(root: &Path) -> DevServerConfig {
        DevServerConfig {
            port: 8888,
            mode: ServerMode::Normal,
            source_root: root.to_path_buf(),
            reload_delay: Duration::from_millis(1000),
            watch_extensions: vec![".py".to_string()],
            adb_reverse: false,
        }
    }

    fn connect(
        session: &mut DevSession,
        id: ClientId,
    ) -> mpsc::UnboundedReceiver<Payload> {
        let (tx, rx) = mpsc::unbounded_channel();
        session.handle_event(Event::Connected { id, tx });
        rx
    }

    fn reload_files(payload: &Payload) -> BTreeMap<String, String> {
        let Payload::Text(json) = payload else {
            panic!("expected text payload");
        };
        match serde_json::from_str(json).unwrap() {
            ServerMessage::Reload { files } => files,
        }
    }

    #[tokio::test]
    async fn test_repeated_changes_in_window_flush_once() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("view.py");
        std::fs::write(&view, "v2").unwrap();

        let (mut session, _tx, _rx) = DevSession::new(&test_config(dir.path()));
        let mut client = connect(&mut session, 1);

        // Three notifications for the same path inside the window.
        for _ in 0..3 {
            session.handle_event(Event::FileChanged { path: view.clone() });
        }
        assert_eq!(session.pending_timers, 3);

        // The first two timers are superseded by the reset; only the last
        // one flushes.
        session.handle_event(Event::FlushTimer);
        session.handle_event(Event::FlushTimer);
        assert!(client.try_recv().is_err());
        session.handle_event(Event::FlushTimer);

        let files = reload_files(&client.try_recv().unwrap());
        assert_eq!(files.len(), 1);
        assert_eq!(files.get("view.py").map(String::as_str), Some("v2"));
        assert!(client.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unwatched_extension_causes_no_transition() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "ignored").unwrap();

        let (mut session, _tx, _rx) = DevSession::new(&test_config(dir.path()));
        let mut client = connect(&mut session, 1);

        session.handle_event(Event::FileChanged { path: notes });
        assert!(session.pending.is_empty());
        assert_eq!(session.pending_timers, 0);

        // Even a stray timer firing finds nothing to push.
        session.handle_event(Event::FlushTimer);
        assert!(client.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_two_files_in_window_share_one_reload() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("view.py");
        let widget = dir.path().join("widget.py");
        std::fs::write(&view, "view body").unwrap();
        std::fs::write(&widget, "widget body").unwrap();

        let (mut session, _tx, _rx) = DevSession::new(&test_config(dir.path()));
        let mut client = connect(&mut session, 1);

        session.handle_event(Event::FileChanged { path: view });
        session.handle_event(Event::FileChanged { path: widget });
        session.handle_event(Event::FlushTimer);
        session.handle_event(Event::FlushTimer);

        let files = reload_files(&client.try_recv().unwrap());
        assert_eq!(files.len(), 2);
        assert_eq!(files.get("view.py").map(String::as_str), Some("view body"));
        assert_eq!(
            files.get("widget.py").map(String::as_str),
            Some("widget body")
        );
        assert!(client.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_flush_with_no_clients_discards_changes() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("view.py");
        std::fs::write(&view, "v1").unwrap();

        let (mut session, _tx, _rx) = DevSession::new(&test_config(dir.path()));
        let _client_a = connect(&mut session, 1);

        session.handle_event(Event::FileChanged { path: view });
        session.handle_event(Event::Disconnected { id: 1 });
        session.handle_event(Event::FlushTimer);
        assert!(session.pending.is_empty());

        // A later client does not see the discarded changes.
        let mut client_b = connect(&mut session, 2);
        assert!(client_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_backlog_flushes_to_first_client() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("view.py");
        std::fs::write(&view, "offline edit").unwrap();

        let (mut session, _tx, _rx) = DevSession::new(&test_config(dir.path()));

        // No client attached: recorded, but no timer scheduled.
        session.handle_event(Event::FileChanged { path: view });
        assert_eq!(session.pending_timers, 0);
        assert_eq!(session.pending.len(), 1);

        let mut client = connect(&mut session, 1);
        let files = reload_files(&client.try_recv().unwrap());
        assert_eq!(files.get("view.py").map(String::as_str), Some("offline edit"));
        assert!(session.pending.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_pending_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("view.py");
        let gone = dir.path().join("gone.py");
        std::fs::write(&view, "kept").unwrap();
        std::fs::write(&gone, "doomed").unwrap();

        let (mut session, _tx, _rx) = DevSession::new(&test_config(dir.path()));
        let mut client = connect(&mut session, 1);

        session.handle_event(Event::FileChanged { path: view });
        session.handle_event(Event::FileChanged { path: gone.clone() });
        std::fs::remove_file(&gone).unwrap();

        session.handle_event(Event::FlushTimer);
        session.handle_event(Event::FlushTimer);

        let files = reload_files(&client.try_recv().unwrap());
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("view.py"));
    }

    #[tokio::test]
    async fn test_forwarding_relays_to_all_but_sender() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.mode = ServerMode::Forwarding;

        let (mut session, _tx, _rx) = DevSession::new(&config);
        let mut a = connect(&mut session, 1);
        let mut b = connect(&mut session, 2);
        let mut c = connect(&mut session, 3);

        session.handle_event(Event::Incoming {
            id: 1,
            payload: Payload::Text("breakpoint hit".to_string()),
        });

        assert!(a.try_recv().is_err());
        assert_eq!(
            b.try_recv().unwrap(),
            Payload::Text("breakpoint hit".to_string())
        );
        assert_eq!(
            c.try_recv().unwrap(),
            Payload::Text("breakpoint hit".to_string())
        );
    }

    #[tokio::test]
    async fn test_normal_mode_logs_instead_of_forwarding() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _tx, _rx) = DevSession::new(&test_config(dir.path()));
        let _a = connect(&mut session, 1);
        let mut b = connect(&mut session, 2);

        session.handle_event(Event::Incoming {
            id: 1,
            payload: Payload::Text("hello server".to_string()),
        });

        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_failure_drops_client_without_aborting_push() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("view.py");
        std::fs::write(&view, "v1").unwrap();

        let (mut session, _tx, _rx) = DevSession::new(&test_config(dir.path()));
        let dead = connect(&mut session, 1);
        drop(dead);
        let mut live = connect(&mut session, 2);

        session.handle_event(Event::FileChanged { path: view });
        session.handle_event(Event::FlushTimer);

        assert!(live.try_recv().is_ok());
        assert_eq!(session.client_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sliding_window_through_the_event_loop() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("view.py");
        let widget = dir.path().join("widget.py");
        std::fs::write(&view, "view body").unwrap();
        std::fs::write(&widget, "widget body").unwrap();

        let (session, tx, rx) = DevSession::new(&test_config(dir.path()));
        tokio::spawn(session.run(rx));

        let (client_tx, mut client_rx) = mpsc::unbounded_channel();
        tx.send(Event::Connected { id: 1, tx: client_tx }).await.unwrap();

        tx.send(Event::FileChanged { path: view }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(Event::FileChanged { path: widget }).await.unwrap();

        // One second after the *last* change, exactly one reload arrives.
        tokio::time::sleep(Duration::from_millis(2000)).await;
        let files = reload_files(&client_rx.recv().await.unwrap());
        assert_eq!(files.len(), 2);
        assert!(client_rx.try_recv().is_err());
    }
}
