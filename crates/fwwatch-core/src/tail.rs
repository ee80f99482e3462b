//! Cooperative polling tail of a single append-only log file.
//!
//! The [`Tailer`] waits for its file to exist, seeks to the end, and then
//! hands every newly completed line to a callback. It polls instead of using
//! filesystem notifications so that a file that is missing, truncated, or
//! replaced under it never ends the tail. Cancellation is checked at the top
//! of every wait and read, so shutdown takes at most one poll interval.

use std::io::{ErrorKind, SeekFrom};
use std::path::Path;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TailConfig;

/// Lifecycle of a [`Tailer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// The file does not exist (or cannot be opened) yet.
    WaitingForFile,
    /// The file is open and new lines are being delivered.
    Following,
    /// Cancelled. Terminal.
    Stopped,
}

/// Follows one file and delivers appended lines in order.
pub struct Tailer {
    config: TailConfig,
    cancel: CancellationToken,
    state: watch::Sender<TailState>,
}

impl Tailer {
    /// Create a tailer that stops when `cancel` fires.
    pub fn new(config: TailConfig, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(TailState::WaitingForFile);
        Self {
            config,
            cancel,
            state,
        }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Watch state transitions (the dashboard shows them in its header).
    pub fn subscribe_state(&self) -> watch::Receiver<TailState> {
        self.state.subscribe()
    }

    /// Request a stop. Takes effect within one poll interval.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Run the tail on a background task.
    pub fn spawn<F>(self, on_line: F) -> JoinHandle<()>
    where
        F: FnMut(String) + Send + 'static,
    {
        tokio::spawn(async move { self.run(on_line).await })
    }

    /// Tail until cancelled, invoking `on_line` synchronously for each line.
    ///
    /// Lines are stripped of surrounding whitespace; invalid UTF-8 is
    /// replaced with U+FFFD. Content present before the file was opened is
    /// never delivered.
    pub async fn run<F>(&self, mut on_line: F)
    where
        F: FnMut(String),
    {
        if let Some((file, offset)) = self.wait_for_file().await {
            self.follow(file, offset, &mut on_line).await;
        }
        self.set_state(TailState::Stopped);
        info!(path = %self.config.path.display(), "tailer stopped");
    }

    // ── Phases ───────────────────────────────────────────────────────

    /// Poll until the file can be opened. Returns the handle positioned at
    /// end-of-file, or `None` if cancelled first.
    async fn wait_for_file(&self) -> Option<(File, u64)> {
        self.set_state(TailState::WaitingForFile);
        let path = &self.config.path;
        let mut reported = false;

        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            match File::open(path).await {
                Ok(mut file) => match file.seek(SeekFrom::End(0)).await {
                    Ok(offset) => return Some((file, offset)),
                    Err(e) => {
                        if !reported {
                            warn!(path = %path.display(), error = %e, "cannot seek log file");
                            reported = true;
                        }
                    }
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    if !reported {
                        info!(path = %path.display(), "waiting for log file to appear");
                        reported = true;
                    }
                }
                Err(e) => {
                    if !reported {
                        let hint = if e.kind() == ErrorKind::PermissionDenied {
                            " (try running as root)"
                        } else {
                            ""
                        };
                        warn!(path = %path.display(), error = %e, "cannot open log file{hint}");
                        reported = true;
                    }
                }
            }

            if !self.pause(self.config.wait_interval).await {
                return None;
            }
        }
    }

    async fn follow<F>(&self, file: File, offset: u64, on_line: &mut F)
    where
        F: FnMut(String),
    {
        self.set_state(TailState::Following);
        info!(path = %self.config.path.display(), offset, "following log file");

        let mut reader = BufReader::new(file);
        let mut position = offset;
        // Bytes of a line whose newline has not been written yet.
        let mut pending: Vec<u8> = Vec::new();
        // Read errors are logged once until a read succeeds again.
        let mut read_error_reported = false;

        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            match reader.read_until(b'\n', &mut pending).await {
                Ok(0) => {
                    if self.was_truncated(position).await {
                        if let Ok(file) = File::open(&self.config.path).await {
                            warn!(
                                path = %self.config.path.display(),
                                "log file shrank, reading from the start"
                            );
                            reader = BufReader::new(file);
                            position = 0;
                            pending.clear();
                            continue;
                        }
                    }
                    if !self.pause(self.config.poll_interval).await {
                        return;
                    }
                }
                Ok(read) => {
                    read_error_reported = false;
                    position = position.saturating_add(u64::try_from(read).unwrap_or(u64::MAX));
                    if pending.last() == Some(&b'\n') {
                        let line = String::from_utf8_lossy(&pending).trim().to_owned();
                        pending.clear();
                        on_line(line);
                    }
                }
                Err(e) => {
                    if !read_error_reported {
                        warn!(path = %self.config.path.display(), error = %e, "log read failed");
                        read_error_reported = true;
                    }
                    if !self.pause(self.config.poll_interval).await {
                        return;
                    }
                }
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Sleep for `interval`. Returns `false` if cancelled meanwhile.
    async fn pause(&self, interval: Duration) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(interval) => true,
        }
    }

    /// Whether the file at our path is now shorter than what we have read.
    async fn was_truncated(&self, position: u64) -> bool {
        tokio::fs::metadata(&self.config.path)
            .await
            .is_ok_and(|meta| meta.len() < position)
    }

    fn set_state(&self, state: TailState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = ?*current, to = ?state, "tail state changed");
            *current = state;
            true
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;

    const DEADLINE: Duration = Duration::from_secs(5);

    fn fast_config(path: PathBuf) -> TailConfig {
        TailConfig {
            path,
            wait_interval: Duration::from_millis(10),
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Log sink shared with a test subscriber.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn append(path: &Path, bytes: &[u8]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
    }

    struct Running {
        lines: mpsc::UnboundedReceiver<String>,
        state: watch::Receiver<TailState>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    }

    fn start(path: PathBuf) -> Running {
        let cancel = CancellationToken::new();
        let tailer = Tailer::new(fast_config(path), cancel.clone());
        let state = tailer.subscribe_state();
        let (tx, lines) = mpsc::unbounded_channel();
        let task = tailer.spawn(move |line| {
            let _ = tx.send(line);
        });
        Running {
            lines,
            state,
            cancel,
            task,
        }
    }

    impl Running {
        async fn until(&mut self, wanted: TailState) {
            timeout(DEADLINE, self.state.wait_for(|s| *s == wanted))
                .await
                .unwrap()
                .unwrap();
        }

        async fn next_line(&mut self) -> String {
            timeout(DEADLINE, self.lines.recv()).await.unwrap().unwrap()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn delivers_only_lines_appended_after_attach() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firewall.log");
        append(&path, b"old line 1\nold line 2\n");

        let mut run = start(path.clone());
        run.until(TailState::Following).await;

        append(&path, b"  new line 1  \nnew line 2\n");
        assert_eq!(run.next_line().await, "new line 1");
        assert_eq!(run.next_line().await, "new line 2");

        run.cancel.cancel();
        run.task.await.unwrap();
        assert!(run.lines.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waits_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.log");

        let mut run = start(path.clone());
        run.until(TailState::WaitingForFile).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*run.state.borrow(), TailState::WaitingForFile);

        append(&path, b"");
        run.until(TailState::Following).await;
        append(&path, b"FW-DROP-SSH: hello\n");
        assert_eq!(run.next_line().await, "FW-DROP-SSH: hello");

        run.cancel.cancel();
        run.task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn partial_lines_are_joined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firewall.log");
        append(&path, b"");

        let mut run = start(path.clone());
        run.until(TailState::Following).await;

        append(&path, b"FW-DROP-SSH: SRC=10.");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(run.lines.try_recv().is_err());

        append(&path, b"0.0.5 DST=10.0.0.1\n");
        assert_eq!(run.next_line().await, "FW-DROP-SSH: SRC=10.0.0.5 DST=10.0.0.1");

        run.cancel.cancel();
        run.task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firewall.log");
        append(&path, b"");

        let mut run = start(path.clone());
        run.until(TailState::Following).await;

        append(&path, b"FW-DROP-X: \xff\xfe bad bytes\nnext\n");
        assert_eq!(run.next_line().await, "FW-DROP-X: \u{fffd}\u{fffd} bad bytes");
        assert_eq!(run.next_line().await, "next");

        run.cancel.cancel();
        run.task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn follows_file_after_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firewall.log");
        append(&path, "x".repeat(512).as_bytes());
        append(&path, b"\n");

        let mut run = start(path.clone());
        run.until(TailState::Following).await;

        std::fs::write(&path, b"after rotate\n").unwrap();
        assert_eq!(run.next_line().await, "after rotate");

        run.cancel.cancel();
        run.task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_is_observed_while_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = start(dir.path().join("never.log"));
        run.until(TailState::WaitingForFile).await;

        run.cancel.cancel();
        timeout(DEADLINE, run.task).await.unwrap().unwrap();
        assert_eq!(*run.state.borrow(), TailState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_is_observed_while_following() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firewall.log");
        append(&path, b"");

        let cancel = CancellationToken::new();
        let tailer = Tailer::new(fast_config(path), cancel);
        let mut state = tailer.subscribe_state();
        let tailer = std::sync::Arc::new(tailer);
        let task = {
            let tailer = std::sync::Arc::clone(&tailer);
            tokio::spawn(async move { tailer.run(|_| {}).await })
        };

        timeout(DEADLINE, state.wait_for(|s| *s == TailState::Following))
            .await
            .unwrap()
            .unwrap();
        tailer.stop();
        timeout(DEADLINE, task).await.unwrap().unwrap();
        assert_eq!(*state.borrow(), TailState::Stopped);
    }

    #[tokio::test]
    async fn persistent_errors_are_logged_once() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        // A directory opens but never reads (or seeks) as a log file.
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let tailer = Tailer::new(fast_config(dir.path().to_path_buf()), cancel.clone());

        let stop_later = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        };
        timeout(DEADLINE, async { tokio::join!(tailer.run(|_| {}), stop_later) })
            .await
            .unwrap();

        let logs = captured.text();
        assert_eq!(logs.matches("WARN").count(), 1, "logs:\n{logs}");
    }
}
