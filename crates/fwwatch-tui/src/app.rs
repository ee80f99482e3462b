//! Application core: event loop, action dispatch, footer.

use std::sync::Arc;
use std::time::Instant;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fwwatch_core::{DashboardConfig, EventStore, TailConfig, export_snapshot};

use crate::action::{Action, Notification, NotificationLevel};
use crate::bridge::run_tail_bridge;
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screens::DashboardScreen;
use crate::theme;
use crate::tui::Tui;

/// Top-level application state and event loop.
pub struct App {
    store: Arc<EventStore>,
    tail: TailConfig,
    settings: DashboardConfig,
    dashboard: DashboardScreen,
    /// Whether the app should keep running.
    running: bool,
    /// Footer message and the instant it stops being shown.
    notice: Option<(Notification, Instant)>,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(store: Arc<EventStore>, tail: TailConfig, settings: DashboardConfig) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let dashboard = DashboardScreen::new(tail.path.clone(), settings.top_n);

        Self {
            store,
            tail,
            settings,
            dashboard,
            running: true,
            notice: None,
            action_tx,
            action_rx,
        }
    }

    /// Run the main event loop until the operator quits.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        let cancel = CancellationToken::new();
        let bridge = tokio::spawn(run_tail_bridge(
            self.tail.clone(),
            Arc::clone(&self.store),
            self.action_tx.clone(),
            cancel.clone(),
        ));

        let mut events = EventReader::new(self.settings.refresh_interval);
        info!(path = %self.tail.path.display(), "dashboard event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
            }

            self.drain_actions()?;
            if self.running {
                tui.draw(|frame| self.render(frame))?;
            }
        }

        events.stop();
        cancel.cancel();
        if let Err(e) = bridge.await {
            warn!(error = %e, "tail bridge task failed");
        }
        tui.exit();
        info!("dashboard event loop ended");
        Ok(())
    }

    /// Process every queued action, including follow-ups they produce.
    fn drain_actions(&mut self) -> Result<()> {
        while let Ok(action) = self.action_rx.try_recv() {
            self.process_action(&action)?;
        }
        Ok(())
    }

    /// Global keys first; everything else goes to the dashboard.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c'))
            | (KeyModifiers::NONE, KeyCode::Char('q')) => Ok(Some(Action::Quit)),
            _ => self.dashboard.handle_key_event(key),
        }
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => {
                debug!("quit requested");
                self.running = false;
            }
            Action::Tick => {
                self.expire_notice(Instant::now());
                self.publish_snapshot()?;
            }
            Action::ClearCounts => {
                self.store.clear_counts();
                self.publish_snapshot()?;
            }
            Action::Export => {
                let notice = self.export();
                self.action_tx.send(Action::Notify(notice))?;
            }
            Action::Notify(notification) => {
                let until = Instant::now() + self.settings.notice_duration;
                self.notice = Some((notification.clone(), until));
            }
            Action::Resize(..) | Action::StoreUpdated(_) | Action::TailStateChanged(_) => {}
        }

        if let Some(follow_up) = self.dashboard.update(action)? {
            self.action_tx.send(follow_up)?;
        }
        Ok(())
    }

    fn publish_snapshot(&self) -> Result<()> {
        let snapshot = Arc::new(self.store.snapshot());
        self.action_tx.send(Action::StoreUpdated(snapshot))?;
        Ok(())
    }

    fn export(&self) -> Notification {
        let snapshot = self.store.snapshot();
        match export_snapshot(&snapshot, &self.settings.export_dir) {
            Ok(path) => Notification::success(format!("Snapshot saved to {}", path.display())),
            Err(e) => {
                warn!(error = %e, "snapshot export failed");
                Notification::error(format!("Export failed: {e}"))
            }
        }
    }

    fn expire_notice(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|(_, until)| now >= *until) {
            self.notice = None;
        }
    }

    fn render(&self, frame: &mut Frame) {
        let [body, footer] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

        self.dashboard.render(frame, body);
        self.render_status_bar(frame, footer);
    }

    /// Footer: the transient notice if one is live, otherwise the key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let line = if let Some((notice, _)) = &self.notice {
            let color = match notice.level {
                NotificationLevel::Success => theme::SUCCESS_GREEN,
                NotificationLevel::Error => theme::ERROR_RED,
            };
            Line::from(vec![
                Span::raw(" "),
                Span::styled(notice.message.clone(), Style::default().fg(color)),
            ])
        } else {
            Line::from(vec![
                Span::styled(" Commands: ", theme::key_hint()),
                Span::styled("q", theme::key_hint_key()),
                Span::styled("=quit  ", theme::key_hint()),
                Span::styled("c", theme::key_hint_key()),
                Span::styled("=clear counters  ", theme::key_hint()),
                Span::styled("e", theme::key_hint_key()),
                Span::styled("=export snapshot", theme::key_hint()),
            ])
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}
