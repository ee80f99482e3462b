//! Dashboard screen: tail status, counters, and the recent-events table.

use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table},
};

use fwwatch_core::{StoreSnapshot, TailState};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

/// Column widths of the recent-events table, in characters.
const TIME_WIDTH: u16 = 19;
const PREFIX_WIDTH: usize = 18;
const SOURCE_WIDTH: usize = 21;
const PORT_WIDTH: usize = 5;
const PROTO_WIDTH: usize = 5;

/// Width reserved for a count in the summary columns.
const COUNT_WIDTH: usize = 7;

pub struct DashboardScreen {
    snapshot: Arc<StoreSnapshot>,
    tail_state: TailState,
    log_path: PathBuf,
    top_n: usize,
}

impl DashboardScreen {
    pub fn new(log_path: impl Into<PathBuf>, top_n: usize) -> Self {
        Self {
            snapshot: Arc::new(StoreSnapshot::default()),
            tail_state: TailState::WaitingForFile,
            log_path: log_path.into(),
            top_n,
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let (indicator, color) = match self.tail_state {
            TailState::Following => ("● following", theme::SUCCESS_GREEN),
            TailState::WaitingForFile => ("◐ waiting for", theme::ELECTRIC_YELLOW),
            TailState::Stopped => ("○ stopped", theme::ERROR_RED),
        };

        let line = Line::from(vec![
            Span::styled(
                " fwwatch ",
                Style::default()
                    .fg(theme::ELECTRIC_PURPLE)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("│ ", theme::key_hint()),
            Span::styled(indicator, Style::default().fg(color)),
            Span::raw(" "),
            Span::styled(
                self.log_path.display().to_string(),
                Style::default().fg(theme::DIM_WHITE),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_summary(&self, frame: &mut Frame, area: Rect) {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(area);

        let prefixes = count_lines(
            format!("Total events: {}", self.snapshot.total()),
            &self.snapshot.top_prefixes(self.top_n),
            left.width.saturating_sub(2),
            true,
        );
        frame.render_widget(
            Paragraph::new(prefixes).block(panel(" Top Prefixes ")),
            left,
        );

        let sources = count_lines(
            format!("Unique sources: {}", self.snapshot.source_counts.len()),
            &self.snapshot.top_sources(self.top_n),
            right.width.saturating_sub(2),
            false,
        );
        frame.render_widget(
            Paragraph::new(sources).block(panel(" Top Source IPs ")),
            right,
        );
    }

    fn render_events(&self, frame: &mut Frame, area: Rect) {
        let block = panel(" Recent Events ");
        let inner = block.inner(area);
        // One row of the inner area goes to the column header.
        let capacity = usize::from(inner.height.saturating_sub(1));

        let header = Row::new(
            ["TIME", "PREFIX", "SRC", "DPT", "PROTO"]
                .into_iter()
                .map(|h| Cell::from(h).style(theme::table_header())),
        );

        let rows = recent_rows(&self.snapshot, capacity)
            .into_iter()
            .map(|[time, prefix, src, dpt, proto]| {
                let color = theme::prefix_color(&prefix);
                Row::new(vec![
                    Cell::from(time),
                    Cell::from(prefix).style(Style::default().fg(color)),
                    Cell::from(src).style(Style::default().fg(theme::NEON_CYAN)),
                    Cell::from(dpt),
                    Cell::from(proto),
                ])
                .style(theme::table_row())
            });

        let table = Table::new(
            rows,
            [
                Constraint::Length(TIME_WIDTH),
                Constraint::Length(width(PREFIX_WIDTH)),
                Constraint::Length(width(SOURCE_WIDTH)),
                Constraint::Length(width(PORT_WIDTH)),
                Constraint::Length(width(PROTO_WIDTH)),
            ],
        )
        .header(header)
        .column_spacing(1)
        .block(block);

        frame.render_widget(table, area);
    }
}

impl Component for DashboardScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers != KeyModifiers::NONE {
            return Ok(None);
        }
        Ok(match key.code {
            KeyCode::Char('c') => Some(Action::ClearCounts),
            KeyCode::Char('e') => Some(Action::Export),
            _ => None,
        })
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::StoreUpdated(snapshot) => self.snapshot = Arc::clone(snapshot),
            Action::TailStateChanged(state) => self.tail_state = *state,
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let summary_height = u16::try_from(self.top_n)
            .unwrap_or(u16::MAX)
            .saturating_add(3);

        let [header, summary, events] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(summary_height),
            Constraint::Min(0),
        ])
        .areas(area);

        self.render_header(frame, header);
        self.render_summary(frame, summary);
        self.render_events(frame, events);
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_default())
}

/// A heading line followed by one `name … count` line per entry.
fn count_lines(
    heading: String,
    entries: &[(&str, u64)],
    width: u16,
    color_by_prefix: bool,
) -> Vec<Line<'static>> {
    let name_width = usize::from(width).saturating_sub(COUNT_WIDTH);
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(Line::styled(heading, theme::title_style()));

    for (name, count) in entries {
        let color = if color_by_prefix {
            theme::prefix_color(name)
        } else {
            theme::DIM_WHITE
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<name_width$}", clip(name, name_width)),
                Style::default().fg(color),
            ),
            Span::styled(
                format!("{count:>COUNT_WIDTH$}"),
                Style::default().fg(theme::NEON_CYAN),
            ),
        ]));
    }
    lines
}

/// Table cells for the newest `max_rows` events, each column clipped.
pub fn recent_rows(snapshot: &StoreSnapshot, max_rows: usize) -> Vec<[String; 5]> {
    snapshot
        .events
        .iter()
        .take(max_rows)
        .map(|event| {
            [
                event.time_label(),
                clip(&event.prefix, PREFIX_WIDTH),
                clip(&event.source_address, SOURCE_WIDTH),
                clip(&event.dest_port, PORT_WIDTH),
                clip(&event.protocol, PROTO_WIDTH),
            ]
        })
        .collect()
}

fn clip(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn width(chars: usize) -> u16 {
    u16::try_from(chars).unwrap_or(u16::MAX)
}
