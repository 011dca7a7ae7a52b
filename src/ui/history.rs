use chrono::{DateTime, Local};
use flick::{
    history::{HistoryEntry, ModeSummary},
    GameMode,
};
use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::{ui::streak_text, App};

/// Pure presenter for a single stored run
pub fn present_row(entry: &HistoryEntry, now: DateTime<Local>, latest: bool) -> Row<'static> {
    let r = &entry.result;

    let acc_color = if r.accuracy >= 90.0 {
        Color::Green
    } else if r.accuracy >= 70.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    let pace = if r.score > 0 {
        format!("{:.0}", r.avg_time_per_target_ms)
    } else {
        "-".to_string()
    };

    let row = Row::new(vec![
        Cell::from(age(entry.recorded_at, now)),
        Cell::from(r.mode.to_string()),
        Cell::from(r.movement.to_string()),
        Cell::from(r.score.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(r.total_clicks.to_string()),
        Cell::from(format!("{:.1}", r.accuracy)).style(Style::default().fg(acc_color)),
        Cell::from(pace),
        Cell::from(format!("{:.1}", r.duration_ms / 1000.0)),
    ]);

    if latest {
        row.style(Style::default().bg(Color::DarkGray))
    } else {
        row
    }
}

/// How long ago a run was recorded, in rough English.
pub fn age(recorded_at: DateTime<Local>, now: DateTime<Local>) -> String {
    let secs = (now - recorded_at).num_seconds().max(0);
    HumanTime::from_seconds(secs).to_text_en(Accuracy::Rough, Tense::Past)
}

/// One line per mode with best score, best pace and mean accuracy.
pub fn summary_line(summaries: &[(GameMode, ModeSummary)]) -> String {
    summaries
        .iter()
        .map(|(mode, s)| {
            if s.runs == 0 {
                return format!("{mode}: no runs");
            }
            format!(
                "{mode}: {} runs, best {} hits, best {} ms/target, {:.1}% acc",
                s.runs,
                s.best_score.unwrap_or(0),
                s.best_avg_time_ms.map_or("-".to_string(), |ms| format!("{ms:.0}")),
                s.mean_accuracy.unwrap_or(0.0)
            )
        })
        .join("   |   ")
}

/// Render the run history screen
pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Summary
            Constraint::Min(0),    // Runs table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let title = match streak_text(app.streak) {
        Some(streak) => format!("History · {streak}"),
        None => "History".to_string(),
    };
    let summary = Paragraph::new(summary_line(&app.history_state.summaries))
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(summary, chunks[0]);

    if app.history_state.entries.is_empty() {
        let message = if app.history.is_some() {
            "No runs recorded yet. Finish a run to start your history."
        } else {
            "History is unavailable; see the log for details."
        };
        let no_data = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize; // borders + header
        let max_scroll = app.history_state.entries.len().saturating_sub(table_height);
        if app.history_state.scroll_offset > max_scroll {
            app.history_state.scroll_offset = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("When"),
            Cell::from("Mode"),
            Cell::from("Movement"),
            Cell::from("Hits"),
            Cell::from("Clicks"),
            Cell::from("Acc (%)"),
            Cell::from("ms/target"),
            Cell::from("Secs"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let now = Local::now();
        let rows: Vec<Row> = app
            .history_state
            .entries
            .iter()
            .skip(app.history_state.scroll_offset)
            .take(table_height)
            .map(|entry| present_row(entry, now, app.last_saved == Some(entry.id)))
            .collect();

        let widths = [
            Constraint::Min(16),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(6),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Recent runs"))
            .column_spacing(1);
        f.render_widget(table, chunks[1]);
    }

    let instructions =
        Paragraph::new("(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (x) clear  (b/backspace) back  (esc) quit")
            .alignment(Alignment::Center)
            .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use flick::{kinematics::Movement, session::SessionResult};
    use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

    fn entry(id: i64, recorded_at: DateTime<Local>) -> HistoryEntry {
        HistoryEntry {
            id,
            recorded_at,
            result: SessionResult {
                mode: GameMode::Precision,
                movement: Movement::Bounce,
                score: 20,
                total_clicks: 25,
                accuracy: 80.0,
                duration_ms: 12_000.0,
                avg_time_per_target_ms: 600.0,
            },
        }
    }

    #[test]
    fn age_is_humanized_past() {
        let now = Local::now();
        let text = age(now - Duration::hours(3), now);
        assert!(text.contains("hour"), "{text}");
    }

    #[test]
    fn age_never_reads_as_future() {
        let now = Local::now();
        let text = age(now + Duration::minutes(5), now);
        assert!(!text.starts_with("in "), "{text}");
    }

    fn render_row(row: Row<'static>) -> Buffer {
        let area = Rect::new(0, 0, 80, 1);
        let widths = [16, 12, 9, 5, 7, 8, 10, 6].map(Constraint::Length);
        let mut buf = Buffer::empty(area);
        Widget::render(Table::new([row], widths), area, &mut buf);
        buf
    }

    fn text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn present_row_fills_every_column() {
        let now = Local::now();
        let buf = render_row(present_row(&entry(1, now), now, false));
        let line = text(&buf);

        for cell in ["PRECISION", "BOUNCE", "20", "25", "80.0", "600", "12.0"] {
            assert!(line.contains(cell), "{cell} missing from {line:?}");
        }
        let acc = line.find("80.0").unwrap() as u16;
        assert_eq!(buf[(acc, 0)].fg, Color::Yellow);
        assert_ne!(buf[(0, 0)].bg, Color::DarkGray);
    }

    #[test]
    fn present_row_highlights_latest_run() {
        let now = Local::now();
        let buf = render_row(present_row(&entry(2, now), now, true));
        assert_eq!(buf[(0, 0)].bg, Color::DarkGray);
        assert_eq!(buf[(79, 0)].bg, Color::DarkGray);
    }

    #[test]
    fn present_row_without_hits_has_no_pace() {
        let now = Local::now();
        let mut run = entry(3, now);
        run.result.score = 0;
        run.result.accuracy = 0.0;
        let line = text(&render_row(present_row(&run, now, false)));
        assert!(line.contains(" - "), "{line:?}");
        assert!(!line.contains("600"));
    }

    #[test]
    fn summary_line_per_mode() {
        let summaries = vec![
            (
                GameMode::TimeAttack,
                ModeSummary {
                    runs: 3,
                    best_score: Some(41),
                    best_avg_time_ms: Some(512.4),
                    mean_accuracy: Some(88.3),
                },
            ),
            (GameMode::Precision, ModeSummary::default()),
        ];
        let line = summary_line(&summaries);
        assert!(line.contains("TIME_ATTACK: 3 runs, best 41 hits, best 512 ms/target, 88.3% acc"));
        assert!(line.contains("PRECISION: no runs"));
        assert!(line.contains("   |   "));
    }
}
