pub mod charting;
pub mod history;
pub mod screen;

use flick::{
    kinematics::Target,
    time_series::cumulative_hits,
    GameMode,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle},
        Axis, Block, Chart, Dataset, GraphType, Paragraph, Widget, Wrap,
    },
};
use unicode_width::UnicodeWidthStr;
use webbrowser::Browser;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// HUD, bordered playfield, legend.
pub fn play_layout(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// The cells targets are drawn in and clicked on, inside the playfield border.
pub fn playfield(area: Rect) -> Rect {
    Block::bordered().inner(play_layout(area)[1])
}

/// Green while fresh, then yellow and red as the target nears expiry.
/// Targets that never expire are cyan.
fn target_color(target: &Target, now: f64) -> Color {
    if target.lifespan <= 0.0 {
        return Color::Cyan;
    }
    let left = 1.0 - (now - target.created_at) / target.lifespan;
    if left > 0.5 {
        Color::Green
    } else if left > 0.25 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// `label  value  (key)` lines for the menu.
/// Streak badge, hidden until there is one.
pub fn streak_text(days: u32) -> Option<String> {
    match days {
        0 => None,
        1 => Some("1 day streak".to_string()),
        n => Some(format!("{n} day streak")),
    }
}

fn menu_lines(app: &App) -> Vec<String> {
    let c = &app.selection;
    let goal = match c.mode {
        GameMode::TimeAttack => format!("{:<10}{:>8} s   (-/+)", "duration", c.duration),
        GameMode::Precision => format!("{:<10}{:>8}     (-/+)", "targets", c.target_count),
    };
    let dismiss = if c.auto_dismiss_time > 0.0 {
        format!("{} s", c.auto_dismiss_time)
    } else {
        "never".to_string()
    };
    vec![
        format!("{:<10}{:>12} (m)", "mode", c.mode.to_string()),
        goal,
        format!("{:<10}{:>12} (v)", "movement", c.movement.to_string()),
        format!("{:<10}{:>12} (d)", "dismiss", dismiss),
        format!("{:<10}{:>12} (z)", "size", c.target_size),
    ]
}

impl App {
    fn render_menu(&self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let lines = menu_lines(self);
        let width = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16 + 4;
        let height = lines.len() as u16 + 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),   // title
                Constraint::Length(1),   // padding
                Constraint::Min(height), // settings
                Constraint::Length(1),   // notice
                Constraint::Length(1),   // legend
            ])
            .split(area);

        Paragraph::new(Span::styled("flick", bold_style.fg(Color::Magenta)))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        if let Some(streak) = streak_text(self.streak) {
            Paragraph::new(Span::styled(streak, italic_style.fg(Color::Yellow)))
                .alignment(Alignment::Center)
                .render(chunks[1], buf);
        }

        let boxed = Rect {
            x: chunks[2].x + chunks[2].width.saturating_sub(width) / 2,
            y: chunks[2].y,
            width: width.min(chunks[2].width),
            height: height.min(chunks[2].height),
        };
        Paragraph::new(lines.into_iter().map(Line::from).collect::<Vec<_>>())
            .block(Block::bordered().title("settings"))
            .style(bold_style)
            .render(boxed, buf);

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(notice.as_str(), Style::default().fg(Color::Red)))
                .alignment(Alignment::Center)
                .render(chunks[3], buf);
        }

        Paragraph::new(Span::styled(
            "(enter) start / (h)istory / (esc)ape",
            italic_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    fn render_play(&self, area: Rect, buf: &mut Buffer) {
        let dim_bold_style = Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let [hud, field, legend] = play_layout(area);
        let session = &self.session;
        let stats = session.stats();

        let progress = match (session.time_remaining(), session.targets_remaining()) {
            (Some(secs), _) => format!("{secs:.1} s left"),
            (None, Some(left)) => format!("{left} to go   {:.1} s", session.elapsed_time()),
            (None, None) => String::new(),
        };
        let waiting = if stats.start_time.is_none() {
            "   click to begin"
        } else {
            ""
        };
        Paragraph::new(Span::styled(
            format!(
                "{} hits   {} misses   {:.0}% acc   {progress}{waiting}",
                stats.score,
                stats.misses(),
                session.accuracy()
            ),
            dim_bold_style,
        ))
        .alignment(Alignment::Center)
        .render(hud, buf);

        let game_area = self.arena.game_area();
        let now = session.now();
        Canvas::default()
            .block(Block::bordered())
            .marker(Marker::Braille)
            .x_bounds([0.0, game_area.width])
            .y_bounds([0.0, game_area.height])
            .paint(|ctx| {
                for t in session.targets() {
                    // canvas y grows upwards
                    ctx.draw(&Circle {
                        x: t.x,
                        y: game_area.height - t.y,
                        radius: t.radius,
                        color: target_color(t, now),
                    });
                }
            })
            .render(field, buf);

        Paragraph::new(Span::styled("(click) shoot / (esc) stop / (r)eset", italic_style))
            .alignment(Alignment::Center)
            .render(legend, buf);
    }

    fn render_results(&self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let magenta_style = Style::default().fg(Color::Magenta);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(1),    // chart
                Constraint::Length(1), // stats
                Constraint::Length(1), // best so far
                Constraint::Length(1), // padding
                Constraint::Length(1), // legend
            ])
            .split(area);

        let Some(result) = self.session.result() else {
            return;
        };

        let points = cumulative_hits(self.session.hit_offsets());
        let (overall_duration, most_hits) =
            charting::compute_chart_params(&points, result.duration_ms / 1000.0);

        let tuples: Vec<(f64, f64)> = points.iter().copied().map(Into::into).collect();
        let datasets = vec![Dataset::default()
            .marker(Marker::Braille)
            .style(magenta_style)
            .graph_type(GraphType::Line)
            .data(&tuples)];

        Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("seconds")
                    .bounds([0.0, overall_duration])
                    .labels(vec![
                        Span::styled("0", bold_style),
                        Span::styled(charting::format_label(overall_duration), bold_style),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("hits")
                    .bounds([0.0, most_hits])
                    .labels(vec![
                        Span::styled("0", bold_style),
                        Span::styled(charting::format_label(most_hits), bold_style),
                    ]),
            )
            .render(chunks[0], buf);

        let spread = self
            .session
            .hit_interval_stats()
            .map_or(String::new(), |(_, sd)| format!("   {:.0} ms sd", sd * 1000.0));
        Paragraph::new(Span::styled(
            format!(
                "{} hits   {:.0}% acc   {:.0} ms/target{spread}",
                result.score, result.accuracy, result.avg_time_per_target_ms
            ),
            bold_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        if let Some(best) = &self.best {
            let pace = best
                .best_avg_time_ms
                .map_or(String::new(), |ms| format!(", fastest {ms:.0} ms/target"));
            Paragraph::new(Span::styled(
                format!(
                    "best {} hits over {} {} runs{pace}",
                    best.best_score.unwrap_or(0),
                    best.runs,
                    result.mode
                ),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);
        }

        Paragraph::new(Span::styled(
            String::from(if Browser::is_available() {
                "(r)etry / (n)ew / (h)istory / (t)weet / (esc)ape"
            } else {
                "(r)etry / (n)ew / (h)istory / (esc)ape"
            }),
            italic_style,
        ))
        .render(chunks[4], buf);
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Menu => self.render_menu(area, buf),
            AppState::Playing => self.render_play(area, buf),
            AppState::Results => self.render_results(area, buf),
            // drawn by ui::history with mutable access
            AppState::History => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use flick::{
        clock::ManualClock,
        config::{Config, FileConfigStore},
        history::HistoryDb,
        sound::NoopSound,
        spawn::Spawner,
        AimSession, GameConfig,
    };

    fn create_test_app(selection: GameConfig) -> (App, ManualClock, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0.0);
        let session = AimSession::new(
            selection.clone(),
            clock.clone(),
            NoopSound,
            Spawner::seeded(4),
        );
        let mut app = App::new(
            Config::default(),
            selection,
            session,
            Some(HistoryDb::in_memory().unwrap()),
            Box::new(FileConfigStore::with_path(dir.path().join("config.json"))),
        );
        app.resize(80, 24);
        (app, clock, dir)
    }

    fn render(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_playfield_sits_inside_border() {
        let area = Rect::new(0, 0, 80, 24);
        let [hud, field, legend] = play_layout(area);
        assert_eq!(hud, Rect::new(0, 0, 80, 1));
        assert_eq!(field, Rect::new(0, 1, 80, 22));
        assert_eq!(legend, Rect::new(0, 23, 80, 1));
        assert_eq!(playfield(area), Rect::new(1, 2, 78, 20));
    }

    #[test]
    fn test_menu_shows_settings() {
        let (app, _, _dir) = create_test_app(GameConfig::default());
        let rendered = render(&app, Rect::new(0, 0, 80, 24));
        assert!(rendered.contains("TIME_ATTACK"));
        assert!(rendered.contains("STATIC"));
        assert!(rendered.contains("(enter) start"));
        assert!(!rendered.contains("streak"));
    }

    #[test]
    fn test_menu_shows_streak() {
        let (mut app, _, _dir) = create_test_app(GameConfig::default());
        app.streak = 3;
        let rendered = render(&app, Rect::new(0, 0, 80, 24));
        assert!(rendered.contains("3 day streak"));
        assert_eq!(streak_text(1).as_deref(), Some("1 day streak"));
        assert_eq!(streak_text(0), None);
    }

    #[test]
    fn test_play_hud_before_first_click() {
        let (mut app, _, _dir) = create_test_app(GameConfig::default());
        app.start_run();
        let rendered = render(&app, Rect::new(0, 0, 80, 24));
        assert!(rendered.contains("30.0 s left"));
        assert!(rendered.contains("click to begin"));
    }

    #[test]
    fn test_play_draws_targets() {
        let (mut app, _, _dir) = create_test_app(GameConfig::default());
        app.start_run();
        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);

        let braille = buffer
            .content()
            .iter()
            .filter(|c| c.symbol().chars().any(|ch| ('\u{2801}'..='\u{28FF}').contains(&ch)))
            .count();
        assert!(braille > 0);
    }

    #[test]
    fn test_precision_hud_counts_down_targets() {
        let selection = GameConfig {
            mode: GameMode::Precision,
            target_count: 7,
            ..GameConfig::default()
        };
        let (mut app, _, _dir) = create_test_app(selection);
        app.start_run();
        let rendered = render(&app, Rect::new(0, 0, 80, 24));
        assert!(rendered.contains("7 to go"));
    }

    #[test]
    fn test_results_show_stats_and_legend() {
        let (mut app, clock, _dir) = create_test_app(GameConfig::default());
        app.start_run();
        let id = app.session.targets()[0].id;
        app.session.on_target_hit(id);
        clock.advance(500.0);
        app.session.on_miss();
        app.on_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(app.state, AppState::Results);

        let rendered = render(&app, Rect::new(0, 0, 80, 24));
        assert!(rendered.contains("1 hits"));
        assert!(rendered.contains("50% acc"));
        assert!(rendered.contains("(r)etry"));
    }

    #[test]
    fn test_target_color_by_lifespan() {
        let mut t = Target {
            id: 1,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            radius: 10.0,
            created_at: 0.0,
            lifespan: 0.0,
        };
        assert_eq!(target_color(&t, 5_000.0), Color::Cyan);
        t.lifespan = 1_000.0;
        assert_eq!(target_color(&t, 100.0), Color::Green);
        assert_eq!(target_color(&t, 600.0), Color::Yellow);
        assert_eq!(target_color(&t, 900.0), Color::Red);
    }

    #[test]
    fn test_ui_widget_extreme_sizes() {
        let (mut app, _, _dir) = create_test_app(GameConfig::default());
        for state in [AppState::Menu, AppState::Playing] {
            if state == AppState::Playing {
                app.start_run();
            }
            for area in [
                Rect::new(0, 0, 10, 5),
                Rect::new(0, 0, 200, 5),
                Rect::new(0, 0, 20, 50),
            ] {
                let mut buffer = Buffer::empty(area);
                (&app).render(area, &mut buffer);
                assert!(*buffer.area() == area);
            }
        }
    }
}
