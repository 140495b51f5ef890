use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use airsense_core::{Channel, FeedMonitor, Observation, TelemetryFeed};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, Paragraph};
use ratatui::Terminal;

const CHANNEL_KEYS: [(Channel, &str, Color); 7] = [
    (Channel::Co, "CO (ppm)", Color::Yellow),
    (Channel::Pm2_5, "PM2.5 (ug/m3)", Color::Cyan),
    (Channel::Pm10, "PM10 (ug/m3)", Color::Green),
    (Channel::Voc, "VOC (ppb)", Color::Magenta),
    (Channel::Methane, "CH4 (ppm)", Color::Blue),
    (Channel::Temperature, "Temp (C)", Color::Red),
    (Channel::Humidity, "Humidity (%)", Color::LightYellow),
];

struct ChannelSeries {
    label: &'static str,
    color: Color,
    points: VecDeque<(f64, f64)>,
}

impl ChannelSeries {
    fn new(label: &'static str, color: Color) -> Self {
        Self {
            label,
            color,
            points: VecDeque::new(),
        }
    }

    fn push(&mut self, x: f64, y: f64, window_sec: f64) {
        self.points.push_back((x, y));
        while let Some((old_x, _)) = self.points.front() {
            if x - old_x > window_sec {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    fn bounds(&self) -> [f64; 2] {
        if self.points.is_empty() {
            return [0.0, 1.0];
        }
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for (_, y) in &self.points {
            min = min.min(*y);
            max = max.max(*y);
        }
        if (max - min).abs() < f64::EPSILON {
            [min - 1.0, max + 1.0]
        } else {
            let pad = (max - min) * 0.12;
            [min - pad, max + pad]
        }
    }
}

struct ViewerState {
    start: Instant,
    latest: Option<Observation>,
    alerts_seen: u64,
    series: Vec<ChannelSeries>,
}

impl ViewerState {
    fn new() -> Self {
        let series = CHANNEL_KEYS
            .iter()
            .map(|(_, label, color)| ChannelSeries::new(label, *color))
            .collect();

        Self {
            start: Instant::now(),
            latest: None,
            alerts_seen: 0,
            series,
        }
    }

    fn update(&mut self, observation: Observation, window_sec: f64) {
        let t = self.start.elapsed().as_secs_f64();
        if let Some(sample) = &observation.sample {
            for (idx, (channel, _, _)) in CHANNEL_KEYS.iter().enumerate() {
                if let Some(value) = sample.value(*channel) {
                    self.series[idx].push(t, value, window_sec);
                }
            }
        }
        self.alerts_seen += observation.alerts.len() as u64;
        self.latest = Some(observation);
    }
}

pub async fn run_viewer<F: TelemetryFeed>(
    monitor: &mut FeedMonitor<F>,
    window_sec: f64,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = ViewerState::new();
    let mut next_tick = Instant::now();
    let mut command_buffer = String::new();

    let run_result = async {
        loop {
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Char(c) => {
                            command_buffer.push(c.to_ascii_lowercase());
                            if command_buffer.len() > 8 {
                                let drain = command_buffer.len() - 8;
                                command_buffer.drain(0..drain);
                            }
                            if command_buffer.ends_with("exit") {
                                break;
                            }
                        }
                        KeyCode::Backspace => {
                            command_buffer.pop();
                        }
                        _ => {}
                    }
                }
            }

            if Instant::now() >= next_tick {
                let observation = monitor.tick().await;
                let interval = monitor.effective_interval();
                state.update(observation, window_sec);
                next_tick = Instant::now() + interval;
            }

            terminal.draw(|frame| draw_ui(frame.size(), frame, &state, window_sec))?;
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn draw_ui(area: Rect, frame: &mut ratatui::Frame<'_>, state: &ViewerState, window_sec: f64) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let header = render_header(state, window_sec);
    frame.render_widget(header, rows[0]);

    let chart_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(rows[1]);

    let mut idx = 0;
    for row_area in chart_rows.iter().copied() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(row_area);

        for col in cols.iter().copied() {
            if idx < state.series.len() {
                render_channel_chart(frame, col, &state.series[idx], state.start.elapsed().as_secs_f64(), window_sec);
            } else {
                let empty = Paragraph::new(Line::from(" "));
                frame.render_widget(empty, col);
            }
            idx += 1;
        }
    }
}

fn render_header(state: &ViewerState, window_sec: f64) -> Paragraph<'static> {
    let mut lines = Vec::new();
    if let Some(observation) = &state.latest {
        let status = format!(
            "status={} stale={} age_ms={} rtt_ms={} alerts_seen={}",
            observation.status.code,
            observation.feed.stale,
            observation.feed.age_ms,
            observation.feed.rtt_ms,
            state.alerts_seen,
        );
        let context = match &observation.sample {
            Some(sample) => format!(
                "{} @ {}  window={}s  (press 'q' to quit)",
                sample.location,
                sample.timestamp.to_rfc3339(),
                window_sec as u64
            ),
            None => format!("waiting for samples  window={}s  (press 'q' to quit)", window_sec as u64),
        };
        lines.push(Line::from(vec![
            Span::styled("AirSense Viewer  ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(status),
        ]));
        lines.push(Line::from(context));
    } else {
        lines.push(Line::from("Waiting first observation..."));
    }

    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"))
}

fn render_channel_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    series: &ChannelSeries,
    now_sec: f64,
    window_sec: f64,
) {
    let points: Vec<(f64, f64)> = series.points.iter().copied().collect();

    let x_min = (now_sec - window_sec).max(0.0);
    let x_max = now_sec.max(window_sec);
    let y_bounds = series.bounds();

    let dataset = Dataset::default()
        .name(series.label)
        .marker(symbols::Marker::Braille)
        .graph_type(ratatui::widgets::GraphType::Line)
        .style(Style::default().fg(series.color))
        .data(&points);

    let x_mid = (x_min + x_max) / 2.0;

    let chart = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(series.label))
        .x_axis(
            Axis::default()
                .title("time (s)")
                .style(Style::default().fg(Color::Gray))
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::raw(format!("{x_min:.0}")),
                    Span::raw(format!("{x_mid:.0}")),
                    Span::raw(format!("{x_max:.0}")),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("value")
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.1}", y_bounds[0])),
                    Span::raw(format!("{:.1}", (y_bounds[0] + y_bounds[1]) / 2.0)),
                    Span::raw(format!("{:.1}", y_bounds[1])),
                ]),
        );

    frame.render_widget(chart, area);
}
