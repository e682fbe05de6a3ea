//! Freight TUI - world map view of tracked shipments
//!
//! Displays, for the selected shipment:
//! - World map with the full synthesized route (dashed) and the part already
//!   sailed (solid), origin/destination markers and the vessel
//! - Side panel with status, progress, distances, ETA, speed, bearing, weather
//!
//! Keys: ←/→ progress ±1%, ↑/↓ ±10%, Home/End start/arrival, Tab next
//! shipment, m toggle index/distance interpolation, q quit.

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use freight_tracker::domain::geo::{split_at_antimeridian, GeoPoint};
use freight_tracker::domain::progress::ProgressMode;
use freight_tracker::domain::shipment::{ShipmentStatus, ShipmentTrackingState, TrackingOptions};
use freight_tracker::infra::Config;
use freight_tracker::services::TrackingBoard;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::canvas::{Canvas, Context, Line as CanvasLine, Map, MapResolution, Points},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Shipments shown when the config lists none
const DEMO_SHIPMENTS: [(&str, &str, &str); 4] = [
    ("MSKU1234567", "Shanghai", "Los Angeles"),
    ("HLCU7654321", "Rotterdam", "New York"),
    ("ONEU2468013", "Tokyo", "Seattle"),
    ("MAEU1357913", "Rotterdam", "Hamburg"),
];

/// Sub-steps per route segment when drawing the dashed line
const DASH_STEPS: usize = 12;

const SMALL_STEP: f64 = 0.01;
const LARGE_STEP: f64 = 0.10;

/// Freight TUI - world map view of tracked shipments
#[derive(Parser, Debug)]
#[command(name = "freight-tui", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

/// A shipment the view can mount
struct Entry {
    tracking_number: String,
    origin: GeoPoint,
    destination: GeoPoint,
    options: TrackingOptions,
    fraction: f64,
}

struct App {
    board: TrackingBoard,
    entries: Vec<Entry>,
    selected: usize,
    message: Option<String>,
}

impl App {
    fn new(entries: Vec<Entry>) -> Self {
        let mut app = Self { board: TrackingBoard::new(), entries, selected: 0, message: None };
        for entry in &app.entries {
            let mounted = app.board.mount(
                &entry.tracking_number,
                entry.origin,
                entry.destination,
                entry.fraction,
                &entry.options,
            );
            // the board logs every reject; the status line keeps the first
            if let Err(e) = mounted {
                if app.message.is_none() {
                    app.message = Some(format!("{}: {e}", entry.tracking_number));
                }
            }
        }
        app
    }

    fn current(&self) -> Option<ShipmentTrackingState> {
        self.entries.get(self.selected).and_then(|e| self.board.get(&e.tracking_number))
    }

    fn next(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + 1) % self.entries.len();
        }
    }

    fn previous(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + self.entries.len() - 1) % self.entries.len();
        }
    }

    /// Set the selected shipment's progress, clamped to [0, 1]
    fn set_progress(&mut self, fraction: f64) {
        let Some(entry) = self.entries.get_mut(self.selected) else {
            return;
        };
        entry.fraction = fraction.clamp(0.0, 1.0);
        // round away float drift from repeated steps
        entry.fraction = (entry.fraction * 1000.0).round() / 1000.0;
        self.message = match self.board.update_progress(&entry.tracking_number, entry.fraction) {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
    }

    fn nudge(&mut self, delta: f64) {
        if let Some(entry) = self.entries.get(self.selected) {
            self.set_progress(entry.fraction + delta);
        }
    }

    /// Remount the selected shipment with the other interpolation mode
    fn toggle_mode(&mut self) {
        let Some(entry) = self.entries.get_mut(self.selected) else {
            return;
        };
        entry.options.progress_mode = match entry.options.progress_mode {
            ProgressMode::Index => ProgressMode::Distance,
            ProgressMode::Distance => ProgressMode::Index,
        };
        self.message = self
            .board
            .mount(
                &entry.tracking_number,
                entry.origin,
                entry.destination,
                entry.fraction,
                &entry.options,
            )
            .err()
            .map(|e| e.to_string());
    }
}

fn load_entries(config: &Config) -> anyhow::Result<Vec<Entry>> {
    let now = Utc::now();
    let mut entries = Vec::new();

    for shipment in config.shipments() {
        let origin = config
            .ports()
            .resolve(&shipment.origin)
            .with_context(|| format!("shipment {} origin", shipment.tracking_number))?;
        let destination = config
            .ports()
            .resolve(&shipment.destination)
            .with_context(|| format!("shipment {} destination", shipment.tracking_number))?;
        entries.push(Entry {
            tracking_number: shipment.tracking_number.clone(),
            origin,
            destination,
            options: config.tracking_options(shipment),
            fraction: shipment.progress_at(now, config.default_progress()),
        });
    }

    if entries.is_empty() {
        for (number, origin, destination) in DEMO_SHIPMENTS {
            entries.push(Entry {
                tracking_number: number.to_string(),
                origin: config.ports().resolve(origin)?,
                destination: config.ports().resolve(destination)?,
                options: TrackingOptions {
                    progress_mode: config.progress_mode(),
                    regional_waypoints: config.regional_waypoints(),
                    ..TrackingOptions::default()
                },
                fraction: config.default_progress(),
            });
        }
    }

    Ok(entries)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path);
    let mut app = App::new(load_entries(&config)?);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, &mut app);

    app.board.clear();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| draw_ui(f, app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Right => app.nudge(SMALL_STEP),
                        KeyCode::Left => app.nudge(-SMALL_STEP),
                        KeyCode::Up => app.nudge(LARGE_STEP),
                        KeyCode::Down => app.nudge(-LARGE_STEP),
                        KeyCode::Home => app.set_progress(0.0),
                        KeyCode::End => app.set_progress(1.0),
                        KeyCode::Tab => app.next(),
                        KeyCode::BackTab => app.previous(),
                        KeyCode::Char('m') => app.toggle_mode(),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

fn draw_ui(f: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Map + side panel
        ])
        .split(f.area());

    let state = app.current();
    draw_header(f, main_chunks[0], app, state.as_ref());

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(40)])
        .split(main_chunks[1]);

    draw_map(f, body_chunks[0], state.as_ref());

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(app.entries.len() as u16 + 2), // Shipments
            Constraint::Length(3),                             // Progress gauge
            Constraint::Min(0),                                // Details
        ])
        .split(body_chunks[1]);

    draw_shipment_list(f, side_chunks[0], app);
    if let Some(state) = &state {
        draw_progress_gauge(f, side_chunks[1], state);
        draw_details(f, side_chunks[2], state);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App, state: Option<&ShipmentTrackingState>) {
    let mut spans = vec![
        Span::styled("Freight Tracker ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| Shipments: "),
        Span::styled(app.board.len().to_string(), Style::default().fg(Color::Yellow)),
    ];
    if let Some(state) = state {
        spans.push(Span::raw(" | Mode: "));
        spans.push(Span::raw(state.progress_mode.as_str()));
    }
    match &app.message {
        Some(message) => {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(message.clone(), Style::default().fg(Color::Red)));
        }
        None => spans.push(Span::raw(" | ←/→ ↑/↓ progress, Tab next, m mode, q quit")),
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn status_color(status: ShipmentStatus) -> Color {
    match status {
        ShipmentStatus::Booked => Color::Gray,
        ShipmentStatus::InTransit => Color::Yellow,
        ShipmentStatus::Delivered => Color::Green,
    }
}

/// Draw `a -> b`, split at the map edge when it crosses the date line
fn draw_segment(ctx: &mut Context, a: GeoPoint, b: GeoPoint, color: Color) {
    for (from, to) in split_at_antimeridian(a, b) {
        ctx.draw(&CanvasLine::new(from.lon, from.lat, to.lon, to.lat, color));
    }
}

fn draw_map(f: &mut Frame, area: Rect, state: Option<&ShipmentTrackingState>) {
    let title = match state {
        Some(s) => format!(" {} - {} ", s.tracking_number, s.route_kind.label()),
        None => " No shipment ".to_string(),
    };

    let canvas = Canvas::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .marker(symbols::Marker::Braille)
        .x_bounds([-180.0, 180.0])
        .y_bounds([-90.0, 90.0])
        .paint(|ctx| {
            ctx.draw(&Map { color: Color::DarkGray, resolution: MapResolution::High });
            ctx.layer();

            let Some(state) = state else {
                return;
            };

            // Full route, dashed
            for pair in state.route.waypoints().windows(2) {
                for step in (0..DASH_STEPS).step_by(2) {
                    let from = pair[0].lerp(pair[1], step as f64 / DASH_STEPS as f64);
                    let to = pair[0].lerp(pair[1], (step + 1) as f64 / DASH_STEPS as f64);
                    draw_segment(ctx, from, to, Color::Blue);
                }
            }

            // Sailed part, solid
            for pair in state.progress.completed.windows(2) {
                draw_segment(ctx, pair[0], pair[1], Color::Cyan);
            }
            ctx.layer();

            let origin = state.origin();
            let destination = state.destination();
            ctx.draw(&Points { coords: &[(origin.lon, origin.lat)], color: Color::Green });
            ctx.draw(&Points {
                coords: &[(destination.lon, destination.lat)],
                color: Color::Red,
            });
            ctx.print(origin.lon, origin.lat, Span::styled("●", Style::default().fg(Color::Green)));
            ctx.print(
                destination.lon,
                destination.lat,
                Span::styled("■", Style::default().fg(Color::Red)),
            );

            let vessel = state.progress.current;
            ctx.print(
                vessel.lon,
                vessel.lat,
                Span::styled(
                    "⛴",
                    Style::default().fg(status_color(state.status)).add_modifier(Modifier::BOLD),
                ),
            );
        });

    f.render_widget(canvas, area);
}

fn draw_shipment_list(f: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .entries
        .iter()
        .map(|entry| {
            let (label, color) = match app.board.get(&entry.tracking_number) {
                Some(state) => (state.status.label(), status_color(state.status)),
                None => ("Invalid", Color::Red),
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<14}", entry.tracking_number)),
                Span::styled(label, Style::default().fg(color)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().title(" Shipments ").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut list_state = ListState::default();
    list_state.select(Some(app.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_progress_gauge(f: &mut Frame, area: Rect, state: &ShipmentTrackingState) {
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(status_color(state.status)))
        .ratio(state.progress.fraction.clamp(0.0, 1.0))
        .label(format!("{}%", state.progress.percent()));
    f.render_widget(gauge, area);
}

fn optional(value: Option<f64>, unit: &str) -> String {
    value.map(|v| format!("{v:.1}{unit}")).unwrap_or_else(|| "-".to_string())
}

fn draw_details(f: &mut Frame, area: Rect, state: &ShipmentTrackingState) {
    let label = Style::default().fg(Color::Cyan);
    let progress = &state.progress;
    let row = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(format!("{name:<11}"), label), Span::raw(value)])
    };

    let lines = vec![
        row("Status", state.status.label().to_string()),
        row("Route", state.route_kind.label().to_string()),
        row(
            "Segment",
            format!("{}/{}", progress.segment_index + 1, state.route.segment_count()),
        ),
        row("Position", progress.current.to_string()),
        row("Next", progress.next_waypoint.to_string()),
        row("Sailed", format!("{:.0} km", progress.traveled_km)),
        row("Remaining", format!("{:.0} km", progress.remaining_km)),
        row("Total", format!("{:.0} km", progress.total_km)),
        row(
            "ETA",
            state
                .eta()
                .map(|eta| eta.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        row("Speed", optional(state.vessel.speed_knots, " kn")),
        row("Bearing", optional(state.vessel.bearing_deg, "°")),
        row("Weather", state.vessel.weather.clone().unwrap_or_else(|| "-".to_string())),
    ];

    let details =
        Paragraph::new(lines).block(Block::default().title(" Vessel ").borders(Borders::ALL));
    f.render_widget(details, area);
}
