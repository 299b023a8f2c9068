//! Ratatui-based terminal UI.
//!
//! The TUI shows the bag totals, one purchase slider per bond offered at the
//! auction (recommended bonds in red), and a chart of the bag's monthly
//! payments with the simulated purchases laid over it.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::{self, RunOutput};
use crate::domain::{BASE_CURRENCY, MonthlySeries, RunConfig};
use crate::engine::monthly::{month_from_index, month_index};
use crate::error::AppError;
use crate::io::write_workbook;
use crate::report::BondDetails;

mod plotters_chart;

use plotters_chart::BagPlottersChart;

/// Slider increment, in bonds.
pub const SLIDER_STEP: u32 = 200;
/// Largest purchase a slider allows.
pub const SLIDER_MAX: u32 = 4800;

/// Start the TUI.
///
/// Sources are loaded before the terminal switches to the alternate screen,
/// so fetch and validation errors print normally.
pub fn run(config: &RunConfig, export_dir: PathBuf) -> Result<(), AppError> {
    let output = pipeline::run(config)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(output, export_dir);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    run: RunOutput,
    /// Purchase amounts aligned with the auction ISINs.
    amounts: Vec<u32>,
    selected: usize,
    forecast: Option<MonthlySeries>,
    export_dir: PathBuf,
    searching: bool,
    search_input: String,
    details: Option<BondDetails>,
    status: String,
}

impl App {
    fn new(run: RunOutput, export_dir: PathBuf) -> Self {
        let amounts = run.auction().zero_amounts();
        let status = if run.auction().is_empty() {
            "No auction candidates available.".to_string()
        } else {
            format!("{} bond(s) offered at the auction.", run.auction().len())
        };
        Self {
            run,
            amounts,
            selected: 0,
            forecast: None,
            export_dir,
            searching: false,
            search_input: String::new(),
            details: None,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        if self.searching {
            return Ok(self.handle_search(code));
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected + 1 < self.amounts.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Left => self.adjust_amount(false),
            KeyCode::Right => self.adjust_amount(true),
            KeyCode::Char('c') => {
                self.amounts.iter_mut().for_each(|a| *a = 0);
                self.forecast = None;
                self.status = "Cleared all purchases.".to_string();
            }
            KeyCode::Char('/') => {
                self.searching = true;
                self.search_input.clear();
                self.status = "Type an ISIN. Enter to look up, Esc to cancel.".to_string();
            }
            KeyCode::Char('e') => {
                self.status = match write_workbook(&self.export_dir, &self.run.summary, &self.run.schedule) {
                    Ok(paths) => format!("Exported {} sheet(s) to {}", paths.len(), self.export_dir.display()),
                    Err(err) => format!("Export failed: {err}"),
                };
            }
            _ => {}
        }

        Ok(false)
    }

    fn handle_search(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Esc => {
                self.searching = false;
                self.status = "Lookup canceled.".to_string();
            }
            KeyCode::Enter => {
                self.searching = false;
                let isin = self.search_input.trim().to_ascii_uppercase();
                self.details = self.run.details(&isin);
                self.status = match &self.details {
                    Some(d) => format!("{}: {} payment(s) remaining.", d.isin, d.remaining.len()),
                    None => format!("Bond {isin} not found."),
                };
            }
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_alphanumeric() => {
                self.search_input.push(c.to_ascii_uppercase());
            }
            _ => {}
        }
        false
    }

    fn adjust_amount(&mut self, up: bool) {
        let Some(amount) = self.amounts.get_mut(self.selected) else {
            return;
        };
        *amount = step_amount(*amount, up);
        let (isin, amount) = (&self.run.auction().isins[self.selected], *amount);

        self.forecast = if self.amounts.iter().any(|&a| a > 0) {
            Some(self.run.simulate_auction(&self.amounts))
        } else {
            None
        };
        self.status = format!("{isin}: {amount}");
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("bonds", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" | as of {}", self.run.asof.format("%d-%m-%Y"))),
        ]));

        let summary = &self.run.summary;
        match &summary.total {
            Some(total) => lines.push(Line::from(Span::styled(
                format!(
                    "bonds: {} | spent: {:.2} | expected: {:.2} | profit after tax: {:.2} ({:.2}%) {BASE_CURRENCY}",
                    total.quantity,
                    total.expenditure,
                    total.expected_return,
                    total.profit_after_tax,
                    total.profitability_pct,
                ),
                Style::default().fg(Color::Gray),
            ))),
            None => lines.push(Line::from(Span::styled(
                "No active positions.",
                Style::default().fg(Color::Gray),
            ))),
        }

        lines.push(Line::from(Span::styled(
            format!(
                "active: {} | matured: {} | recommended: {} | monthly average: {:.2}",
                summary.active.len(),
                summary.matured.len(),
                self.run.recommendations.len(),
                self.run.baseline.mean().unwrap_or(0.0),
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(30), Constraint::Min(0)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(8)])
            .split(columns[0]);

        self.draw_sliders(frame, left[0]);
        self.draw_details(frame, left[1]);
        self.draw_chart(frame, columns[1]);
    }

    fn draw_sliders(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .run
            .auction()
            .isins
            .iter()
            .zip(&self.amounts)
            .map(|(isin, amount)| {
                let style = if self.run.is_recommended(isin) {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(isin.clone(), style),
                    Span::raw(format!(" {amount:>5}")),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Auction").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !self.amounts.is_empty() {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_details(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Bond").borders(Borders::ALL);

        let text = if self.searching {
            Text::from(Line::from(Span::styled(
                format!("ISIN: {}_", self.search_input),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )))
        } else if let Some(d) = &self.details {
            let next = d
                .remaining
                .first()
                .map(|(date, val)| format!("{} {val:.2}", date.format("%d-%m-%Y")))
                .unwrap_or_else(|| "-".to_string());
            Text::from(vec![
                Line::from(d.isin.clone()),
                Line::from(format!("{} {}", d.bond_type, d.currency)),
                Line::from(format!(
                    "matures: {}",
                    d.maturity_date
                        .map(|m| m.format("%d-%m-%Y").to_string())
                        .unwrap_or_else(|| "-".to_string())
                )),
                Line::from(format!("next: {next}")),
                Line::from(format!(
                    "lifetime: {}",
                    d.lifetime_profitability_pct
                        .map(|p| format!("{p:.2}%"))
                        .unwrap_or_else(|| "-".to_string())
                )),
            ])
        } else {
            Text::from(Line::from(Span::styled("/ to look up a bond", Style::default().fg(Color::Gray))))
        };

        frame.render_widget(Paragraph::new(text).block(block), area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Monthly payments").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if self.run.baseline.is_empty() && self.forecast.is_none() {
            let msg = Paragraph::new("No payments in the bag.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        }

        let series = chart_series(&self.run.baseline, self.forecast.as_ref());

        let (chart_rect, insets) = chart_layout(inner);
        let widget = BagPlottersChart {
            baseline: &series.baseline,
            forecast: series.forecast.as_deref(),
            average: self.run.baseline.mean(),
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: "month",
            y_label: BASE_CURRENCY.to_string(),
            fmt_x: fmt_axis_month,
            fmt_y: fmt_axis_amount,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ amount  c clear  / lookup  e export  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Move a slider one step, staying within `0..=SLIDER_MAX`.
fn step_amount(amount: u32, up: bool) -> u32 {
    if up {
        amount.saturating_add(SLIDER_STEP).min(SLIDER_MAX)
    } else {
        amount.saturating_sub(SLIDER_STEP)
    }
}

struct ChartSeries {
    baseline: Vec<(f64, f64)>,
    forecast: Option<Vec<(f64, f64)>>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series (x = month index) and bounds for Plotters.
fn chart_series(baseline: &MonthlySeries, forecast: Option<&MonthlySeries>) -> ChartSeries {
    let to_points = |s: &MonthlySeries| -> Vec<(f64, f64)> {
        s.entries().map(|(m, v)| (month_index(m) as f64, v)).collect()
    };
    let baseline_pts = to_points(baseline);
    let forecast_pts = forecast.map(to_points);

    let all = || baseline_pts.iter().chain(forecast_pts.iter().flatten());

    let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in all() {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y_max = y_max.max(y);
    }
    if !x0.is_finite() || !x1.is_finite() {
        x0 = 0.0;
        x1 = 1.0;
    }
    if x1 <= x0 {
        x1 = x0 + 1.0;
    }
    if !y_max.is_finite() || y_max <= 0.0 {
        y_max = 1.0;
    }

    let pad = (y_max * 0.05).max(1e-12);
    ChartSeries {
        baseline: baseline_pts,
        forecast: forecast_pts,
        x_bounds: [x0, x1],
        y_bounds: [0.0, y_max + pad],
    }
}

fn fmt_axis_month(v: f64) -> String {
    month_from_index(v.round() as i32)
        .map(|d| d.format("%m.%y").to_string())
        .unwrap_or_default()
}

fn fmt_axis_amount(v: f64) -> String {
    if v.abs() >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if v.abs() >= 1_000.0 {
        format!("{:.0}k", v / 1_000.0)
    } else {
        format!("{v:.0}")
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_month(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_amount(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("month")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new(BASE_CURRENCY).style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
