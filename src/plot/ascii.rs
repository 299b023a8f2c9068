//! ASCII plotting of monthly payment totals for terminal output.
//!
//! Fixed-size grid, deterministic output. Plot elements:
//! - baseline months: `o`
//! - forecast: `*` line
//! - baseline monthly average: `.` horizontal line

use crate::domain::{BASE_CURRENCY, MonthlySeries};
use crate::engine::monthly::{month_from_index, month_index};

/// Render the baseline, optionally with a forecast laid over it.
pub fn render_monthly_plot(
    baseline: &MonthlySeries,
    forecast: Option<&MonthlySeries>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let series: Vec<&MonthlySeries> = std::iter::once(baseline).chain(forecast).collect();
    let Some((m_min, m_max)) = month_range(&series) else {
        return "Plot: (no monthly payments)\n".to_string();
    };
    let (x_min, x_max) = (m_min as f64, (m_max as f64).max(m_min as f64 + 1.0));

    let (y_min, y_max) = value_range(&series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    if let Some(f) = forecast {
        let points: Vec<(f64, f64)> = f
            .entries()
            .map(|(m, v)| (month_index(m) as f64, v))
            .collect();
        draw_curve(&mut grid, &points, x_min, x_max, y_min, y_max, '*');
    }

    if let Some(avg) = baseline.mean() {
        let y = map_y(avg, y_min, y_max, height);
        for cell in grid[y].iter_mut().filter(|c| **c == ' ') {
            *cell = '.';
        }
    }

    for (m, v) in baseline.entries() {
        let x = map_x(month_index(m) as f64, x_min, x_max, width);
        let y = map_y(v, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let fmt_month = |idx: i32| {
        month_from_index(idx)
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_else(|| "?".to_string())
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: months=[{}, {}] | y=[{y_min:.2}, {y_max:.2}] {BASE_CURRENCY}\n",
        fmt_month(m_min),
        fmt_month(m_max),
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str(if forecast.is_some() {
        "o baseline  * forecast  . average\n"
    } else {
        "o baseline  . average\n"
    });

    out
}

fn month_range(series: &[&MonthlySeries]) -> Option<(i32, i32)> {
    let min = series.iter().filter_map(|s| s.first_month()).map(month_index).min()?;
    let max = series.iter().filter_map(|s| s.last_month()).map(month_index).max()?;
    Some((min, max))
}

fn value_range(series: &[&MonthlySeries]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for s in series {
        for p in s.points() {
            min_y = min_y.min(p.value);
            max_y = max_y.max(p.value);
        }
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y <= min_y {
        return Some((min_y, min_y + 1.0));
    }
    Some((min_y, max_y))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
    ch: char,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, ch),
            None => grid[yy][x] = ch,
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
