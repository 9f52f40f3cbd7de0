//! Terminal chart of a run's detail rows.
//!
//! One column per bucket index, scaled to a fixed grid, so the same run always
//! prints the same picture.
//!
//! Plot elements:
//! - observed values: `o`
//! - counterfactual prediction: `-` line
//! - intervention start: `|` column

use chrono::NaiveDate;

use crate::report::DetailRow;

/// Render actual vs predicted over bucket index, marking `post_start`.
pub fn render_impact_plot(rows: &[DetailRow], post_start: NaiveDate, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return "Plot: (no data)\n".to_string();
    };

    let x_max = (rows.len() as f64 - 1.0).max(1.0);
    let (y_min, y_max) = y_range(rows).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Prediction first so the marker and observations overlay it.
    let predicted: Vec<(usize, usize)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            r.predicted
                .map(|p| (map_x(i as f64, x_max, width), map_y(p, y_min, y_max, height)))
        })
        .collect();
    draw_polyline(&mut grid, &predicted, '-');

    if let Some(idx) = rows.iter().position(|r| r.date >= post_start) {
        let x = map_x(idx as f64, x_max, width);
        for row in grid.iter_mut() {
            if row[x] == ' ' {
                row[x] = '|';
            }
        }
    }

    for (i, r) in rows.iter().enumerate() {
        let x = map_x(i as f64, x_max, width);
        let y = map_y(r.actual, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} .. {} | y=[{y_min:.2}, {y_max:.2}]\n",
        first.date, last.date
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn y_range(rows: &[DetailRow]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in rows.iter().flat_map(|r| std::iter::once(r.actual).chain(r.predicted)) {
        min_y = min_y.min(v);
        max_y = max_y.max(v);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(i: f64, x_max: f64, width: usize) -> usize {
    let u = (i / x_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Top row is y_max.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], points: &[(usize, usize)], ch: char) {
    let Some(&(x, y)) = points.first() else {
        return;
    };
    grid[y][x] = ch;
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        draw_line(grid, x0, y0, x1, y1, ch);
    }
}

/// Integer line drawing (Bresenham).
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
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
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
