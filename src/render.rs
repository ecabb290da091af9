//! Drawing helpers for the waveform view
//!
//! The presentation layer draws a filled SVG path from the amplitudes and a
//! vertical marker at the playback position. The terminal front end uses the
//! sparkline instead.

/// Filled SVG path for `points` in a `width` x `height` box
///
/// Each amplitude becomes a vertex at `height - p * height`; the shape is
/// closed along the bottom edge. Returns an empty string for no points.
pub fn wave_path(points: &[f32], width: f32, height: f32) -> String {
    if points.is_empty() {
        return String::new();
    }

    let step = width / points.len() as f32;
    let mut path = format!("M 0 {}", height / 2.0);
    for (i, p) in points.iter().enumerate() {
        let x = i as f32 * step;
        let y = height - p * height;
        path.push_str(&format!(" L {:.2} {:.2}", x, y));
    }
    path.push_str(&format!(" L {} {} L 0 {} Z", width, height, height));
    path
}

/// Horizontal position of the playback marker
pub fn progress_x(progress: f32, width: f32) -> f32 {
    progress.clamp(0.0, 1.0) * width
}

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One block character per amplitude
pub fn sparkline(points: &[f32]) -> String {
    points
        .iter()
        .map(|p| {
            let level = (p.clamp(0.0, 1.0) * (BARS.len() - 1) as f32).round() as usize;
            BARS[level]
        })
        .collect()
}

/// Sparkline with the character under `progress` replaced by a marker
pub fn sparkline_with_marker(points: &[f32], progress: f32) -> String {
    if points.is_empty() {
        return String::new();
    }
    let marker = ((progress_x(progress, points.len() as f32)) as usize).min(points.len() - 1);
    sparkline(points)
        .chars()
        .enumerate()
        .map(|(i, c)| if i == marker { '|' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path() {
        assert_eq!(wave_path(&[], 300.0, 100.0), "");
    }

    #[test]
    fn test_path_vertices() {
        let path = wave_path(&[0.0, 0.5, 1.0, 0.25], 200.0, 100.0);
        assert_eq!(
            path,
            "M 0 50 L 0.00 100.00 L 50.00 50.00 L 100.00 0.00 L 150.00 75.00 L 200 100 L 0 100 Z"
        );
    }

    #[test]
    fn test_progress_x_is_clamped() {
        assert_eq!(progress_x(0.5, 320.0), 160.0);
        assert_eq!(progress_x(1.5, 320.0), 320.0);
        assert_eq!(progress_x(-0.1, 320.0), 0.0);
    }

    #[test]
    fn test_sparkline_levels() {
        assert_eq!(sparkline(&[0.0, 1.0, 2.0]), "▁██");
        assert_eq!(sparkline(&[]), "");
    }

    #[test]
    fn test_sparkline_marker() {
        assert_eq!(sparkline_with_marker(&[0.0; 4], 0.5), "▁▁|▁");
        assert_eq!(sparkline_with_marker(&[0.0; 4], 1.0), "▁▁▁|");
        assert_eq!(sparkline_with_marker(&[], 0.3), "");
    }
}
