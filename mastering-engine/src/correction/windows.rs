//! Measurement window placement

/// Window length plus sorted, unique start offsets (in frames)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPlan {
    pub window_len: usize,
    pub starts: Vec<usize>,
}

impl WindowPlan {
    /// `(start, len)` pairs
    pub fn windows(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.starts.iter().map(move |&s| (s, self.window_len))
    }
}

/// Place windows at the beginning, across the back half, and flush with the end
///
/// Material no longer than one window gets a single window at offset 0
/// covering the whole buffer.
pub fn plan_windows(total_len: usize, window_len: usize, tail_windows: usize) -> WindowPlan {
    if window_len == 0 || total_len <= window_len {
        return WindowPlan {
            window_len: total_len,
            starts: vec![0],
        };
    }

    let last = total_len - window_len;
    let half = (total_len / 2).min(last);
    let span = last - half;

    let mut starts = Vec::with_capacity(tail_windows + 2);
    starts.push(0);
    for i in 0..tail_windows {
        starts.push(half + span * i / tail_windows);
    }
    starts.push(last);

    starts.sort_unstable();
    starts.dedup();

    WindowPlan { window_len, starts }
}

/// Window length in frames for a duration
pub fn window_frames(window_seconds: f64, sample_rate: u32) -> usize {
    if !window_seconds.is_finite() || window_seconds <= 0.0 {
        return 0;
    }
    (window_seconds * sample_rate as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_material_single_window() {
        let plan = plan_windows(1_000, 4_800, 3);
        assert_eq!(plan.starts, vec![0]);
        assert_eq!(plan.window_len, 1_000);
    }

    #[test]
    fn test_exact_length_single_window() {
        let plan = plan_windows(4_800, 4_800, 3);
        assert_eq!(plan.starts, vec![0]);
    }

    #[test]
    fn test_covers_start_back_half_and_end() {
        let plan = plan_windows(100, 10, 3);
        // back half runs 50..90 in thirds, plus the flush-end window at 90
        assert_eq!(plan.starts, vec![0, 50, 63, 76, 90]);
        let (last_start, len) = plan.windows().last().unwrap();
        assert_eq!(last_start + len, 100);
    }

    #[test]
    fn test_no_tail_windows() {
        let plan = plan_windows(100, 10, 0);
        assert_eq!(plan.starts, vec![0, 90]);
    }

    #[test]
    fn test_overlapping_starts_deduplicated() {
        let plan = plan_windows(12, 10, 4);
        assert_eq!(plan.starts, vec![0, 2]);
    }

    #[test]
    fn test_window_frames() {
        assert_eq!(window_frames(10.0, 48_000), 480_000);
        assert_eq!(window_frames(0.0, 48_000), 0);
        assert_eq!(window_frames(f64::NAN, 48_000), 0);
    }
}
