//! In-place Floyd-Rivest selection over the index's parallel arrays.

use super::{Axis, PointIndex};

/// Ranges wider than this are narrowed with a sampled recursive pass first.
const SAMPLE_THRESHOLD: usize = 600;

impl PointIndex {
    /// Reorder `[left, right]` (inclusive) so that position `k` holds the
    /// value it would have after a full sort on `axis`, every position before
    /// it holds a value `<=` and every position after it a value `>=`.
    pub(super) fn select(&mut self, k: usize, mut left: usize, mut right: usize, axis: Axis) {
        while right > left {
            if right - left > SAMPLE_THRESHOLD {
                let n = (right - left + 1) as f64;
                let m = (k - left + 1) as f64;
                let z = n.ln();
                let s = 0.5 * (2.0 * z / 3.0).exp();
                let sign = if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 };
                let sd = 0.5 * (z * s * (n - s) / n).sqrt() * sign;
                let k_f = k as f64;
                // Negative floats saturate to 0 when cast.
                let new_left = left.max((k_f - m * s / n + sd).floor() as usize);
                let new_right = right.min((k_f + (n - m) * s / n + sd).floor() as usize);
                self.select(k, new_left, new_right, axis);
            }

            let t = self.value(k, axis);
            let mut i = left;
            let mut j = right;

            self.swap_item(left, k);
            if self.value(right, axis) > t {
                self.swap_item(left, right);
            }

            // `left` now holds a value <= t and `right` a value >= t; they
            // act as sentinels for the inner scans.
            while i < j {
                self.swap_item(i, j);
                i += 1;
                j -= 1;
                while self.value(i, axis) < t {
                    i += 1;
                }
                while self.value(j, axis) > t {
                    j -= 1;
                }
            }

            if self.value(left, axis) == t {
                self.swap_item(left, j);
            } else {
                j += 1;
                self.swap_item(j, right);
            }

            if j < k {
                left = j + 1;
            } else if j > k {
                right = j - 1;
            } else {
                break;
            }
        }
    }

    #[inline]
    fn value(&self, i: usize, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.xs[i],
            Axis::Y => self.ys[i],
        }
    }

    #[inline]
    fn swap_item(&mut self, i: usize, j: usize) {
        self.ids.swap(i, j);
        self.xs.swap(i, j);
        self.ys.swap(i, j);
    }
}
