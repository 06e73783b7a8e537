use ndarray::Array2;

use super::{Stat, StatSet, VarianceConvention, ZeroPolicy};

/// Welford running moments for every index along one axis.
#[derive(Debug, Clone)]
pub(crate) struct AxisWelford {
    count: Vec<u64>,
    mean: Vec<f64>,
    m2: Vec<f64>,
    stats: StatSet,
    track_mean: bool,
    track_m2: bool,
}

impl AxisWelford {
    pub fn new(len: usize, stats: StatSet) -> Self {
        let track_m2 = stats.contains(Stat::Variance);
        let track_mean = track_m2 || stats.contains(Stat::Mean);
        AxisWelford {
            count: vec![0; len],
            mean: if track_mean { vec![0.0; len] } else { Vec::new() },
            m2: if track_m2 { vec![0.0; len] } else { Vec::new() },
            stats,
            track_mean,
            track_m2,
        }
    }

    pub fn len(&self) -> usize {
        self.count.len()
    }

    /// First index whose count exceeds `span`, with that count.
    pub fn over_span(&self, span: usize) -> Option<(usize, u64)> {
        self.count
            .iter()
            .enumerate()
            .find(|&(_, &c)| c > span as u64)
            .map(|(i, &c)| (i, c))
    }

    #[inline]
    pub fn push(&mut self, i: usize, x: f64) {
        self.count[i] += 1;
        if !self.track_mean {
            return;
        }
        let n = self.count[i] as f64;
        let delta = x - self.mean[i];
        self.mean[i] += delta / n;
        if self.track_m2 {
            self.m2[i] += delta * (x - self.mean[i]);
        }
    }

    /// Chan et al. pairwise combination of two partial accumulations.
    pub fn merge(&mut self, other: &AxisWelford) {
        for i in 0..self.count.len() {
            let (ca, cb) = (self.count[i], other.count[i]);
            if cb == 0 {
                continue;
            }
            let c = ca + cb;
            self.count[i] = c;
            if !self.track_mean {
                continue;
            }
            if ca == 0 {
                self.mean[i] = other.mean[i];
                if self.track_m2 {
                    self.m2[i] = other.m2[i];
                }
                continue;
            }
            let (ca, cb, c) = (ca as f64, cb as f64, c as f64);
            let delta = other.mean[i] - self.mean[i];
            self.mean[i] += delta * cb / c;
            if self.track_m2 {
                self.m2[i] += other.m2[i] + delta * delta * ca * cb / c;
            }
        }
    }

    /// Lay the tracked statistics out as rows of a `(stats.len(), len)` array.
    ///
    /// `span` is the number of cells along the axis, used when absent entries
    /// count as zeros.
    pub fn finish(&self, convention: VarianceConvention, zeros: ZeroPolicy, span: usize) -> Array2<f64> {
        let mut out = Array2::zeros((self.stats.len(), self.len()));
        for (row, stat) in self.stats.iter().enumerate() {
            let mut dest = out.row_mut(row);
            for (i, slot) in dest.iter_mut().enumerate() {
                *slot = match stat {
                    Stat::Nonzero => self.count[i] as f64,
                    Stat::Mean => self.moments(i, zeros, span).1,
                    Stat::Variance => {
                        let (n, _, m2) = self.moments(i, zeros, span);
                        variance(m2, n, convention)
                    }
                };
            }
        }
        out
    }

    /// (observations, mean, m2) for index `i` under the zero policy.
    fn moments(&self, i: usize, zeros: ZeroPolicy, span: usize) -> (f64, f64, f64) {
        let c = self.count[i] as f64;
        let m2 = if self.track_m2 { self.m2[i] } else { 0.0 };
        let mean = self.mean[i];
        match zeros {
            ZeroPolicy::Stored => {
                if self.count[i] == 0 {
                    (0.0, f64::NAN, f64::NAN)
                } else {
                    (c, mean, m2)
                }
            }
            ZeroPolicy::Implicit => {
                let n = span as f64;
                if span == 0 {
                    return (0.0, f64::NAN, f64::NAN);
                }
                let z = n - c;
                (n, mean * c / n, m2 + mean * mean * c * z / n)
            }
        }
    }
}

fn variance(m2: f64, n: f64, convention: VarianceConvention) -> f64 {
    match convention {
        VarianceConvention::Population if n >= 1.0 => m2 / n,
        VarianceConvention::Sample if n >= 2.0 => m2 / (n - 1.0),
        _ => f64::NAN,
    }
}
