//! Signal conditioning for per-frame kinematic signals.

use std::collections::VecDeque;

/// Causal moving average filter
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    window_size: usize,
    buffer: VecDeque<f64>,
    sum: f64,
}

impl MovingAverageFilter {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            buffer: VecDeque::with_capacity(window_size),
            sum: 0.0,
        }
    }

    pub fn filter(&mut self, x: f64) -> f64 {
        self.buffer.push_back(x);
        self.sum += x;

        if self.buffer.len() > self.window_size {
            if let Some(old) = self.buffer.pop_front() {
                self.sum -= old;
            }
        }

        self.sum / self.buffer.len() as f64
    }

    pub fn filter_signal(&mut self, signal: &[f64]) -> Vec<f64> {
        self.reset();
        signal.iter().map(|&x| self.filter(x)).collect()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
    }
}

/// Centered moving average. The window shrinks at the edges so the output
/// has the same length as the input and is never shifted in time.
pub fn centered_moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    let half = window.max(1) / 2;
    let n = signal.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n.saturating_sub(1));
            let slice = &signal[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Fill missing samples by linear interpolation between the nearest known
/// neighbours, holding the first/last known value at the edges.
///
/// Returns `None` when no sample is known.
pub fn fill_gaps(samples: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<(usize, f64)> = samples
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();

    let (&(first_i, first_v), &(last_i, last_v)) = (known.first()?, known.last()?);

    let mut out = vec![0.0; samples.len()];
    out[..=first_i].fill(first_v);
    out[last_i..].fill(last_v);

    for pair in known.windows(2) {
        let (i0, v0) = pair[0];
        let (i1, v1) = pair[1];
        let span = (i1 - i0) as f64;
        for (k, slot) in out[i0..=i1].iter_mut().enumerate() {
            *slot = v0 + (v1 - v0) * k as f64 / span;
        }
    }

    Some(out)
}

/// Gap-fill then smooth a per-frame signal
pub fn condition_signal(samples: &[Option<f64>], window: usize) -> Option<Vec<f64>> {
    fill_gaps(samples).map(|filled| centered_moving_average(&filled, window))
}
