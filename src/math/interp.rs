//! Interpolation primitives: a Fritsch-Carlson monotone cubic used for the
//! strike→vol smile fit, and a total-variance term curve used for the FX
//! at-the-money vol term structure.

use crate::error::{invalid_input, Result};

/// Monotone-preserving piecewise cubic Hermite interpolant with flat
/// extrapolation outside the knot range.
#[derive(Debug, Clone, PartialEq)]
pub struct MonotoneCubic {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Adjusted tangent at each knot
    ts: Vec<f64>,
}

impl MonotoneCubic {
    /// Builds the interpolant through `(xs[i], ys[i])`.
    ///
    /// `xs` must be strictly increasing and every value finite.
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self> {
        let n = xs.len();
        if n < 2 {
            return Err(invalid_input!("need at least 2 knots, got {}", n));
        }
        if ys.len() != n {
            return Err(invalid_input!(
                "knot abscissae and ordinates differ in length ({} vs {})",
                n,
                ys.len()
            ));
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(invalid_input!("knots must be finite"));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid_input!("knot abscissae must be strictly increasing"));
        }

        let delta: Vec<f64> = (0..n - 1)
            .map(|i| (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]))
            .collect();

        let mut ts = vec![0.0; n];
        ts[0] = delta[0];
        ts[n - 1] = delta[n - 2];
        for i in 1..n - 1 {
            // local extremum keeps a zero tangent
            ts[i] = if delta[i - 1] * delta[i] <= 0.0 {
                0.0
            } else {
                0.5 * (delta[i - 1] + delta[i])
            };
        }

        // Fritsch-Carlson: keep (alpha, beta) inside the circle of radius 3
        for i in 0..n - 1 {
            if delta[i].abs() < 1e-30 {
                ts[i] = 0.0;
                ts[i + 1] = 0.0;
            } else {
                let alpha = ts[i] / delta[i];
                let beta = ts[i + 1] / delta[i];
                let r2 = alpha * alpha + beta * beta;
                if r2 > 9.0 {
                    let tau = 3.0 / r2.sqrt();
                    ts[i] = tau * alpha * delta[i];
                    ts[i + 1] = tau * beta * delta[i];
                }
            }
        }

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            ts,
        })
    }

    pub fn x_min(&self) -> f64 {
        self.xs[0]
    }

    pub fn x_max(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    pub fn knots(&self) -> (&[f64], &[f64]) {
        (&self.xs, &self.ys)
    }

    /// Tangent used at knot `i`.
    pub fn tangent(&self, i: usize) -> Option<f64> {
        self.ts.get(i).copied()
    }

    /// Index `lo` such that `xs[lo] <= x < xs[lo + 1]`; caller guarantees `x`
    /// is strictly inside the knot range.
    fn interval(&self, x: f64) -> usize {
        let hi = self.xs.partition_point(|&xi| xi <= x);
        hi.saturating_sub(1).min(self.xs.len() - 2)
    }

    /// Interpolated value, flat beyond the end knots.
    pub fn value(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }

        let lo = self.interval(x);
        let hi = lo + 1;
        let h = self.xs[hi] - self.xs[lo];
        let t = (x - self.xs[lo]) / h;
        let h00 = (1.0 + 2.0 * t) * (1.0 - t) * (1.0 - t);
        let h10 = t * (1.0 - t) * (1.0 - t);
        let h01 = t * t * (3.0 - 2.0 * t);
        let h11 = t * t * (t - 1.0);

        h00 * self.ys[lo] + h10 * h * self.ts[lo] + h01 * self.ys[hi] + h11 * h * self.ts[hi]
    }

    /// First derivative, zero beyond the end knots.
    pub fn derivative(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x < self.xs[0] || x > self.xs[n - 1] {
            return 0.0;
        }
        if x == self.xs[n - 1] {
            return self.ts[n - 1];
        }

        let lo = self.interval(x);
        let hi = lo + 1;
        let h = self.xs[hi] - self.xs[lo];
        let t = (x - self.xs[lo]) / h;
        let dh00 = 6.0 * t * t - 6.0 * t;
        let dh10 = 3.0 * t * t - 4.0 * t + 1.0;
        let dh01 = -6.0 * t * t + 6.0 * t;
        let dh11 = 3.0 * t * t - 2.0 * t;

        (dh00 * self.ys[lo] + dh01 * self.ys[hi]) / h + dh10 * self.ts[lo] + dh11 * self.ts[hi]
    }
}

/// At-the-money vol term structure interpolated in total variance `w = σ²t`.
///
/// Between quoted tenors the total variance follows a monotone cubic in time;
/// before the first and after the last tenor the vol is held flat.
#[derive(Debug, Clone, PartialEq)]
pub struct TermVarianceCurve {
    times: Vec<f64>,
    vols: Vec<f64>,
    spline: Option<MonotoneCubic>,
}

impl TermVarianceCurve {
    /// `times` in years (strictly increasing, positive), `vols` annualised.
    pub fn new(times: &[f64], vols: &[f64]) -> Result<Self> {
        if times.is_empty() {
            return Err(invalid_input!("term curve needs at least one tenor"));
        }
        if times.len() != vols.len() {
            return Err(invalid_input!(
                "tenors and vols differ in length ({} vs {})",
                times.len(),
                vols.len()
            ));
        }
        if let Some(v) = vols.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(invalid_input!("term vols must be positive, got {}", v));
        }
        if times.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
            return Err(invalid_input!("tenor times must be positive"));
        }

        let spline = if times.len() > 1 {
            let variances: Vec<f64> = times
                .iter()
                .zip(vols)
                .map(|(t, v)| v * v * t)
                .collect();
            Some(MonotoneCubic::new(times, &variances)?)
        } else {
            None
        };

        Ok(Self {
            times: times.to_vec(),
            vols: vols.to_vec(),
            spline,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn vols(&self) -> &[f64] {
        &self.vols
    }

    /// Interpolated total variance at `t` years.
    pub fn total_variance(&self, t: f64) -> f64 {
        let t = t.max(0.0);
        let n = self.times.len();
        match &self.spline {
            Some(spline) if t > self.times[0] && t < self.times[n - 1] => spline.value(t),
            _ if t >= self.times[n - 1] => self.vols[n - 1] * self.vols[n - 1] * t,
            _ => self.vols[0] * self.vols[0] * t,
        }
    }

    /// Term (root-mean-square) vol to `t` years.
    pub fn vol(&self, t: f64) -> f64 {
        let n = self.times.len();
        if t <= self.times[0] {
            return self.vols[0];
        }
        if t >= self.times[n - 1] {
            return self.vols[n - 1];
        }
        (self.total_variance(t) / t).max(0.0).sqrt()
    }

    /// Instantaneous vol at `t` years: `sqrt(dw/dt)`.
    pub fn inst_vol(&self, t: f64) -> f64 {
        let n = self.times.len();
        match &self.spline {
            Some(spline) if t > self.times[0] && t < self.times[n - 1] => {
                spline.derivative(t).max(0.0).sqrt()
            }
            _ if t >= self.times[n - 1] => self.vols[n - 1],
            _ => self.vols[0],
        }
    }
}
