use super::arm::ArmStats;
use super::index::IndexRule;

const EPS: f64 = 1e-15;

/// Kullback-Leibler divergence between Bernoulli distributions of means `x` and `y`.
pub fn kl_bernoulli(x: f64, y: f64) -> f64 {
    let x = x.clamp(EPS, 1.0 - EPS);
    let y = y.clamp(EPS, 1.0 - EPS);
    x * (x / y).ln() + (1.0 - x) * ((1.0 - x) / (1.0 - y)).ln()
}

/// Largest `q` in `[x, 1]` with `kl(x, q) <= d`, found by bisection.
pub fn kl_ucb_bernoulli(x: f64, d: f64, tolerance: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    if d <= 0.0 {
        return x;
    }
    let (mut low, mut high) = (x, 1.0);
    while high - low > tolerance {
        let middle = 0.5 * (low + high);
        if kl_bernoulli(x, middle) > d {
            high = middle;
        } else {
            low = middle;
        }
    }
    0.5 * (low + high)
}

/// Bernoulli KL-UCB index with exploration level `c * ln(t) / pulls`.
#[derive(Clone, Debug)]
pub struct KlUcb {
    c: f64,
    tolerance: f64,
}

impl KlUcb {
    pub fn new(c: f64) -> Self {
        Self { c, tolerance: 1e-6 }
    }
}

impl Default for KlUcb {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl IndexRule for KlUcb {
    fn name(&self) -> String {
        format!("KL-UCB({})", self.c)
    }

    fn index(&self, arm: &ArmStats, t: u64) -> f64 {
        let t = t.max(1) as f64;
        kl_ucb_bernoulli(arm.mean(), self.c * t.ln() / arm.pulls as f64, self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kl_properties() {
        assert!(kl_bernoulli(0.5, 0.5).abs() < 1e-12);
        assert!(kl_bernoulli(0.1, 0.9) > kl_bernoulli(0.1, 0.5));
        assert!(kl_bernoulli(0.0, 1.0).is_finite());
    }

    #[test]
    fn upper_bound_is_above_mean() {
        let q = kl_ucb_bernoulli(0.3, 0.2, 1e-6);
        assert!(q > 0.3 && q <= 1.0);
        assert!((kl_bernoulli(0.3, q) - 0.2).abs() < 1e-4);
    }

    #[test]
    fn zero_exploration() {
        assert_eq!(kl_ucb_bernoulli(0.4, 0.0, 1e-6), 0.4);
    }

    #[test]
    fn index_is_finite_and_bounded() {
        let rule = KlUcb::default();
        let arm = ArmStats {
            pulls: 3,
            rewards: 3.0,
        };
        let index = rule.index(&arm, 10);
        assert!(index.is_finite());
        assert!(index <= 1.0);
    }
}
