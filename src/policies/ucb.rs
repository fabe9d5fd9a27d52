use super::arm::ArmStats;
use super::index::IndexRule;

/// UCB-alpha index `mean + sqrt(alpha * ln(t) / (2 * pulls))`; `alpha = 4`
/// gives UCB1.
#[derive(Clone, Debug)]
pub struct Ucb {
    alpha: f64,
}

impl Ucb {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for Ucb {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl IndexRule for Ucb {
    fn name(&self) -> String {
        format!("UCB({})", self.alpha)
    }

    fn index(&self, arm: &ArmStats, t: u64) -> f64 {
        let t = t.max(1) as f64;
        arm.mean() + (self.alpha * t.ln() / (2.0 * arm.pulls as f64)).sqrt()
    }
}
