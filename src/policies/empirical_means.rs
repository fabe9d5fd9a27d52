use super::arm::ArmStats;
use super::index::IndexRule;

/// Greedy index on the empirical mean, without exploration bonus.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmpiricalMeans;

impl IndexRule for EmpiricalMeans {
    fn name(&self) -> String {
        "EmpiricalMeans".to_string()
    }

    fn index(&self, arm: &ArmStats, _: u64) -> f64 {
        arm.mean()
    }
}
