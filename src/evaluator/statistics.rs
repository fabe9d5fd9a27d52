use super::results::{PolicyResults, RoundStatistics};
use super::runner::Trajectory;

use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

const NORMAL_QUANTILE: f64 = 1.959_963_984_540_054;

/// Two-sided 95% quantile of the Student-t distribution for `n` samples.
pub fn student_quantile(n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    StudentsT::new(0.0, 1.0, (n - 1) as f64)
        .map(|t| t.inverse_cdf(0.975))
        .unwrap_or(NORMAL_QUANTILE)
}

/// Mean and standard error of the mean. The standard error is 0 below two
/// samples.
pub fn mean_std_err(values: &[f64]) -> (f64, f64) {
    match values.len() {
        0 => (0.0, 0.0),
        1 => (values[0], 0.0),
        n => (values.mean(), values.std_dev() / (n as f64).sqrt()),
    }
}

fn column(n: usize, value: impl Fn(usize) -> f64) -> Vec<f64> {
    (0..n).map(value).collect()
}

fn cumulative(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, value| {
            *acc += value;
            Some(*acc)
        })
        .collect()
}

/// Reduces the trajectories of one policy, given in repetition order.
pub fn summarize(label: &str, n_players: usize, trajectories: &[&Trajectory]) -> PolicyResults {
    let n = trajectories.len();
    let horizon = trajectories.iter().map(|t| t.len()).min().unwrap_or(0);
    let quantile = student_quantile(n);
    let cumulative_regret: Vec<Vec<f64>> =
        trajectories.iter().map(|t| cumulative(&t.regret)).collect();

    let rounds: Vec<RoundStatistics> = (0..horizon)
        .map(|round| {
            let (mean_regret, regret_std_err) =
                mean_std_err(&column(n, |k| trajectories[k].regret[round]));
            let (mean_cumulative_regret, cumulative_std_err) =
                mean_std_err(&column(n, |k| cumulative_regret[k][round]));
            let (mean_reward, _) = mean_std_err(&column(n, |k| trajectories[k].rewards[round]));

            let best = trajectories.iter().filter(|t| t.best[round]).count();
            let collisions: u64 = trajectories
                .iter()
                .map(|t| u64::from(t.collisions[round]))
                .sum();

            RoundStatistics {
                round: round as u64,
                mean_regret,
                regret_std_err,
                mean_cumulative_regret,
                cumulative_std_err,
                cumulative_ci_low: mean_cumulative_regret - quantile * cumulative_std_err,
                cumulative_ci_high: mean_cumulative_regret + quantile * cumulative_std_err,
                best_arm_rate: best as f64 / n as f64,
                mean_reward,
                mean_collisions: collisions as f64 / n as f64,
            }
        })
        .collect();

    let player_rewards = (n_players > 1).then(|| {
        (0..n_players)
            .map(|player| {
                let total: f64 = trajectories.iter().map(|t| t.player_rewards[player]).sum();
                if n == 0 {
                    0.0
                } else {
                    total / n as f64
                }
            })
            .collect()
    });

    PolicyResults {
        label: label.to_string(),
        n_players,
        completed: n,
        final_cumulative_regret: rounds.last().map_or(0.0, |r| r.mean_cumulative_regret),
        player_rewards,
        rounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn trajectory(regret: &[f64]) -> Trajectory {
        Trajectory {
            rewards: regret.iter().map(|r| 1.0 - r).collect(),
            regret: regret.to_vec(),
            best: regret.iter().map(|&r| r == 0.0).collect(),
            collisions: vec![1; regret.len()],
            player_rewards: vec![regret.len() as f64, 0.0],
        }
    }

    #[test]
    fn quantiles() {
        assert_eq!(student_quantile(1), 0.0);
        assert!((student_quantile(2) - 12.706).abs() < 1e-2);
        assert!((student_quantile(1000) - NORMAL_QUANTILE).abs() < 1e-2);
    }

    #[test]
    fn mean_and_std_err() {
        let (mean, std_err) = mean_std_err(&[1.0, 2.0, 3.0, 4.0]);
        assert!((mean - 2.5).abs() < EPS);
        // sample std is sqrt(5/3)
        assert!((std_err - (5.0f64 / 3.0).sqrt() / 2.0).abs() < EPS);
        assert_eq!(mean_std_err(&[7.0]), (7.0, 0.0));
        assert_eq!(mean_std_err(&[]), (0.0, 0.0));
    }

    #[test]
    fn summarize_rounds() {
        let a = trajectory(&[0.0, 1.0, 0.0]);
        let b = trajectory(&[1.0, 1.0, 0.0]);
        let results = summarize("test", 2, &[&a, &b]);

        assert_eq!(results.completed, 2);
        assert_eq!(results.rounds.len(), 3);
        let first = &results.rounds[0];
        assert!((first.mean_regret - 0.5).abs() < EPS);
        assert!((first.best_arm_rate - 0.5).abs() < EPS);
        assert!((first.mean_collisions - 1.0).abs() < EPS);
        assert!((results.rounds[2].mean_cumulative_regret - 1.5).abs() < EPS);
        assert!((results.final_cumulative_regret - 1.5).abs() < EPS);
        assert!(results.rounds[2].cumulative_ci_low < 1.5);
        assert!(results.rounds[2].cumulative_ci_high > 1.5);
        assert_eq!(results.player_rewards, Some(vec![3.0, 0.0]));
    }

    #[test]
    fn summarize_nothing() {
        let results = summarize("empty", 1, &[]);
        assert_eq!(results.completed, 0);
        assert!(results.rounds.is_empty());
        assert_eq!(results.final_cumulative_regret, 0.0);
        assert_eq!(results.player_rewards, None);
    }
}
