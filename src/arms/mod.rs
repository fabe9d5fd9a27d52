pub mod arm;
pub mod bernoulli;
pub mod constant;
mod environment;
pub mod exponential;
pub mod gaussian;
pub mod generator;

pub use arm::{Arm, ArmFamily, Arms};
pub use environment::{Environment, EnvironmentType, Problem, ProblemCursor, ProblemSegment};
pub use generator::{
    uniform_means, BayesianMeans, MarkovianMeans, MeanGenerator, MeanSchedule, MeanSegment,
    StaticMeans,
};
