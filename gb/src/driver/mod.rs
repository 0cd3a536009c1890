//! Attempt driving: the control loop, its rate limiter and run reports

mod engine;
mod limiter;
mod report;

pub use engine::{AttemptDriver, DriverMode, DriverSettings};
pub use limiter::RateLimiter;
pub use report::{RunOutcome, RunReport, RunStats};
