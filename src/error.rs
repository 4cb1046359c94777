use thiserror::Error;

use crate::zombie_model::Trajectory;

pub type OutbreakResult<T> = Result<T, OutbreakError>;

#[derive(Debug, Error)]
pub enum OutbreakError {
    /// Rejected before the first integration step
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Integration stopped early. `partial` ends with the last finite sample
    #[error("numerical instability at t = {time}: {reason}")]
    NumericalInstability {
        time: f64,
        reason: String,
        partial: Box<Trajectory>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to set up logging: {0}")]
    Logging(String),

    /// Some of several independent runs failed, `first` is the earliest cause
    #[error("{failed} scenario(s) failed, first error: {first}")]
    ScenariosFailed {
        failed: usize,
        first: Box<OutbreakError>,
    },

    #[error("unable to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl OutbreakError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self
    {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_pool_failure_keeps_its_own_variant()
    {
        // the second global pool is always refused
        let _ = rayon::ThreadPoolBuilder::new().build_global();
        let err = rayon::ThreadPoolBuilder::new()
            .build_global()
            .unwrap_err();
        let err = OutbreakError::from(err);
        assert!(matches!(err, OutbreakError::ThreadPool(_)));
        assert!(err.to_string().starts_with("unable to build thread pool"));
    }
}
