//! Bounded-time polling for eventually-consistent conditions.
//!
//! A deliberately stateless primitive: each call is a pure function of its
//! arguments plus wall-clock time. The predicate is evaluated before the
//! deadline is checked on every iteration, including the first, so a
//! condition that holds exactly at the deadline still counts as
//! convergence. Polling is an explicit loop rather than rescheduling, and
//! each predicate evaluation runs to completion before the elapsed check,
//! so a slow evaluation can overrun the nominal deadline by one
//! evaluation's latency. That approximation is intentional; callers needing
//! a hard cut-off must enforce it around the predicate themselves.

use std::convert::Infallible;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of one polling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Convergence {
    /// The predicate was observed true.
    Converged {
        /// Wall-clock time spent before the observation.
        elapsed: Duration,
    },
    /// The deadline elapsed without the predicate turning true.
    TimedOut {
        /// Wall-clock time spent across all evaluations.
        elapsed: Duration,
    },
}

impl Convergence {
    /// Whether the condition was observed true.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    /// Wall-clock time spent in the call, whichever way it resolved.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Converged { elapsed } | Self::TimedOut { elapsed } => *elapsed,
        }
    }
}

/// Polls `predicate` until it reports true or `deadline` elapses.
///
/// The predicate is evaluated immediately; if it is already true the call
/// resolves with no added delay. Predicate errors propagate unmodified and
/// end the poll. There is no cancellation beyond the deadline: composition
/// with an outer abort is a caller responsibility.
///
/// Repeated evaluation must not itself perturb the observed system; that
/// obligation rests with the caller and is not enforced here.
pub fn wait_for<F, E>(deadline: Duration, interval: Duration, mut predicate: F) -> Result<Convergence, E>
where
    F: FnMut() -> Result<bool, E>,
{
    let started = Instant::now();
    loop {
        if predicate()? {
            return Ok(Convergence::Converged {
                elapsed: started.elapsed(),
            });
        }
        let elapsed = started.elapsed();
        if elapsed >= deadline {
            return Ok(Convergence::TimedOut { elapsed });
        }
        thread::sleep(interval);
    }
}

/// Infallible convenience over [`wait_for`] for plain boolean conditions.
pub fn wait_until<F>(deadline: Duration, interval: Duration, mut condition: F) -> Convergence
where
    F: FnMut() -> bool,
{
    match wait_for(deadline, interval, || Ok::<_, Infallible>(condition())) {
        Ok(outcome) => outcome,
        Err(never) => match never {},
    }
}
