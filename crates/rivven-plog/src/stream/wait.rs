//! Wait-for-data policy
//!
//! A stream that runs out of bytes in the middle of a record reports a
//! wait instead of blocking. The policy decides how long the caller should
//! back off and when a file from a forcibly restarted mining run is given
//! up on.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Suggested sleep before retrying
    pub interval: Duration,
    /// Consecutive waits tolerated on a forced-restart file
    pub restart_wait_limit: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            restart_wait_limit: 60,
        }
    }
}

/// Outcome of evaluating a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitDecision {
    /// Back off and retry
    Retry { attempts: u32, retry_after: Duration },
    /// Stop waiting and treat the stream as finished
    GiveUp { attempts: u32 },
}

impl WaitPolicy {
    pub fn new(interval: Duration, restart_wait_limit: u32) -> Self {
        Self {
            interval,
            restart_wait_limit,
        }
    }

    /// Decide on the `attempts`-th consecutive wait.
    pub fn evaluate(&self, attempts: u32, forced_restart: bool) -> WaitDecision {
        if forced_restart && attempts > self.restart_wait_limit {
            WaitDecision::GiveUp { attempts }
        } else {
            WaitDecision::Retry {
                attempts,
                retry_after: self.interval,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.restart_wait_limit, 60);
    }

    #[test]
    fn test_regular_file_waits_forever() {
        let policy = WaitPolicy::new(Duration::from_millis(10), 2);
        assert_eq!(
            policy.evaluate(1000, false),
            WaitDecision::Retry {
                attempts: 1000,
                retry_after: Duration::from_millis(10)
            }
        );
    }

    #[test]
    fn test_forced_restart_gives_up() {
        let policy = WaitPolicy::new(Duration::from_millis(10), 2);
        assert!(matches!(
            policy.evaluate(2, true),
            WaitDecision::Retry { attempts: 2, .. }
        ));
        assert_eq!(policy.evaluate(3, true), WaitDecision::GiveUp { attempts: 3 });
    }
}
