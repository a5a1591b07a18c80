//! Periodic refresh timer.
//!
//! The poller owns no I/O. It tells the driver when a refresh is due and
//! keeps two pieces of bookkeeping: whether a refresh is already running
//! (due ticks are skipped until it finishes) and a generation counter that
//! lets the store discard results from an older refresh.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Monitoring,
}

#[derive(Debug)]
pub struct Poller {
    period: Duration,
    ticker: Option<Interval>,
    in_flight: bool,
    generation: u64,
}

impl Poller {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            ticker: None,
            in_flight: false,
            generation: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> PollerState {
        if self.ticker.is_some() {
            PollerState::Monitoring
        } else {
            PollerState::Idle
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.ticker.is_some()
    }

    /// Arm the timer. The first tick fires one period from now. Returns
    /// false when already monitoring.
    pub fn start(&mut self) -> bool {
        if self.ticker.is_some() {
            return false;
        }

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        true
    }

    /// Disarm the timer. Returns false when already idle.
    pub fn stop(&mut self) -> bool {
        self.ticker.take().is_some()
    }

    /// Wait for the next tick. Pending forever while idle, so it can sit in
    /// a `select!` arm unconditionally.
    pub async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Claim the next refresh. `None` while a previous one is still running.
    pub fn begin_cycle(&mut self) -> Option<u64> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        self.generation += 1;
        Some(self.generation)
    }

    /// Release the claim taken by [`begin_cycle`](Self::begin_cycle).
    pub fn finish_cycle(&mut self) {
        self.in_flight = false;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // start() arms a tokio interval, so this needs a runtime
    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let mut poller = Poller::new(Duration::from_millis(100));
        assert_eq!(poller.state(), PollerState::Idle);

        assert!(!poller.stop());
        assert!(poller.start());
        assert!(!poller.start());
        assert_eq!(poller.state(), PollerState::Monitoring);

        assert!(poller.stop());
        assert!(!poller.stop());
        assert_eq!(poller.state(), PollerState::Idle);
    }

    #[test]
    fn test_cycles_do_not_overlap() {
        let mut poller = Poller::new(Duration::from_millis(100));

        assert_eq!(poller.begin_cycle(), Some(1));
        assert!(poller.in_flight());
        assert_eq!(poller.begin_cycle(), None);

        poller.finish_cycle();
        assert_eq!(poller.begin_cycle(), Some(2));
        assert_eq!(poller.generation(), 2);
    }

    #[test]
    fn test_zero_period_is_floored() {
        let poller = Poller::new(Duration::ZERO);
        assert_eq!(poller.period(), Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let mut poller = Poller::new(Duration::from_secs(1));
        poller.start();

        let started = Instant::now();
        poller.tick().await;
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_tick_never_fires() {
        let mut poller = Poller::new(Duration::from_millis(10));
        let fired = tokio::time::timeout(Duration::from_secs(5), poller.tick()).await;
        assert!(fired.is_err());
    }
}
