//! Three logical timers rescheduled on the connection executor:
//! keep-alive ticker, ping-response deadline, disconnect deadline.
//! Implemented against `tokio::time`, gated behind the `tokio`
//! feature -- a bare-metal executor is expected to build without this
//! feature and drive C2's timeout handling from its own timer queue
//! through the same call sites in [`crate::client::engine`].

use core::time::Duration;

pub struct TimerSet {
    keep_alive_interval: Option<Duration>,
    ping_deadline: Option<Duration>,
    disconnect_deadline: Option<Duration>,
    keep_alive: Option<tokio::time::Interval>,
    ping_sleep: Option<core::pin::Pin<alloc::boxed::Box<tokio::time::Sleep>>>,
    disconnect_sleep: Option<core::pin::Pin<alloc::boxed::Box<tokio::time::Sleep>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    KeepAliveTick,
    PingDeadlineElapsed,
    DisconnectDeadlineElapsed,
}

impl Default for TimerSet {
    fn default() -> Self {
        TimerSet {
            keep_alive_interval: None,
            ping_deadline: None,
            disconnect_deadline: None,
            keep_alive: None,
            ping_sleep: None,
            disconnect_sleep: None,
        }
    }
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms (or disarms, with `Duration::ZERO`) the keep-alive
    /// ticker. Per the resolved Open Question, setting this to zero
    /// while connected disarms the ticker immediately for the rest of
    /// this connection; it does not affect the in-flight ping
    /// deadline, and re-arms from the config's value on the next
    /// CONNACK.
    pub fn arm_keep_alive(&mut self, period: Duration) {
        self.keep_alive_interval = if period.is_zero() { None } else { Some(period) };
        self.keep_alive = self.keep_alive_interval.map(tokio::time::interval);
    }

    pub fn arm_ping_deadline(&mut self, timeout: Duration) {
        self.ping_deadline = Some(timeout);
        self.ping_sleep = Some(alloc::boxed::Box::pin(tokio::time::sleep(timeout)));
    }

    pub fn disarm_ping_deadline(&mut self) {
        self.ping_sleep = None;
    }

    pub fn arm_disconnect_deadline(&mut self, timeout: Duration) {
        self.disconnect_deadline = Some(timeout);
        self.disconnect_sleep = Some(alloc::boxed::Box::pin(tokio::time::sleep(timeout)));
    }

    /// Cancels every timer; called on every transition to Closed.
    /// Cancellation is not surfaced as an error -- callers simply stop
    /// polling the futures these timers would otherwise produce.
    pub fn cancel_all(&mut self) {
        self.keep_alive = None;
        self.ping_sleep = None;
        self.disconnect_sleep = None;
    }

    pub async fn next_keep_alive_tick(&mut self) -> Option<()> {
        match &mut self.keep_alive {
            Some(interval) => {
                interval.tick().await;
                Some(())
            }
            None => core::future::pending().await,
        }
    }

    pub async fn wait_ping_deadline(&mut self) -> Option<()> {
        match &mut self.ping_sleep {
            Some(sleep) => {
                sleep.as_mut().await;
                Some(())
            }
            None => core::future::pending().await,
        }
    }

    pub async fn wait_disconnect_deadline(&mut self) -> Option<()> {
        match &mut self.disconnect_sleep {
            Some(sleep) => {
                sleep.as_mut().await;
                Some(())
            }
            None => core::future::pending().await,
        }
    }

    /// Races the keep-alive ticker against the ping-response deadline
    /// in a single `select!`, borrowing the two `Option` fields
    /// disjointly -- the two-method split above can't be raced
    /// directly against each other from outside this module since
    /// both take `&mut self`. `awaiting_pingresp` gates the deadline
    /// branch off when no PINGREQ is outstanding.
    pub async fn tick(&mut self, awaiting_pingresp: bool) -> TimerEvent {
        tokio::select! {
            biased;
            _ = wait_sleep(&mut self.ping_sleep), if awaiting_pingresp => {
                TimerEvent::PingDeadlineElapsed
            }
            _ = wait_interval(&mut self.keep_alive) => TimerEvent::KeepAliveTick,
        }
    }
}

async fn wait_interval(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => core::future::pending().await,
    }
}

async fn wait_sleep(sleep: &mut Option<core::pin::Pin<alloc::boxed::Box<tokio::time::Sleep>>>) {
    match sleep {
        Some(s) => s.as_mut().await,
        None => core::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ping_deadline_fires_after_timeout() {
        let mut timers = TimerSet::new();
        timers.arm_ping_deadline(Duration::from_millis(50));
        timers.wait_ping_deadline().await;
    }

    #[tokio::test]
    async fn disarmed_keep_alive_never_ticks() {
        let mut timers = TimerSet::new();
        timers.arm_keep_alive(Duration::ZERO);
        let result = tokio::time::timeout(Duration::from_millis(20), timers.next_keep_alive_tick()).await;
        assert!(result.is_err(), "disarmed ticker must never resolve");
    }

    #[tokio::test]
    async fn cancel_all_disarms_everything() {
        let mut timers = TimerSet::new();
        timers.arm_ping_deadline(Duration::from_millis(10));
        timers.cancel_all();
        let result = tokio::time::timeout(Duration::from_millis(30), timers.wait_ping_deadline()).await;
        assert!(result.is_err());
    }
}
