use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::fixture::StatusCode;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub fn timer_target(fixture_id: u64) -> String {
    format!("timer-{fixture_id}")
}

/// `M':SS` with an unpadded minute count.
pub fn format_clock(elapsed_seconds: u64) -> String {
    format!("{}':{:02}", elapsed_seconds / 60, elapsed_seconds % 60)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveTimer {
    pub fixture_id: u64,
    pub initial_elapsed_minutes: u32,
    pub captured_at: DateTime<Utc>,
    pub status: StatusCode,
}

impl LiveTimer {
    pub fn target_id(&self) -> String {
        timer_target(self.fixture_id)
    }

    pub fn advances(&self) -> bool {
        self.status != StatusCode::HalfTime
    }

    /// Never below the seeded value, even if `now` predates the capture.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        let since = (now - self.captured_at).num_seconds().max(0) as u64;
        u64::from(self.initial_elapsed_minutes) * 60 + since
    }

    pub fn display(&self, now: DateTime<Utc>, halftime_label: &str) -> String {
        if !self.advances() {
            return halftime_label.to_string();
        }
        format_clock(self.elapsed_seconds(now))
    }
}

/// Where tick output goes. Returns `false` when the target is gone.
pub trait TimerSink {
    fn set_timer_text(&mut self, target_id: &str, text: &str) -> bool;
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The live clocks from one fetch. Replaced, never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerRegistry {
    timers: Vec<LiveTimer>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timer: LiveTimer) {
        self.timers.push(timer);
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveTimer> {
        self.timers.iter()
    }

    pub fn get(&self, fixture_id: u64) -> Option<&LiveTimer> {
        self.timers.iter().find(|t| t.fixture_id == fixture_id)
    }

    /// Pushes every clock to the sink; returns how many targets accepted it.
    pub fn tick(&self, now: DateTime<Utc>, halftime_label: &str, sink: &mut impl TimerSink) -> usize {
        let mut updated = 0;
        for timer in &self.timers {
            let text = timer.display(now, halftime_label);
            if sink.set_timer_text(&timer.target_id(), &text) {
                updated += 1;
            }
        }
        updated
    }
}

impl FromIterator<LiveTimer> for TimerRegistry {
    fn from_iter<I: IntoIterator<Item = LiveTimer>>(iter: I) -> Self {
        Self {
            timers: iter.into_iter().collect(),
        }
    }
}

/// A running tick task. Dropping the handle cancels it.
#[derive(Debug)]
pub struct TickerHandle {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl TickerHandle {
    /// Stops the task and waits for it, so no tick lands after this returns.
    pub fn cancel(mut self) {
        self.stop();
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn start_ticking<C, S>(
    registry: TimerRegistry,
    halftime_label: String,
    period: Duration,
    clock: C,
    mut sink: S,
) -> TickerHandle
where
    C: Clock + Send + 'static,
    S: TimerSink + Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let join = thread::spawn(move || {
        debug!(timers = registry.len(), "ticker started");
        loop {
            match stop_rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {
                    registry.tick(clock.now(), &halftime_label, &mut sink);
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("ticker stopped");
    });
    TickerHandle {
        stop_tx: Some(stop_tx),
        join: Some(join),
    }
}

/// Holds at most one running tick task.
#[derive(Debug, Default)]
pub struct Ticker {
    active: Option<TickerHandle>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the running task, if any, then starts a new one.
    pub fn restart<C, S>(
        &mut self,
        registry: TimerRegistry,
        halftime_label: String,
        period: Duration,
        clock: C,
        sink: S,
    ) where
        C: Clock + Send + 'static,
        S: TimerSink + Send + 'static,
    {
        if let Some(prev) = self.active.take() {
            prev.cancel();
        }
        self.active = Some(start_ticking(registry, halftime_label, period, clock, sink));
    }

    pub fn stop(&mut self) {
        if let Some(prev) = self.active.take() {
            prev.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(TickerHandle::is_running)
    }
}
