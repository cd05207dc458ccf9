use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use quiz_core::TimerTicket;

/// The single running phase timer. Aborted when dropped.
pub struct PhaseTimer {
    ticket: TimerTicket,
    handle: JoinHandle<()>,
}

impl PhaseTimer {
    /// Call `on_tick` every `period`, first after one full period, until it
    /// returns `false` or the timer is dropped.
    pub fn start<F>(ticket: TimerTicket, period: Duration, on_tick: F) -> Self
    where
        F: Fn(TimerTicket) -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !on_tick(ticket) {
                    break;
                }
            }
        });

        Self { ticket, handle }
    }

    pub fn ticket(&self) -> TimerTicket {
        self.ticket
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
