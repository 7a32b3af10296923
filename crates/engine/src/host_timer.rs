//! Authoritative turn clock driver
//!
//! Wraps a [`HostClock`] in a tokio task that calls `on_period` on a fixed
//! interval while the clock runs. The remaining time is published on a
//! watch channel; tick and expiry events go to a caller-provided sink.
//!
//! Every control message opens a new epoch and events carry the epoch they
//! were produced in. An event already in flight when the clock was restarted
//! carries an older epoch than [`HostTimer::epoch`] and can be discarded.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::{HostClock, TimerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    Start,
    Restart,
    Stop,
}

#[derive(Debug)]
pub struct HostTimer {
    control_tx: mpsc::UnboundedSender<TimerControl>,
    epoch: u64,
    task: JoinHandle<()>,
}

impl HostTimer {
    /// Spawn the driver. The clock starts stopped.
    ///
    /// `sink` returns `false` once nobody listens any more, which ends the
    /// task.
    pub fn spawn<F>(
        clock: HostClock,
        period: Duration,
        time_left_tx: watch::Sender<Duration>,
        sink: F,
    ) -> Self
    where
        F: FnMut(u64, TimerEvent) -> bool + Send + 'static,
    {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(clock, period, control_rx, time_left_tx, sink));
        Self {
            control_tx,
            epoch: 0,
            task,
        }
    }

    /// Epoch of the most recent control message
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn start(&mut self) {
        self.control(TimerControl::Start);
    }

    pub fn restart(&mut self) {
        self.control(TimerControl::Restart);
    }

    pub fn stop(&mut self) {
        self.control(TimerControl::Stop);
    }

    pub fn control(&mut self, control: TimerControl) {
        self.epoch += 1;
        if self.control_tx.send(control).is_err() {
            tracing::debug!(?control, "host timer already finished");
        }
    }
}

impl Drop for HostTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive<F>(
    mut clock: HostClock,
    period: Duration,
    mut control_rx: mpsc::UnboundedReceiver<TimerControl>,
    time_left_tx: watch::Sender<Duration>,
    mut sink: F,
) where
    F: FnMut(u64, TimerEvent) -> bool,
{
    let mut epoch = 0u64;
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            control = control_rx.recv() => {
                let Some(control) = control else { break };
                epoch += 1;
                match control {
                    TimerControl::Start => clock.start(),
                    TimerControl::Restart => clock.restart(),
                    TimerControl::Stop => clock.stop(),
                }
                if clock.is_running() {
                    // A full period until the first tick after (re)starting.
                    interval.reset();
                }
                time_left_tx.send_replace(clock.time_left());
            }
            _ = interval.tick(), if clock.is_running() => {
                let Some(event) = clock.on_period() else { continue };
                time_left_tx.send_replace(clock.time_left());
                if !sink(epoch, event) {
                    break;
                }
            }
        }
    }
}
