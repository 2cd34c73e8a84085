//! Keep-alive scheduler for the status interface.
//!
//! The dongle only emits battery and charging reports while it is poked
//! with a wake-up report now and then. [`KeepAlive`] tracks whether the
//! repeating poke is armed and which handle it writes to; the session
//! worker drives it from its event loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::error::{HidError, HidResult};
use crate::handle::DeviceHandle;

/// Report that asks the dongle to resume periodic status reports.
pub const WAKEUP_REPORT: [u8; 20] = [
    0x21, 0xff, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

enum State {
    Disarmed,
    Armed { ticker: Interval },
}

/// Repeating wake-up writer.
pub struct KeepAlive {
    period: Duration,
    state: State,
    status: Option<Arc<DeviceHandle>>,
}

impl KeepAlive {
    /// Create a disarmed scheduler that pokes every `period` once armed.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self { period, state: State::Disarmed, status: None }
    }

    /// Start the repeating timer if it is not already running.
    ///
    /// The first tick fires one period from now; callers poke immediately
    /// themselves. Returns `true` if the timer was started by this call.
    pub fn arm(&mut self) -> bool {
        if self.is_armed() {
            return false;
        }

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.state = State::Armed { ticker };
        info!(period_ms = self.period.as_millis(), "Keep-alive armed");
        true
    }

    /// Stop the repeating timer. The status handle stays attached.
    ///
    /// Returns `true` if the timer was running.
    pub fn disarm(&mut self) -> bool {
        let was_armed = self.is_armed();
        self.state = State::Disarmed;
        if was_armed {
            info!("Keep-alive disarmed");
        }
        was_armed
    }

    /// Whether the repeating timer is running.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self.state, State::Armed { .. })
    }

    /// Wait for the next tick. Never completes while disarmed.
    pub async fn tick(&mut self) {
        match &mut self.state {
            State::Armed { ticker } => {
                ticker.tick().await;
            }
            State::Disarmed => std::future::pending().await,
        }
    }

    /// Status handle wake-ups are written to, if resolved.
    #[must_use]
    pub fn status(&self) -> Option<&Arc<DeviceHandle>> {
        self.status.as_ref()
    }

    /// Set the status handle wake-ups are written to.
    pub fn attach(&mut self, handle: Arc<DeviceHandle>) {
        debug!(path = %handle.path(), "Keep-alive attached to status interface");
        self.status = Some(handle);
    }

    /// Release the status handle.
    pub fn detach(&mut self) -> Option<Arc<DeviceHandle>> {
        self.status.take()
    }

    /// Write the wake-up report to the attached status handle.
    ///
    /// The write runs on the blocking pool since the status interface's
    /// reader may hold the device for a whole read poll. The returned task
    /// resolves with the write result.
    ///
    /// # Errors
    /// Returns [`HidError::StatusInterfaceNotFound`] if no handle is
    /// attached.
    pub fn poke(&self) -> HidResult<JoinHandle<HidResult<()>>> {
        let handle = Arc::clone(self.status.as_ref().ok_or(HidError::StatusInterfaceNotFound)?);
        Ok(tokio::task::spawn_blocking(move || write_wakeup(&handle)))
    }
}

/// Write the wake-up report to `handle`, blocking until the device is free.
///
/// # Errors
/// Returns [`HidError::WakeupWriteFailure`] if the write fails.
pub fn write_wakeup(handle: &DeviceHandle) -> HidResult<()> {
    handle.write(&WAKEUP_REPORT).map_err(|e| HidError::WakeupWriteFailure {
        path: handle.path().to_string(),
        reason: e.to_string(),
    })?;
    debug!(path = %handle.path(), "Wake-up report sent");
    Ok(())
}
