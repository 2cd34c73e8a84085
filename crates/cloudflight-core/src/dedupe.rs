//! Change and heartbeat dedupe for decoded signals.

use std::time::{Duration, Instant};

use crate::signal::{DecodedSignal, PowerState};

/// Default minimum interval between repeated battery events.
pub const DEFAULT_BATTERY_MIN_INTERVAL: Duration = Duration::from_secs(15);

/// Controls which decoded signals are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupePolicy {
    /// When false every decoded signal is surfaced
    pub enabled: bool,
    /// Battery heartbeat: an unchanged percentage is re-emitted after this long
    pub battery_min_interval: Duration,
}

impl Default for DedupePolicy {
    fn default() -> Self {
        Self { enabled: true, battery_min_interval: DEFAULT_BATTERY_MIN_INTERVAL }
    }
}

/// Last observed value per channel.
///
/// One instance is shared by every interface of a session, since the
/// channels arrive on different interfaces of the same dongle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Last decoded power state
    pub power: Option<PowerState>,
    /// Last decoded microphone mute state
    pub muted: Option<bool>,
    /// Last decoded charging state
    pub charging: Option<bool>,
    /// Last emitted battery percentage
    pub battery: Option<u8>,
    /// When the last battery event was emitted
    pub battery_emitted_at: Option<Instant>,
}

impl SessionState {
    /// Record a decoded signal and decide whether it should be emitted.
    ///
    /// Power, mute and charging state is always updated to the new value;
    /// battery state only changes when an event is emitted.
    pub fn admit(&mut self, policy: &DedupePolicy, signal: &DecodedSignal, now: Instant) -> bool {
        match signal {
            DecodedSignal::Power(state) => replace_and_compare(&mut self.power, *state, policy),
            DecodedSignal::Muted(muted) => replace_and_compare(&mut self.muted, *muted, policy),
            DecodedSignal::Charging(charging) => {
                replace_and_compare(&mut self.charging, *charging, policy)
            }
            DecodedSignal::Battery(percentage) => self.admit_battery(policy, *percentage, now),
            DecodedSignal::Volume(_) | DecodedSignal::Unknown(_) => true,
        }
    }

    fn admit_battery(&mut self, policy: &DedupePolicy, percentage: u8, now: Instant) -> bool {
        let changed = self.battery != Some(percentage);
        let heartbeat_due = self
            .battery_emitted_at
            .is_none_or(|at| now.saturating_duration_since(at) >= policy.battery_min_interval);

        let emit = !policy.enabled || changed || heartbeat_due;
        if emit {
            self.battery = Some(percentage);
            self.battery_emitted_at = Some(now);
        }
        emit
    }
}

fn replace_and_compare<T: PartialEq + Copy>(
    slot: &mut Option<T>,
    value: T,
    policy: &DedupePolicy,
) -> bool {
    let previous = slot.replace(value);
    !policy.enabled || previous != Some(value)
}
