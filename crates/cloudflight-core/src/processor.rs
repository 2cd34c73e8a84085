//! Single decoding entry point for a session.

use std::time::Instant;

use tracing::trace;

use crate::decoder::decode;
use crate::dedupe::{DedupePolicy, SessionState};
use crate::signal::{DecodedSignal, HeadsetEvent, PowerState};

/// Outcome of processing one raw report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
    /// Events that passed the dedupe policy, in decode order
    pub events: Vec<HeadsetEvent>,
    /// Power state decoded from the report, even if its event was suppressed
    pub power: Option<PowerState>,
}

/// Decodes reports from every interface of a session against one shared
/// [`SessionState`].
#[derive(Debug, Default)]
pub struct ReportProcessor {
    policy: DedupePolicy,
    state: SessionState,
}

impl ReportProcessor {
    /// Create a processor with a fresh session state.
    #[must_use]
    pub fn new(policy: DedupePolicy) -> Self {
        Self { policy, state: SessionState::default() }
    }

    /// Decode a raw report and filter the result through the dedupe policy.
    pub fn process(&mut self, report: &[u8], now: Instant) -> Processed {
        let mut processed = Processed::default();

        for signal in decode(report) {
            if let DecodedSignal::Power(state) = signal {
                processed.power = Some(state);
            }

            if self.state.admit(&self.policy, &signal, now) {
                processed.events.push(signal.into());
            } else {
                trace!(?signal, "Suppressed duplicate signal");
            }
        }

        processed
    }

    /// Current per-channel state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Active dedupe policy.
    #[must_use]
    pub fn policy(&self) -> &DedupePolicy {
        &self.policy
    }
}
