//! Raw report classification.
//!
//! Reports are told apart purely by their length; the dongle exposes one
//! report shape per channel and no header byte is validated.
//!
//! | Length  | Channel                 |
//! |---------|-------------------------|
//! | 2       | power / microphone mute |
//! | 5       | volume wheel            |
//! | 15, 20  | charge state / battery  |

use crate::battery::{self, CHARGE_STATE_CHARGING, CHARGING_THRESHOLD, FULLY_CHARGED_THRESHOLD};
use crate::signal::{DecodedSignal, PowerState, VolumeDirection};

const POWER_REPORT_ID: u8 = 0x64;
const POWER_OFF: u8 = 0x03;
const POWER_ON: u8 = 0x01;
const MUTE_REPORT_ID: u8 = 0x65;
const MUTED: u8 = 0x04;

const VOLUME_UP: u8 = 0x01;
const VOLUME_DOWN: u8 = 0x02;

/// Decode a raw report into the signals it carries.
///
/// Most reports yield exactly one signal. A status report while charging
/// may yield both `Charging` and `Battery` (in that order), and volume or
/// status reports with unrecognised contents yield nothing.
#[must_use]
pub fn decode(report: &[u8]) -> Vec<DecodedSignal> {
    match *report {
        [first, second] => vec![decode_two_byte(first, second)],
        [_, direction, _, _, _] => decode_volume(direction).into_iter().collect(),
        _ if report.len() == 15 || report.len() == 20 => decode_status(report[3], report[4]),
        _ => vec![DecodedSignal::Unknown(report.to_vec())],
    }
}

fn decode_two_byte(first: u8, second: u8) -> DecodedSignal {
    match (first, second) {
        (POWER_REPORT_ID, POWER_OFF) => DecodedSignal::Power(PowerState::Off),
        (POWER_REPORT_ID, POWER_ON) => DecodedSignal::Power(PowerState::On),
        // Every other two-byte report is a mute status report
        _ => DecodedSignal::Muted(first == MUTE_REPORT_ID && second == MUTED),
    }
}

fn decode_volume(direction: u8) -> Option<DecodedSignal> {
    match direction {
        VOLUME_UP => Some(DecodedSignal::Volume(VolumeDirection::Up)),
        VOLUME_DOWN => Some(DecodedSignal::Volume(VolumeDirection::Down)),
        _ => None,
    }
}

fn decode_status(charge_state: u8, level: u8) -> Vec<DecodedSignal> {
    let magic_value = if level == 0 { charge_state } else { level };
    let mut signals = Vec::with_capacity(2);

    let percentage = if charge_state == CHARGE_STATE_CHARGING {
        signals.push(DecodedSignal::Charging(magic_value >= CHARGING_THRESHOLD));
        (magic_value <= FULLY_CHARGED_THRESHOLD).then_some(100)
    } else {
        battery::estimate(charge_state, magic_value)
    };

    if let Some(percentage) = percentage {
        signals.push(DecodedSignal::Battery(percentage));
    }
    signals
}
