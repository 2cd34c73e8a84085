//! Battery percentage estimation.
//!
//! The headset does not report a percentage. Status reports carry a charge
//! state byte selecting a regime and a "magic" level byte whose meaning
//! depends on that regime. The bands below map the level byte to the
//! percentage the vendor software shows. They are not linear and the band
//! edges mix open and closed bounds; boundary values belong to exactly one
//! band, and a few values fall into no band at all.

/// Charge state while the headset is on the charger.
pub const CHARGE_STATE_CHARGING: u8 = 0x10;
/// Charge state for the upper half of the battery range.
pub const CHARGE_STATE_HIGH: u8 = 0x0f;
/// Charge state for the lower half of the battery range.
pub const CHARGE_STATE_LOW: u8 = 0x0e;

/// Level at or above which a charging headset reports itself as charging.
pub const CHARGING_THRESHOLD: u8 = 20;
/// Level at or below which a charging headset is considered full.
pub const FULLY_CHARGED_THRESHOLD: u8 = 11;

/// Estimate the battery percentage for a discharging headset.
///
/// Returns `None` for charge states other than [`CHARGE_STATE_HIGH`] and
/// [`CHARGE_STATE_LOW`], and for level values outside every band.
#[must_use]
pub fn estimate(charge_state: u8, magic_value: u8) -> Option<u8> {
    match charge_state {
        CHARGE_STATE_HIGH => high_band(magic_value),
        CHARGE_STATE_LOW => low_band(magic_value),
        _ => None,
    }
}

fn high_band(value: u8) -> Option<u8> {
    let percentage = match value {
        130.. => 100,
        120..130 => 95,
        100..120 => 90,
        70..100 => 85,
        50..70 => 80,
        20..50 => 75,
        1..20 => 70,
        0 => return None,
    };
    Some(percentage)
}

fn low_band(value: u8) -> Option<u8> {
    let percentage = match value {
        241..250 => 65,
        220..240 => 60,
        208..220 => 55,
        200..208 => 50,
        190..200 => 45,
        180..190 => 40,
        169..179 => 35,
        159..169 => 30,
        148..159 => 25,
        119..148 => 20,
        90..119 => 15,
        0..90 => 10,
        // 179, 240 and 250.. are not covered by any band
        _ => return None,
    };
    Some(percentage)
}
