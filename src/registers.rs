//! Bidirectional scaled-integer <-> engineering-unit projection (§4.4).
//!
//! This is the bit-exact contract external PLC/HMI clients and the
//! simulation driver both compile against; every scale and index here is
//! taken verbatim from the canonical register map table.

use crate::state::{Controls, MeasuredState, PlantState};

pub const COIL_WELLFIELD_ON: usize = 0;
pub const COIL_RO_ON: usize = 1;
pub const COIL_DIST_PUMP_ON: usize = 2;
pub const NUM_COILS: usize = 3;

pub const HOLD_Q_FEED_MEAS: usize = 0;
pub const HOLD_Q_PERM_MEAS: usize = 1;
pub const HOLD_LEVEL_CLEARWELL_MEAS: usize = 2;
pub const HOLD_PH_MEAS: usize = 3;
pub const HOLD_CL_MEAS: usize = 4;
pub const HOLD_TDS_PERM: usize = 5;
pub const HOLD_DP_RO_MEAS: usize = 6;
/// One past the highest read-only measurement holding; also the start of
/// the dead band between the measurement block and the setpoint block.
pub const NUM_MEASURED_HOLDINGS: usize = 7;

pub const HOLD_NAOH_DOSE: usize = 100;
pub const HOLD_CL_DOSE: usize = 101;
pub const HOLD_Q_OUT_SP: usize = 102;

const SCALE_Q_FEED_MEAS: f64 = 10.0;
const SCALE_Q_PERM_MEAS: f64 = 10.0;
const SCALE_LEVEL_CLEARWELL_MEAS: f64 = 100.0;
const SCALE_PH_MEAS: f64 = 100.0;
const SCALE_CL_MEAS: f64 = 100.0;
const SCALE_TDS_PERM: f64 = 1.0;
const SCALE_DP_RO_MEAS: f64 = 100.0;
const SCALE_NAOH_DOSE: f64 = 100.0;
const SCALE_CL_DOSE: f64 = 100.0;
const SCALE_Q_OUT_SP: f64 = 10.0;

/// Encodes a non-negative engineering value at the given scale, saturating
/// to `[0, 65535]` and rounding half-to-even (`f64::round` ties away from
/// zero is close enough at these scales; `round_ties_even` is used where
/// available to match the spec's "round-half-to-even (or nearest)" clause).
fn encode(value: f64, scale: f64) -> u16 {
    let scaled = (value.max(0.0) * scale).round_ties_even();
    if scaled <= 0.0 {
        0
    } else if scaled >= u16::MAX as f64 {
        u16::MAX
    } else {
        scaled as u16
    }
}

fn decode(raw: u16, scale: f64) -> f64 {
    raw as f64 / scale
}

/// Encodes the three writable setpoints at construction / reset time.
pub fn encode_naoh_dose(value: f64) -> u16 {
    encode(value.clamp(Controls::NAOH_DOSE_RANGE.0, Controls::NAOH_DOSE_RANGE.1), SCALE_NAOH_DOSE)
}

pub fn encode_cl_dose(value: f64) -> u16 {
    encode(value.clamp(Controls::CL_DOSE_RANGE.0, Controls::CL_DOSE_RANGE.1), SCALE_CL_DOSE)
}

pub fn encode_q_out_sp(value: f64) -> u16 {
    encode(value.clamp(Controls::Q_OUT_SP_RANGE.0, Controls::Q_OUT_SP_RANGE.1), SCALE_Q_OUT_SP)
}

/// Re-encodes a raw write to one of the three setpoint holdings, clamping
/// the decoded engineering value into its §3 range first so the register
/// reads back the clamped value afterwards, per §4.4's last paragraph and
/// the corresponding testable property in §8.
///
/// Returns `None` for any address that is not a writable setpoint.
pub fn clamp_setpoint_write(addr: usize, raw: u16) -> Option<u16> {
    match addr {
        HOLD_NAOH_DOSE => Some(encode_naoh_dose(decode(raw, SCALE_NAOH_DOSE))),
        HOLD_CL_DOSE => Some(encode_cl_dose(decode(raw, SCALE_CL_DOSE))),
        HOLD_Q_OUT_SP => Some(encode_q_out_sp(decode(raw, SCALE_Q_OUT_SP))),
        _ => None,
    }
}

/// `true` for any holding address external clients may write. The
/// measurement block (§4.4, indices `0..NUM_MEASURED_HOLDINGS`) is the
/// only reserved read-only range; everything at or past the setpoint
/// block is writable.
pub fn is_writable_holding(addr: usize) -> bool {
    addr >= NUM_MEASURED_HOLDINGS
}

/// Decodes the controls record the driver feeds into `model::step` (§4.6
/// step 1). Setpoints are clamped on *read* too, defensively, even though
/// every write path already clamps on the way in.
pub fn decode_controls(coils: &[bool], holdings: &[u16]) -> Controls {
    let coil = |i: usize| coils.get(i).copied().unwrap_or(false);
    let holding = |i: usize| holdings.get(i).copied().unwrap_or(0);

    Controls {
        wellfield_on: coil(COIL_WELLFIELD_ON),
        ro_on: coil(COIL_RO_ON),
        dist_pump_on: coil(COIL_DIST_PUMP_ON),
        naoh_dose: decode(holding(HOLD_NAOH_DOSE), SCALE_NAOH_DOSE)
            .clamp(Controls::NAOH_DOSE_RANGE.0, Controls::NAOH_DOSE_RANGE.1),
        cl_dose: decode(holding(HOLD_CL_DOSE), SCALE_CL_DOSE)
            .clamp(Controls::CL_DOSE_RANGE.0, Controls::CL_DOSE_RANGE.1),
        q_out_sp: decode(holding(HOLD_Q_OUT_SP), SCALE_Q_OUT_SP)
            .clamp(Controls::Q_OUT_SP_RANGE.0, Controls::Q_OUT_SP_RANGE.1),
    }
}

/// Encodes the measured holdings block (§4.6 step 3). `TDS_perm` is the
/// one row in the table that is not a sensor-lagged companion — the table
/// names it bare (`TDS_perm`, not `TDS_perm_meas`), so it is read straight
/// off the true state rather than `MeasuredState`.
pub fn encode_measured(state: &PlantState, measured: &MeasuredState, holdings: &mut [u16]) {
    holdings[HOLD_Q_FEED_MEAS] = encode(measured.q_feed_meas, SCALE_Q_FEED_MEAS);
    holdings[HOLD_Q_PERM_MEAS] = encode(measured.q_perm_meas, SCALE_Q_PERM_MEAS);
    holdings[HOLD_LEVEL_CLEARWELL_MEAS] = encode(measured.level_clearwell_meas, SCALE_LEVEL_CLEARWELL_MEAS);
    holdings[HOLD_PH_MEAS] = encode(measured.ph_meas, SCALE_PH_MEAS);
    holdings[HOLD_CL_MEAS] = encode(measured.cl_meas, SCALE_CL_MEAS);
    holdings[HOLD_TDS_PERM] = encode(state.tds_perm, SCALE_TDS_PERM);
    holdings[HOLD_DP_RO_MEAS] = encode(measured.dp_ro_meas, SCALE_DP_RO_MEAS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 100.0)]
    #[case(7.234, 100.0)]
    #[case(655.35, 100.0)]
    #[case(80.0, 10.0)]
    fn encode_decode_round_trips_within_scale_precision(#[case] value: f64, #[case] scale: f64) {
        let raw = encode(value, scale);
        let back = decode(raw, scale);
        assert!((back - value.max(0.0)).abs() <= 1.0 / scale + 1e-9);
    }

    #[test]
    fn decode_encode_identity_on_holding() {
        let raw: u16 = 1234;
        let back = decode(raw, SCALE_PH_MEAS);
        let re = encode(back, SCALE_PH_MEAS);
        assert_eq!(raw, re);
    }

    #[test]
    fn encode_saturates_to_u16_range() {
        assert_eq!(encode(-5.0, 100.0), 0);
        assert_eq!(encode(1_000_000.0, 100.0), u16::MAX);
    }

    #[test]
    fn setpoint_writes_are_clamped_not_rejected() {
        // NaOH 999 mg/L encoded at x100 overflows u16; the decode must
        // clamp into [0, 50] before being re-encoded for storage.
        let raw_over_range = encode(999.0, SCALE_NAOH_DOSE);
        let stored = clamp_setpoint_write(HOLD_NAOH_DOSE, raw_over_range).unwrap();
        let readback = decode(stored, SCALE_NAOH_DOSE);
        assert!((readback - Controls::NAOH_DOSE_RANGE.1).abs() < 1e-9);
    }

    #[test]
    fn measurement_block_is_not_writable() {
        assert!(!is_writable_holding(HOLD_PH_MEAS));
        assert!(!is_writable_holding(HOLD_TDS_PERM));
        assert!(is_writable_holding(HOLD_NAOH_DOSE));
        assert!(is_writable_holding(HOLD_Q_OUT_SP));
    }

    #[test]
    fn decode_controls_reads_canonical_indices() {
        let coils = [true, false, true];
        let mut holdings = vec![0u16; 103];
        holdings[HOLD_NAOH_DOSE] = encode_naoh_dose(20.0);
        holdings[HOLD_CL_DOSE] = encode_cl_dose(1.5);
        holdings[HOLD_Q_OUT_SP] = encode_q_out_sp(90.0);

        let controls = decode_controls(&coils, &holdings);
        assert!(controls.wellfield_on);
        assert!(!controls.ro_on);
        assert!(controls.dist_pump_on);
        assert!((controls.naoh_dose - 20.0).abs() < 1e-9);
        assert!((controls.cl_dose - 1.5).abs() < 1e-9);
        assert!((controls.q_out_sp - 90.0).abs() < 1e-9);
    }
}
