//! Controls and true/measured state (§3).

use serde::{Deserialize, Serialize};

/// Externally driven controls. Continuous setpoints are clamped into their
/// §3 ranges on every write (see `registers::decode`), not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    pub wellfield_on: bool,
    pub ro_on: bool,
    pub dist_pump_on: bool,

    pub naoh_dose: f64,
    pub cl_dose: f64,
    pub q_out_sp: f64,
}

impl Controls {
    pub const NAOH_DOSE_RANGE: (f64, f64) = (0.0, 50.0);
    pub const CL_DOSE_RANGE: (f64, f64) = (0.0, 10.0);
    pub const Q_OUT_SP_RANGE: (f64, f64) = (0.0, 200.0);

    pub fn nominal(params: &crate::params::Parameters) -> Self {
        Self {
            wellfield_on: true,
            ro_on: true,
            dist_pump_on: true,
            naoh_dose: params.naoh_dose_nom,
            cl_dose: params.cl_dose_nom,
            q_out_sp: params.q_out_nom,
        }
    }
}

/// True process state, mutated only by `model::step` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub t: f64,

    pub q_feed: f64,
    pub q_perm: f64,
    pub q_brine: f64,
    pub q_out: f64,

    pub tds_feed: f64,
    pub tds_perm: f64,
    pub tds_brine: f64,
    pub h2s_feed: f64,
    pub h2s_out: f64,

    pub ph_true: f64,
    pub cl_true: f64,
    pub dp_ro_true: f64,

    pub v_clearwell: f64,
    pub level_clearwell: f64,
}

impl PlantState {
    pub fn initial(params: &crate::params::Parameters) -> Self {
        Self {
            t: 0.0,
            q_feed: 0.0,
            q_perm: 0.0,
            q_brine: 0.0,
            q_out: 0.0,
            tds_feed: params.tds_raw_base,
            tds_perm: 0.0,
            tds_brine: 0.0,
            h2s_feed: params.h2s_raw_base,
            h2s_out: 0.0,
            ph_true: 7.0,
            cl_true: 0.0,
            dp_ro_true: 0.0,
            v_clearwell: params.clearwell_v_init,
            level_clearwell: params.clearwell_v_init / params.clearwell_area,
        }
    }
}

/// First-order-lag-filtered companions to the true state (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasuredState {
    pub q_feed_meas: f64,
    pub q_perm_meas: f64,
    pub level_clearwell_meas: f64,
    pub ph_meas: f64,
    pub cl_meas: f64,
    pub dp_ro_meas: f64,
}

impl MeasuredState {
    pub fn from_true(state: &PlantState) -> Self {
        Self {
            q_feed_meas: state.q_feed,
            q_perm_meas: state.q_perm,
            level_clearwell_meas: state.level_clearwell,
            ph_meas: state.ph_true,
            cl_meas: state.cl_true,
            dp_ro_meas: state.dp_ro_true,
        }
    }
}
