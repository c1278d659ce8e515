//! Immutable physical/chemical constants and nominal setpoints (`Parameters`,
//! §3) plus the decay-rate/threshold table for the equipment-health variant
//! (`DamageParams`, §4.3).

use serde::{Deserialize, Serialize};

/// Numerical floor used everywhere a denominator or a log argument could
/// otherwise degenerate to zero (§4.2, last paragraph).
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub q_well_nom: f64,

    pub tds_raw_base: f64,
    pub tds_raw_amp: f64,
    pub h2s_raw_base: f64,
    pub h2s_raw_amp: f64,

    pub recovery_clean: f64,
    pub recovery_dtds: f64,
    pub salt_rejection_clean: f64,
    pub salt_rejection_dtds: f64,
    pub dp_clean_bar: f64,
    pub dp_dtds_bar: f64,

    pub degas_eff: f64,

    pub alkalinity_meq: f64,
    pub naoh_dose_nom: f64,
    pub cl_dose_nom: f64,
    pub tau_ph: f64,

    /// Retained only for backward compatibility of parameter dumps; the
    /// buffered pH model in `model::step` never reads it (§9 Open Questions).
    pub ph_base: f64,

    pub clearwell_area: f64,
    pub clearwell_v_init: f64,

    pub q_out_nom: f64,
    pub tau_pump: f64,

    pub k_cl_base: f64,
    pub k_cl_ph_gain: f64,
    pub k_cl_temp_gain: f64,
    pub temp_c: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            q_well_nom: 100.0,

            tds_raw_base: 2500.0,
            tds_raw_amp: 300.0,
            h2s_raw_base: 2.5,
            h2s_raw_amp: 1.0,

            recovery_clean: 0.75,
            recovery_dtds: 0.02,
            salt_rejection_clean: 0.98,
            salt_rejection_dtds: 0.01,
            dp_clean_bar: 1.0,
            dp_dtds_bar: 0.3,

            degas_eff: 0.9,

            alkalinity_meq: 2.0,
            naoh_dose_nom: 5.0,
            cl_dose_nom: 1.0,
            tau_ph: 60.0,

            ph_base: 7.2,

            clearwell_area: 40.0,
            clearwell_v_init: 200.0,

            q_out_nom: 80.0,
            tau_pump: 30.0,

            k_cl_base: 0.05,
            k_cl_ph_gain: 0.15,
            k_cl_temp_gain: 0.02,
            temp_c: 20.0,
        }
    }
}

/// Decay rates and thresholds for the optional damage model (§4.3). Setting
/// every rate to `0.0` reproduces the damage-free variant (§9).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageParams {
    pub pump_well_deadhead_rate: f64,
    pub pump_feed_suction_rate: f64,
    pub pump_feed_discharge_rate: f64,
    pub pump_dist_dry_rate: f64,
    pub pump_dist_closed_rate: f64,

    pub pipe_well_overpressure_bar: f64,
    pub pipe_well_overpressure_rate: f64,
    pub pipe_feed_overpressure_bar: f64,
    pub pipe_feed_overpressure_rate: f64,
    pub pipe_dist_overpressure_bar: f64,
    pub pipe_dist_overpressure_rate: f64,

    pub membrane_chlorine_limit: f64,
    pub membrane_chlorine_rate: f64,
    pub membrane_overpressure_bar: f64,
    pub membrane_overpressure_rate: f64,

    pub feed_tank_area: f64,
    pub feed_tank_low_suction_m: f64,
    pub tau_pressure: f64,
}

impl Default for DamageParams {
    fn default() -> Self {
        Self {
            pump_well_deadhead_rate: 0.3,
            pump_feed_suction_rate: 0.5,
            pump_feed_discharge_rate: 0.5,
            pump_dist_dry_rate: 0.5,
            pump_dist_closed_rate: 0.3,

            pipe_well_overpressure_bar: 10.0,
            pipe_well_overpressure_rate: 0.2,
            pipe_feed_overpressure_bar: 20.0,
            pipe_feed_overpressure_rate: 0.5,
            pipe_dist_overpressure_bar: 12.0,
            pipe_dist_overpressure_rate: 0.3,

            membrane_chlorine_limit: 0.1,
            membrane_chlorine_rate: 0.2,
            membrane_overpressure_bar: 20.0,
            membrane_overpressure_rate: 1.0,

            feed_tank_area: 10.0,
            feed_tank_low_suction_m: 0.2,
            tau_pressure: 2.0,
        }
    }
}

/// `Damage-free` preset described in §9 Open Questions: every decay path
/// zeroed so equipment health never moves from 100.
impl DamageParams {
    pub fn disabled() -> Self {
        Self {
            pump_well_deadhead_rate: 0.0,
            pump_feed_suction_rate: 0.0,
            pump_feed_discharge_rate: 0.0,
            pump_dist_dry_rate: 0.0,
            pump_dist_closed_rate: 0.0,
            pipe_well_overpressure_rate: 0.0,
            pipe_feed_overpressure_rate: 0.0,
            pipe_dist_overpressure_rate: 0.0,
            membrane_chlorine_rate: 0.0,
            membrane_overpressure_rate: 0.0,
            ..Self::default()
        }
    }
}
