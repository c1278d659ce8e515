//! One integration step of the plant dynamics (§4.2).
//!
//! Fixed explicit-Euler step in the ten sub-stages the spec lists, in the
//! order it lists them: time, raw water drift, wellfield ramp, RO, degas,
//! pH buffer, distribution ramp, clearwell mass balance, chlorine CSTR.
//! Instrumentation (step 10) is the caller's job (`sensor::Sensor::step`),
//! since sensors need both the pre- and post-step `PlantState` and a
//! `MeasuredState` the model itself has no business touching.

use std::f64::consts::PI;

use crate::params::{Parameters, EPSILON};
use crate::state::{Controls, PlantState};

/// Advances `state` by `dt` seconds under `controls`.
///
/// `membrane_health_frac` is `1.0` in the damage-free configuration; the
/// damage variant passes in `EquipmentHealth::membrane / 100.0` computed
/// from the *previous* tick, so the base step here stays pure with respect
/// to `damage::step` (no circular dependency within one tick, per §4.3).
pub fn step(state: &mut PlantState, params: &Parameters, controls: &Controls, dt: f64, membrane_health_frac: f64) {
    // 1. Time advance.
    state.t += dt;

    // 2. Raw water drift — the only source of "noise", fully deterministic.
    let theta = 2.0 * PI * ((state.t / 3600.0).rem_euclid(24.0)) / 24.0;
    state.tds_feed = (params.tds_raw_base + params.tds_raw_amp * theta.sin()).max(0.0);
    state.h2s_feed = (params.h2s_raw_base + params.h2s_raw_amp * (theta + PI / 4.0).sin()).max(0.0);

    // 3. Wellfield ramp.
    let q_feed_target = if controls.wellfield_on { params.q_well_nom } else { 0.0 };
    state.q_feed += (dt / params.tau_pump) * (q_feed_target - state.q_feed);
    state.q_feed = state.q_feed.max(0.0);

    // 4. RO unit, algebraic each tick.
    if controls.ro_on && state.q_feed > EPSILON {
        let delta = ((state.tds_feed - params.tds_raw_base) / 1000.0).max(0.0);
        let recovery = (params.recovery_clean - params.recovery_dtds * delta).clamp(0.55, 0.82);
        let salt_rejection = ((params.salt_rejection_clean - params.salt_rejection_dtds * delta)
            .clamp(0.9, 0.99))
            * membrane_health_frac;

        state.q_perm = recovery * state.q_feed;
        state.q_brine = (1.0 - recovery) * state.q_feed;
        state.tds_perm = (1.0 - salt_rejection) * state.tds_feed;
        state.tds_brine = (state.q_feed * state.tds_feed - state.q_perm * state.tds_perm)
            / state.q_brine.max(EPSILON);
        state.dp_ro_true = params.dp_clean_bar + params.dp_dtds_bar * delta;
    } else {
        state.q_perm = 0.0;
        state.q_brine = state.q_feed;
        // tds_perm / tds_brine carried over from the previous tick.
        state.dp_ro_true = 0.0;
    }

    // 5. Degas.
    state.h2s_out = (1.0 - params.degas_eff) * state.h2s_feed;

    // 6. pH buffer dynamics.
    let alkalinity = params.alkalinity_meq * 1e-3;
    let added_hydroxide = controls.naoh_dose.max(0.0) / 40_000.0;
    let h_plus = 10f64.powf(-state.ph_true);
    let oh_minus = (alkalinity + added_hydroxide - h_plus).max(1e-12);
    let ph_target = 14.0 + oh_minus.log10();
    state.ph_true += (dt / params.tau_ph) * (ph_target - state.ph_true);

    // 7. Distribution pump ramp.
    let q_out_target = if controls.dist_pump_on { controls.q_out_sp.max(0.0) } else { 0.0 };
    state.q_out += (dt / params.tau_pump) * (q_out_target - state.q_out);
    state.q_out = state.q_out.max(0.0);

    // 8. Clearwell mass balance.
    state.v_clearwell = (state.v_clearwell + (state.q_perm - state.q_out) * dt / 3600.0).max(0.0);
    state.level_clearwell = state.v_clearwell / params.clearwell_area;

    // 9. Chlorine CSTR.
    let k_cl = params.k_cl_base
        * (1.0
            + params.k_cl_ph_gain * (state.ph_true - 7.0).max(0.0)
            + params.k_cl_temp_gain * (params.temp_c - 20.0).max(0.0));
    let dc_dt = if state.v_clearwell > EPSILON {
        (state.q_perm / state.v_clearwell) * (controls.cl_dose.max(0.0) - state.cl_true) - k_cl * state.cl_true
    } else {
        -params.k_cl_base * state.cl_true
    };
    state.cl_true = (state.cl_true + (dt / 3600.0) * dc_dt).max(0.0);
}
