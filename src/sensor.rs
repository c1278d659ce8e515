//! First-order-lag instrumentation (§4.1).
//!
//! A sensor is `(pv_key, meas_key, tau)`; here the string keys become plain
//! function pointers resolved at compile time, so there is no dynamic
//! dispatch and no string lookup in the hot path (§9 Design Notes).

use crate::state::{MeasuredState, PlantState};

pub struct Sensor {
    name: &'static str,
    tau: f64,
    read_pv: fn(&PlantState) -> f64,
    read_meas: fn(&MeasuredState) -> f64,
    write_meas: fn(&mut MeasuredState, f64),
}

impl Sensor {
    pub fn new(
        name: &'static str,
        tau: f64,
        read_pv: fn(&PlantState) -> f64,
        read_meas: fn(&MeasuredState) -> f64,
        write_meas: fn(&mut MeasuredState, f64),
    ) -> Self {
        assert!(tau > 0.0, "sensor {name} requires tau > 0");
        Self {
            name,
            tau,
            read_pv,
            read_meas,
            write_meas,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `meas <- meas + (dt/tau) * (pv - meas)`, the lag filter in §4.1.
    /// Contractive for any `dt >= 0` since the gain is clamped to `[0, 1]`:
    /// `|meas_{n+1} - pv| = |1 - gain| * |meas_n - pv| <= |meas_n - pv|`.
    pub fn step(&self, state: &PlantState, meas: &mut MeasuredState, dt: f64) {
        let pv = (self.read_pv)(state);
        let current = (self.read_meas)(meas);
        let gain = (dt / self.tau).clamp(0.0, 1.0);
        let next = current + gain * (pv - current);
        (self.write_meas)(meas, next);
    }
}

/// Builds the fixed, order-independent list of instrumented PVs named in
/// §3: feed flow, permeate flow, clearwell level, pH, chlorine, RO dP.
pub fn build_sensors() -> Vec<Sensor> {
    vec![
        Sensor::new(
            "q_feed",
            5.0,
            |s| s.q_feed,
            |m| m.q_feed_meas,
            |m, v| m.q_feed_meas = v,
        ),
        Sensor::new(
            "q_perm",
            5.0,
            |s| s.q_perm,
            |m| m.q_perm_meas,
            |m, v| m.q_perm_meas = v,
        ),
        Sensor::new(
            "level_clearwell",
            10.0,
            |s| s.level_clearwell,
            |m| m.level_clearwell_meas,
            |m, v| m.level_clearwell_meas = v,
        ),
        Sensor::new(
            "ph",
            15.0,
            |s| s.ph_true,
            |m| m.ph_meas,
            |m, v| m.ph_meas = v,
        ),
        Sensor::new(
            "cl",
            20.0,
            |s| s.cl_true,
            |m| m.cl_meas,
            |m, v| m.cl_meas = v,
        ),
        Sensor::new(
            "dp_ro",
            5.0,
            |s| s.dp_ro_true,
            |m| m.dp_ro_meas,
            |m, v| m.dp_ro_meas = v,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.1)]
    #[case(1.0)]
    #[case(5.0)]
    #[case(30.0)]
    fn lag_is_contractive(#[case] dt: f64) {
        let sensor = Sensor::new(
            "test",
            5.0,
            |s| s.q_feed,
            |m| m.q_feed_meas,
            |m, v| m.q_feed_meas = v,
        );
        let mut state = PlantState::initial(&crate::params::Parameters::default());
        state.q_feed = 100.0;
        let mut meas = MeasuredState::from_true(&PlantState::initial(&crate::params::Parameters::default()));
        meas.q_feed_meas = 0.0;

        for _ in 0..20 {
            let before = (meas.q_feed_meas - state.q_feed).abs();
            sensor.step(&state, &mut meas, dt);
            let after = (meas.q_feed_meas - state.q_feed).abs();
            assert!(after <= before + 1e-12, "lag must not overshoot the pv");
        }
    }

    #[test]
    fn initial_meas_equals_pv_by_construction() {
        let params = crate::params::Parameters::default();
        let state = PlantState::initial(&params);
        let meas = MeasuredState::from_true(&state);
        assert_eq!(meas.q_feed_meas, state.q_feed);
        assert_eq!(meas.ph_meas, state.ph_true);
    }
}
