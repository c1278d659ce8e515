//! Optional equipment-health / damage variant (§4.3).
//!
//! Promoted to a standing module per §9 Open Questions: the damage-free
//! configuration is reached by constructing `DamageParams::disabled()`
//! (every rate zeroed), not by `cfg`-gating this module out. Grounded in
//! `original_source/twin.py`'s `simulate_physics` (the pipe/pump/membrane
//! decay block and the feed-tank/pressure bookkeeping around it).
//!
//! The canonical register map (§4.4) has no coils for the valves
//! `twin.py` reads (`valve_101_open`, `valve_201_open`, ...); this crate's
//! external protocol surface exposes only pump/dose/setpoint controls, so
//! the valve booleans below default open and are unreachable from the
//! gateway. They remain first-class fields — settable via
//! `DamageState::set_valve_*` for direct testing and for any future
//! register-map extension — so the "closed discharge" decay paths the
//! spec describes are implemented faithfully even though nothing on the
//! wire can presently trigger them.

use crate::params::DamageParams;
use crate::state::{Controls, PlantState};

/// Equipment health scores in `[0, 100]`. Monotonically non-increasing
/// except via `reset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquipmentHealth {
    pub membrane: f64,
    pub pump_well: f64,
    pub pump_feed: f64,
    pub pump_dist: f64,
    pub pipe_well: f64,
    pub pipe_feed: f64,
    pub pipe_dist: f64,
}

impl EquipmentHealth {
    pub fn new() -> Self {
        Self {
            membrane: 100.0,
            pump_well: 100.0,
            pump_feed: 100.0,
            pump_dist: 100.0,
            pipe_well: 100.0,
            pipe_feed: 100.0,
            pipe_dist: 100.0,
        }
    }

    /// Explicit operator action (§4.3); never invoked by the gateway.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for EquipmentHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// The feed-tank and lagged-pressure state the damage variant adds on top
/// of the base `PlantState` (§3 Supplemental fields).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageState {
    pub level_feed_tank: f64,
    pub v_feed_tank: f64,

    pub pressure_well: f64,
    pub pressure_feed: f64,
    pub pressure_dist: f64,

    valve_well_open: bool,
    valve_feed_open: bool,
    valve_dist_open: bool,

    pub health: EquipmentHealth,
}

impl DamageState {
    pub fn initial(params: &DamageParams) -> Self {
        let v_feed_tank = params.feed_tank_area * 2.5;
        Self {
            level_feed_tank: v_feed_tank / params.feed_tank_area,
            v_feed_tank,
            pressure_well: 0.0,
            pressure_feed: 0.0,
            pressure_dist: 0.0,
            valve_well_open: true,
            valve_feed_open: true,
            valve_dist_open: true,
            health: EquipmentHealth::new(),
        }
    }

    pub fn set_valve_well(&mut self, open: bool) {
        self.valve_well_open = open;
    }

    pub fn set_valve_feed(&mut self, open: bool) {
        self.valve_feed_open = open;
    }

    pub fn set_valve_dist(&mut self, open: bool) {
        self.valve_dist_open = open;
    }
}

fn lag_toward(current: f64, target: f64, dt: f64, tau: f64) -> f64 {
    let gain = (dt / tau).clamp(0.0, 1.0);
    current + gain * (target - current)
}

/// Runs once per tick, after `model::step` has produced the new `PlantState`
/// (§4.3: "called once per tick, after the base process step"). Health is
/// clamped into `[0, 100]` at every decrement, never recovers except via
/// `EquipmentHealth::reset`.
pub fn step(dt: f64, state: &PlantState, controls: &Controls, params: &DamageParams, damage: &mut DamageState) {
    // Feed-tank mass balance: wellfield output less whatever the RO stage
    // actually draws (zero if RO is off or its discharge valve is shut).
    let q_wellfield_out = if controls.wellfield_on { state.q_feed } else { 0.0 };
    let q_ro_draw = if controls.ro_on && damage.valve_feed_open { state.q_feed } else { 0.0 };
    let cap = params.feed_tank_area * 5.0;
    damage.v_feed_tank = (damage.v_feed_tank + (q_wellfield_out - q_ro_draw) * dt / 3600.0).clamp(0.0, cap);
    damage.level_feed_tank = damage.v_feed_tank / params.feed_tank_area;

    // Lagged pressure targets, grounded in twin.py's per-stage pressure
    // block: an open, flowing path settles to a modest running pressure; a
    // closed/blocked path settles to a deadhead pressure well above the
    // corresponding pipe-overpressure threshold.
    let suction_ok = damage.level_feed_tank > params.feed_tank_low_suction_m;

    let target_well = if controls.wellfield_on {
        if damage.valve_well_open { params.pipe_well_overpressure_bar * 0.3 } else { params.pipe_well_overpressure_bar * 2.0 }
    } else {
        0.0
    };
    let target_feed = if controls.ro_on {
        if !suction_ok || !damage.valve_feed_open {
            params.pipe_feed_overpressure_bar * 2.0
        } else {
            params.pipe_feed_overpressure_bar * 0.6
        }
    } else {
        0.0
    };
    let target_dist = if controls.dist_pump_on && state.level_clearwell > 0.1 {
        if damage.valve_dist_open { params.pipe_dist_overpressure_bar * 0.33 } else { params.pipe_dist_overpressure_bar * 1.25 }
    } else {
        0.0
    };

    damage.pressure_well = lag_toward(damage.pressure_well, target_well, dt, params.tau_pressure);
    damage.pressure_feed = lag_toward(damage.pressure_feed, target_feed, dt, params.tau_pressure);
    damage.pressure_dist = lag_toward(damage.pressure_dist, target_dist, dt, params.tau_pressure);

    let decay = |health: f64, rate: f64| (health - rate * dt).max(0.0);

    // Well pump dead-heading against a closed outlet valve.
    if controls.wellfield_on && !damage.valve_well_open {
        damage.health.pump_well = decay(damage.health.pump_well, params.pump_well_deadhead_rate);
    }

    // RO feed pump: insufficient suction head, or blocked downstream.
    if controls.ro_on && !suction_ok {
        damage.health.pump_feed = decay(damage.health.pump_feed, params.pump_feed_suction_rate);
    }
    if controls.ro_on && !damage.valve_feed_open {
        damage.health.pump_feed = decay(damage.health.pump_feed, params.pump_feed_discharge_rate);
    }

    // Distribution pump: running dry, or against a closed outlet.
    if controls.dist_pump_on && state.level_clearwell < params.feed_tank_low_suction_m {
        damage.health.pump_dist = decay(damage.health.pump_dist, params.pump_dist_dry_rate);
    }
    if controls.dist_pump_on && !damage.valve_dist_open {
        damage.health.pump_dist = decay(damage.health.pump_dist, params.pump_dist_closed_rate);
    }

    // Pipe overpressure, per segment.
    if damage.pressure_well > params.pipe_well_overpressure_bar {
        damage.health.pipe_well = decay(damage.health.pipe_well, params.pipe_well_overpressure_rate);
    }
    if damage.pressure_feed > params.pipe_feed_overpressure_bar {
        damage.health.pipe_feed = decay(damage.health.pipe_feed, params.pipe_feed_overpressure_rate);
    }
    if damage.pressure_dist > params.pipe_dist_overpressure_bar {
        damage.health.pipe_dist = decay(damage.health.pipe_dist, params.pipe_dist_overpressure_rate);
    }

    // Membrane attack: residual chlorine with feed flowing, or overpressure.
    if state.cl_true > params.membrane_chlorine_limit && state.q_feed > 0.0 {
        damage.health.membrane = decay(damage.health.membrane, params.membrane_chlorine_rate);
    }
    if damage.pressure_feed > params.membrane_overpressure_bar {
        damage.health.membrane = decay(damage.health.membrane, params.membrane_overpressure_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameters;

    #[test]
    fn disabled_params_never_move_health() {
        let params = DamageParams::disabled();
        let controls = Controls::nominal(&Parameters::default());
        let mut state = PlantState::initial(&Parameters::default());
        state.cl_true = 50.0; // would attack the membrane under default params
        let mut damage = DamageState::initial(&params);
        damage.set_valve_well(false);
        damage.set_valve_feed(false);
        damage.set_valve_dist(false);
        for _ in 0..1000 {
            step(1.0, &state, &controls, &params, &mut damage);
        }
        assert_eq!(damage.health, EquipmentHealth::new());
    }

    #[test]
    fn well_deadhead_decays_pump_well_health() {
        let params = DamageParams::default();
        let mut controls = Controls::nominal(&Parameters::default());
        controls.wellfield_on = true;
        let state = PlantState::initial(&Parameters::default());
        let mut damage = DamageState::initial(&params);
        damage.set_valve_well(false);
        for _ in 0..10 {
            step(1.0, &state, &controls, &params, &mut damage);
        }
        assert!((damage.health.pump_well - (100.0 - 10.0 * params.pump_well_deadhead_rate)).abs() < 1e-9);
    }

    #[test]
    fn low_suction_decays_feed_pump_health() {
        let params = DamageParams::default();
        let mut controls = Controls::nominal(&Parameters::default());
        controls.ro_on = true;
        let state = PlantState::initial(&Parameters::default());
        let mut damage = DamageState::initial(&params);
        damage.v_feed_tank = 0.0;
        damage.level_feed_tank = 0.0;
        for _ in 0..10 {
            step(1.0, &state, &controls, &params, &mut damage);
        }
        assert!(damage.health.pump_feed < 100.0);
    }

    #[test]
    fn membrane_chlorine_attack_requires_positive_feed_flow() {
        let params = DamageParams::default();
        let controls = Controls::nominal(&Parameters::default());
        let mut state = PlantState::initial(&Parameters::default());
        state.q_feed = 0.0;
        state.cl_true = 5.0;
        let mut damage = DamageState::initial(&params);
        for _ in 0..10 {
            step(1.0, &state, &controls, &params, &mut damage);
        }
        assert_eq!(damage.health.membrane, 100.0);

        state.q_feed = 50.0;
        for _ in 0..10 {
            step(1.0, &state, &controls, &params, &mut damage);
        }
        assert!(damage.health.membrane < 100.0);
    }

    #[test]
    fn health_never_recovers_without_explicit_reset() {
        let params = DamageParams::default();
        let mut controls = Controls::nominal(&Parameters::default());
        let state = PlantState::initial(&Parameters::default());
        let mut damage = DamageState::initial(&params);
        damage.set_valve_well(false);
        controls.wellfield_on = true;
        step(1.0, &state, &controls, &params, &mut damage);
        let after_one = damage.health.pump_well;
        damage.set_valve_well(true);
        for _ in 0..100 {
            step(1.0, &state, &controls, &params, &mut damage);
        }
        assert_eq!(damage.health.pump_well, after_one);
        damage.health.reset();
        assert_eq!(damage.health.pump_well, 100.0);
    }
}
