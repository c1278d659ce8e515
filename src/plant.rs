//! `Plant`: the facade owning the process model's state, the damage
//! variant's state, and the immutable parameter sets behind a single
//! `parking_lot::Mutex` (§4.6 ambient stack, §9 Design Note — two
//! independent locks total in the binary: this one over plant physics,
//! and `gateway::RegisterBank`'s over the published registers).

use log::debug;
use parking_lot::Mutex;

use crate::damage::{self, DamageState, EquipmentHealth};
use crate::model;
use crate::params::{DamageParams, Parameters};
use crate::sensor::{self, Sensor};
use crate::state::{Controls, MeasuredState, PlantState};

/// A point-in-time copy of everything the out-of-scope observer interface
/// (§6) would serialize as `{time_s, state, params, ...}`. `controls` is
/// deliberately absent: the live register bank, not `Plant`, is the source
/// of truth for controls, and the spec requires any such surface to read
/// controls from the bank under its own mutex rather than bypass it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub time_s: f64,
    pub state: PlantState,
    pub measured: MeasuredState,
    pub damage: DamageState,
    pub params: Parameters,
}

struct Inner {
    state: PlantState,
    measured: MeasuredState,
    damage: DamageState,
}

pub struct Plant {
    params: Parameters,
    damage_params: DamageParams,
    sensors: Vec<Sensor>,
    inner: Mutex<Inner>,
}

impl Plant {
    pub fn new(params: Parameters, damage_params: DamageParams) -> Self {
        let state = PlantState::initial(&params);
        let measured = MeasuredState::from_true(&state);
        let damage = DamageState::initial(&damage_params);
        Self {
            params,
            damage_params,
            sensors: sensor::build_sensors(),
            inner: Mutex::new(Inner { state, measured, damage }),
        }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Iterates the process model with nominal controls for `steps` ticks
    /// of `dt` seconds to reach steady state before the driver and gateway
    /// start observing it (§3 Lifecycle: ~15 simulated minutes = 900 x 1 s
    /// steps by default, via `TWIN_WARMUP_STEPS`).
    pub fn warm_start(&self, steps: u64, dt: f64) {
        let controls = Controls::nominal(&self.params);
        let mut guard = self.inner.lock();
        for _ in 0..steps {
            self.step_locked(&mut guard, dt, &controls);
        }
        debug!(target: "plant", "warm start complete: {steps} steps at dt={dt}s, t={}s", guard.state.t);
    }

    /// One tick: model step, damage step (using last tick's membrane
    /// health), then every sensor. Returns the freshly updated measured
    /// state for the caller to publish to the register bank.
    pub fn step(&self, dt: f64, controls: &Controls) -> MeasuredState {
        let mut guard = self.inner.lock();
        self.step_locked(&mut guard, dt, controls);
        guard.measured
    }

    fn step_locked(&self, guard: &mut Inner, dt: f64, controls: &Controls) {
        let membrane_frac = guard.damage.health.membrane / 100.0;
        model::step(&mut guard.state, &self.params, controls, dt, membrane_frac);
        for sensor in &self.sensors {
            sensor.step(&guard.state, &mut guard.measured, dt);
        }
        damage::step(dt, &guard.state, controls, &self.damage_params, &mut guard.damage);
    }

    /// Clones the current state under the same lock used by `step`, so the
    /// two are mutually exclusive and never observe a torn update (§5).
    pub fn snapshot(&self) -> Snapshot {
        let guard = self.inner.lock();
        Snapshot {
            time_s: guard.state.t,
            state: guard.state,
            measured: guard.measured,
            damage: guard.damage,
            params: self.params,
        }
    }

    /// Explicit operator action (§4.3); not reachable from the Modbus
    /// register map.
    pub fn reset_damage(&self) {
        let mut guard = self.inner.lock();
        guard.damage.health = EquipmentHealth::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_start_reaches_steady_state() {
        let plant = Plant::new(Parameters::default(), DamageParams::default());
        plant.warm_start(900, 1.0);
        let snap = plant.snapshot();
        assert!((snap.state.q_feed - 100.0).abs() < 1.0);
        assert!((snap.state.q_perm - 75.0).abs() < 2.0);
    }

    #[test]
    fn step_and_snapshot_agree() {
        let plant = Plant::new(Parameters::default(), DamageParams::default());
        let controls = Controls::nominal(&Parameters::default());
        let measured = plant.step(1.0, &controls);
        let snap = plant.snapshot();
        assert_eq!(measured, snap.measured);
    }

    #[test]
    fn reset_damage_restores_full_health() {
        let params = DamageParams::default();
        let plant = Plant::new(Parameters::default(), params);
        let mut controls = Controls::nominal(&Parameters::default());
        controls.ro_on = true;
        for _ in 0..50 {
            plant.step(1.0, &controls);
        }
        plant.reset_damage();
        assert_eq!(plant.snapshot().damage.health, EquipmentHealth::new());
    }
}
