//! `plant-twin`: a real-time digital twin of a small water treatment
//! plant, reachable over Modbus TCP the way a real PLC/HMI — or an
//! intruder — would reach it.
//!
//! The crate is organized leaf-first, matching the component table in the
//! design spec: [`params`] and [`state`] are plain data; [`sensor`] and
//! [`model`] are pure per-tick transforms; [`damage`] is the optional
//! equipment-health variant layered on top of the base model; [`registers`]
//! is the bit-exact scaled-integer codec; [`gateway`] serves that codec
//! over Modbus TCP; [`plant`] is the facade tying state and model together
//! behind one lock; [`driver`] orchestrates the three at a fixed tick rate.

pub mod config;
pub mod damage;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod model;
pub mod params;
pub mod plant;
pub mod registers;
pub mod sensor;
pub mod state;

pub use config::Config;
pub use error::TwinError;
pub use plant::Plant;
