//! Core library for microscopic simulation of cooperative vehicle platoon
//! formation on a single freeway.
//!
//! The simulation loop ([`simulation::Simulation`]) drives a fixed-length
//! step pipeline — spawn, scheduler actions, lane-change, car-following,
//! position update, collision check, trip completion, time advance — over a
//! columnar [`fleet::Fleet`] and a [`platoon::PlatoonRegistry`]. CLI
//! argument parsing and CSV/file output are caller concerns; this crate owns
//! the validated [`config::Config`] type and the in-memory record types in
//! [`statistics`] that a caller serializes.

pub mod collision;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fleet;
pub mod formation;
pub mod lane_change;
pub mod maneuver;
pub mod models;
pub mod platoon;
pub mod rng;
pub mod road;
pub mod simulation;
pub mod spawner;
pub mod statistics;
pub mod vehicle_type;
