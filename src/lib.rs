//! Automatic headlight control.
//!
//! A light-dependent resistor is sampled every cycle, smoothed with a
//! fixed-point exponential filter and fed to two relay controllers with
//! hysteresis: one for the headlights and one for the nav screen
//! illumination. The firmware binary wires this up to the hardware.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod controller;
pub mod errors;
pub mod filter;
pub mod hysteresis;
pub mod ldr;
