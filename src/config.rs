//! Compile-time configuration.
//!
//! All values are raw 10-bit ADC counts of the LDR voltage divider. The LDR
//! pulls the reading down as it gets darker, so the ON limit of each output is
//! the lower edge of its hysteresis band.

use crate::hysteresis::Thresholds;

/// Largest value the 10-bit ADC can return
pub const ADC_MAX: u16 = 1023;

/// Base hysteresis margin
pub const HYSTERESIS: u16 = 12;

/// Headlights turn on below this value
pub const LIGHTS_ON_VAL: u16 = 930;
/// Headlights turn off above this value
pub const LIGHTS_OFF_VAL: u16 = LIGHTS_ON_VAL + HYSTERESIS;

/// Nav illumination (dimmed nav screen) turns on below this value
pub const NAV_ILL_ON_VAL: u16 = 330;
/// Nav illumination turns off above this value.
///
/// The LDR swings more in the lower range, so this band is three times wider.
pub const NAV_ILL_OFF_VAL: u16 = NAV_ILL_ON_VAL + 3 * HYSTERESIS;

pub const HEADLIGHT_THRESHOLDS: Thresholds = Thresholds::with_margin(LIGHTS_ON_VAL, HYSTERESIS);
pub const NAV_ILLUMINATION_THRESHOLDS: Thresholds =
    Thresholds::with_margin(NAV_ILL_ON_VAL, 3 * HYSTERESIS);

/// Smoothing coefficient in 1/64 units (alpha = 3/64)
pub const SMOOTHING_ALPHA: u8 = 3;

/// Value of the smoothed signal at power-up
pub const INITIAL_SIGNAL: u16 = LIGHTS_ON_VAL;

/// Length of one polling cycle
pub const CYCLE_PERIOD_MS: u16 = 250;

/// Size of the error log queue
pub const ERROR_LOG_CAPACITY: usize = 8;

const _: () = assert!(LIGHTS_ON_VAL < LIGHTS_OFF_VAL);
const _: () = assert!(NAV_ILL_ON_VAL < NAV_ILL_OFF_VAL);
const _: () = assert!(LIGHTS_OFF_VAL <= ADC_MAX);
const _: () = assert!(SMOOTHING_ALPHA <= 64);
const _: () = assert!(HEADLIGHT_THRESHOLDS.off_limit() == LIGHTS_OFF_VAL);
const _: () = assert!(NAV_ILLUMINATION_THRESHOLDS.off_limit() == NAV_ILL_OFF_VAL);
