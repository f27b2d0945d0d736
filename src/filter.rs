//! Fixed-point exponential smoothing of the raw LDR samples.
//!
//! The smoothing coefficient is given in 1/64 units so that the division can
//! be done with a shift. No floating point code is pulled in.

/// Denominator of the smoothing coefficient
const ALPHA_SCALE: u8 = 64;
const ALPHA_SHIFT: u32 = 6;

/// Blend a new sample into the prior signal.
///
/// Computes `(prior * (64 - alpha64) + new * alpha64) >> 6`, i.e. an
/// exponential moving average with alpha = `alpha64 / 64`, rounded down.
/// Values of `alpha64` above 64 are treated as 64.
pub fn smooth(new_sample: u16, prior_signal: u16, alpha64: u8) -> u16 {
    let alpha = u32::from(alpha64.min(ALPHA_SCALE));
    let acc = u32::from(prior_signal) * (u32::from(ALPHA_SCALE) - alpha)
        + u32::from(new_sample) * alpha;
    // A weighted mean of two u16 values always fits into a u16
    (acc >> ALPHA_SHIFT) as u16
}

/// Exponential smoothing filter that owns its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    /// Current smoothed value
    signal: u16,
    /// Smoothing coefficient in 1/64 units
    alpha64: u8,
}

impl Filter {
    pub fn new(initial: u16, alpha64: u8) -> Self {
        Self {
            signal: initial,
            alpha64: alpha64.min(ALPHA_SCALE),
        }
    }

    /// Feed a raw sample and return the new smoothed signal.
    pub fn update(&mut self, sample: u16) -> u16 {
        self.signal = smooth(sample, self.signal, self.alpha64);
        self.signal
    }

    pub fn signal(&self) -> u16 {
        self.signal
    }
}
