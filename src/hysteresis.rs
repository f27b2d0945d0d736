//! Two-state relay controller with hysteresis.
//!
//! Lower readings mean darker surroundings, so the relay switches on when the
//! signal falls below the ON limit and off again once it rises above the OFF
//! limit. Values inside the band, including both limits, never cause a
//! transition.

/// Output state of a relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Off,
    On,
}

impl RelayState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }

    pub fn is_off(self) -> bool {
        self == Self::Off
    }

    /// Logic level of the output line (relays are active high)
    pub fn is_high(self) -> bool {
        self.is_on()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::On => "On",
        }
    }
}

/// Switching limits of one relay.
///
/// The OFF limit is always strictly above the ON limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Signal values below this turn the relay on
    on_limit: u16,
    /// Signal values above this turn the relay off
    off_limit: u16,
}

impl Thresholds {
    /// Create thresholds with `off_limit = on_limit + margin`.
    ///
    /// Panics (at compile time when used in a const) if the margin is zero
    /// or the OFF limit does not fit into a `u16`.
    pub const fn with_margin(on_limit: u16, margin: u16) -> Self {
        assert!(margin > 0, "hysteresis margin must be positive");
        let off_limit = match on_limit.checked_add(margin) {
            Some(limit) => limit,
            None => panic!("hysteresis off limit overflows"),
        };
        Self {
            on_limit,
            off_limit,
        }
    }

    pub const fn on_limit(&self) -> u16 {
        self.on_limit
    }

    pub const fn off_limit(&self) -> u16 {
        self.off_limit
    }

    /// Width of the dead zone
    pub const fn band(&self) -> u16 {
        self.off_limit - self.on_limit
    }
}

/// Compute the next relay state for the given signal.
pub fn evaluate(signal: u16, state: RelayState, thresholds: &Thresholds) -> RelayState {
    match state {
        RelayState::Off if signal < thresholds.on_limit => RelayState::On,
        RelayState::On if signal > thresholds.off_limit => RelayState::Off,
        unchanged => unchanged,
    }
}

/// Relay controller that keeps its own state.
///
/// The relay starts in the off state.
#[derive(Debug, Clone)]
pub struct HysteresisSwitch {
    thresholds: Thresholds,
    /// Current relay state, used to implement hysteresis
    state: RelayState,
}

impl HysteresisSwitch {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: RelayState::Off,
        }
    }

    pub fn update(&mut self, signal: u16) -> Switching {
        let previous = self.state;
        self.state = evaluate(signal, previous, &self.thresholds);
        Switching {
            state: self.state,
            changed: self.state != previous,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }
}

/// Result of a single switch update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switching {
    /// State after the update
    pub state: RelayState,
    /// Whether the update caused a transition
    pub changed: bool,
}
