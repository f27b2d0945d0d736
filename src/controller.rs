//! The polling loop that ties sensor, filter and relays together.

use embedded_hal::{
    blocking::delay::DelayMs,
    digital::v2::{OutputPin, PinState},
};
use heapless::spsc::Queue;

use crate::{
    config::{
        CYCLE_PERIOD_MS, HEADLIGHT_THRESHOLDS, INITIAL_SIGNAL, NAV_ILLUMINATION_THRESHOLDS,
        SMOOTHING_ALPHA,
    },
    errors::Error,
    filter::Filter,
    hysteresis::{HysteresisSwitch, RelayState, Switching},
    ldr::LightSensor,
};

/// Decision state carried from one cycle to the next.
#[derive(Debug, Clone)]
pub struct LightState {
    filter: Filter,
    headlight: HysteresisSwitch,
    nav_illumination: HysteresisSwitch,
}

impl LightState {
    /// Power-up state: signal at `INITIAL_SIGNAL`, both relays off.
    pub fn new() -> Self {
        Self {
            filter: Filter::new(INITIAL_SIGNAL, SMOOTHING_ALPHA),
            headlight: HysteresisSwitch::new(HEADLIGHT_THRESHOLDS),
            nav_illumination: HysteresisSwitch::new(NAV_ILLUMINATION_THRESHOLDS),
        }
    }

    /// Smooth a raw sample and let both relays decide on the result.
    pub fn step(&mut self, raw: u16) -> Cycle {
        let signal = self.filter.update(raw);
        Cycle {
            raw,
            signal,
            headlight: self.headlight.update(signal),
            nav_illumination: self.nav_illumination.update(signal),
        }
    }

    pub fn signal(&self) -> u16 {
        self.filter.signal()
    }

    pub fn headlight(&self) -> RelayState {
        self.headlight.state()
    }

    pub fn nav_illumination(&self) -> RelayState {
        self.nav_illumination.state()
    }
}

impl Default for LightState {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one polling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    /// Sample as read from the ADC
    pub raw: u16,
    /// Smoothed signal the decisions were based on
    pub signal: u16,
    pub headlight: Switching,
    pub nav_illumination: Switching,
}

/// Automatic headlight and nav illumination control.
pub struct AutoLights<S, HL, NAV> {
    sensor: S,
    headlight_relay: HL,
    nav_relay: NAV,
    state: LightState,
}

impl<S, HL, NAV> AutoLights<S, HL, NAV>
where
    S: LightSensor,
    HL: OutputPin,
    NAV: OutputPin,
{
    pub fn new(sensor: S, headlight_relay: HL, nav_relay: NAV) -> Self {
        Self {
            sensor,
            headlight_relay,
            nav_relay,
            state: LightState::new(),
        }
    }

    /// Drive both relays to their power-up state.
    ///
    /// Call this once before the first cycle.
    pub fn init(&mut self) -> Result<(), Error> {
        let headlight = self.write_headlight();
        let nav = self.write_nav_illumination();
        headlight.and(nav)
    }

    /// Run one cycle without waiting.
    ///
    /// Both relays are driven on every cycle, so a failed write is retried on
    /// the next one. If the sensor cannot be read, the state is left alone and
    /// `None` is returned. Errors go to `errors`.
    pub fn poll<const N: usize>(&mut self, errors: &mut Queue<Error, N>) -> Option<Cycle> {
        let cycle = match self.sensor.read() {
            Ok(raw) => Some(self.state.step(raw)),
            Err(e) => {
                e.log(errors);
                None
            }
        };
        if let Err(e) = self.write_headlight() {
            e.log(errors);
        }
        if let Err(e) = self.write_nav_illumination() {
            e.log(errors);
        }
        cycle
    }

    /// Run one cycle, then block for the cycle period.
    ///
    /// `before_wait` sees the cycle and the updated state right after the
    /// relays were driven, so anything that mirrors them changes together.
    pub fn run_cycle<D, F, const N: usize>(
        &mut self,
        delay: &mut D,
        errors: &mut Queue<Error, N>,
        before_wait: F,
    ) -> Option<Cycle>
    where
        D: DelayMs<u16>,
        F: FnOnce(Option<&Cycle>, &LightState),
    {
        let cycle = self.poll(errors);
        before_wait(cycle.as_ref(), &self.state);
        delay.delay_ms(CYCLE_PERIOD_MS);
        cycle
    }

    pub fn state(&self) -> &LightState {
        &self.state
    }

    fn write_headlight(&mut self) -> Result<(), Error> {
        let level = PinState::from(self.state.headlight().is_high());
        self.headlight_relay
            .set_state(level)
            .map_err(|_| Error::HeadlightGpioWriteFailed)
    }

    fn write_nav_illumination(&mut self) -> Result<(), Error> {
        let level = PinState::from(self.state.nav_illumination().is_high());
        self.nav_relay
            .set_state(level)
            .map_err(|_| Error::NavIlluminationGpioWriteFailed)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::VecDeque, rc::Rc, vec::Vec};

    use super::*;
    use crate::config::{ERROR_LOG_CAPACITY, NAV_ILL_ON_VAL};

    type Errors = Queue<Error, ERROR_LOG_CAPACITY>;

    /// Sensor that replays a script of readings
    struct ScriptedSensor(VecDeque<Result<u16, Error>>);

    impl ScriptedSensor {
        fn new(readings: &[Result<u16, Error>]) -> Self {
            Self(readings.iter().copied().collect())
        }
    }

    impl LightSensor for ScriptedSensor {
        fn read(&mut self) -> Result<u16, Error> {
            self.0.pop_front().unwrap_or(Err(Error::AdcReadFailed))
        }
    }

    /// Output pin that records every level written to it
    #[derive(Clone, Default)]
    struct RecordingPin {
        levels: Rc<RefCell<Vec<bool>>>,
        failing: Rc<RefCell<bool>>,
    }

    impl RecordingPin {
        fn levels(&self) -> Vec<bool> {
            self.levels.borrow().clone()
        }

        fn set_failing(&self, failing: bool) {
            *self.failing.borrow_mut() = failing;
        }

        fn write(&mut self, level: bool) -> Result<(), ()> {
            if *self.failing.borrow() {
                return Err(());
            }
            self.levels.borrow_mut().push(level);
            Ok(())
        }
    }

    impl OutputPin for RecordingPin {
        type Error = ();

        fn set_low(&mut self) -> Result<(), ()> {
            self.write(false)
        }

        fn set_high(&mut self) -> Result<(), ()> {
            self.write(true)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingDelay(Rc<RefCell<Vec<u16>>>);

    impl RecordingDelay {
        fn waits(&self) -> Vec<u16> {
            self.0.borrow().clone()
        }
    }

    impl DelayMs<u16> for RecordingDelay {
        fn delay_ms(&mut self, ms: u16) {
            self.0.borrow_mut().push(ms);
        }
    }

    fn setup(
        readings: &[Result<u16, Error>],
    ) -> (
        AutoLights<ScriptedSensor, RecordingPin, RecordingPin>,
        RecordingPin,
        RecordingPin,
    ) {
        let headlight = RecordingPin::default();
        let nav = RecordingPin::default();
        let lights = AutoLights::new(ScriptedSensor::new(readings), headlight.clone(), nav.clone());
        (lights, headlight, nav)
    }

    fn drain(errors: &mut Errors) -> Vec<Error> {
        let mut drained = Vec::new();
        while let Some(e) = errors.dequeue() {
            drained.push(e);
        }
        drained
    }

    #[test]
    fn test_power_up_state() {
        let state = LightState::new();
        assert_eq!(state.signal(), 930);
        assert_eq!(state.headlight(), RelayState::Off);
        assert_eq!(state.nav_illumination(), RelayState::Off);
    }

    #[test]
    fn test_step_smooths_then_decides() {
        let mut state = LightState::new();
        let cycle = state.step(900);
        assert_eq!(cycle.raw, 900);
        assert_eq!(cycle.signal, 928);
        assert!(cycle.headlight.changed);
        assert_eq!(cycle.headlight.state, RelayState::On);
        assert!(!cycle.nav_illumination.changed);
        assert_eq!(cycle.nav_illumination.state, RelayState::Off);
    }

    #[test]
    fn test_bright_keeps_lights_off() {
        let mut state = LightState::new();
        for _ in 0..200 {
            let cycle = state.step(1023);
            assert_eq!(cycle.headlight.state, RelayState::Off);
            assert_eq!(cycle.nav_illumination.state, RelayState::Off);
        }
        assert!(state.signal() > 1000);
    }

    #[test]
    fn test_dusk_and_dawn() {
        let mut state = LightState::new();

        // First dark sample already drags the signal below the headlight limit
        assert_eq!(state.step(0).headlight.state, RelayState::On);

        // The nav illumination follows much later
        let mut cycles = 1;
        while state.nav_illumination().is_off() {
            state.step(0);
            cycles += 1;
            assert!(cycles < 100);
        }
        assert!(cycles > 10, "nav illumination on after {} cycles", cycles);
        assert!(state.signal() < NAV_ILL_ON_VAL);
        assert_eq!(state.headlight(), RelayState::On);

        // Back into daylight, both go off again
        for _ in 0..200 {
            state.step(1023);
        }
        assert_eq!(state.headlight(), RelayState::Off);
        assert_eq!(state.nav_illumination(), RelayState::Off);
    }

    #[test]
    fn test_noise_does_not_toggle() {
        let mut state = LightState::new();
        state.step(900);
        assert_eq!(state.headlight(), RelayState::On);

        // Spikes around the band are smoothed away
        for i in 0..100 {
            let raw = if i % 2 == 0 { 1000 } else { 860 };
            let cycle = state.step(raw);
            assert!(!cycle.headlight.changed, "toggled in cycle {}", i);
        }
    }

    #[test]
    fn test_independent_instances() {
        let mut first = LightState::new();
        let mut second = LightState::new();
        for _ in 0..50 {
            first.step(0);
        }
        assert_eq!(first.nav_illumination(), RelayState::On);
        assert_eq!(second.signal(), 930);
        assert_eq!(second.step(1023).headlight.state, RelayState::Off);
    }

    #[test]
    fn test_init_drives_relays_off() {
        let (mut lights, headlight, nav) = setup(&[]);
        assert_eq!(lights.init(), Ok(()));
        assert_eq!(headlight.levels(), vec![false]);
        assert_eq!(nav.levels(), vec![false]);
    }

    #[test]
    fn test_init_reports_write_error() {
        let (mut lights, headlight, nav) = setup(&[]);
        nav.set_failing(true);
        assert_eq!(lights.init(), Err(Error::NavIlluminationGpioWriteFailed));
        // The other relay is still driven
        assert_eq!(headlight.levels(), vec![false]);
    }

    #[test]
    fn test_poll_drives_relays() {
        let (mut lights, headlight, nav) = setup(&[Ok(1023), Ok(0)]);
        let mut errors = Errors::new();

        let cycle = lights.poll(&mut errors).unwrap();
        assert_eq!(cycle.signal, 934);
        assert_eq!(headlight.levels(), vec![false]);

        let cycle = lights.poll(&mut errors).unwrap();
        assert!(cycle.headlight.changed);
        assert_eq!(headlight.levels(), vec![false, true]);
        assert_eq!(nav.levels(), vec![false, false]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_poll_sensor_error() {
        let (mut lights, headlight, nav) = setup(&[Ok(900), Err(Error::AdcReadFailed)]);
        let mut errors = Errors::new();

        lights.poll(&mut errors).unwrap();
        let signal = lights.state().signal();

        assert_eq!(lights.poll(&mut errors), None);
        assert_eq!(lights.state().signal(), signal);
        assert_eq!(lights.state().headlight(), RelayState::On);
        assert_eq!(drain(&mut errors), vec![Error::AdcReadFailed]);

        // Outputs keep their last decision
        assert_eq!(headlight.levels(), vec![true, true]);
        assert_eq!(nav.levels(), vec![false, false]);
    }

    #[test]
    fn test_poll_write_error_heals() {
        let (mut lights, headlight, nav) = setup(&[Ok(900), Ok(900)]);
        let mut errors = Errors::new();

        headlight.set_failing(true);
        let cycle = lights.poll(&mut errors).unwrap();
        assert_eq!(cycle.headlight.state, RelayState::On);
        assert_eq!(drain(&mut errors), vec![Error::HeadlightGpioWriteFailed]);
        assert!(headlight.levels().is_empty());
        assert_eq!(nav.levels(), vec![false]);

        headlight.set_failing(false);
        let cycle = lights.poll(&mut errors).unwrap();
        assert!(!cycle.headlight.changed);
        assert_eq!(headlight.levels(), vec![true]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_run_cycle_waits() {
        let (mut lights, _headlight, _nav) = setup(&[Ok(900), Err(Error::AdcReadFailed)]);
        let mut errors = Errors::new();
        let mut delay = RecordingDelay::default();

        assert!(lights.run_cycle(&mut delay, &mut errors, |_, _| {}).is_some());
        assert!(lights.run_cycle(&mut delay, &mut errors, |_, _| {}).is_none());
        assert_eq!(delay.waits(), vec![250, 250]);
    }

    #[test]
    fn test_run_cycle_reports_before_waiting() {
        let (mut lights, headlight, _nav) = setup(&[Ok(900), Err(Error::AdcReadFailed)]);
        let mut errors = Errors::new();
        let mut delay = RecordingDelay::default();
        let waits = delay.clone();

        let mut seen = None;
        lights.run_cycle(&mut delay, &mut errors, |cycle, state| {
            // Relay already switched, wait not started yet
            assert!(waits.waits().is_empty());
            assert_eq!(headlight.levels(), vec![true]);
            assert_eq!(state.headlight(), RelayState::On);
            seen = cycle.copied();
        });
        assert!(seen.unwrap().headlight.changed);

        let mut called = false;
        lights.run_cycle(&mut delay, &mut errors, |cycle, state| {
            assert_eq!(waits.waits(), vec![250]);
            assert!(cycle.is_none());
            assert_eq!(state.headlight(), RelayState::On);
            called = true;
        });
        assert!(called);
    }
}
