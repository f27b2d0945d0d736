//! The light-dependent resistor, read through an ADC channel.

use core::marker::PhantomData;

use embedded_hal::adc::{Channel, OneShot};

use crate::errors::Error;

/// Source of raw 10-bit light readings
pub trait LightSensor {
    /// Take one sample. Darker surroundings give lower values.
    fn read(&mut self) -> Result<u16, Error>;
}

/// LDR voltage divider connected to an analog input pin.
pub struct Ldr<A, ADC, PIN> {
    adc: ADC,
    pin: PIN,
    _adc: PhantomData<A>,
}

impl<A, ADC, PIN> Ldr<A, ADC, PIN>
where
    ADC: OneShot<A, u16, PIN>,
    PIN: Channel<A>,
{
    /// The ADC must already be configured for 10-bit conversions.
    pub fn new(adc: ADC, pin: PIN) -> Self {
        Self {
            adc,
            pin,
            _adc: PhantomData,
        }
    }
}

impl<A, ADC, PIN> LightSensor for Ldr<A, ADC, PIN>
where
    ADC: OneShot<A, u16, PIN>,
    PIN: Channel<A>,
{
    fn read(&mut self) -> Result<u16, Error> {
        nb::block!(self.adc.read(&mut self.pin)).map_err(|_| Error::AdcReadFailed)
    }
}
