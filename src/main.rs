#![no_std]
#![no_main]

use auto_headlight::controller::Cycle;
use panic_halt as _;
use rtt_target::rprintln;

#[rtic::app(device = stm32f4xx_hal::pac, peripherals = true)]
mod app {
    use auto_headlight::{
        config::{
            ERROR_LOG_CAPACITY, HEADLIGHT_THRESHOLDS, INITIAL_SIGNAL,
            NAV_ILLUMINATION_THRESHOLDS,
        },
        controller::AutoLights,
        errors::Error,
        ldr::Ldr,
    };
    use heapless::spsc::Queue;
    use rtt_target::{rprintln, rtt_init_print};
    use stm32f4xx_hal::{
        adc::{
            config::{AdcConfig, Resolution, SampleTime},
            Adc,
        },
        gpio::{gpioa, gpiob, gpioc, Analog, Output, PushPull},
        pac,
        prelude::*,
        timer::SysDelay,
    };

    type LdrSensor = Ldr<pac::ADC1, Adc<pac::ADC1>, gpioa::PA1<Analog>>;
    type Lights =
        AutoLights<LdrSensor, gpiob::PB12<Output<PushPull>>, gpiob::PB13<Output<PushPull>>>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        lights: Lights,
        delay: SysDelay,
        // On-board LED, mirrors the headlight relay
        led: gpioc::PC13<Output<PushPull>>,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        rtt_init_print!();

        rprintln!("Initializing");

        // Clock setup
        let rcc = ctx.device.RCC.constrain();
        let clocks = rcc.cfgr.sysclk(48.MHz()).freeze();

        rprintln!("Clock setup done");

        // GPIO setup
        let gpioa = ctx.device.GPIOA.split();
        let gpiob = ctx.device.GPIOB.split();
        let gpioc = ctx.device.GPIOC.split();

        // LDR voltage divider on PA1 (ADC1 channel 1). Analog mode disconnects
        // the internal pull-up.
        let ldr_pin = gpioa.pa1.into_analog();
        let adc_config = AdcConfig::default()
            .resolution(Resolution::Ten)
            .default_sample_time(SampleTime::Cycles_480);
        let adc = Adc::adc1(ctx.device.ADC1, true, adc_config);

        // Relays are active high
        let headlight_relay = gpiob.pb12.into_push_pull_output();
        let nav_relay = gpiob.pb13.into_push_pull_output();

        // The LED is active low
        let mut led = gpioc.pc13.into_push_pull_output();
        led.set_high();

        rprintln!("ADC and GPIO setup done");

        let mut lights = AutoLights::new(Ldr::new(adc, ldr_pin), headlight_relay, nav_relay);
        if let Err(e) = lights.init() {
            rprintln!("Could not initialize relays: {}", e.description());
        }
        rprintln!(
            "Headlight band {}..{} ({}), nav illumination band {}..{} ({}), initial signal {}",
            HEADLIGHT_THRESHOLDS.on_limit(),
            HEADLIGHT_THRESHOLDS.off_limit(),
            HEADLIGHT_THRESHOLDS.band(),
            NAV_ILLUMINATION_THRESHOLDS.on_limit(),
            NAV_ILLUMINATION_THRESHOLDS.off_limit(),
            NAV_ILLUMINATION_THRESHOLDS.band(),
            INITIAL_SIGNAL,
        );

        // Nothing else runs, SysTick is free for blocking delays
        let delay = ctx.core.SYST.delay(&clocks);

        rprintln!("Done initializing");

        (Shared {}, Local { lights, delay, led }, init::Monotonics())
    }

    #[idle(local = [lights, delay, led, errors: Queue<Error, ERROR_LOG_CAPACITY> = Queue::new()])]
    fn idle(ctx: idle::Context) -> ! {
        let led = ctx.local.led;
        loop {
            ctx.local
                .lights
                .run_cycle(ctx.local.delay, ctx.local.errors, |cycle, state| {
                    if let Some(cycle) = cycle {
                        crate::log_transitions(cycle);
                    }
                    // The LED is active low
                    if state.headlight().is_on() {
                        led.set_low();
                    } else {
                        led.set_high();
                    }
                });

            while let Some(e) = ctx.local.errors.dequeue() {
                rprintln!(":: Error: {}", e.description());
            }
        }
    }
}

fn log_transitions(cycle: &Cycle) {
    if cycle.headlight.changed {
        rprintln!(
            ":: Headlight transition: {} [signal={}, raw={}]",
            cycle.headlight.state.as_str(),
            cycle.signal,
            cycle.raw,
        );
    }
    if cycle.nav_illumination.changed {
        rprintln!(
            ":: Nav illumination transition: {} [signal={}, raw={}]",
            cycle.nav_illumination.state.as_str(),
            cycle.signal,
            cycle.raw,
        );
    }
}
