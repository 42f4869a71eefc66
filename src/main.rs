//! tickctl - firmware entry point for nRF52840.
//!
//! Priority layout:
//!   - SWI1 interrupt executor (P6): 1 ms tick, SAADC completion, UART receive
//!   - thread mode: the blocking [`Scheduler`] loop (LCD, serial reports)
//!
//! The thread-mode loop owns the LCD bus and busy-waits on it; the
//! interrupt executor preempts it whenever a tick or conversion is due.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt::{info, unwrap, warn};
use embassy_executor::InterruptExecutor;
use embassy_nrf::gpio::{AnyPin, Flex, Input, Level, Output, OutputDrive, Pin, Pull};
use embassy_nrf::interrupt;
use embassy_nrf::interrupt::{InterruptExt, Priority};
use embassy_nrf::peripherals::UARTE0;
use embassy_nrf::saadc::{self, Saadc};
use embassy_nrf::uarte::{self, UarteRx, UarteTx};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Delay, Duration, Ticker};
use {defmt_rtt as _, panic_probe as _};

use tickctl::analog::{AnalogInput, AnalogSample};
use tickctl::bus::{BitBangPort, TwoWireMaster};
use tickctl::config::{SchedulerConfig, TimingConfig, ADC_MAX, BUS_POLL_LIMIT};
use tickctl::lcd::Lcd;
use tickctl::scheduler::Scheduler;
use tickctl::serial::SerialPort;
use tickctl::timing::{SharedTimingState, TimingEngine};

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    UARTE0_UART0 => uarte::InterruptHandler<peripherals::UARTE0>;
});

/// Shared with the tick task; the scheduler only reads it.
static SHARED: SharedTimingState = SharedTimingState::new();
/// Written by the conversion task.
static ANALOG: AnalogSample = AnalogSample::new();

static ADC_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static RX_BYTES: Channel<CriticalSectionRawMutex, u8, 16> = Channel::new();

static EXECUTOR_TICK: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn EGU1_SWI1() {
    EXECUTOR_TICK.on_interrupt()
}

// ═══════════════════════════════════════════════════════════════════════════
// Interrupt-priority tasks
// ═══════════════════════════════════════════════════════════════════════════

/// 1 ms periodic tick: debounce, mode, indicator, ratio output, heartbeat.
#[embassy_executor::task]
async fn tick_task(button: Input<'static>, mut indicator: Output<'static>, mut ratio: Output<'static>) {
    let mut engine = TimingEngine::new(TimingConfig::DEFAULT, &SHARED, &ANALOG);
    let mut ticker = Ticker::every(Duration::from_millis(1));

    loop {
        ticker.next().await;
        // Active-low button.
        let out = engine.tick(|| button.is_low());
        indicator.set_level(Level::from(out.indicator));
        if out.ratio_toggled {
            ratio.set_level(Level::from(SHARED.ratio_level()));
        }
    }
}

/// One conversion per request from the main loop.
#[embassy_executor::task]
async fn adc_task(mut saadc: Saadc<'static, 1>) {
    saadc.calibrate().await;
    let mut buf = [0i16; 1];

    loop {
        ADC_REQUEST.wait().await;
        saadc.sample(&mut buf).await;
        // Single-ended readings can dip slightly below zero.
        let raw = buf[0].max(0) as u16;
        ANALOG.capture(raw.min(ADC_MAX));
    }
}

#[embassy_executor::task]
async fn rx_task(mut rx: UarteRx<'static, UARTE0>) {
    let mut byte = [0u8; 1];

    loop {
        match rx.read(&mut byte).await {
            Ok(()) => {
                // Drop input the main loop has not caught up with.
                let _ = RX_BYTES.try_send(byte[0]);
            }
            Err(e) => warn!("uart rx: {}", e),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Thread-mode adapters
// ═══════════════════════════════════════════════════════════════════════════

/// Conversion trigger. The SAADC powers itself per sample, so gating is a no-op.
struct AdcTrigger;

impl AnalogInput for AdcTrigger {
    fn start_conversion(&mut self) {
        ADC_REQUEST.signal(());
    }
}

struct Uart {
    tx: UarteTx<'static, UARTE0>,
}

impl SerialPort for Uart {
    fn write_byte(&mut self, byte: u8) {
        if let Err(e) = self.tx.blocking_write(&[byte]) {
            warn!("uart tx: {}", e);
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        RX_BYTES.try_receive().ok()
    }
}

/// Open-drain line with pull-up, usable as both input and output.
fn open_drain(pin: AnyPin) -> Flex<'static> {
    let mut line = Flex::new(pin);
    line.set_high();
    line.set_as_input_output(Pull::Up, OutputDrive::Standard0Disconnect1);
    line
}

#[entry]
fn main() -> ! {
    let p = embassy_nrf::init(Default::default());
    info!("tickctl starting");

    // ── Peripherals ──────────────────────────────────────────────────
    let button = Input::new(p.P0_11, Pull::Up);
    let indicator = Output::new(p.P0_13, Level::Low, OutputDrive::Standard);
    let ratio = Output::new(p.P0_14, Level::Low, OutputDrive::Standard);

    let mut adc_config = saadc::Config::default();
    adc_config.resolution = saadc::Resolution::_10BIT;
    let channel = saadc::ChannelConfig::single_ended(p.P0_03);
    let saadc = Saadc::new(p.SAADC, Irqs, adc_config, [channel]);

    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = uarte::Baudrate::BAUD9600;
    let uart = uarte::Uarte::new(p.UARTE0, Irqs, p.P0_08, p.P0_06, uart_config);
    let (tx, rx) = uart.split();

    // ── Interrupt executor ───────────────────────────────────────────
    interrupt::EGU1_SWI1.set_priority(Priority::P6);
    let spawner = EXECUTOR_TICK.start(interrupt::EGU1_SWI1);
    unwrap!(spawner.spawn(tick_task(button, indicator, ratio)));
    unwrap!(spawner.spawn(adc_task(saadc)));
    unwrap!(spawner.spawn(rx_task(rx)));

    // ── Display bus and main loop ────────────────────────────────────
    let port = BitBangPort::new(
        open_drain(p.P0_27.degrade()),
        open_drain(p.P0_26.degrade()),
        Delay,
    );
    let bus = TwoWireMaster::with_poll_limit(port, BUS_POLL_LIMIT);
    let lcd = Lcd::new(bus, Delay);

    let mut scheduler = Scheduler::new(lcd, AdcTrigger, Uart { tx }, SchedulerConfig::DEFAULT);
    if let Err(e) = scheduler.start() {
        warn!("lcd init: {}", e);
    }
    info!("entering main loop");
    scheduler.run(&SHARED, &ANALOG)
}
