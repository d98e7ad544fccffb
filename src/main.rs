// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Servo node firmware entry point.

#![no_main]
#![no_std]

use cortex_m_rt::entry;
use defmt_rtt as _;
use panic_halt as _;

use hal::{
    can::Can,
    i2c::{BlockingI2c, Mode},
    pac,
    prelude::*,
};
use stm32f7xx_hal as hal;

use snode::drivers::ina219::{self, Ina219};
use snode::hw::adc::VsenseAdc;
use snode::hw::can::CanBus;
use snode::hw::flash::SectorFlash;
use snode::hw::pins::{BoardPins, I2c1Scl, I2c1Sda};
use snode::hw::pwm::ServoPwm;
use snode::hw::system::Platform;
use snode::hw::{Board, Parts};
use snode::{params, Node};

/// I2C data timeout in microseconds.
const I2C_TIMEOUT_US: u32 = 10_000;

struct F7Board;

impl Board for F7Board {
    type Can = CanBus<pac::CAN1>;
    type Flash = SectorFlash;
    type System = Platform;
    type Servo = ServoPwm;
    type Power = Ina219<BlockingI2c<pac::I2C1, I2c1Scl, I2c1Sda>>;
    type Analog = VsenseAdc;
}

#[entry]
fn main() -> ! {
    // Peripherals
    let (Some(dp), Some(cp)) = (pac::Peripherals::take(), cortex_m::Peripherals::take()) else {
        panic!("peripherals already taken");
    };

    // Clocks: 216 MHz core, 54 MHz APB1 (CAN bit timing depends on it)
    let rcc = dp.RCC.constrain();
    let clocks = rcc
        .cfgr
        .sysclk(216.MHz())
        .hclk(216.MHz())
        .pclk1(54.MHz())
        .pclk2(108.MHz())
        .freeze();
    let mut apb1 = rcc.apb1;

    let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOD);

    // CAN1
    let can1 = Can::new(dp.CAN1, &mut apb1, (pins.can1.tx, pins.can1.rx));
    let mut can = CanBus::new(can1, params::CAN_BTR);
    can.configure_accept_all_filter();

    // INA219 on I2C1
    let i2c = BlockingI2c::i2c1(
        dp.I2C1,
        (pins.i2c1.scl, pins.i2c1.sda),
        Mode::standard(100.kHz()),
        &clocks,
        &mut apb1,
        I2C_TIMEOUT_US,
    );
    let mut power = Ina219::new(i2c, ina219::DEFAULT_ADDRESS);
    if power
        .configure(ina219::CONFIG_32V_320MV_12BIT, params::INA219_CALIBRATION)
        .is_err()
    {
        defmt::warn!("ina219 not responding");
    }

    let parts = Parts::<F7Board> {
        can,
        flash: SectorFlash::new(dp.FLASH),
        system: Platform::new(cp.SYST, dp.IWDG, clocks.sysclk().raw()),
        servo: ServoPwm::tim4(dp.TIM4, clocks.timclk1().raw()),
        power,
        analog: VsenseAdc::adc1(dp.ADC1),
    };

    let mut node = Node::new(parts);
    defmt::info!("running as node {=u8}", node.node_id());

    loop {
        node.can_mut().poll();
        if node.system_mut().tick_elapsed() {
            node.tick();
        }
    }
}
