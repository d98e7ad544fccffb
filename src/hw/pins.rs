// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F777 servo node board.

use stm32f7xx_hal::{
    gpio::{gpioa, gpiob, gpiod, Alternate, Analog, OpenDrain},
    pac,
    prelude::*,
};

pub type I2c1Scl = gpiob::PB8<Alternate<4, OpenDrain>>;
pub type I2c1Sda = gpiob::PB9<Alternate<4, OpenDrain>>;

/// All board pins. Construct this once at startup using:
///
/// ```ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOD);
/// ```
pub struct BoardPins {
    pub can1: Can1Pins,
    pub servo: ServoPins,
    pub i2c1: I2c1Pins,
    pub vsense: VsensePins,
}

/// CAN1 bus pins
pub struct Can1Pins {
    pub tx: gpioa::PA12<Alternate<9>>,
    pub rx: gpioa::PA11<Alternate<9>>,
}

/// Servo pulse output
pub struct ServoPins {
    pub pwm: gpiod::PD12<Alternate<2>>, // TIM4_CH1
}

/// INA219 bus
pub struct I2c1Pins {
    pub scl: I2c1Scl,
    pub sda: I2c1Sda,
}

/// Voltage sense inputs
pub struct VsensePins {
    pub vsense1: gpioa::PA3<Analog>, // ADC1_IN3
    pub vsense2: gpioa::PA4<Analog>, // ADC1_IN4
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(gpioa: pac::GPIOA, gpiob: pac::GPIOB, gpiod: pac::GPIOD) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();
        let gpiod = gpiod.split();

        Self {
            can1: Can1Pins {
                tx: gpioa.pa12.into_alternate::<9>(),
                rx: gpioa.pa11.into_alternate::<9>().internal_pull_up(true),
            },

            servo: ServoPins {
                pwm: gpiod.pd12.into_alternate::<2>(),
            },

            i2c1: I2c1Pins {
                scl: gpiob.pb8.into_alternate_open_drain::<4>(),
                sda: gpiob.pb9.into_alternate_open_drain::<4>(),
            },

            vsense: VsensePins {
                vsense1: gpioa.pa3.into_analog(),
                vsense2: gpioa.pa4.into_analog(),
            },
        }
    }
}
