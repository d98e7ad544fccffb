// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Driver for the TI INA219 current/power monitor on the servo supply.
//!
//! Talks over any blocking `embedded-hal` 0.2 I2C bus. A failed transfer returns the bus error
//! and also sets a sticky NAK flag, which stays set until [`Ina219::clear_nak`] is called.
//!
//! Example:
//! ```ignore
//! let mut ina = Ina219::new(i2c, ina219::DEFAULT_ADDRESS);
//! ina.configure(ina219::CONFIG_32V_320MV_12BIT, params::INA219_CALIBRATION)?;
//! let mv = ina.bus_voltage_mv()?;
//! ```

use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::hw::{PowerMonitor, PowerSample};

/// 7-bit bus address with A0 = A1 = GND.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// 32 V bus range, ±320 mV shunt range, 12-bit conversions, continuous shunt and bus.
pub const CONFIG_32V_320MV_12BIT: u16 = 0x399F;

/// Bus voltage register LSB in millivolts.
const BUS_VOLTAGE_LSB_MV: u16 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Config = 0x00,
    ShuntVoltage = 0x01,
    BusVoltage = 0x02,
    Power = 0x03,
    Current = 0x04,
    Calibration = 0x05,
}

/// Error type for `Ina219` operations.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// The I2C transfer failed (typically a NAK).
    Bus(E),
    /// The bus voltage register reported a math overflow.
    Overflow,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Bus(e)
    }
}

pub struct Ina219<I2C> {
    i2c: I2C,
    address: u8,
    nak: bool,
}

impl<I2C> Ina219<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            nak: false,
        }
    }

    /// Whether any transfer has failed since the flag was last cleared.
    #[inline]
    pub fn nak_latched(&self) -> bool {
        self.nak
    }

    #[inline]
    pub fn clear_nak(&mut self) {
        self.nak = false;
    }

    /// Consume the driver and return the bus.
    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> Ina219<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    fn latch<T>(&mut self, result: Result<T, E>) -> Result<T, Error<E>> {
        if result.is_err() {
            if !self.nak {
                warn!("ina219: no ack at {=u8:#x}", self.address);
            }
            self.nak = true;
        }
        result.map_err(Error::Bus)
    }

    pub fn write_register(&mut self, reg: Register, value: u16) -> Result<(), Error<E>> {
        let [hi, lo] = value.to_be_bytes();
        let result = self.i2c.write(self.address, &[reg as u8, hi, lo]);
        self.latch(result)
    }

    pub fn read_register(&mut self, reg: Register) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        let result = self.i2c.write_read(self.address, &[reg as u8], &mut buf);
        self.latch(result)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write the configuration and calibration registers.
    pub fn configure(&mut self, config: u16, calibration: u16) -> Result<(), Error<E>> {
        self.write_register(Register::Config, config)?;
        self.write_register(Register::Calibration, calibration)
    }

    /// Bus voltage in millivolts.
    pub fn bus_voltage_mv(&mut self) -> Result<u16, Error<E>> {
        let raw = self.read_register(Register::BusVoltage)?;
        // OVF
        if raw & 0x0001 != 0 {
            return Err(Error::Overflow);
        }
        Ok((raw >> 3) * BUS_VOLTAGE_LSB_MV)
    }

    /// Raw current register, scaled by the calibration value.
    pub fn current_raw(&mut self) -> Result<u16, Error<E>> {
        self.read_register(Register::Current)
    }
}

impl<I2C, E> PowerMonitor for Ina219<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    fn sample(&mut self) -> PowerSample {
        PowerSample {
            bus_voltage_mv: self.bus_voltage_mv().unwrap_or(0),
            current_raw: self.current_raw().unwrap_or(0),
        }
    }
}
