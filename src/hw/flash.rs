// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Configuration page storage in a dedicated STM32F7 flash sector.
//!
//! The page lives at the start of sector 11 (`CONFIG` in `memory.x`). Erasing the page erases the
//! whole sector, which holds nothing else. Programming is done one half-word at a time so the
//! page layout in flash is the same as in RAM.

use core::ptr;

use stm32f7xx_hal::pac;

use crate::hw::{Flash, NvmError, Page, PAGE_WORDS};
use crate::params::CONFIG_PAGE_ADDR;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

// FLASH_SR
const SR_EOP: u32 = 1 << 0;
const SR_OPERR: u32 = 1 << 1;
const SR_WRPERR: u32 = 1 << 4;
const SR_PGAERR: u32 = 1 << 5;
const SR_PGPERR: u32 = 1 << 6;
const SR_ERSERR: u32 = 1 << 7;
const SR_BSY: u32 = 1 << 16;
const SR_ERRORS: u32 = SR_OPERR | SR_WRPERR | SR_PGAERR | SR_PGPERR | SR_ERSERR;

// FLASH_CR
const CR_PG: u32 = 1 << 0;
const CR_SER: u32 = 1 << 1;
const CR_SNB_SHIFT: u32 = 3;
const CR_PSIZE_X16: u32 = 0b01 << 8;
const CR_PSIZE_X32: u32 = 0b10 << 8;
const CR_STRT: u32 = 1 << 16;
const CR_LOCK: u32 = 1 << 31;

/// Sector holding the configuration page.
pub const CONFIG_SECTOR: u8 = 11;

pub struct SectorFlash {
    flash: pac::FLASH,
    base: u32,
    sector: u8,
}

impl SectorFlash {
    /// Configuration sector at [`CONFIG_PAGE_ADDR`].
    pub fn new(flash: pac::FLASH) -> Self {
        Self {
            flash,
            base: CONFIG_PAGE_ADDR,
            sector: CONFIG_SECTOR,
        }
    }

    #[inline]
    pub fn free(self) -> pac::FLASH {
        self.flash
    }

    fn unlock(&mut self) {
        if self.flash.cr.read().bits() & CR_LOCK != 0 {
            self.flash.keyr.write(|w| unsafe { w.bits(KEY1) });
            self.flash.keyr.write(|w| unsafe { w.bits(KEY2) });
        }
    }

    fn lock(&mut self) {
        self.flash.cr.write(|w| unsafe { w.bits(CR_LOCK) });
    }

    fn wait_idle(&self) {
        while self.flash.sr.read().bits() & SR_BSY != 0 {}
    }

    /// Clear EOP and any error flags left from a previous operation.
    fn clear_status(&mut self) {
        self.flash
            .sr
            .write(|w| unsafe { w.bits(SR_EOP | SR_ERRORS) });
    }

    /// Error flags of the last operation, with the controller locked again.
    fn finish(&mut self) -> u16 {
        self.wait_idle();
        let errors = self.flash.sr.read().bits() & SR_ERRORS;
        self.clear_status();
        self.lock();
        errors as u16
    }

    fn check_address(&self, address: u32) -> bool {
        address == self.base
    }
}

impl Flash for SectorFlash {
    fn read_page(&self, address: u32, page: &mut Page) {
        let src = address as *const u16;
        for (i, word) in page.iter_mut().enumerate() {
            *word = unsafe { ptr::read_volatile(src.add(i)) };
        }
    }

    fn erase_page(&mut self, address: u32) -> Result<(), NvmError> {
        if !self.check_address(address) {
            return Err(NvmError::Erase(SR_PGAERR as u16));
        }

        self.wait_idle();
        self.unlock();
        self.clear_status();

        let snb = (self.sector as u32) << CR_SNB_SHIFT;
        self.flash
            .cr
            .write(|w| unsafe { w.bits(CR_SER | snb | CR_PSIZE_X32) });
        self.flash
            .cr
            .modify(|r, w| unsafe { w.bits(r.bits() | CR_STRT) });

        match self.finish() {
            0 => Ok(()),
            errors => Err(NvmError::Erase(errors)),
        }
    }

    fn program_page(&mut self, address: u32, page: &Page) -> Result<(), NvmError> {
        if !self.check_address(address) {
            return Err(NvmError::Program(SR_PGAERR as u16));
        }

        self.wait_idle();
        self.unlock();
        self.clear_status();

        self.flash
            .cr
            .write(|w| unsafe { w.bits(CR_PG | CR_PSIZE_X16) });

        let dst = address as *mut u16;
        for (i, &word) in page.iter().enumerate() {
            unsafe { ptr::write_volatile(dst.add(i), word) };
            cortex_m::asm::dsb();
            self.wait_idle();
            if self.flash.sr.read().bits() & SR_ERRORS != 0 {
                break;
            }
        }

        match self.finish() {
            0 => {}
            errors => return Err(NvmError::Program(errors)),
        }

        let mut readback = [0u16; PAGE_WORDS];
        self.read_page(address, &mut readback);
        if readback != *page {
            return Err(NvmError::Verify);
        }
        Ok(())
    }
}
