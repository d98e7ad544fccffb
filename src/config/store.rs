// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Remote configuration service over the persisted record.
//!
//! Every access reads the page back from flash; nothing is cached in RAM. A write copies the page,
//! changes one field, erases the page and programs it back, with the CPU stalled for both flash
//! operations.

use crate::config::record::{CoeffSet, Coefficients, ConfigRecord, Selector};
use crate::hw::{CanBuffers, Flash, FlowControl, NvmError, Stall, System, PAGE_WORDS};
use crate::params::IDENTITY_RESET_DELAY_MS;
use crate::protocol::id::NodeId;
use crate::protocol::messages::{
    ConfigReadRequest, ConfigReadResponse, ConfigWriteRequest, ConfigWriteResponse, SELECTOR_NODE_ID,
};
use crate::protocol::mux::CanMux;

/// What a call to [`ConfigStore::service`] did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceReport {
    pub write: Option<ConfigWriteResponse>,
    pub read: Option<ConfigReadResponse>,
    /// A device reset was requested after an identity change.
    pub reset: bool,
}

pub struct ConfigStore<F: Flash> {
    flash: F,
    address: u32,
}

impl<F: Flash> ConfigStore<F> {
    /// Serve the record kept in the page at `address`.
    pub fn new(flash: F, address: u32) -> Self {
        Self { flash, address }
    }

    #[inline]
    pub fn flash(&self) -> &F {
        &self.flash
    }

    #[inline]
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// The record as currently persisted.
    pub fn record(&self) -> ConfigRecord {
        let mut page = [0u16; PAGE_WORDS];
        self.flash.read_page(self.address, &mut page);
        ConfigRecord::from_page(&page)
    }

    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.record().node_id()
    }

    /// Fresh copy of one coefficient set.
    #[inline]
    pub fn coefficients(&self, set: CoeffSet) -> Coefficients {
        self.record().coefficients(set)
    }

    /// Apply a write request and persist the result.
    ///
    /// Unknown selectors leave the record as it is but still go through erase and program. If the
    /// erase fails nothing is programmed.
    pub fn write<C>(&mut self, req: &ConfigWriteRequest, flow: &mut C) -> ConfigWriteResponse
    where
        C: FlowControl + ?Sized,
    {
        let mut working = self.record();
        match Selector::from_raw(req.selector) {
            Some(sel) => working.set(sel, req.value()),
            None => debug!("config write: selector {=u16} not defined", req.selector),
        }

        let result = self.persist(&working, flow);
        match result {
            Ok(()) => info!("config write: selector {=u16} stored", req.selector),
            Err(e) => warn!("config write: selector {=u16} failed: {}", req.selector, e),
        }

        ConfigWriteResponse {
            selector: req.selector,
            fault: result.is_err(),
            fault_detail: result.err().map_or(0, |e| e.detail()),
        }
    }

    fn persist<C>(&mut self, record: &ConfigRecord, flow: &mut C) -> Result<(), NvmError>
    where
        C: FlowControl + ?Sized,
    {
        let _stall = Stall::new(flow);
        self.flash.erase_page(self.address)?;
        self.flash.program_page(self.address, record.page())
    }

    /// Answer a read request from the persisted record.
    pub fn read(&self, req: &ConfigReadRequest) -> ConfigReadResponse {
        let value = Selector::from_raw(req.selector).map(|sel| self.record().get(sel));
        debug!("config read: selector {=u16}", req.selector);
        ConfigReadResponse {
            selector: req.selector,
            value,
        }
    }

    /// Serve at most one pending write and then at most one pending read.
    ///
    /// The receive filters only pick up an identity at start-up. A write that leaves the persisted
    /// identity different from the one the filters were built with (a successful identity write,
    /// or a program fault that drops the page back to factory) is followed by a short delay and a
    /// device reset. A successful identity write resets even when the value is unchanged.
    pub fn service<B, S>(&mut self, mux: &mut CanMux<B>, system: &mut S) -> ServiceReport
    where
        B: CanBuffers,
        S: System,
    {
        let mut report = ServiceReport::default();

        if let Some(req) = mux.recv::<ConfigWriteRequest>() {
            let resp = self.write(&req, system);
            mux.send(self.node_id(), &resp);
            report.write = Some(resp);

            let identity_written = req.selector == SELECTOR_NODE_ID && !resp.fault;
            if identity_written || self.node_id() != mux.node_id() {
                warn!(
                    "node id {=u8} -> {=u8}, resetting",
                    mux.node_id(),
                    self.node_id()
                );
                system.delay_ms(IDENTITY_RESET_DELAY_MS);
                system.reset();
                report.reset = true;
            }
        }

        if let Some(req) = mux.recv::<ConfigReadRequest>() {
            let resp = self.read(&req);
            mux.send(self.node_id(), &resp);
            report.read = Some(resp);
        }

        report
    }
}
