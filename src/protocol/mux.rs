// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Multiplexer between logical message types and hardware message buffers.
//!
//! - `CanMux` owns the buffer peripheral and programs its priorities and acceptance filters from
//!   the static catalog once, at construction.
//! - `transmit` / `receive` move raw payloads; `send` / `recv` wrap them for typed messages.

use crate::hw::CanBuffers;
use crate::protocol::catalog::{RxKind, TxKind};
use crate::protocol::id::{BufferHeader, NodeId, ACCEPT_MASK, HEADER_WORDS, NODE_ID_MASK};
use crate::protocol::messages::{Payload, Receive, Transmit, PAYLOAD_WORDS};

pub struct CanMux<B: CanBuffers> {
    buffers: B,
    node_id: NodeId,
}

impl<B: CanBuffers> CanMux<B> {
    /// Take over `buffers` and bind them to the catalog.
    ///
    /// `node_id` is latched into the receive filters; accepting a new identity needs a new `CanMux`.
    pub fn new(mut buffers: B, node_id: NodeId) -> Self {
        let node_id = node_id & NODE_ID_MASK;

        for kind in TxKind::ALL {
            let desc = kind.descriptor();
            buffers.set_tx_priority(desc.buffer, desc.priority);
        }

        for kind in RxKind::ALL {
            let accept = kind.accepted_id(node_id).to_raw();
            for &buf in kind.descriptor().buffers {
                buffers.set_filter(buf, accept, ACCEPT_MASK);
            }
        }

        debug!("can mux bound for node {=u8}", node_id);
        Self { buffers, node_id }
    }

    /// Identity the receive filters were programmed with.
    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    #[inline]
    pub fn buffers(&self) -> &B {
        &self.buffers
    }

    #[inline]
    pub fn buffers_mut(&mut self) -> &mut B {
        &mut self.buffers
    }

    /// Queue `payload` as message `kind` from node `src`.
    ///
    /// Returns `false` without touching the buffer if the previous frame of this kind is still
    /// waiting to go out.
    pub fn transmit(&mut self, src: NodeId, kind: TxKind, payload: &Payload) -> bool {
        let index = kind.descriptor().buffer;
        if self.buffers.tx_requested(index) {
            trace!("tx {} dropped, buffer {=u8} busy", kind, index);
            return false;
        }

        let header = BufferHeader::data_frame(kind.id(src).to_raw(), kind.data_len(payload));
        let buf = self.buffers.buffer_mut(index);
        buf[HEADER_WORDS..HEADER_WORDS + PAYLOAD_WORDS].copy_from_slice(payload);
        buf[..HEADER_WORDS].copy_from_slice(&header.words());
        self.buffers.request_tx(index);
        true
    }

    /// Copy the payload of the first full buffer bound to `kind` into `out` and release that
    /// buffer. Returns `false` if none is full.
    pub fn receive(&mut self, kind: RxKind, out: &mut Payload) -> bool {
        let Some(&index) = kind
            .descriptor()
            .buffers
            .iter()
            .find(|&&b| self.buffers.rx_full(b))
        else {
            return false;
        };

        out.copy_from_slice(&self.buffers.buffer(index)[HEADER_WORDS..HEADER_WORDS + PAYLOAD_WORDS]);
        self.buffers.release_rx(index);
        true
    }

    /// Queue a typed message. See [`CanMux::transmit`].
    #[inline]
    pub fn send<M: Transmit>(&mut self, src: NodeId, msg: &M) -> bool {
        self.transmit(src, M::KIND, &msg.to_payload())
    }

    /// Take the next pending message of type `M`, if any.
    pub fn recv<M: Receive>(&mut self) -> Option<M> {
        let mut payload: Payload = [0; PAYLOAD_WORDS];
        self.receive(M::KIND, &mut payload)
            .then(|| M::from_payload(&payload))
    }
}
