//! Owns the PROXY v2 header and the upstream stream pair (spec §4.3).

use fnv::FnvHashMap;
use slog::Logger;

use crate::codec;
use crate::config::AdapterConfig;
use crate::contracts::{BufferPool, Frame, FrameSink, HandlerRef, Side, Slot};
use crate::error::EncodeError;
use crate::flow::FlowState;
use crate::ids::StreamId;
use crate::proxy::{encode, BeginEx};

use super::app_half::AppHalf;

/// `flags` value for the fused single-fragment Data frame that carries the
/// pending PROXY v2 header: FIN=1, INIT=1 (spec §4.3).
const FLAG_FUSED: u8 = 0x03;

/// The buffer-pool slot held between `do_net_begin` and the Window that
/// flushes it (spec §3, "Pending-header slot").
struct PendingHeader {
    slot: Slot,
    len: usize,
}

pub struct NetHalf {
    initial_id: StreamId,
    reply_id: StreamId,
    initial_budget: FlowState,
    reply_budget: FlowState,
    pending: Option<PendingHeader>,
    trace: u64,
    auth: u64,
    sink: Box<dyn FrameSink>,
    log: Logger,
}

impl NetHalf {
    pub(crate) fn new(initial_id: StreamId, reply_id: StreamId, sink: Box<dyn FrameSink>, log: Logger) -> Self {
        Self {
            initial_id,
            reply_id,
            initial_budget: FlowState::new(),
            reply_budget: FlowState::new(),
            pending: None,
            trace: 0,
            auth: 0,
            sink,
            log,
        }
    }

    pub fn initial_id(&self) -> StreamId {
        self.initial_id
    }

    pub fn reply_id(&self) -> StreamId {
        self.reply_id
    }

    /// `initial_budget`/`reply_budget` snapshots, for tests and diagnostics.
    pub fn budgets(&self) -> (i32, i32) {
        (self.initial_budget.budget, self.reply_budget.budget)
    }

    /// spec §4.3 `do_net_begin`.
    pub(crate) fn do_net_begin(
        &mut self,
        trace: u64,
        auth: u64,
        affinity: u64,
        begin_ex: Option<&BeginEx>,
        pool: &mut dyn BufferPool,
        correlations: &mut FnvHashMap<StreamId, HandlerRef>,
        config: &AdapterConfig,
        session: usize,
    ) -> Result<(), EncodeError> {
        assert!(
            self.pending.is_none(),
            "do_net_begin called with a pending header slot already held"
        );
        self.trace = trace;
        self.auth = auth;

        let mut scratch = bytes::BytesMut::new();
        match begin_ex {
            None => encode::encode_local(&mut scratch),
            Some(ex) => encode::encode_proxy(&mut scratch, ex, config)?,
        }

        let slot = pool
            .acquire(self.initial_id)
            .expect("buffer pool exhausted on session begin");
        {
            let buf = pool.buffer(slot);
            assert!(
                scratch.len() <= buf.len(),
                "encoded PROXY v2 header does not fit the pool slot"
            );
            buf[..scratch.len()].copy_from_slice(&scratch);
        }
        self.pending = Some(PendingHeader {
            slot,
            len: scratch.len(),
        });

        correlations.insert(self.reply_id, HandlerRef { session, side: Side::Net });

        trace!(self.log, "net begin";
            "initial_id" => self.initial_id.0, "reply_id" => self.reply_id.0, "header_len" => scratch.len());
        codec::emit_begin(&self.log, &mut *self.sink, self.initial_id, trace, auth, affinity, None);
        Ok(())
    }

    /// spec §4.3 `on_net_window`: credits `initial_budget`, flushes the
    /// pending header once enough of it has been granted, then propagates
    /// capacity to `AppHalf`.
    pub(crate) fn on_net_window(
        &mut self,
        credit: i32,
        padding: u32,
        app: &mut AppHalf,
        pool: &mut dyn BufferPool,
        config: &AdapterConfig,
    ) {
        self.initial_budget.add_credit(credit, padding);

        if let Some(pending) = self.pending.take() {
            let reserved = pending.len as u32 + padding;
            let enough = self.initial_budget.budget >= reserved as i32;
            if !config.gate_flush_on_budget || enough {
                let payload = pool.buffer(pending.slot)[..pending.len].to_vec();
                self.initial_budget.budget -= reserved as i32;
                debug!(self.log, "flushing pending PROXY v2 header";
                    "initial_id" => self.initial_id.0, "reserved" => reserved);
                codec::emit_data(&self.log, &mut *self.sink, self.initial_id, reserved, FLAG_FUSED, &payload);
                pool.release(pending.slot);
            } else {
                self.pending = Some(pending);
            }
        }

        app.do_app_window(self.trace, self.auth, self.initial_id.0, self.initial_budget.budget, padding);
    }

    /// spec §4.3 `on_net_data`: inbound Data from the upstream reply.
    pub(crate) fn on_net_data(&mut self, reserved: u32, flags: u8, payload: &[u8], app: &mut AppHalf) {
        match self.reply_budget.reserve(self.reply_id, reserved, false) {
            Ok(()) => app.do_app_data(reserved, flags, payload),
            Err(err) => {
                warn!(self.log, "reply budget violation, resetting"; "error" => %err);
                codec::emit_reset(&self.log, &mut *self.sink, self.reply_id);
                app.do_app_abort();
            }
        }
    }

    /// spec §4.3 `do_net_data`: outbound Data forwarded from the app.
    pub(crate) fn do_net_data(&mut self, reserved: u32, flags: u8, payload: &[u8]) {
        self.initial_budget.budget -= reserved as i32;
        debug_assert!(self.initial_budget.budget >= 0, "initial_budget invariant violated on send");
        codec::emit_data(&self.log, &mut *self.sink, self.initial_id, reserved, flags, payload);
    }

    /// Relays the app's own Window grant upstream (spec §4.2's "forward a
    /// Window to net" row); a pure pass-through, it does not touch either
    /// of this half's own budgets.
    pub(crate) fn forward_window(&mut self, max_budget: i32, min_padding: u32) {
        codec::emit_window(&self.log, &mut *self.sink, self.initial_id, max_budget, min_padding);
    }

    pub(crate) fn do_net_end(&mut self, pool: &mut dyn BufferPool) {
        self.release_unflushed_slot(pool);
        codec::emit_end(&self.log, &mut *self.sink, self.initial_id);
    }

    pub(crate) fn do_net_abort(&mut self, pool: &mut dyn BufferPool) {
        self.release_unflushed_slot(pool);
        codec::emit_abort(&self.log, &mut *self.sink, self.initial_id);
    }

    pub(crate) fn do_net_flush(&mut self) {
        codec::emit_flush(&self.log, &mut *self.sink, self.initial_id);
    }

    /// spec §4.3 `do_net_reset`.
    pub(crate) fn do_net_reset(&mut self, pool: &mut dyn BufferPool, correlations: &mut FnvHashMap<StreamId, HandlerRef>) {
        self.release_unflushed_slot(pool);
        correlations.remove(&self.reply_id);
        codec::emit_reset(&self.log, &mut *self.sink, self.reply_id);
    }

    pub(crate) fn do_net_challenge(&mut self, extension: &[u8]) {
        codec::emit_challenge(&self.log, &mut *self.sink, self.initial_id, extension);
    }

    /// §9's leak fix: release the slot on any terminal transition that
    /// happens before the first Window, not only on the Window flush.
    fn release_unflushed_slot(&mut self, pool: &mut dyn BufferPool) {
        if let Some(pending) = self.pending.take() {
            pool.release(pending.slot);
        }
    }

    /// spec §4.3's dispatch over the seven frame kinds that can arrive on
    /// an established net stream (Begin is consumed once by
    /// `Dispatcher::new_stream` and never reaches here).
    pub(crate) fn on_net_message(
        &mut self,
        frame: Frame,
        app: &mut AppHalf,
        pool: &mut dyn BufferPool,
        correlations: &mut FnvHashMap<StreamId, HandlerRef>,
        config: &AdapterConfig,
    ) {
        match frame {
            Frame::Begin(_) => {
                warn!(self.log, "unexpected Begin on an established net stream"; "reply_id" => self.reply_id.0);
            }
            Frame::Data(d) => self.on_net_data(d.reserved, d.flags, &d.payload, app),
            Frame::End(_) => app.do_app_end(),
            Frame::Abort(_) => app.do_app_abort(),
            Frame::Flush(_) => app.do_app_flush(),
            Frame::Window(w) => self.on_net_window(w.credit, w.padding, app, pool, config),
            Frame::Reset(_) => {
                correlations.remove(&self.reply_id);
                app.do_app_reset();
            }
            Frame::Challenge(c) => app.do_app_challenge(&c.extension),
        }
    }
}
