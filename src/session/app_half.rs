//! Terminates the application-facing stream pair (spec §4.2).

use fnv::FnvHashMap;
use slog::Logger;

use crate::codec;
use crate::config::AdapterConfig;
use crate::contracts::{BufferPool, DataView, Frame, FrameSink, HandlerRef, WindowView};
use crate::flow::FlowState;
use crate::ids::StreamId;

use super::net_half::NetHalf;

pub struct AppHalf {
    initial_id: StreamId,
    reply_id: StreamId,
    initial_budget: FlowState,
    reply_budget: FlowState,
    /// Sink for the emissions that travel on `reply_id` (spec §4.2: Data,
    /// End, Abort, Flush).
    sink_reply: Box<dyn FrameSink>,
    /// Sink for the emissions that travel on `initial_id` instead — Reset,
    /// Window and Challenge, "the reply-of-reply direction back to the
    /// application peer" (spec §4.2).
    sink_initial: Box<dyn FrameSink>,
    log: Logger,
}

impl AppHalf {
    pub(crate) fn new(
        initial_id: StreamId,
        reply_id: StreamId,
        sink_reply: Box<dyn FrameSink>,
        sink_initial: Box<dyn FrameSink>,
        log: Logger,
    ) -> Self {
        Self {
            initial_id,
            reply_id,
            initial_budget: FlowState::new(),
            reply_budget: FlowState::new(),
            sink_reply,
            sink_initial,
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

    fn handle_data(&mut self, data: DataView, net: &mut NetHalf, pool: &mut dyn BufferPool) {
        match self.initial_budget.reserve(self.initial_id, data.reserved, true) {
            Ok(()) => net.do_net_data(data.reserved, data.flags, &data.payload),
            Err(err) => {
                warn!(self.log, "inbound budget violation, resetting"; "error" => %err);
                codec::emit_reset(&self.log, &mut *self.sink_initial, self.initial_id);
                net.do_net_abort(pool);
            }
        }
    }

    fn handle_window(&mut self, window: WindowView, net: &mut NetHalf) {
        self.reply_budget.add_credit(window.credit, window.padding);
        net.forward_window(self.reply_budget.budget, window.padding);
    }

    /// spec §4.3's `do_app_window`: converts `NetHalf`'s absolute maximum
    /// budget notification into incremental credit toward the app.
    pub(crate) fn do_app_window(&mut self, trace: u64, auth: u64, budget_id: u64, max_budget: i32, padding: u32) {
        let initial_credit = max_budget - self.initial_budget.budget;
        if initial_credit > 0 {
            self.initial_budget.add_credit(initial_credit, padding);
            trace!(self.log, "app window";
                "stream" => self.initial_id.0, "trace" => trace, "auth" => auth,
                "budget_id" => budget_id, "credit" => initial_credit, "padding" => padding);
            codec::emit_window(&self.log, &mut *self.sink_initial, self.initial_id, initial_credit, padding);
        }
    }

    pub(crate) fn do_app_data(&mut self, reserved: u32, flags: u8, payload: &[u8]) {
        codec::emit_data(&self.log, &mut *self.sink_reply, self.reply_id, reserved, flags, payload);
    }

    pub(crate) fn do_app_end(&mut self) {
        codec::emit_end(&self.log, &mut *self.sink_reply, self.reply_id);
    }

    pub(crate) fn do_app_abort(&mut self) {
        codec::emit_abort(&self.log, &mut *self.sink_reply, self.reply_id);
    }

    pub(crate) fn do_app_flush(&mut self) {
        codec::emit_flush(&self.log, &mut *self.sink_reply, self.reply_id);
    }

    pub(crate) fn do_app_reset(&mut self) {
        codec::emit_reset(&self.log, &mut *self.sink_initial, self.initial_id);
    }

    pub(crate) fn do_app_challenge(&mut self, extension: &[u8]) {
        codec::emit_challenge(&self.log, &mut *self.sink_initial, self.initial_id, extension);
    }

    /// spec §4.2's dispatch over the seven frame kinds that can arrive on
    /// an established app stream (Begin is handled once, by
    /// `Dispatcher::new_stream`, when the session is created).
    pub(crate) fn on_app_message(
        &mut self,
        frame: Frame,
        net: &mut NetHalf,
        pool: &mut dyn BufferPool,
        correlations: &mut FnvHashMap<StreamId, HandlerRef>,
        _config: &AdapterConfig,
    ) {
        match frame {
            Frame::Begin(_) => {
                warn!(self.log, "unexpected Begin on an established app stream"; "initial_id" => self.initial_id.0);
            }
            Frame::Data(data) => self.handle_data(data, net, pool),
            Frame::End(_) => net.do_net_end(pool),
            Frame::Abort(_) => net.do_net_abort(pool),
            Frame::Flush(_) => net.do_net_flush(),
            Frame::Window(window) => self.handle_window(window, net),
            Frame::Reset(_) => net.do_net_reset(pool, correlations),
            Frame::Challenge(c) => net.do_net_challenge(&c.extension),
        }
    }
}
