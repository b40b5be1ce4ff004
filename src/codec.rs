//! Codec helpers (spec §2): thin, stateless wrappers around
//! [`FrameSink`](crate::contracts::FrameSink) that give `AppHalf` and
//! `NetHalf` typed, logged call sites instead of poking the sink's eight
//! methods directly. None of these observe or construct wire bytes; the
//! actual framing is the external codec's job (spec §4.5).

use slog::Logger;

use crate::contracts::FrameSink;
use crate::ids::StreamId;
use crate::proxy::BeginEx;

pub fn emit_begin(
    log: &Logger,
    sink: &mut dyn FrameSink,
    stream: StreamId,
    trace: u64,
    auth: u64,
    affinity: u64,
    begin_ex: Option<&BeginEx>,
) {
    trace!(log, "emit begin"; "stream" => stream.0);
    sink.send_begin(stream, trace, auth, affinity, begin_ex);
}

pub fn emit_data(log: &Logger, sink: &mut dyn FrameSink, stream: StreamId, reserved: u32, flags: u8, payload: &[u8]) {
    trace!(log, "emit data"; "stream" => stream.0, "reserved" => reserved, "flags" => flags, "len" => payload.len());
    sink.send_data(stream, reserved, flags, payload);
}

pub fn emit_end(log: &Logger, sink: &mut dyn FrameSink, stream: StreamId) {
    trace!(log, "emit end"; "stream" => stream.0);
    sink.send_end(stream);
}

pub fn emit_abort(log: &Logger, sink: &mut dyn FrameSink, stream: StreamId) {
    debug!(log, "emit abort"; "stream" => stream.0);
    sink.send_abort(stream);
}

pub fn emit_flush(log: &Logger, sink: &mut dyn FrameSink, stream: StreamId) {
    trace!(log, "emit flush"; "stream" => stream.0);
    sink.send_flush(stream);
}

pub fn emit_window(log: &Logger, sink: &mut dyn FrameSink, stream: StreamId, credit: i32, padding: u32) {
    trace!(log, "emit window"; "stream" => stream.0, "credit" => credit, "padding" => padding);
    sink.send_window(stream, credit, padding);
}

pub fn emit_reset(log: &Logger, sink: &mut dyn FrameSink, stream: StreamId) {
    debug!(log, "emit reset"; "stream" => stream.0);
    sink.send_reset(stream);
}

pub fn emit_challenge(log: &Logger, sink: &mut dyn FrameSink, stream: StreamId, extension: &[u8]) {
    trace!(log, "emit challenge"; "stream" => stream.0, "len" => extension.len());
    sink.send_challenge(stream, extension);
}
