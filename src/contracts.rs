//! External contracts consumed by this crate (spec §6), plus the tagged
//! union of decoded frame views the nucleus's dispatcher hands us (spec
//! §9: "a tagged-union of frame views with a single `type_id`
//! discriminator is the natural encoding").
//!
//! Everything in this module is a boundary: the route-resolution table,
//! the stream-id factory, the slot-based buffer pool and the control-frame
//! wire codecs themselves are all owned by the surrounding nucleus runtime
//! (spec §1, "out of scope"). This crate only declares the shape it needs
//! from them.

use bytes::Bytes;

use crate::ids::{RouteId, StreamId};
use crate::proxy::BeginEx;

/// The eight control frame kinds (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Begin,
    Data,
    End,
    Abort,
    Flush,
    Window,
    Reset,
    Challenge,
}

impl FrameKind {
    pub const fn type_id(self) -> u32 {
        match self {
            FrameKind::Begin => 0,
            FrameKind::Data => 1,
            FrameKind::End => 2,
            FrameKind::Abort => 3,
            FrameKind::Flush => 4,
            FrameKind::Window => 5,
            FrameKind::Reset => 6,
            FrameKind::Challenge => 7,
        }
    }

    pub fn from_type_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => FrameKind::Begin,
            1 => FrameKind::Data,
            2 => FrameKind::End,
            3 => FrameKind::Abort,
            4 => FrameKind::Flush,
            5 => FrameKind::Window,
            6 => FrameKind::Reset,
            7 => FrameKind::Challenge,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod kind_tests {
    use super::FrameKind;

    const ALL: [FrameKind; 8] = [
        FrameKind::Begin,
        FrameKind::Data,
        FrameKind::End,
        FrameKind::Abort,
        FrameKind::Flush,
        FrameKind::Window,
        FrameKind::Reset,
        FrameKind::Challenge,
    ];

    #[test]
    fn type_id_round_trips_for_every_kind() {
        for kind in ALL {
            assert_eq!(FrameKind::from_type_id(kind.type_id()), Some(kind));
        }
    }

    #[test]
    fn from_type_id_rejects_values_past_the_known_range() {
        assert_eq!(FrameKind::from_type_id(8), None);
        assert_eq!(FrameKind::from_type_id(u32::MAX), None);
    }
}

/// A decoded Begin frame view, handed to `Dispatcher::new_stream` and to
/// `AppHalf::on_app_message`/`NetHalf::on_net_message`.
#[derive(Debug, Clone)]
pub struct BeginView {
    pub stream_id: StreamId,
    pub route_id: RouteId,
    pub auth: u64,
    pub trace: u64,
    pub affinity: u64,
    pub begin_ex: Option<BeginEx>,
}

#[derive(Debug, Clone)]
pub struct DataView {
    pub stream_id: StreamId,
    pub reserved: u32,
    pub flags: u8,
    pub payload: Bytes,
}

#[derive(Debug, Clone, Copy)]
pub struct EndView {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Copy)]
pub struct AbortView {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Copy)]
pub struct FlushView {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, Copy)]
pub struct WindowView {
    pub stream_id: StreamId,
    pub credit: i32,
    pub padding: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ResetView {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone)]
pub struct ChallengeView {
    pub stream_id: StreamId,
    pub extension: Bytes,
}

/// Tagged union over a decoded frame, discriminated by [`FrameKind`].
#[derive(Debug, Clone)]
pub enum Frame {
    Begin(BeginView),
    Data(DataView),
    End(EndView),
    Abort(AbortView),
    Flush(FlushView),
    Window(WindowView),
    Reset(ResetView),
    Challenge(ChallengeView),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Begin(_) => FrameKind::Begin,
            Frame::Data(_) => FrameKind::Data,
            Frame::End(_) => FrameKind::End,
            Frame::Abort(_) => FrameKind::Abort,
            Frame::Flush(_) => FrameKind::Flush,
            Frame::Window(_) => FrameKind::Window,
            Frame::Reset(_) => FrameKind::Reset,
            Frame::Challenge(_) => FrameKind::Challenge,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        match self {
            Frame::Begin(v) => v.stream_id,
            Frame::Data(v) => v.stream_id,
            Frame::End(v) => v.stream_id,
            Frame::Abort(v) => v.stream_id,
            Frame::Flush(v) => v.stream_id,
            Frame::Window(v) => v.stream_id,
            Frame::Reset(v) => v.stream_id,
            Frame::Challenge(v) => v.stream_id,
        }
    }
}

/// Outbound emission sink for one direction of one stream pair.
///
/// A `FrameSink` is obtained from [`Router::supply_receiver`] and is what
/// `AppHalf`/`NetHalf` call to hand a frame to the control-frame codec for
/// encoding and dispatch; this crate never observes the codec's wire
/// layout (spec §4.5).
pub trait FrameSink: Send {
    fn send_begin(&mut self, stream: StreamId, trace: u64, auth: u64, affinity: u64, begin_ex: Option<&BeginEx>);
    fn send_data(&mut self, stream: StreamId, reserved: u32, flags: u8, payload: &[u8]);
    fn send_end(&mut self, stream: StreamId);
    fn send_abort(&mut self, stream: StreamId);
    fn send_flush(&mut self, stream: StreamId);
    fn send_window(&mut self, stream: StreamId, credit: i32, padding: u32);
    fn send_reset(&mut self, stream: StreamId);
    fn send_challenge(&mut self, stream: StreamId, extension: &[u8]);
}

/// A route successfully resolved for an inbound initial Begin.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub route_id: RouteId,
}

/// Which half of a session a registered handler token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    App,
    Net,
}

/// An opaque, copyable token identifying "the message handler" the spec
/// refers to throughout §4: a session arena slot plus which half of the
/// pair should receive the next frame for a given stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerRef {
    pub session: usize,
    pub side: Side,
}

/// Route-resolution table and reverse-direction handler registry (spec
/// §6). Implemented by the surrounding nucleus; this crate only calls it.
pub trait Router {
    /// Look up an outbound route for `route_id`/`auth`, honoring any
    /// extension predicates carried by `begin_ex`. `None` means "no
    /// route" (spec §7, `NoRoute`).
    fn resolve_app(&mut self, route_id: RouteId, auth: u64, begin_ex: Option<&BeginEx>) -> Option<Route>;

    /// Obtain the outbound message sink for `stream_id`.
    fn supply_receiver(&mut self, stream_id: StreamId) -> Box<dyn FrameSink>;

    /// Register `handler` as the recipient for frames arriving on
    /// `stream_id` (the reverse-direction throttle, or the correlation
    /// entry for a reply id).
    fn set_throttle(&mut self, stream_id: StreamId, handler: HandlerRef);
}

/// Stream-id factory (spec §6): produces odd initial ids and deterministically
/// derives the paired even reply id.
pub trait IdSupplier {
    fn supply_initial_id(&mut self, route_id: RouteId) -> StreamId;
    fn supply_reply_id(&mut self, initial_id: StreamId) -> StreamId;
}

/// An opaque handle to a buffer-pool slot (spec §3, "pending-header
/// slot").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub usize);

/// Slot-based buffer pool (spec §6). At most one outstanding slot per
/// `NetHalf`.
pub trait BufferPool {
    fn acquire(&mut self, key: StreamId) -> Option<Slot>;
    fn buffer(&mut self, slot: Slot) -> &mut [u8];
    fn release(&mut self, slot: Slot);
}
