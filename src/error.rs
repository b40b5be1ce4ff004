//! Error kinds, per spec §7.
//!
//! Every recoverable condition here maps to a `Reset`/`Abort` pair emitted
//! by the caller; none of these propagate across a handler boundary as a
//! panic. Core invariant violations (`budget >= 0` on send, double-acquire
//! of a pending-header slot) are asserted instead — see spec §9 and the
//! `debug_assert!`/`panic!` call sites in `session`.

use crate::ids::StreamId;
use thiserror::Error;

/// Recoverable adapter-level errors, one per row of spec §7's error table
/// (excluding `SlotExhaustion`, which is fatal and asserted rather than
/// returned — see `session::net_half`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// `resolve_app` returned `None` for an inbound initial Begin.
    #[error("no route for begin on stream {0}")]
    NoRoute(StreamId),

    /// A reply Begin arrived whose `stream_id` has no entry in the
    /// correlation table.
    #[error("no correlation entry for reply stream {0}")]
    CorrelationMiss(StreamId),

    /// App-side Data exceeded `initial_budget`.
    #[error("inbound budget violation on stream {0}: reserved {reserved} > budget {budget}")]
    BudgetViolationInbound {
        stream: StreamId,
        reserved: u32,
        budget: i32,
    },

    /// Net-side Data exceeded `reply_budget`.
    #[error("reply budget violation on stream {0}: reserved {reserved} > budget {budget}")]
    BudgetViolationReply {
        stream: StreamId,
        reserved: u32,
        budget: i32,
    },

    /// A frame arrived whose `type_id` is not one of the eight known kinds.
    /// Policy is to ignore it silently; this variant exists so callers that
    /// want to log the occurrence have something to log.
    #[error("unknown frame type {0} on stream {1}")]
    UnknownFrame(u32, StreamId),

    /// An info item in a `BeginEx` carried a kind this crate does not
    /// recognize; the item is skipped.
    #[error("unknown info kind {0}")]
    UnknownInfoKind(u8),
}

/// Errors raised by the PROXY v2 encoder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// `BeginEx::address` named a family this encoder does not implement.
    /// Resolves the §9 open question: reject rather than emit a
    /// half-initialized header.
    #[error("unsupported address family")]
    UnknownAddressFamily,

    /// A second, non-contiguous run of SECURE info items was encountered
    /// and `AdapterConfig::reject_discontiguous_secure` is set.
    #[error("discontiguous SECURE info run rejected by configuration")]
    DiscontiguousSecureRun,

    /// A TLV value (or an address path, for UNIX sockets) exceeded the
    /// 16-bit length field that frames it.
    #[error("value of length {0} does not fit in a 16-bit TLV length field")]
    ValueTooLong(usize),
}
