//! Client-side PROXY protocol v2 egress adapter.
//!
//! This crate bridges one application-facing stream pair to one
//! network-facing stream pair and injects a PROXY protocol v2 header as the
//! first bytes of the outbound payload. It forwards payload bytes and
//! flow-control credit transparently in both directions thereafter.
//!
//! The adapter is sans-I/O: it never opens a socket, never terminates TLS,
//! and never parses a PROXY header arriving from a peer. It consumes a
//! small set of external contracts (see [`contracts`]) for route
//! resolution, stream id allocation and buffer pooling, and is driven
//! entirely by a reactive message dispatcher calling into
//! [`session::Dispatcher::new_stream`] and the per-frame handlers on
//! [`session::AppHalf`] / [`session::NetHalf`].

#[macro_use]
extern crate slog;

mod codec;
mod config;
mod contracts;
mod error;
mod flow;
mod ids;
mod proxy;
mod session;

pub use config::AdapterConfig;
pub use contracts::{
    AbortView, BeginView, BufferPool, ChallengeView, DataView, EndView, Frame, FrameKind,
    FrameSink, FlushView, HandlerRef, IdSupplier, Route, Router, Side, Slot, WindowView, ResetView,
};
pub use error::{AdapterError, EncodeError};
pub use flow::FlowState;
pub use ids::{Direction, RouteId, StreamId};
pub use proxy::{AddressTuple, BeginEx, InfoItem, SecureItem, TransportProtocol};
pub use session::{AppHalf, Dispatcher, NetHalf, Session};
