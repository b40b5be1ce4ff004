//! The two halves of a client session (spec §4.2, §4.3) and the session
//! arena that owns them (spec §4.1, §9).
//!
//! `AppHalf` and `NetHalf` are never linked by a Rust reference to one
//! another — the cyclic pair lives as two sibling fields of one [`Session`]
//! in the dispatcher's arena, and every call across the pair threads a
//! `&mut` to the other half through the call site instead (see
//! `DESIGN.md`).

mod app_half;
mod dispatcher;
mod net_half;

pub use app_half::AppHalf;
pub use dispatcher::{Dispatcher, Session};
pub use net_half::NetHalf;
