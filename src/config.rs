//! Adapter-wide configuration, in the teacher's `pub` fields + `Default`
//! style (cf. `quinn-proto::endpoint::Config`).

/// Knobs for behavior the spec leaves as an open question or an
/// implementation choice. See `DESIGN.md` for the rationale behind each
/// default.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Gate the pending-header flush on `initial_budget >= header_len +
    /// padding` rather than trusting the first Window to have granted
    /// enough. Resolves the §9 "pending-header flush reservation" open
    /// question. Defaults to `true`; the original always trusted the first
    /// Window.
    pub gate_flush_on_budget: bool,

    /// If `true`, encoding a `BeginEx` whose info list contains a second,
    /// non-contiguous run of SECURE items returns
    /// `EncodeError::DiscontiguousSecureRun` instead of encoding a second
    /// TLV envelope for it. Defaults to `false`, preserving the original's
    /// accept-and-aggregate-separately behavior (spec §9, "multiple SECURE
    /// groups").
    pub reject_discontiguous_secure: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            gate_flush_on_budget: true,
            reject_discontiguous_secure: false,
        }
    }
}
