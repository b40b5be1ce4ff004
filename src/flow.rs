//! Per-direction, per-half flow-control state (spec §3).

use crate::error::AdapterError;
use crate::ids::StreamId;

/// `budget` is signed so that a caller can observe (and reject) an
/// over-reservation before clamping back to zero, mirroring the teacher's
/// practice of tracking flow control as plain counters rather than
/// saturating arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowState {
    pub budget: i32,
    pub padding: u32,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `credit` bytes to the budget and record the peer's latest
    /// padding quote. Used on every inbound Window.
    pub fn add_credit(&mut self, credit: i32, padding: u32) {
        self.budget += credit;
        self.padding = padding;
    }

    /// Reserve `reserved` bytes for an outbound Data frame on `stream`.
    ///
    /// Returns the budget violation error (without mutating state) if the
    /// reservation would take the budget negative, per the invariant in
    /// spec §3: "receiver-side `budget` going negative is a protocol
    /// violation and triggers a Reset." Callers distinguish the inbound vs.
    /// reply variant of the error.
    pub fn reserve(&mut self, stream: StreamId, reserved: u32, inbound: bool) -> Result<(), AdapterError> {
        let budget = self.budget;
        if i64::from(budget) - i64::from(reserved) < 0 {
            return Err(if inbound {
                AdapterError::BudgetViolationInbound {
                    stream,
                    reserved,
                    budget,
                }
            } else {
                AdapterError::BudgetViolationReply {
                    stream,
                    reserved,
                    budget,
                }
            });
        }
        self.budget -= reserved as i32;
        debug_assert!(self.budget >= 0, "budget invariant violated after reserve");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_credit_accumulates() {
        let mut fs = FlowState::new();
        fs.add_credit(64, 3);
        assert_eq!(fs.budget, 64);
        assert_eq!(fs.padding, 3);
        fs.add_credit(10, 5);
        assert_eq!(fs.budget, 74);
        assert_eq!(fs.padding, 5);
    }

    #[test]
    fn reserve_within_budget_succeeds() {
        let mut fs = FlowState::new();
        fs.add_credit(50, 0);
        fs.reserve(StreamId(1), 50, true).unwrap();
        assert_eq!(fs.budget, 0);
    }

    #[test]
    fn reserve_over_budget_errors_without_mutating() {
        let mut fs = FlowState::new();
        fs.add_credit(50, 0);
        let err = fs.reserve(StreamId(1), 100, true).unwrap_err();
        assert_eq!(
            err,
            AdapterError::BudgetViolationInbound {
                stream: StreamId(1),
                reserved: 100,
                budget: 50,
            }
        );
        // budget is unchanged on error
        assert_eq!(fs.budget, 50);
    }

    #[test]
    fn reply_violation_uses_reply_variant() {
        let mut fs = FlowState::new();
        let err = fs.reserve(StreamId(2), 1, false).unwrap_err();
        assert_matches::assert_matches!(err, AdapterError::BudgetViolationReply { .. });
    }
}
