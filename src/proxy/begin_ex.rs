use super::{AddressTuple, InfoItem};

/// The optional BeginEx extension on an inbound app Begin (spec §3). Its
/// presence selects the `PROXY` command; its absence selects `LOCAL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginEx {
    pub address: AddressTuple,
    pub infos: Vec<InfoItem>,
}

impl BeginEx {
    pub fn new(address: AddressTuple) -> Self {
        Self {
            address,
            infos: Vec::new(),
        }
    }

    pub fn with_infos(address: AddressTuple, infos: Vec<InfoItem>) -> Self {
        Self { address, infos }
    }
}
