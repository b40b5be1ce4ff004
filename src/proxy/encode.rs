//! PROXY protocol v2 encoder (spec §4.4): a pure function over a write
//! buffer. Nothing here retains state across calls — the scratch buffer
//! is owned by the caller (spec §5, "shared scratch write buffer").

use bytes::{BufMut, BytesMut};

use super::{AddressTuple, BeginEx, InfoItem, TransportProtocol};
use crate::config::AdapterConfig;
use crate::error::EncodeError;

use super::{COMMAND_LOCAL, COMMAND_PROXY, SIGNATURE};

/// Encodes a `LOCAL` header: signature, command byte `0x20`, a zeroed
/// family/protocol byte and a zero length. No address block, no TLVs
/// (spec §4.4: "encoding stops at offset 16").
pub fn encode_local(out: &mut BytesMut) {
    out.put_slice(&SIGNATURE);
    out.put_u8(COMMAND_LOCAL);
    out.put_u8(0x00);
    out.put_u16(0x0000);
}

/// Encodes a `PROXY` header for `begin_ex`: signature, command byte
/// `0x21`, family/protocol byte, a placeholder length, the address block
/// and the TLV list, then back-patches the length at offset 14.
pub fn encode_proxy(out: &mut BytesMut, begin_ex: &BeginEx, config: &AdapterConfig) -> Result<(), EncodeError> {
    out.put_slice(&SIGNATURE);
    out.put_u8(COMMAND_PROXY);

    // `AddressTuple` is a closed enum over the three known families (spec
    // §9's "unknown address family" open question is resolved by making
    // the unrecognized case unrepresentable rather than checked at
    // runtime); `EncodeError::UnknownAddressFamily` remains for callers
    // that decode a `BeginEx` from an untrusted wire source upstream of
    // this crate and need a typed rejection to surface.
    let family = begin_ex.address.family_nibble();
    let protocol = begin_ex.address.protocol();
    out.put_u8((family << 4) | (protocol.ordinal() + 1));

    let length_offset = out.len();
    out.put_u16(0x0000);

    encode_address(out, &begin_ex.address)?;
    encode_infos(out, &begin_ex.infos, config)?;

    let total_len = out.len();
    let remaining = total_len - length_offset - 2;
    patch_u16(out, length_offset, remaining)?;
    Ok(())
}

fn encode_address(out: &mut BytesMut, address: &AddressTuple) -> Result<(), EncodeError> {
    match address {
        AddressTuple::Inet4 {
            source,
            dest,
            source_port,
            dest_port,
            ..
        } => {
            out.put_slice(&source.octets());
            out.put_slice(&dest.octets());
            out.put_u16(*source_port);
            out.put_u16(*dest_port);
        }
        AddressTuple::Inet6 {
            source,
            dest,
            source_port,
            dest_port,
            ..
        } => {
            out.put_slice(&source.octets());
            out.put_slice(&dest.octets());
            out.put_u16(*source_port);
            out.put_u16(*dest_port);
        }
        AddressTuple::Unix { source, dest, .. } => {
            out.put_slice(source);
            out.put_slice(dest);
        }
    }
    Ok(())
}

/// Implements the SECURE aggregation algorithm (spec §4.4): contiguous
/// `Secure` items collapse into a single `0x20` envelope TLV with a
/// nested TLV list; everything else emits a direct TLV.
///
/// Per §9's "multiple SECURE groups" open question, only the first
/// contiguous run aggregates; a later, non-contiguous run produces a
/// second envelope unless `config.reject_discontiguous_secure` is set.
fn encode_infos(out: &mut BytesMut, infos: &[InfoItem], config: &AdapterConfig) -> Result<(), EncodeError> {
    let mut saw_secure_run = false;
    let mut i = 0;
    while i < infos.len() {
        if infos[i].is_secure() {
            if saw_secure_run && config.reject_discontiguous_secure {
                return Err(EncodeError::DiscontiguousSecureRun);
            }
            saw_secure_run = true;
            i = encode_secure_run(out, infos, i)?;
        } else {
            encode_direct_tlv(out, infos[i].tlv_type(), infos[i].value().unwrap_or(&[]))?;
            i += 1;
        }
    }
    Ok(())
}

fn encode_secure_run(out: &mut BytesMut, infos: &[InfoItem], start: usize) -> Result<usize, EncodeError> {
    out.put_u8(0x20);
    let length_offset = out.len();
    out.put_u16(0x0000);

    // `client` flags (literal 0x07) and `verify` (literal 0x00000000).
    out.put_u8(0x07);
    out.put_u32(0x0000_0000);

    let mut i = start;
    while i < infos.len() {
        let item = match &infos[i] {
            InfoItem::Secure(item) => item,
            _ => break,
        };
        encode_direct_tlv(out, item.tlv_type(), item.value())?;
        i += 1;
    }

    let envelope_len = out.len() - length_offset - 2;
    patch_u16(out, length_offset, envelope_len)?;
    Ok(i)
}

fn encode_direct_tlv(out: &mut BytesMut, tlv_type: u8, value: &[u8]) -> Result<(), EncodeError> {
    if value.len() > u16::MAX as usize {
        return Err(EncodeError::ValueTooLong(value.len()));
    }
    out.put_u8(tlv_type);
    out.put_u16(value.len() as u16);
    out.put_slice(value);
    Ok(())
}

fn patch_u16(out: &mut BytesMut, offset: usize, value: usize) -> Result<(), EncodeError> {
    if value > u16::MAX as usize {
        return Err(EncodeError::ValueTooLong(value));
    }
    let bytes = (value as u16).to_be_bytes();
    out[offset] = bytes[0];
    out[offset + 1] = bytes[1];
    Ok(())
}

/// Length of a `LOCAL` header: fixed at 16 bytes (spec §4.4).
pub const LOCAL_HEADER_LEN: usize = 16;
