//! Key/value codec (C1): big-endian key encoding, sentinel IDs, and packed
//! degree tuples.
//!
//! Every node ID component of every key is byte-swapped to big-endian before
//! being used so that LMDB's native ordered scans yield ID-ascending order
//! regardless of host endianness (I8). Values use native layout: they are
//! only ever read back on the machine that wrote them.

use crate::types::{GraphError, Result};

/// 32-bit node IDs by default; build with `--features wide-ids` for 64-bit.
#[cfg(not(feature = "wide-ids"))]
pub type NodeId = u32;
#[cfg(feature = "wide-ids")]
pub type NodeId = u64;

/// Edge weights are a single signed integer, present only on weighted graphs.
pub type EdgeWeight = i32;

/// Unsigned degree counter, maintained only in read-optimized graphs.
pub type Degree = u32;

/// Reserved ID that is never a real node: the second key component of a
/// node row in the Edge-Key family, and the low end of an "to the start"
/// range bound.
pub const MIN_SENTINEL: NodeId = 0;

/// Reserved ID that is never a real node: signals end-of-iteration and
/// "to the end" range bounds.
pub const MAX_SENTINEL: NodeId = NodeId::MAX;

const ID_WIDTH: usize = std::mem::size_of::<NodeId>();

/// Encodes a node ID to its big-endian on-disk form.
#[inline(always)]
pub fn encode_id(id: NodeId) -> [u8; ID_WIDTH] {
    id.to_be_bytes()
}

/// Decodes a big-endian on-disk node ID.
#[inline(always)]
pub fn decode_id(bytes: &[u8]) -> Result<NodeId> {
    let arr: [u8; ID_WIDTH] = bytes.try_into().map_err(|_| GraphError::SliceLength)?;
    Ok(NodeId::from_be_bytes(arr))
}

/// Composite edge key `(src, dst)`, used verbatim by EKey's unified table
/// and by SplitEKey's out-edges table; SplitEKey's in-edges table swaps the
/// arguments to get `(dst, src)`.
#[inline(always)]
pub fn edge_key(a: NodeId, b: NodeId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_WIDTH * 2);
    key.extend_from_slice(&encode_id(a));
    key.extend_from_slice(&encode_id(b));
    key
}

/// Splits a composite `(a, b)` key back into its two node IDs.
#[inline(always)]
pub fn decode_edge_key(bytes: &[u8]) -> Result<(NodeId, NodeId)> {
    if bytes.len() != ID_WIDTH * 2 {
        return Err(GraphError::SliceLength);
    }
    Ok((decode_id(&bytes[0..ID_WIDTH])?, decode_id(&bytes[ID_WIDTH..])?))
}

/// Packs `(in_degree, out_degree)` into a fixed 8-byte tuple, native layout.
#[inline(always)]
pub fn encode_degrees(in_degree: Degree, out_degree: Degree) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf[0..4].copy_from_slice(&in_degree.to_ne_bytes());
    buf[4..8].copy_from_slice(&out_degree.to_ne_bytes());
    buf
}

/// Unpacks `(in_degree, out_degree)`.
#[inline(always)]
pub fn decode_degrees(bytes: &[u8]) -> Result<(Degree, Degree)> {
    if bytes.len() != 8 {
        return Err(GraphError::SliceLength);
    }
    let in_degree = Degree::from_ne_bytes(bytes[0..4].try_into().unwrap());
    let out_degree = Degree::from_ne_bytes(bytes[4..8].try_into().unwrap());
    Ok((in_degree, out_degree))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip_is_big_endian() {
        let encoded = encode_id(1);
        // big-endian: the most significant byte (0) comes first, the least
        // significant (1) comes last.
        assert_eq!(*encoded.last().unwrap(), 1);
        assert_eq!(decode_id(&encoded).unwrap(), 1);
    }

    #[test]
    fn edge_key_roundtrip() {
        let key = edge_key(3, 9);
        assert_eq!(decode_edge_key(&key).unwrap(), (3, 9));
    }

    #[test]
    fn sentinels_never_collide_with_real_ids() {
        assert_ne!(MIN_SENTINEL, 1);
        assert_ne!(MAX_SENTINEL, 1);
    }
}
