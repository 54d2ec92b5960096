/*!
Serde bridge for occupancy bit-vectors. Downstream joins and plots expect a
plain 0/1 array per patch, not the word-level layout `bitvec` would emit on
its own, so occupancy fields serialize through this module.
 */

use bitvec::prelude::BitVec;
use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::Deserialize;

pub fn serialize<S>(bits: &BitVec, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(bits.len()))?;
    for bit in bits.iter().by_vals() {
        seq.serialize_element(&(bit as u8))?;
    }
    seq.end()
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<u8> = Vec::deserialize(deserializer)?;
    Ok(raw.iter().map(|&bit| bit != 0).collect())
}
