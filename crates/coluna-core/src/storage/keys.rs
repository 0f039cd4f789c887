//! Shard row key encoding.
//!
//! A queue's message list is bucketed by time into physically distinct rows.
//! The row key is a fixed 24-byte composite, all fields big-endian:
//!
//! ```text
//! u64(queue id, high bits) || u64(queue id, low bits) || i64(bucket timestamp)
//! ```
//!
//! No padding, no length prefix — the 24-byte length is itself the parsing
//! contract, and any layout change breaks every stored row. Decoding always
//! works from a fresh immutable slice with explicit offsets; the identifier
//! and timestamp reads never share cursor state.

use uuid::Uuid;

use crate::error::CodecError;

/// Exact length of a shard row key.
pub const SHARD_KEY_LEN: usize = 24;

const TS_OFFSET: usize = 16;

/// Build the shard row key for a queue id and bucket timestamp.
pub fn shard_key(id: &Uuid, timestamp: i64) -> [u8; SHARD_KEY_LEN] {
    let mut key = [0u8; SHARD_KEY_LEN];
    // `Uuid::as_bytes` is network order: the first 8 bytes are the high
    // 64 bits, the next 8 the low 64 bits.
    key[..TS_OFFSET].copy_from_slice(id.as_bytes());
    key[TS_OFFSET..].copy_from_slice(&timestamp.to_be_bytes());
    key
}

/// Read the owning queue id from a shard row key.
pub fn id_from_key(key: &[u8]) -> Result<Uuid, CodecError> {
    let key = check_len(key)?;
    let bytes: [u8; 16] = key[..TS_OFFSET].try_into().expect("length checked");
    Ok(Uuid::from_bytes(bytes))
}

/// Read the bucket timestamp from a shard row key, at its fixed offset.
pub fn timestamp_from_key(key: &[u8]) -> Result<i64, CodecError> {
    let key = check_len(key)?;
    let bytes: [u8; 8] = key[TS_OFFSET..].try_into().expect("length checked");
    Ok(i64::from_be_bytes(bytes))
}

fn check_len(key: &[u8]) -> Result<&[u8], CodecError> {
    if key.len() != SHARD_KEY_LEN {
        return Err(CodecError::InvalidRowKey(key.len()));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_id_and_timestamp() {
        let id = Uuid::now_v7();
        for ts in [0i64, 1, 42, -1, i64::MIN, i64::MAX, 1_700_000_000_000] {
            let key = shard_key(&id, ts);
            assert_eq!(id_from_key(&key).unwrap(), id);
            assert_eq!(timestamp_from_key(&key).unwrap(), ts);
        }
    }

    #[test]
    fn fixed_identifier_decodes_back() {
        let id: Uuid = "00000000-0000-0000-0000-000000000001".parse().unwrap();
        let key = shard_key(&id, 42);
        assert_eq!(id_from_key(&key).unwrap(), id);
        assert_eq!(timestamp_from_key(&key).unwrap(), 42);
    }

    #[test]
    fn layout_is_high_low_timestamp_big_endian() {
        let id: Uuid = "01020304-0506-0708-090a-0b0c0d0e0f10".parse().unwrap();
        let key = shard_key(&id, 0x1122334455667788);
        assert_eq!(&key[..16], id.as_bytes());
        assert_eq!(
            &key[16..],
            &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]
        );
    }

    #[test]
    fn wrong_length_is_rejected() {
        let id = Uuid::now_v7();
        let key = shard_key(&id, 7);

        for bad in [&key[..23], &[][..]] {
            assert!(matches!(
                id_from_key(bad),
                Err(CodecError::InvalidRowKey(_))
            ));
            assert!(matches!(
                timestamp_from_key(bad),
                Err(CodecError::InvalidRowKey(_))
            ));
        }

        let long = [0u8; 25];
        assert!(matches!(
            timestamp_from_key(&long),
            Err(CodecError::InvalidRowKey(25))
        ));
    }

    #[test]
    fn keys_for_one_queue_sort_by_timestamp() {
        let id = Uuid::now_v7();
        let early = shard_key(&id, 1_000);
        let late = shard_key(&id, 2_000);
        assert!(early < late, "big-endian timestamps must sort naturally");
    }
}
