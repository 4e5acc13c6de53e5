use core::{fmt, str::FromStr, time::Duration};

use crate::{
    error::{Error, Result},
    id::NodeId,
};

/// A 64-bit Snowflake ID with a split datacenter/worker identity.
///
/// - 1 bit reserved (always zero, so the value is also a positive `i64`)
/// - 41 bits timestamp (ms since the generator's epoch)
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21            17 16        12 11             0
///              +--------------+----------------+----------------+-----------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter (5) | worker (5)| sequence (12) |
///              +--------------+----------------+----------------+-----------+---------------+
///              |<----------------- MSB ------------- 64 bits ------------- LSB ----------->|
/// ```
///
/// Because the timestamp sits in the most significant bits, IDs compare in
/// issue order as plain integers.
///
/// # Example
///
/// ```
/// use flakeforge::{NodeId, SnowflakeId};
///
/// let node = NodeId::new(1, 2).unwrap();
/// let id = SnowflakeId::from_components(1000, node, 5);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.datacenter_id(), 1);
/// assert_eq!(id.worker_id(), 2);
/// assert_eq!(id.sequence(), 5);
/// assert_eq!(id.to_raw(), (1000 << 22) | (1 << 17) | (2 << 12) | 5);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u64", into = "u64")
)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << 41) - 1;

    /// Bitmask for extracting the 5-bit datacenter ID field. Occupies bits 17
    /// through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for extracting the 5-bit worker ID field. Occupies bits 12
    /// through 16.
    pub const WORKER_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << 12) - 1;

    /// Sequence + worker + datacenter bits.
    pub const TIMESTAMP_SHIFT: u64 = 22;

    /// Sequence + worker bits.
    pub const DATACENTER_ID_SHIFT: u64 = 17;

    /// Sequence bits.
    pub const WORKER_ID_SHIFT: u64 = 12;

    /// The sequence occupies the lowest bits.
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// The reserved sign bit. Never set on a valid ID.
    pub const RESERVED_MASK: u64 = 1 << 63;

    /// Packs the fields into an ID. Each field is masked to its width.
    pub const fn from_parts(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id =
            (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Packs a timestamp, a node identity and a sequence into an ID.
    ///
    /// Out-of-range values are masked to their field width. Debug builds
    /// assert they fit; use [`Self::try_from_components`] for untrusted input.
    pub const fn from_components(timestamp: u64, node: NodeId, sequence: u64) -> Self {
        debug_assert!(timestamp <= Self::TIMESTAMP_MASK, "timestamp overflow");
        debug_assert!(sequence <= Self::SEQUENCE_MASK, "sequence overflow");
        Self::from_parts(
            timestamp,
            node.datacenter_id(),
            node.worker_id(),
            sequence,
        )
    }

    /// Like [`Self::from_components`], but rejects values that do not fit.
    ///
    /// # Errors
    /// - [`Error::TimestampOverflow`] if `timestamp` exceeds 41 bits
    /// - [`Error::InvalidId`] if `sequence` exceeds 4095
    ///
    /// ```
    /// use flakeforge::{NodeId, SnowflakeId};
    ///
    /// let node = NodeId::new(1, 2).unwrap();
    /// assert!(SnowflakeId::try_from_components(5, node, 4095).is_ok());
    /// assert!(SnowflakeId::try_from_components(5, node, 4096).is_err());
    /// ```
    pub fn try_from_components(timestamp: u64, node: NodeId, sequence: u64) -> Result<Self> {
        if timestamp > Self::max_timestamp() {
            return Err(Error::TimestampOverflow { timestamp });
        }
        if sequence > Self::max_sequence() {
            return Err(Error::InvalidId {
                value: format!("sequence {sequence} exceeds {}", Self::max_sequence()),
            });
        }
        Ok(Self::from_components(timestamp, node, sequence))
    }

    /// Extracts the timestamp (ms since the epoch) from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter ID from the packed ID.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the node identity from the packed ID.
    pub const fn node_id(&self) -> NodeId {
        NodeId::from_masked(self.datacenter_id(), self.worker_id())
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the maximum possible value for the timestamp field.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Returns the maximum possible value for the sequence field.
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// Returns the raw packed value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Returns the raw packed value as a signed integer. Never negative for a
    /// valid ID.
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Wraps a raw value without validation.
    ///
    /// Use [`SnowflakeId::try_from`] to reject values with the reserved bit
    /// set.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns `true` if the reserved sign bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id & Self::RESERVED_MASK == 0
    }

    /// The state a generator holds before it has issued anything: the node
    /// bits of `node` with the reserved bit set, so it never compares equal
    /// to a real ID.
    pub(crate) const fn unissued(node: NodeId) -> Self {
        Self::from_raw(Self::RESERVED_MASK | Self::from_components(0, node, 0).id)
    }

    /// Returns true if the current sequence value can be incremented.
    pub const fn has_sequence_room(&self) -> bool {
        self.sequence() < Self::SEQUENCE_MASK
    }

    /// Returns a new ID with the sequence incremented.
    pub const fn increment_sequence(&self) -> Self {
        Self::from_raw(self.id + 1)
    }

    /// Returns a new ID for a newer timestamp with sequence reset to zero.
    pub const fn rollover_to_timestamp(&self, ts: u64) -> Self {
        Self::from_components(ts, self.node_id(), 0)
    }

    /// Returns the Unix time, in milliseconds, at which this ID was issued,
    /// given the epoch of the clock that produced it.
    ///
    /// ```
    /// use flakeforge::{NodeId, SnowflakeId, TWITTER_EPOCH};
    ///
    /// let id = SnowflakeId::from_components(10, NodeId::default(), 0);
    /// assert_eq!(id.unix_millis(TWITTER_EPOCH), 1_288_834_974_667);
    /// ```
    #[allow(clippy::cast_possible_truncation)]
    pub const fn unix_millis(&self, epoch: Duration) -> u64 {
        epoch.as_millis() as u64 + self.timestamp()
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_i64()
    }
}

impl TryFrom<u64> for SnowflakeId {
    type Error = Error;

    fn try_from(raw: u64) -> Result<Self> {
        let id = Self::from_raw(raw);
        if id.is_valid() {
            Ok(id)
        } else {
            Err(Error::InvalidId {
                value: raw.to_string(),
            })
        }
    }
}

impl TryFrom<i64> for SnowflakeId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        u64::try_from(raw).map(Self::from_raw).map_err(|_| Error::InvalidId {
            value: raw.to_string(),
        })
    }
}

impl FromStr for SnowflakeId {
    type Err = Error;

    /// Parses the decimal form produced by [`fmt::Display`] or
    /// [`SnowflakeId::to_padded_string`].
    fn from_str(s: &str) -> Result<Self> {
        let raw = s.parse::<i64>().map_err(|_| Error::InvalidId {
            value: s.to_owned(),
        })?;
        Self::try_from(raw)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_and_bounds() {
        let node = NodeId::new(31, 31).unwrap();
        let id = SnowflakeId::from_components(
            SnowflakeId::max_timestamp(),
            node,
            SnowflakeId::max_sequence(),
        );
        assert_eq!(id.timestamp(), SnowflakeId::max_timestamp());
        assert_eq!(id.datacenter_id(), 31);
        assert_eq!(id.worker_id(), 31);
        assert_eq!(id.sequence(), SnowflakeId::max_sequence());
        assert_eq!(id.to_raw(), u64::MAX >> 1);
        assert!(id.is_valid());
        assert_eq!(id.to_i64(), i64::MAX);
    }

    #[test]
    fn matches_documented_shift_formula() {
        let (ts, dc, worker, seq) = (123_456_789_u64, 7, 19, 4000);
        let id = SnowflakeId::from_parts(ts, dc, worker, seq);
        assert_eq!(id.to_raw(), (ts << 22) | (dc << 17) | (worker << 12) | seq);
    }

    #[test]
    fn node_id_round_trips_for_every_identity() {
        for dc in 0..=31 {
            for worker in 0..=31 {
                let node = NodeId::new(dc, worker).unwrap();
                let id = SnowflakeId::from_components(42, node, 9);
                assert_eq!(id.node_id(), node);
                assert_eq!((id.to_raw() >> 17) & 0x1f, dc);
                assert_eq!((id.to_raw() >> 12) & 0x1f, worker);
            }
        }
    }

    #[test]
    fn sequence_helpers_keep_identity() {
        let node = NodeId::new(4, 5).unwrap();
        let id = SnowflakeId::from_components(10, node, 0);

        let next = id.increment_sequence();
        assert_eq!(next.timestamp(), 10);
        assert_eq!(next.sequence(), 1);
        assert_eq!(next.node_id(), node);

        let full = SnowflakeId::from_components(10, node, SnowflakeId::max_sequence());
        assert!(!full.has_sequence_room());

        let rolled = full.rollover_to_timestamp(11);
        assert_eq!(rolled.timestamp(), 11);
        assert_eq!(rolled.sequence(), 0);
        assert_eq!(rolled.node_id(), node);
        assert!(rolled > full);
    }

    #[test]
    fn checked_components_reject_out_of_range_fields() {
        let node = NodeId::new(4, 5).unwrap();
        assert_eq!(
            SnowflakeId::try_from_components(5, node, 5000),
            Err(Error::InvalidId {
                value: "sequence 5000 exceeds 4095".to_owned()
            })
        );
        let too_big = SnowflakeId::max_timestamp() + 1;
        assert_eq!(
            SnowflakeId::try_from_components(too_big, node, 0),
            Err(Error::TimestampOverflow { timestamp: too_big })
        );
        let id = SnowflakeId::try_from_components(5, node, 4095).unwrap();
        assert_eq!(id, SnowflakeId::from_components(5, node, 4095));
    }

    #[test]
    fn ordering_follows_timestamp_then_sequence() {
        let high_node = NodeId::new(31, 31).unwrap();
        let low_node = NodeId::new(0, 0).unwrap();
        let a = SnowflakeId::from_components(1, high_node, SnowflakeId::max_sequence());
        let b = SnowflakeId::from_components(2, low_node, 0);
        assert!(a < b);
        assert!(a.to_i64() < b.to_i64());
    }

    #[test]
    fn decimal_text_round_trip() {
        let id = SnowflakeId::from_components(99, NodeId::new(1, 1).unwrap(), 3);
        assert_eq!(id.to_string().parse::<SnowflakeId>().unwrap(), id);
        assert_eq!(id.to_padded_string().len(), 20);
        assert_eq!(id.to_padded_string().parse::<SnowflakeId>().unwrap(), id);
    }

    #[test]
    fn rejects_invalid_raw_values() {
        assert!(SnowflakeId::try_from(u64::MAX).is_err());
        assert!(SnowflakeId::try_from(-1_i64).is_err());
        assert!("-5".parse::<SnowflakeId>().is_err());
        assert!("abc".parse::<SnowflakeId>().is_err());
        assert_eq!(
            "18446744073709551615".parse::<SnowflakeId>(),
            Err(Error::InvalidId {
                value: "18446744073709551615".to_owned()
            })
        );
    }

    #[test]
    fn debug_lists_fields() {
        let id = SnowflakeId::from_parts(1, 2, 3, 4);
        let dbg = format!("{id:?}");
        assert!(dbg.contains("timestamp: 1"));
        assert!(dbg.contains("datacenter_id: 2"));
        assert!(dbg.contains("worker_id: 3"));
        assert!(dbg.contains("sequence: 4"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_as_native_integer() {
        let id = SnowflakeId::from_parts(5, 1, 2, 3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, id.to_raw().to_string());
        let back: SnowflakeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad = serde_json::from_str::<SnowflakeId>(&u64::MAX.to_string());
        assert!(bad.is_err());
    }
}
