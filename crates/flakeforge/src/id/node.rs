use core::fmt;

use crate::error::{Error, NodeField, Result};

/// The identity of the node issuing IDs: a 5-bit datacenter ID and a 5-bit
/// worker ID.
///
/// Every cooperating generator must be configured with a distinct pair;
/// nothing here can verify that across processes. Once built, a `NodeId` is
/// always in range, so generators never re-check it on the hot path.
///
/// # Example
///
/// ```
/// use flakeforge::NodeId;
///
/// let node = NodeId::new(3, 17).unwrap();
/// assert_eq!(node.datacenter_id(), 3);
/// assert_eq!(node.worker_id(), 17);
///
/// assert!(NodeId::new(32, 0).is_err());
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId {
    datacenter_id: u8,
    worker_id: u8,
}

impl NodeId {
    /// Largest accepted datacenter ID (5 bits).
    pub const MAX_DATACENTER_ID: u64 = (1 << 5) - 1;

    /// Largest accepted worker ID (5 bits).
    pub const MAX_WORKER_ID: u64 = (1 << 5) - 1;

    /// Validates and builds a node identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNodeId`] if either value exceeds 31.
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        Self::from_signed(
            i64::try_from(datacenter_id).unwrap_or(i64::MAX),
            i64::try_from(worker_id).unwrap_or(i64::MAX),
        )
    }

    /// Like [`NodeId::new`], but accepts signed input so that negative values
    /// are rejected with a proper error rather than failing to convert.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNodeId`] if either value is negative or exceeds
    /// 31. The datacenter ID is checked first.
    pub fn from_signed(datacenter_id: i64, worker_id: i64) -> Result<Self> {
        let datacenter_id =
            check_field(NodeField::Datacenter, datacenter_id, Self::MAX_DATACENTER_ID)?;
        let worker_id = check_field(NodeField::Worker, worker_id, Self::MAX_WORKER_ID)?;
        Ok(Self {
            datacenter_id,
            worker_id,
        })
    }

    /// Builds a node identity by masking each value to 5 bits.
    pub(crate) const fn from_masked(datacenter_id: u64, worker_id: u64) -> Self {
        Self {
            datacenter_id: (datacenter_id & Self::MAX_DATACENTER_ID) as u8,
            worker_id: (worker_id & Self::MAX_WORKER_ID) as u8,
        }
    }

    /// Returns the datacenter ID.
    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id as u64
    }

    /// Returns the worker ID.
    pub const fn worker_id(&self) -> u64 {
        self.worker_id as u64
    }
}

#[allow(clippy::cast_possible_truncation)]
fn check_field(field: NodeField, value: i64, max: u64) -> Result<u8> {
    match u64::try_from(value) {
        Ok(v) if v <= max => Ok(v as u8),
        _ => Err(Error::InvalidNodeId { field, value, max }),
    }
}

impl TryFrom<(u64, u64)> for NodeId {
    type Error = Error;

    /// Converts a `(datacenter_id, worker_id)` pair.
    fn try_from((datacenter_id, worker_id): (u64, u64)) -> Result<Self> {
        Self::new(datacenter_id, worker_id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.datacenter_id, self.worker_id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeId")
            .field("datacenter_id", &self.datacenter_id)
            .field("worker_id", &self.worker_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_full_range() {
        for dc in 0..=31 {
            for worker in 0..=31 {
                let node = NodeId::new(dc, worker).unwrap();
                assert_eq!(node.datacenter_id(), dc);
                assert_eq!(node.worker_id(), worker);
            }
        }
    }

    #[test]
    fn rejects_out_of_range_worker() {
        assert_eq!(
            NodeId::new(0, 32),
            Err(Error::InvalidNodeId {
                field: NodeField::Worker,
                value: 32,
                max: 31,
            })
        );
    }

    #[test]
    fn rejects_negative_datacenter() {
        assert_eq!(
            NodeId::from_signed(-1, 0),
            Err(Error::InvalidNodeId {
                field: NodeField::Datacenter,
                value: -1,
                max: 31,
            })
        );
    }

    #[test]
    fn huge_values_saturate_in_the_error() {
        let err = NodeId::new(u64::MAX, 0).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidNodeId {
                field: NodeField::Datacenter,
                value: i64::MAX,
                max: 31,
            }
        );
    }

    #[test]
    fn display_is_datacenter_then_worker() {
        let node = NodeId::try_from((2, 9)).unwrap();
        assert_eq!(node.to_string(), "2:9");
    }
}
