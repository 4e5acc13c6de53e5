use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::warn;

use crate::{
    error::{Error, Result},
    generator::IdGenStatus,
    id::SnowflakeId,
};

/// Computes the successor of the last issued ID given the current time.
///
/// This is the whole allocation algorithm; generators differ only in how
/// they make the read-compute-store sequence atomic.
///
/// - same millisecond with sequence room: bump the sequence
/// - same millisecond, sequence full: [`IdGenStatus::Pending`] until the next
///   millisecond
/// - later millisecond (or nothing issued yet): new timestamp, sequence 0
/// - earlier millisecond: [`Error::ClockRegression`]
///
/// On error or pending the caller must leave its state untouched.
#[inline]
pub(crate) fn advance(current: SnowflakeId, now: u64) -> Result<IdGenStatus> {
    if !current.is_valid() {
        return first_id(current, now);
    }

    let current_ts = current.timestamp();
    match now.cmp(&current_ts) {
        Ordering::Equal => {
            if current.has_sequence_room() {
                Ok(IdGenStatus::Ready {
                    id: current.increment_sequence(),
                })
            } else {
                Ok(IdGenStatus::Pending {
                    yield_until: current_ts + 1,
                })
            }
        }
        Ordering::Greater => {
            if now > SnowflakeId::max_timestamp() {
                return Err(cold_timestamp_overflow(now));
            }
            Ok(IdGenStatus::Ready {
                id: current.rollover_to_timestamp(now),
            })
        }
        Ordering::Less => Err(cold_clock_behind(now, current_ts)),
    }
}

/// Step used while a caller is already waiting out an exhausted sequence.
///
/// A clock reading behind the last issued timestamp keeps the caller waiting
/// instead of failing: the regression check only applies to the first read
/// of a call.
#[inline]
pub(crate) fn advance_waiting(current: SnowflakeId, now: u64) -> Result<IdGenStatus> {
    if current.is_valid() && now < current.timestamp() {
        let current_ts = current.timestamp();
        let yield_until = if current.has_sequence_room() {
            current_ts
        } else {
            current_ts + 1
        };
        return Ok(IdGenStatus::Pending { yield_until });
    }
    advance(current, now)
}

/// Picks the step for a poll: [`advance`] on the first read of a call,
/// [`advance_waiting`] once the call has seen [`IdGenStatus::Pending`].
#[inline]
pub(crate) fn step_for(waiting: bool) -> fn(SnowflakeId, u64) -> Result<IdGenStatus> {
    if waiting { advance_waiting } else { advance }
}

fn first_id(unissued: SnowflakeId, now: u64) -> Result<IdGenStatus> {
    if now > SnowflakeId::max_timestamp() {
        return Err(cold_timestamp_overflow(now));
    }
    Ok(IdGenStatus::Ready {
        id: SnowflakeId::from_components(now, unissued.node_id(), 0),
    })
}

#[cold]
#[inline(never)]
fn cold_clock_behind(now: u64, current_ts: u64) -> Error {
    let behind_ms = current_ts - now;
    #[cfg(feature = "tracing")]
    warn!(behind_ms, last_timestamp = current_ts, "clock moved backwards");
    Error::ClockRegression { behind_ms }
}

#[cold]
#[inline(never)]
fn cold_timestamp_overflow(now: u64) -> Error {
    #[cfg(feature = "tracing")]
    warn!(timestamp = now, "timestamp exceeds 41 bits, epoch is too old");
    Error::TimestampOverflow { timestamp: now }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeId;

    fn node() -> NodeId {
        NodeId::new(3, 4).unwrap()
    }

    #[test]
    fn first_call_starts_at_sequence_zero() {
        let id = advance(SnowflakeId::unissued(node()), 0).unwrap().unwrap_ready();
        assert_eq!(id.timestamp(), 0);
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.node_id(), node());
    }

    #[test]
    fn same_tick_increments() {
        let last = SnowflakeId::from_components(10, node(), 7);
        let id = advance(last, 10).unwrap().unwrap_ready();
        assert_eq!(id.timestamp(), 10);
        assert_eq!(id.sequence(), 8);
    }

    #[test]
    fn full_tick_is_pending_until_next_millisecond() {
        let last = SnowflakeId::from_components(10, node(), SnowflakeId::max_sequence());
        assert_eq!(
            advance(last, 10).unwrap(),
            IdGenStatus::Pending { yield_until: 11 }
        );
    }

    #[test]
    fn new_tick_resets_sequence() {
        let last = SnowflakeId::from_components(10, node(), 99);
        let id = advance(last, 12).unwrap().unwrap_ready();
        assert_eq!(id.timestamp(), 12);
        assert_eq!(id.sequence(), 0);
    }

    #[test]
    fn earlier_tick_reports_distance() {
        let last = SnowflakeId::from_components(10, node(), 0);
        assert_eq!(advance(last, 4), Err(Error::ClockRegression { behind_ms: 6 }));
    }

    #[test]
    fn waiting_step_tolerates_a_lagging_clock() {
        let last = SnowflakeId::from_components(42, node(), SnowflakeId::max_sequence());
        assert_eq!(
            advance_waiting(last, 41),
            Ok(IdGenStatus::Pending { yield_until: 43 })
        );
        assert_eq!(
            advance_waiting(last, 42),
            Ok(IdGenStatus::Pending { yield_until: 43 })
        );
        let id = advance_waiting(last, 43).unwrap().unwrap_ready();
        assert_eq!((id.timestamp(), id.sequence()), (43, 0));

        // The first read of a call still reports the regression.
        assert_eq!(
            step_for(false)(last, 41),
            Err(Error::ClockRegression { behind_ms: 1 })
        );
    }

    #[test]
    fn timestamp_past_41_bits_is_rejected() {
        let too_big = SnowflakeId::max_timestamp() + 1;
        assert_eq!(
            advance(SnowflakeId::unissued(node()), too_big),
            Err(Error::TimestampOverflow { timestamp: too_big })
        );
        let last = SnowflakeId::from_components(5, node(), 0);
        assert_eq!(
            advance(last, too_big),
            Err(Error::TimestampOverflow { timestamp: too_big })
        );
    }
}
