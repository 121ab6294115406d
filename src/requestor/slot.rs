use tracing::{debug, error};

use crate::error::ReqError;

/// Marks the one operation currently allowed to touch the connection handle.
///
/// The slot lives inside the requestor's mutex, so it is only ever inspected
/// by the task holding that mutex. Finding it occupied there means an earlier
/// operation leaked its occupancy, which is a bug in the locking discipline.
#[derive(Debug, Default)]
pub(crate) struct LockSlot {
    occupant: Option<String>,
}

impl LockSlot {
    pub(crate) fn occupy(&mut self, tag: impl Into<String>) -> Result<Occupied<'_>, ReqError> {
        let tag = tag.into();
        if let Some(current) = &self.occupant {
            error!(slot = %current, requested = %tag, "lock slot unexpectedly occupied");
            return Err(ReqError::ConnectionInvariant(format!(
                "lock slot held by '{}' while acquiring '{}'",
                current, tag
            )));
        }
        debug!(slot = %tag, "lock slot occupied");
        self.occupant = Some(tag);
        Ok(Occupied { slot: self })
    }

    #[cfg(test)]
    pub(crate) fn occupant(&self) -> Option<&str> {
        self.occupant.as_deref()
    }
}

/// Clears the slot when dropped, including when the owning future is dropped.
pub(crate) struct Occupied<'a> {
    slot: &'a mut LockSlot,
}

impl Drop for Occupied<'_> {
    fn drop(&mut self) {
        if let Some(tag) = self.slot.occupant.take() {
            debug!(slot = %tag, "lock slot released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupy_and_release() {
        let mut slot = LockSlot::default();
        {
            let _occupied = slot.occupy("connect()").unwrap();
        }
        assert_eq!(slot.occupant(), None);
        assert!(slot.occupy("query(): SELECT 1").is_ok());
    }

    #[test]
    fn test_double_occupancy_is_an_invariant_violation() {
        let mut slot = LockSlot {
            occupant: Some("connect()".to_string()),
        };
        match slot.occupy("disconnect()") {
            Err(ReqError::ConnectionInvariant(msg)) => {
                assert!(msg.contains("connect()"));
                assert!(msg.contains("disconnect()"));
            }
            Err(other) => panic!("Expected ConnectionInvariant, got {:?}", other),
            Ok(_) => panic!("Expected ConnectionInvariant, got an occupied slot"),
        }
        assert_eq!(slot.occupant(), Some("connect()"));
    }
}
