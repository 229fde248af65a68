use std::collections::VecDeque;

use crate::{
    state::{error::RecordHistoryError, lod::Lod},
    types::{PacketNumber, SENTINEL_PACKET_NUMBER},
};

/// An entry in a [`RecordHistory`]
pub trait Record {
    fn packet_number(&self) -> PacketNumber;
}

/// What was sent in outgoing packet `packet_number`
#[derive(Clone, Debug, PartialEq)]
pub struct SendRecord {
    pub packet_number: PacketNumber,
    pub lod: Lod,
}

impl SendRecord {
    pub fn sentinel() -> Self {
        Self {
            packet_number: SENTINEL_PACKET_NUMBER,
            lod: Lod::default(),
        }
    }
}

impl Record for SendRecord {
    fn packet_number(&self) -> PacketNumber {
        self.packet_number
    }
}

/// The mirror as it stood after processing incoming packet `packet_number`,
/// and the lod it was decoded for
#[derive(Clone, Debug, PartialEq)]
pub struct ReceiveRecord<M> {
    pub packet_number: PacketNumber,
    pub snapshot: M,
    pub lod: Lod,
}

impl<M: Default> ReceiveRecord<M> {
    pub fn sentinel() -> Self {
        Self {
            packet_number: SENTINEL_PACKET_NUMBER,
            snapshot: M::default(),
            lod: Lod::default(),
        }
    }
}

impl<M> Record for ReceiveRecord<M> {
    fn packet_number(&self) -> PacketNumber {
        self.packet_number
    }
}

/// Ordered history of per-packet records that is never empty.
///
/// The oldest record is the baseline both peers can rely on. On
/// acknowledgment through packet `n` every record up to `n` is released and
/// the newest of them becomes the baseline, so the history always holds the
/// acknowledged baseline followed by the records still in flight.
#[derive(Clone, Debug)]
pub struct RecordHistory<R: Record> {
    baseline: R,
    in_flight: VecDeque<R>,
}

impl<R: Record> RecordHistory<R> {
    pub fn new(baseline: R) -> Self {
        Self {
            baseline,
            in_flight: VecDeque::new(),
        }
    }

    /// The oldest record: the baseline both peers are known to share
    pub fn oldest(&self) -> &R {
        &self.baseline
    }

    pub fn newest(&self) -> &R {
        self.in_flight.back().unwrap_or(&self.baseline)
    }

    pub fn len(&self) -> usize {
        1 + self.in_flight.len()
    }

    /// Never true; a history always holds its baseline
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Records newer than the baseline, oldest first
    pub fn in_flight(&self) -> impl Iterator<Item = &R> {
        self.in_flight.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        std::iter::once(&self.baseline).chain(self.in_flight.iter())
    }

    /// Append a record for a newer packet
    pub fn push(&mut self, record: R) -> Result<(), RecordHistoryError> {
        let newest = self.newest().packet_number();
        if record.packet_number() <= newest {
            return Err(RecordHistoryError::NonIncreasing {
                newest,
                attempted: record.packet_number(),
            });
        }
        self.in_flight.push_back(record);
        Ok(())
    }

    /// Release every record with a packet number up to and including
    /// `packet_number`; the newest released record becomes the baseline.
    /// Returns the number of records discarded.
    pub fn acknowledge_through(&mut self, packet_number: PacketNumber) -> usize {
        let mut discarded = 0;
        while self
            .in_flight
            .front()
            .is_some_and(|record| record.packet_number() <= packet_number)
        {
            if let Some(record) = self.in_flight.pop_front() {
                self.baseline = record;
                discarded += 1;
            }
        }
        discarded
    }
}
