use std::time::Duration;

use log::{debug, info, trace, warn};

use voxsync_shared::{
    DatagramSender, DatagramSequencer, Lod, MetavoxelState, PacketNumber, ReceivedDatagram,
    RecordHistory, SequencerEvent, SyncMessage, TransportError,
};

use crate::{
    connection::delta_record::DeltaRecord, error::SessionError, events::SessionEvent,
    server::ServerConfig,
};

/// Server side of one client connection. Streams deltas of the
/// authoritative structure, each encoded against the oldest record the
/// client has not yet been heard acknowledging past.
pub struct MetavoxelSession<M: MetavoxelState> {
    open: bool,
    sequencer: DatagramSequencer,
    send_records: RecordHistory<DeltaRecord<M>>,
    client_lod: Lod,
    sender: Box<dyn DatagramSender>,
    send_interval: Duration,
    since_last_send: Duration,
}

impl<M: MetavoxelState> MetavoxelSession<M> {
    pub fn new(config: &ServerConfig, sender: Box<dyn DatagramSender>) -> Self {
        Self {
            open: true,
            sequencer: DatagramSequencer::new(config.connection.clone()),
            send_records: RecordHistory::new(DeltaRecord::sentinel()),
            client_lod: Lod::default(),
            sender,
            send_interval: config.send_interval,
            since_last_send: Duration::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Newest lod announced by the client
    pub fn client_lod(&self) -> &Lod {
        &self.client_lod
    }

    pub fn send_records(&self) -> &RecordHistory<DeltaRecord<M>> {
        &self.send_records
    }

    pub fn outgoing_packet_number(&self) -> PacketNumber {
        self.sequencer.outgoing_packet_number()
    }

    pub fn incoming_packet_number(&self) -> PacketNumber {
        self.sequencer.incoming_packet_number()
    }

    /// Advance time, sending a delta of `data` once the send interval has
    /// elapsed
    pub fn update(&mut self, delta: Duration, data: &M) -> Result<(), SessionError> {
        if !self.open {
            return Err(SessionError::Closed);
        }
        self.since_last_send += delta;
        if self.since_last_send < self.send_interval {
            return Ok(());
        }
        self.since_last_send = Duration::ZERO;
        self.send_delta(data)
    }

    /// Encode `data` at the client's lod against the oldest baseline and
    /// send it. Nothing is sent before the client has announced a lod.
    pub fn send_delta(&mut self, data: &M) -> Result<(), SessionError> {
        if !self.open {
            return Err(SessionError::Closed);
        }
        if !self.client_lod.is_valid() {
            trace!("no lod announced yet, delta deferred");
            return Ok(());
        }

        let baseline = self.send_records.oldest();
        let bytes = data.encode_delta(&baseline.snapshot, &baseline.lod, &self.client_lod)?;
        let message = SyncMessage::<M::Edit>::DeltaUpdate { bytes };
        let mut writer = self.sequencer.start_datagram();
        writer.write(&message)?;
        let datagram = self.sequencer.finish_datagram(writer)?;

        let record = DeltaRecord {
            packet_number: self.sequencer.outgoing_packet_number(),
            snapshot: data.snapshot(),
            lod: self.client_lod,
        };
        trace!(
            "delta in packet {} against baseline {}",
            record.packet_number,
            baseline.packet_number
        );
        if let Err(error) = self.send_records.push(record) {
            self.close();
            return Err(error.into());
        }
        self.send(&datagram)
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), SessionError> {
        match self.sender.send(datagram) {
            Ok(()) => Ok(()),
            Err(TransportError::Disconnected) => {
                self.close();
                Err(TransportError::Disconnected.into())
            }
            Err(error) => {
                warn!("datagram lost at the network boundary: {}", error);
                Ok(())
            }
        }
    }

    /// Process one inbound datagram from the client. Malformed datagrams are
    /// logged and dropped.
    pub fn receive_datagram(
        &mut self,
        bytes: &[u8],
    ) -> Result<Vec<SessionEvent<M::Edit>>, SessionError> {
        if !self.open {
            return Err(SessionError::Closed);
        }
        let received = match self.sequencer.receive_datagram(bytes) {
            Ok(Some(received)) => received,
            Ok(None) => return Ok(Vec::new()),
            Err(error) if error.is_malformed_input() => {
                warn!("discarding datagram: {}", error);
                return Ok(Vec::new());
            }
            Err(error) => {
                self.close();
                return Err(error.into());
            }
        };

        for event in &received.events {
            if let SequencerEvent::SendAcknowledged(packet_number) = *event {
                let released = self.send_records.acknowledge_through(packet_number);
                debug!(
                    "client acknowledged through {}, {} baselines released",
                    packet_number, released
                );
            }
        }

        let mut events = Vec::new();
        for message in Self::read_messages(received) {
            self.dispatch(message, &mut events);
        }
        if events.contains(&SessionEvent::ClosedByPeer) {
            info!("metavoxel session closed by client");
            self.open = false;
        }
        Ok(events)
    }

    fn read_messages(received: ReceivedDatagram) -> Vec<SyncMessage<M::Edit>> {
        let mut messages = Vec::new();
        let high_priority = received
            .high_priority_messages
            .into_iter()
            .map(|(_, bytes)| bytes);
        for bytes in received.reliable_messages.into_iter().chain(high_priority) {
            match SyncMessage::from_bytes(&bytes) {
                Ok(message) => messages.push(message),
                Err(_) => warn!("discarding undecodable channel message"),
            }
        }
        if !received.stale && !received.payload.is_empty() {
            match SyncMessage::from_bytes(&received.payload) {
                Ok(message) => messages.push(message),
                Err(_) => warn!(
                    "discarding undecodable payload of datagram {}",
                    received.packet_number
                ),
            }
        }
        messages
    }

    fn dispatch(&mut self, message: SyncMessage<M::Edit>, events: &mut Vec<SessionEvent<M::Edit>>) {
        match message {
            SyncMessage::StateAnnouncement { lod } => {
                if lod != self.client_lod {
                    self.client_lod = lod;
                    events.push(SessionEvent::LodAnnounced(lod));
                }
            }
            SyncMessage::EditOperation { edit } => events.push(SessionEvent::EditReceived(edit)),
            SyncMessage::DeltaUpdate { .. } => {
                warn!("ignoring delta sent by client");
            }
            SyncMessage::CloseSession => {
                if !events.contains(&SessionEvent::ClosedByPeer) {
                    events.push(SessionEvent::ClosedByPeer);
                }
            }
            SyncMessage::Batch(elements) => {
                for element in elements {
                    self.dispatch(element, events);
                }
            }
        }
    }

    /// Send a best-effort close message and stop serving
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let mut writer = self.sequencer.start_datagram();
        let composed = writer
            .write(&SyncMessage::<M::Edit>::CloseSession)
            .and_then(|_| self.sequencer.finish_datagram(writer));
        match composed {
            Ok(datagram) => {
                if let Err(error) = self.sender.send(&datagram) {
                    debug!("close message not sent: {}", error);
                }
            }
            Err(error) => debug!("close message not composed: {}", error),
        }
        self.send_records = RecordHistory::new(DeltaRecord::sentinel());
        info!("metavoxel session closed");
    }
}
