use std::{collections::BTreeMap, sync::Arc, time::Duration};

use log::{debug, info, trace, warn};

use voxsync_shared::{
    decode_and_apply, DatagramSender, DatagramSequencer, HighPriorityId, Lod, MetavoxelState,
    PacketNumber, ReceiveRecord, ReceivedDatagram, RecordHistory, SendRecord, SequencerError,
    SequencerEvent, Serde, SharedObjectResolver, StateError, SyncMessage, TransportError,
};

use crate::{
    client_config::ClientConfig, endpoint_state::EndpointState, error::EndpointError,
    events::EndpointEvent,
};

/// Changes accumulated while reading one message, committed only if the
/// whole message was processed
struct StagedReceive<M> {
    mirror: Option<M>,
    delta_lod: Option<Lod>,
    edits_applied: usize,
    close_requested: bool,
}

impl<M> Default for StagedReceive<M> {
    fn default() -> Self {
        Self {
            mirror: None,
            delta_lod: None,
            edits_applied: 0,
            close_requested: false,
        }
    }
}

/// Messages of one inbound datagram, in wire order
struct DatagramMessages<E: Serde> {
    /// Released by the reliable and high-priority channels. These are never
    /// offered again, so each one is committed on its own.
    channel: Vec<SyncMessage<E>>,
    payload: Option<SyncMessage<E>>,
}

/// Sync endpoint for one remote connection. Holds the local mirror of the
/// remote structure and the send/receive histories that decide which
/// baseline every incoming delta is decoded against.
///
/// All methods take `&mut self`; callers that drive an endpoint from
/// several threads wrap the whole endpoint in one lock (see
/// [`EndpointTable`](crate::EndpointTable)).
pub struct MetavoxelClient<M: MetavoxelState> {
    config: ClientConfig,
    state: EndpointState,
    sequencer: DatagramSequencer,
    mirror: M,
    send_records: RecordHistory<SendRecord>,
    receive_records: RecordHistory<ReceiveRecord<M>>,
    // optimistic edits not yet acknowledged, replayed after every new baseline
    pub(crate) optimistic_edits: BTreeMap<HighPriorityId, M::Edit>,
    sender: Box<dyn DatagramSender>,
    resolver: Arc<dyn SharedObjectResolver<M::Object>>,
    viewer_position: [f32; 3],
    since_last_send: Duration,
}

impl<M: MetavoxelState> MetavoxelClient<M> {
    pub fn new(
        config: ClientConfig,
        sender: Box<dyn DatagramSender>,
        resolver: Arc<dyn SharedObjectResolver<M::Object>>,
    ) -> Self {
        info!("metavoxel endpoint open");
        Self {
            sequencer: DatagramSequencer::new(config.connection.clone()),
            config,
            state: EndpointState::Open,
            mirror: M::default(),
            send_records: RecordHistory::new(SendRecord::sentinel()),
            receive_records: RecordHistory::new(ReceiveRecord::sentinel()),
            optimistic_edits: BTreeMap::new(),
            sender,
            resolver,
            viewer_position: [0.0; 3],
            since_last_send: Duration::ZERO,
        }
    }

    // Accessors

    pub fn state(&self) -> EndpointState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Local mirror of the remote structure, including optimistic edits
    pub fn mirror(&self) -> &M {
        &self.mirror
    }

    pub fn send_records(&self) -> &RecordHistory<SendRecord> {
        &self.send_records
    }

    pub fn receive_records(&self) -> &RecordHistory<ReceiveRecord<M>> {
        &self.receive_records
    }

    pub fn outgoing_packet_number(&self) -> PacketNumber {
        self.sequencer.outgoing_packet_number()
    }

    pub fn incoming_packet_number(&self) -> PacketNumber {
        self.sequencer.incoming_packet_number()
    }

    pub fn set_viewer_position(&mut self, position: [f32; 3]) {
        self.viewer_position = position;
    }

    /// The level of detail announced on the next tick
    pub fn current_lod(&self) -> Lod {
        Lod::new(self.viewer_position, self.config.lod_threshold)
    }

    // Send cycle

    /// Advance time. Announces the current lod once `send_interval` has
    /// elapsed since the previous announcement.
    pub fn tick(&mut self, delta: Duration) -> Result<(), EndpointError> {
        self.ensure_open()?;
        self.since_last_send += delta;
        if self.since_last_send < self.config.send_interval {
            return Ok(());
        }
        self.since_last_send = Duration::ZERO;
        self.send_announcement()
    }

    fn send_announcement(&mut self) -> Result<(), EndpointError> {
        let lod = self.current_lod();
        let datagram = match self.compose(&SyncMessage::StateAnnouncement { lod }) {
            Ok(datagram) => datagram,
            Err(error) => return Err(self.fail(error.into())),
        };
        let packet_number = self.sequencer.outgoing_packet_number();
        if let Err(error) = self.send_records.push(SendRecord { packet_number, lod }) {
            return Err(self.fail(error.into()));
        }
        trace!("announced lod in packet {}", packet_number);
        self.send(&datagram)
    }

    fn compose(&mut self, message: &SyncMessage<M::Edit>) -> Result<Vec<u8>, SequencerError> {
        let mut writer = self.sequencer.start_datagram();
        writer.write(message)?;
        self.sequencer.finish_datagram(writer)
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), EndpointError> {
        match self.sender.send(datagram) {
            Ok(()) => Ok(()),
            Err(TransportError::Disconnected) => {
                Err(self.fail(TransportError::Disconnected.into()))
            }
            Err(error) => {
                // loss is repaired by later datagrams
                warn!("datagram lost at the network boundary: {}", error);
                Ok(())
            }
        }
    }

    // Receive cycle

    /// Process one inbound datagram. Malformed datagrams are logged and
    /// dropped without affecting the session.
    pub fn receive_datagram(&mut self, bytes: &[u8]) -> Result<Vec<EndpointEvent>, EndpointError> {
        self.ensure_open()?;
        let received = match self.sequencer.receive_datagram(bytes) {
            Ok(Some(received)) => received,
            Ok(None) => return Ok(Vec::new()),
            Err(error) if error.is_malformed_input() => {
                warn!("discarding datagram: {}", error);
                return Ok(Vec::new());
            }
            Err(error) => return Err(self.fail(error.into())),
        };

        let mut events = self.process_acknowledgments(&received.events);
        let packet_number = received.packet_number;
        let messages = Self::read_messages(received);

        let mut datagram = StagedReceive::default();
        for message in messages.channel {
            if let Err(error) = self.commit_message(message, &mut datagram) {
                warn!(
                    "discarding channel message of datagram {}: {}",
                    packet_number, error
                );
            }
        }
        if let Some(message) = messages.payload {
            if let Err(error) = self.commit_message(message, &mut datagram) {
                warn!(
                    "discarding payload of datagram {}, baseline unchanged: {}",
                    packet_number, error
                );
            }
        }

        if datagram.close_requested {
            info!("metavoxel session closed by peer");
            self.state = EndpointState::Closed;
            self.release();
            events.push(EndpointEvent::ClosedByPeer);
            return Ok(events);
        }

        if let Some(lod) = datagram.delta_lod {
            let record = ReceiveRecord {
                packet_number,
                snapshot: self.mirror.snapshot(),
                lod,
            };
            if let Err(error) = self.receive_records.push(record) {
                return Err(self.fail(error.into()));
            }
            self.replay_optimistic_edits();
            events.push(EndpointEvent::BaselineCommitted(packet_number));
        }
        if datagram.edits_applied > 0 {
            events.push(EndpointEvent::EditsApplied(datagram.edits_applied));
        }
        Ok(events)
    }

    /// Stage one message and commit it to the mirror if it applies in full,
    /// folding what it did into `datagram`
    fn commit_message(
        &mut self,
        message: SyncMessage<M::Edit>,
        datagram: &mut StagedReceive<M>,
    ) -> Result<(), StateError> {
        let mut staged = StagedReceive::default();
        self.stage_message(message, &mut staged)?;
        if let Some(mirror) = staged.mirror {
            self.mirror = mirror;
        }
        if staged.delta_lod.is_some() {
            datagram.delta_lod = staged.delta_lod;
        }
        datagram.edits_applied += staged.edits_applied;
        datagram.close_requested |= staged.close_requested;
        Ok(())
    }

    fn process_acknowledgments(&mut self, sequencer_events: &[SequencerEvent]) -> Vec<EndpointEvent> {
        let mut events = Vec::new();
        for event in sequencer_events {
            match *event {
                SequencerEvent::SendAcknowledged(packet_number) => {
                    let released = self.send_records.acknowledge_through(packet_number);
                    debug!(
                        "send acknowledged through {}, {} records released",
                        packet_number, released
                    );
                    events.push(EndpointEvent::SendAcknowledged(packet_number));
                }
                SequencerEvent::ReceiveAcknowledged(packet_number) => {
                    self.receive_records.acknowledge_through(packet_number);
                    events.push(EndpointEvent::ReceiveAcknowledged(packet_number));
                }
                SequencerEvent::HighPriorityAcknowledged(id) => {
                    if self.optimistic_edits.remove(&id).is_some() {
                        events.push(EndpointEvent::EditAcknowledged(id));
                    }
                }
            }
        }
        events
    }

    /// Reliable messages, then high-priority messages, then the payload, in
    /// the order they appear on the wire. A stale datagram contributes no
    /// payload and no deltas.
    fn read_messages(received: ReceivedDatagram) -> DatagramMessages<M::Edit> {
        let stale = received.stale;
        let reliable = received.reliable_messages.into_iter();
        let high_priority = received
            .high_priority_messages
            .into_iter()
            .map(|(_, bytes)| bytes);
        let mut channel = Vec::new();
        for bytes in reliable.chain(high_priority) {
            match SyncMessage::from_bytes(&bytes) {
                Ok(SyncMessage::DeltaUpdate { .. }) if stale => {
                    debug!("ignoring delta carried by stale datagram {}", received.packet_number);
                }
                Ok(message) => channel.push(message),
                Err(_) => warn!("discarding undecodable channel message"),
            }
        }

        let mut payload = None;
        if stale {
            debug!("ignoring payload of stale datagram {}", received.packet_number);
        } else if !received.payload.is_empty() {
            match SyncMessage::from_bytes(&received.payload) {
                Ok(message) => payload = Some(message),
                Err(_) => warn!(
                    "discarding undecodable payload of datagram {}",
                    received.packet_number
                ),
            }
        }
        DatagramMessages { channel, payload }
    }

    fn stage_message(
        &self,
        message: SyncMessage<M::Edit>,
        staged: &mut StagedReceive<M>,
    ) -> Result<(), StateError> {
        match message {
            SyncMessage::StateAnnouncement { .. } => {
                trace!("peer announced its lod");
            }
            SyncMessage::DeltaUpdate { bytes } => {
                let (mirror, lod) =
                    decode_and_apply(&self.receive_records, &self.send_records, &bytes)?;
                staged.mirror = Some(mirror);
                staged.delta_lod = Some(lod);
            }
            SyncMessage::EditOperation { edit } => {
                let target = staged
                    .mirror
                    .get_or_insert_with(|| self.mirror.snapshot());
                target.apply_edit(&edit, self.resolver.as_ref())?;
                staged.edits_applied += 1;
            }
            SyncMessage::CloseSession => {
                staged.close_requested = true;
            }
            SyncMessage::Batch(elements) => {
                for element in elements {
                    self.stage_message(element, staged)?;
                }
            }
        }
        Ok(())
    }

    /// Re-assert every unacknowledged optimistic edit on the fresh baseline
    fn replay_optimistic_edits(&mut self) {
        for (id, edit) in &self.optimistic_edits {
            if let Err(error) = self.mirror.apply_edit(edit, self.resolver.as_ref()) {
                warn!("replay of optimistic edit {} failed: {}", id, error);
            }
        }
    }

    // Edits

    pub(crate) fn apply_local_edit(&mut self, edit: &M::Edit) -> Result<(), StateError> {
        self.mirror.apply_edit(edit, self.resolver.as_ref())
    }

    pub(crate) fn sequencer_mut(&mut self) -> &mut DatagramSequencer {
        &mut self.sequencer
    }

    // Lifecycle

    pub(crate) fn ensure_open(&self) -> Result<(), EndpointError> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(EndpointError::NotOpen { state: self.state })
        }
    }

    /// Close the endpoint after an unrecoverable error
    pub(crate) fn fail(&mut self, error: EndpointError) -> EndpointError {
        warn!("closing metavoxel endpoint: {}", error);
        self.close();
        error
    }

    /// Move to `Closing`, send a best-effort close message, then `Closed`.
    /// Does nothing unless open.
    pub fn close(&mut self) {
        if !self.state.is_open() {
            return;
        }
        self.state = EndpointState::Closing;
        info!("metavoxel endpoint closing");
        match self.compose(&SyncMessage::CloseSession) {
            Ok(datagram) => {
                if let Err(error) = self.sender.send(&datagram) {
                    debug!("close message not sent: {}", error);
                }
            }
            Err(error) => debug!("close message not composed: {}", error),
        }
        self.state = EndpointState::Closed;
        self.release();
        info!("metavoxel endpoint closed");
    }

    fn release(&mut self) {
        self.send_records = RecordHistory::new(SendRecord::sentinel());
        self.receive_records = RecordHistory::new(ReceiveRecord::sentinel());
        self.optimistic_edits.clear();
    }
}

impl<M: MetavoxelState> Drop for MetavoxelClient<M> {
    fn drop(&mut self) {
        self.close();
    }
}
