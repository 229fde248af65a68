use log::debug;

use voxsync_shared::{HighPriorityId, MetavoxelState, SequencerError, Serde, SyncMessage};

use crate::{client::MetavoxelClient, error::EndpointError};

/// How an edit travels to the remote host
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EditDelivery {
    /// Ordered and exactly once on the reliable channel. Not applied
    /// locally; the next delta from the remote host reflects it.
    Reliable,
    /// Applied to the local mirror at once and repeated in every datagram
    /// until acknowledged. Replayed onto each new baseline meanwhile.
    Optimistic,
}

impl<M: MetavoxelState> MetavoxelClient<M> {
    /// Route an edit according to `delivery`. Returns the high-priority id
    /// of an optimistic edit.
    pub fn submit_edit(
        &mut self,
        edit: M::Edit,
        delivery: EditDelivery,
    ) -> Result<Option<HighPriorityId>, EndpointError> {
        match delivery {
            EditDelivery::Reliable => self.submit_reliable(edit).map(|_| None),
            EditDelivery::Optimistic => self.submit_optimistic(edit).map(Some),
        }
    }

    /// Queue an edit on the reliable channel. A stalled channel closes the
    /// endpoint.
    pub fn submit_reliable(&mut self, edit: M::Edit) -> Result<(), EndpointError> {
        self.ensure_open()?;
        let bytes = SyncMessage::EditOperation { edit }.to_bytes()?;
        match self.sequencer_mut().reliable_output_channel().send_message(bytes) {
            Ok(message_index) => {
                debug!("edit queued as reliable message {}", message_index);
                Ok(())
            }
            Err(error @ SequencerError::ReliableChannelStalled { .. }) => {
                Err(self.fail(error.into()))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Apply an edit locally and send it redundantly until acknowledged.
    /// Refused without closing the endpoint while the unacknowledged
    /// optimistic edits would crowd the lod announcement out of a datagram.
    pub fn submit_optimistic(&mut self, edit: M::Edit) -> Result<HighPriorityId, EndpointError> {
        self.ensure_open()?;
        let bytes = SyncMessage::EditOperation { edit: edit.clone() }.to_bytes()?;
        let announcement = SyncMessage::<M::Edit>::StateAnnouncement {
            lod: self.current_lod(),
        };
        self.sequencer_mut().check_high_priority_room(&bytes, announcement.bit_length())?;

        self.apply_local_edit(&edit)?;
        let id = self.sequencer_mut().send_high_priority_message(bytes);
        self.optimistic_edits.insert(id, edit);
        debug!("optimistic edit sent as high-priority message {}", id);
        Ok(id)
    }
}
