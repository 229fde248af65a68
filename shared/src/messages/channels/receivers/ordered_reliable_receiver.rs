use std::collections::VecDeque;

use log::trace;

use crate::{
    messages::channels::receivers::error::ReceiverError, types::MessageIndex,
    wrapping_number::{forward_distance, sequence_less_than},
};

/// Reassembles the reliable channel: messages may arrive out of order or
/// more than once, and are released exactly once, in index order
pub struct OrderedReliableReceiver {
    buffer: VecDeque<(MessageIndex, Option<Vec<u8>>)>,
    messages_received: MessageIndex,
    window: usize,
}

impl OrderedReliableReceiver {
    pub fn new(window: usize) -> Self {
        Self {
            buffer: VecDeque::new(),
            messages_received: 0,
            window,
        }
    }

    /// Index of the next message to be released
    pub fn next_index(&self) -> MessageIndex {
        self.messages_received
    }

    /// Validate an incoming index without changing any state
    pub fn check_index(&self, message_index: MessageIndex) -> Result<(), ReceiverError> {
        if sequence_less_than(message_index, self.messages_received) {
            return Ok(());
        }
        let distance = forward_distance(self.messages_received, message_index) as usize;
        if distance >= self.window {
            return Err(ReceiverError::IndexOutOfWindow {
                index: message_index,
                expected: self.messages_received,
                distance,
                window: self.window,
            });
        }
        Ok(())
    }

    /// Buffer a message and return every message that is now deliverable
    pub fn receive_message(
        &mut self,
        message_index: MessageIndex,
        bytes: Vec<u8>,
    ) -> Result<Vec<Vec<u8>>, ReceiverError> {
        if sequence_less_than(message_index, self.messages_received) {
            trace!("discarding already released reliable message {}", message_index);
            return Ok(Vec::new());
        }
        self.check_index(message_index)?;

        // Put message where it needs to go in buffer
        let offset = forward_distance(self.messages_received, message_index) as usize;
        while self.buffer.len() <= offset {
            let next_index = self
                .messages_received
                .wrapping_add(self.buffer.len() as MessageIndex);
            self.buffer.push_back((next_index, None));
        }
        let (slot_index, slot) =
            self.buffer
                .get_mut(offset)
                .ok_or(ReceiverError::BufferInconsistency {
                    reason: "buffer slot not instantiated",
                })?;
        if *slot_index != message_index {
            return Err(ReceiverError::BufferInconsistency {
                reason: "buffer slot holds a different index",
            });
        }
        if slot.is_none() {
            *slot = Some(bytes);
        }

        // Pop messages out in order
        let mut output = Vec::new();
        while let Some((_, Some(_))) = self.buffer.front() {
            let Some((_, Some(message))) = self.buffer.pop_front() else {
                return Err(ReceiverError::BufferInconsistency {
                    reason: "message disappeared between check and pop",
                });
            };
            output.push(message);
            self.messages_received = self.messages_received.wrapping_add(1);
        }
        Ok(output)
    }
}
