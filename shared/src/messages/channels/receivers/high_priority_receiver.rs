use log::warn;

use crate::types::HighPriorityId;

/// Releases each high-priority message once. The remote sender repeats
/// every unacknowledged message in every datagram, so anything below the
/// next expected id has already been released.
pub struct HighPriorityReceiver {
    next_expected: HighPriorityId,
}

impl HighPriorityReceiver {
    pub fn new() -> Self {
        Self { next_expected: 0 }
    }

    pub fn receive_messages(
        &mut self,
        mut messages: Vec<(HighPriorityId, Vec<u8>)>,
    ) -> Vec<(HighPriorityId, Vec<u8>)> {
        messages.sort_by_key(|(id, _)| *id);
        let mut output = Vec::new();
        for (id, bytes) in messages {
            if id < self.next_expected {
                continue;
            }
            if id > self.next_expected {
                warn!(
                    "high-priority ids {}..{} were never received",
                    self.next_expected, id
                );
            }
            self.next_expected = id.wrapping_add(1);
            output.push((id, bytes));
        }
        output
    }
}

impl Default for HighPriorityReceiver {
    fn default() -> Self {
        Self::new()
    }
}
