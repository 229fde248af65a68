pub mod delta_codec;
pub mod error;
pub mod lod;
pub mod record_history;
pub mod shared_objects;

use naia_serde::Serde;

use crate::state::{error::StateError, lod::Lod, shared_objects::SharedObjectResolver};

/// The spatial structure both peers keep in sync. Implemented by the
/// application; the protocol only snapshots, diffs and edits it.
pub trait MetavoxelState: Clone + Default + Send {
    /// An operation on the structure, carried as an `EditOperation`
    type Edit: Serde + Send;
    /// Shared objects that edits may refer to by id
    type Object: Send + Sync;

    /// Deep, independent copy used as a decode baseline
    fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Encode the difference between `self` at `lod` and `base` at
    /// `base_lod`
    fn encode_delta(&self, base: &Self, base_lod: &Lod, lod: &Lod) -> Result<Vec<u8>, StateError>;

    /// Called on a copy of the baseline that `bytes` were encoded against;
    /// transforms it into the encoder's state at `lod`
    fn apply_delta(&mut self, bytes: &[u8], base_lod: &Lod, lod: &Lod) -> Result<(), StateError>;

    /// Apply one edit. Applying the same edit twice must leave the
    /// structure as applying it once does.
    fn apply_edit(
        &mut self,
        edit: &Self::Edit,
        resolver: &dyn SharedObjectResolver<Self::Object>,
    ) -> Result<(), StateError>;
}
