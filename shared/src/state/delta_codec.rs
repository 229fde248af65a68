use crate::state::{
    error::StateError,
    lod::Lod,
    record_history::{ReceiveRecord, RecordHistory, SendRecord},
    MetavoxelState,
};

/// The baseline an incoming delta was encoded against: the oldest receive
/// record, since the remote host cannot assume anything newer than what it
/// has heard acknowledged
pub fn select_decode_baseline<M>(receive_history: &RecordHistory<ReceiveRecord<M>>) -> (&M, &Lod) {
    let oldest = receive_history.oldest();
    (&oldest.snapshot, &oldest.lod)
}

/// The lod the remote host has certainly seen acknowledged, and therefore
/// the lod its deltas target
pub fn select_reference_lod(send_history: &RecordHistory<SendRecord>) -> &Lod {
    &send_history.oldest().lod
}

/// Decode `bytes` onto a copy of the selected baseline. Returns the new
/// state and the reference lod used; nothing is committed on failure.
pub fn decode_and_apply<M: MetavoxelState>(
    receive_history: &RecordHistory<ReceiveRecord<M>>,
    send_history: &RecordHistory<SendRecord>,
    bytes: &[u8],
) -> Result<(M, Lod), StateError> {
    let (baseline, baseline_lod) = select_decode_baseline(receive_history);
    let reference_lod = *select_reference_lod(send_history);
    let mut staged = baseline.snapshot();
    staged.apply_delta(bytes, baseline_lod, &reference_lod)?;
    Ok((staged, reference_lod))
}
