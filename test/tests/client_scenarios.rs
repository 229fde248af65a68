/// Sync endpoint scenarios driven by a hand-controlled remote host
/// Each test crafts the exact datagrams the endpoint receives and checks the
/// resulting histories, mirror and events

use std::sync::Arc;

use voxsync_client::{EndpointError, EndpointEvent, EndpointState};
use voxsync_shared::{Lod, MetavoxelState, Record, SequencerError, SharedObjectTable, SyncMessage};
use voxsync_test::{
    connect_client, init_logger, payload_message, LocalSocketPair, Material, RawPeer, TestEdit,
    TestMirror, TICK,
};

struct Scenario {
    link: LocalSocketPair,
    peer: RawPeer,
    materials: Arc<SharedObjectTable<Material>>,
}

impl Scenario {
    fn new() -> Self {
        init_logger();
        Self {
            link: LocalSocketPair::new(),
            peer: RawPeer::new(),
            materials: Arc::new(SharedObjectTable::new()),
        }
    }
}

fn world() -> TestMirror {
    TestMirror::with_voxels([([0, 0, 0], 1), ([5, 0, 0], 2), ([900, 0, 0], 3)])
}

fn delta(data: &TestMirror, base: &TestMirror, base_lod: &Lod, lod: &Lod) -> SyncMessage<TestEdit> {
    SyncMessage::DeltaUpdate {
        bytes: data.encode_delta(base, base_lod, lod).unwrap(),
    }
}

#[test]
fn acknowledgment_rebases_send_history() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);

    for _ in 0..3 {
        client.tick(TICK).unwrap();
    }
    let sent = scenario.link.take_to_server();
    assert_eq!(sent.len(), 3);
    assert_eq!(client.outgoing_packet_number(), 3);

    // only packet 2 reaches the remote host
    scenario.peer.receive(&sent[1]).unwrap();
    let reply = scenario.peer.compose(None);
    let events = client.receive_datagram(&reply).unwrap();

    assert!(events.contains(&EndpointEvent::SendAcknowledged(2)));
    assert_eq!(client.send_records().oldest().packet_number(), 2);
    let in_flight: Vec<u32> = client
        .send_records()
        .in_flight()
        .map(|record| record.packet_number())
        .collect();
    assert_eq!(in_flight, vec![3]);
}

#[test]
fn announcements_carry_current_lod() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    client.set_viewer_position([3.0, 4.0, 5.0]);

    client.tick(TICK).unwrap();
    let received = scenario.peer.receive_all(&scenario.link);

    assert_eq!(received.len(), 1);
    assert_eq!(
        payload_message(&received[0]),
        SyncMessage::StateAnnouncement {
            lod: client.current_lod()
        }
    );
    assert_eq!(client.send_records().newest().lod, client.current_lod());
}

#[test]
fn first_delta_commits_against_sentinel() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    let lod = client.current_lod();
    let data = world();

    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);
    let reply = scenario
        .peer
        .compose(Some(&delta(&data, &TestMirror::new(), &Lod::default(), &lod)));
    let events = client.receive_datagram(&reply).unwrap();

    assert!(events.contains(&EndpointEvent::BaselineCommitted(1)));
    assert_eq!(client.mirror(), &data.visible_at(&lod));
    assert!(client.mirror().get(&[900, 0, 0]).is_none());

    let newest = client.receive_records().newest();
    assert_eq!(newest.packet_number, 1);
    assert_eq!(newest.lod, lod);
    assert_eq!(newest.snapshot, data.visible_at(&lod));
}

#[test]
fn stale_delta_is_ignored() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    let lod = client.current_lod();

    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);
    let older = TestMirror::with_voxels([([1, 0, 0], 1)]);
    let newer = TestMirror::with_voxels([([2, 0, 0], 2)]);
    let first = scenario
        .peer
        .compose(Some(&delta(&older, &TestMirror::new(), &Lod::default(), &lod)));
    let second = scenario
        .peer
        .compose(Some(&delta(&newer, &TestMirror::new(), &Lod::default(), &lod)));

    client.receive_datagram(&second).unwrap();
    let events = client.receive_datagram(&first).unwrap();

    assert!(!events
        .iter()
        .any(|event| matches!(event, EndpointEvent::BaselineCommitted(_))));
    assert_eq!(client.mirror(), &newer);
    assert_eq!(client.incoming_packet_number(), 2);
}

#[test]
fn duplicate_datagram_is_ignored() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    let lod = client.current_lod();

    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);
    let reply = scenario
        .peer
        .compose(Some(&delta(&world(), &TestMirror::new(), &Lod::default(), &lod)));

    assert!(!client.receive_datagram(&reply).unwrap().is_empty());
    assert!(client.receive_datagram(&reply).unwrap().is_empty());
    assert_eq!(client.receive_records().len(), 2);
}

#[test]
fn optimistic_edit_is_replayed_until_acknowledged() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    let lod = client.current_lod();
    let edit = TestEdit::SetVoxel {
        position: [1, 0, 0],
        color: 5,
    };

    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);

    let id = client.submit_optimistic(edit.clone()).unwrap();
    assert_eq!(client.mirror().get(&[1, 0, 0]).map(|voxel| voxel.color), Some(5));

    // the datagram carrying the edit is lost
    client.tick(TICK).unwrap();
    scenario.link.take_to_server();

    let before_edit = world();
    let reply = scenario.peer.compose(Some(&delta(
        &before_edit,
        &TestMirror::new(),
        &Lod::default(),
        &lod,
    )));
    let events = client.receive_datagram(&reply).unwrap();

    assert!(events.contains(&EndpointEvent::BaselineCommitted(1)));
    assert!(!events.contains(&EndpointEvent::EditAcknowledged(id)));
    assert_eq!(client.mirror().get(&[1, 0, 0]).map(|voxel| voxel.color), Some(5));
    assert_eq!(client.mirror().get(&[0, 0, 0]).map(|voxel| voxel.color), Some(1));
    assert!(client.receive_records().newest().snapshot.get(&[1, 0, 0]).is_none());

    // the edit is repeated in the next datagram
    client.tick(TICK).unwrap();
    let received = scenario.peer.receive_all(&scenario.link);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].high_priority_messages.len(), 1);
    let (received_id, bytes) = &received[0].high_priority_messages[0];
    assert_eq!(*received_id, id);
    assert_eq!(
        SyncMessage::<TestEdit>::from_bytes(bytes).unwrap(),
        SyncMessage::EditOperation { edit: edit.clone() }
    );

    let mut after_edit = before_edit.clone();
    after_edit
        .apply_edit(&edit, scenario.materials.as_ref())
        .unwrap();
    let reply = scenario
        .peer
        .compose(Some(&delta(&after_edit, &before_edit, &lod, &lod)));
    let events = client.receive_datagram(&reply).unwrap();

    assert!(events.contains(&EndpointEvent::EditAcknowledged(id)));
    assert!(events.contains(&EndpointEvent::ReceiveAcknowledged(1)));
    assert!(events.contains(&EndpointEvent::BaselineCommitted(2)));
    assert_eq!(client.receive_records().oldest().packet_number, 1);
    assert_eq!(client.mirror(), &after_edit.visible_at(&lod));

    // an acknowledged edit is no longer repeated
    client.tick(TICK).unwrap();
    let received = scenario.peer.receive_all(&scenario.link);
    assert!(received[0].high_priority_messages.is_empty());
}

#[test]
fn reliable_edit_is_not_applied_locally() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    let edit = TestEdit::SetVoxel {
        position: [3, 3, 3],
        color: 8,
    };

    client.submit_reliable(edit.clone()).unwrap();
    assert!(client.mirror().is_empty());

    client.tick(TICK).unwrap();
    let received = scenario.peer.receive_all(&scenario.link);

    assert_eq!(received[0].reliable_messages.len(), 1);
    assert_eq!(
        SyncMessage::<TestEdit>::from_bytes(&received[0].reliable_messages[0]).unwrap(),
        SyncMessage::EditOperation { edit }
    );
    assert!(received[0].high_priority_messages.is_empty());
}

#[test]
fn reliable_edit_survives_loss_and_arrives_once() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);

    client
        .submit_reliable(TestEdit::ClearVoxel {
            position: [0, 0, 0],
        })
        .unwrap();
    client.tick(TICK).unwrap();
    scenario.link.take_to_server();

    let mut delivered = 0;
    for _ in 0..12 {
        client.tick(TICK).unwrap();
        for received in scenario.peer.receive_all(&scenario.link) {
            delivered += received.reliable_messages.len();
        }
    }

    assert_eq!(delivered, 1);
}

#[test]
fn close_sends_close_message_and_rejects_further_use() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);

    client.close();

    assert_eq!(client.state(), EndpointState::Closed);
    let received = scenario.peer.receive_all(&scenario.link);
    assert_eq!(received.len(), 1);
    assert_eq!(payload_message(&received[0]), SyncMessage::CloseSession);

    assert_eq!(
        client.tick(TICK),
        Err(EndpointError::NotOpen {
            state: EndpointState::Closed
        })
    );
    let reply = scenario.peer.compose(None);
    assert!(matches!(
        client.receive_datagram(&reply),
        Err(EndpointError::NotOpen { .. })
    ));
    assert!(matches!(
        client.submit_optimistic(TestEdit::ClearVoxel {
            position: [0, 0, 0]
        }),
        Err(EndpointError::NotOpen { .. })
    ));
    assert_eq!(client.send_records().len(), 1);

    // closing twice sends nothing more
    client.close();
    assert!(scenario.link.take_to_server().is_empty());
}

#[test]
fn dropping_endpoint_closes_it() {
    let mut scenario = Scenario::new();
    let client = connect_client(&scenario.link, &scenario.materials);

    drop(client);

    let received = scenario.peer.receive_all(&scenario.link);
    assert_eq!(received.len(), 1);
    assert_eq!(payload_message(&received[0]), SyncMessage::CloseSession);
}

#[test]
fn close_from_peer_closes_endpoint() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);

    let reply = scenario.peer.compose(Some(&SyncMessage::CloseSession));
    let events = client.receive_datagram(&reply).unwrap();

    assert!(events.contains(&EndpointEvent::ClosedByPeer));
    assert_eq!(client.state(), EndpointState::Closed);
    assert!(!client.is_open());
}

#[test]
fn malformed_datagrams_are_discarded() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);

    assert!(client.receive_datagram(&[]).unwrap().is_empty());
    assert!(client.receive_datagram(&[0xff, 0x01]).unwrap().is_empty());
    // acknowledges a packet the endpoint never sent
    let mut liar = RawPeer::new();
    let lie = {
        let fake_client = LocalSocketPair::new();
        let mut fake = connect_client(&fake_client, &scenario.materials);
        for _ in 0..5 {
            fake.tick(TICK).unwrap();
        }
        liar.receive_all(&fake_client);
        liar.compose(None)
    };
    assert!(client.receive_datagram(&lie).unwrap().is_empty());

    assert!(client.is_open());
    assert_eq!(client.incoming_packet_number(), 0);
    let reply = scenario.peer.compose(None);
    assert!(client.receive_datagram(&reply).is_ok());
    assert_eq!(client.incoming_packet_number(), 1);
}

#[test]
fn undecodable_delta_keeps_baseline() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);

    let reply = scenario.peer.compose(Some(&SyncMessage::DeltaUpdate {
        bytes: vec![0xff; 3],
    }));
    let events = client.receive_datagram(&reply).unwrap();

    assert!(client.is_open());
    assert!(events.contains(&EndpointEvent::SendAcknowledged(1)));
    assert!(!events
        .iter()
        .any(|event| matches!(event, EndpointEvent::BaselineCommitted(_))));
    assert_eq!(client.receive_records().len(), 1);
    assert!(client.mirror().is_empty());
}

#[test]
fn unresolvable_optimistic_edit_is_not_sent() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);

    let result = client.submit_optimistic(TestEdit::Paint {
        position: [0, 0, 0],
        material: 99,
    });

    // the material is unknown, so the edit fails to apply locally
    assert!(matches!(result, Err(EndpointError::State(_))));
    assert!(client.mirror().is_empty());
    client.tick(TICK).unwrap();
    let received = scenario.peer.receive_all(&scenario.link);
    assert!(received[0].high_priority_messages.is_empty());
}

#[test]
fn channel_messages_survive_an_undecodable_delta() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);

    let reliable = SyncMessage::EditOperation {
        edit: TestEdit::SetVoxel {
            position: [1, 1, 1],
            color: 6,
        },
    };
    let high_priority = SyncMessage::EditOperation {
        edit: TestEdit::SetVoxel {
            position: [2, 2, 2],
            color: 7,
        },
    };
    scenario
        .peer
        .sequencer
        .reliable_output_channel()
        .send_message(reliable.to_bytes().unwrap())
        .unwrap();
    scenario
        .peer
        .sequencer
        .send_high_priority_message(high_priority.to_bytes().unwrap());
    let reply = scenario.peer.compose(Some(&SyncMessage::DeltaUpdate {
        bytes: vec![0xff; 3],
    }));
    let events = client.receive_datagram(&reply).unwrap();

    assert!(client.is_open());
    assert!(events.contains(&EndpointEvent::EditsApplied(2)));
    assert!(!events
        .iter()
        .any(|event| matches!(event, EndpointEvent::BaselineCommitted(_))));
    assert_eq!(client.receive_records().len(), 1);
    assert_eq!(client.mirror().get(&[1, 1, 1]).map(|voxel| voxel.color), Some(6));
    assert_eq!(client.mirror().get(&[2, 2, 2]).map(|voxel| voxel.color), Some(7));

    // the peer learns of delivery and never offers the reliable edit again
    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);
    assert!(!scenario
        .peer
        .sequencer
        .reliable_output_channel()
        .has_outgoing_messages());
}

#[test]
fn failing_channel_message_leaves_the_others_applied() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);
    client.tick(TICK).unwrap();
    scenario.peer.receive_all(&scenario.link);

    let channel = scenario.peer.sequencer.reliable_output_channel();
    for edit in [
        TestEdit::Paint {
            position: [3, 3, 3],
            material: 99,
        },
        TestEdit::SetVoxel {
            position: [4, 4, 4],
            color: 8,
        },
    ] {
        let bytes = SyncMessage::EditOperation { edit }.to_bytes().unwrap();
        channel.send_message(bytes).unwrap();
    }
    let reply = scenario.peer.compose(None);
    let events = client.receive_datagram(&reply).unwrap();

    assert_eq!(
        events,
        vec![EndpointEvent::SendAcknowledged(1), EndpointEvent::EditsApplied(1)]
    );
    assert!(client.mirror().get(&[3, 3, 3]).is_none());
    assert_eq!(client.mirror().get(&[4, 4, 4]).map(|voxel| voxel.color), Some(8));
}

#[test]
fn optimistic_backlog_is_refused_without_closing() {
    let mut scenario = Scenario::new();
    let mut client = connect_client(&scenario.link, &scenario.materials);

    let mut accepted = 0u16;
    let refusal = loop {
        let edit = TestEdit::SetVoxel {
            position: [accepted, 0, 0],
            color: 1,
        };
        match client.submit_optimistic(edit) {
            Ok(_) => accepted += 1,
            Err(error) => break error,
        }
    };

    assert!(accepted > 0);
    assert!(matches!(
        refusal,
        EndpointError::Sequencer(SequencerError::HighPriorityBacklog { .. })
    ));
    assert!(client.is_open());
    assert!(client.mirror().get(&[accepted, 0, 0]).is_none());

    client.tick(TICK).unwrap();
    let received = scenario.peer.receive_all(&scenario.link);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].high_priority_messages.len(), usize::from(accepted));
    assert_eq!(
        payload_message(&received[0]),
        SyncMessage::StateAnnouncement {
            lod: client.current_lod()
        }
    );

    // acknowledgment drains the backlog
    let reply = scenario.peer.compose(None);
    let events = client.receive_datagram(&reply).unwrap();
    let acknowledged = events
        .iter()
        .filter(|event| matches!(event, EndpointEvent::EditAcknowledged(_)))
        .count();
    assert_eq!(acknowledged, usize::from(accepted));
    assert!(client
        .submit_optimistic(TestEdit::ClearVoxel {
            position: [0, 0, 0]
        })
        .is_ok());
}
