use std::sync::Arc;

use chord_transport::connections::DummyConnector;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio::time::Duration;

use super::TestRing;
use crate::dht::Bootstrap;
use crate::dht::NodeId;
use crate::dht::NodeRef;
use crate::dht::NodeState;
use crate::error::Error;
use crate::error::Result;
use crate::message::Envelope;
use crate::message::FindSuccessorSend;
use crate::message::FindSuccessorThen;
use crate::message::Message;
use crate::message::NotifyPredecessorSend;
use crate::swarm::ChordNodeBuilder;
use crate::transport::SwarmTransport;

#[tokio::test]
async fn test_two_nodes_converge() -> Result<()> {
    let mut ring = TestRing::new(8);
    let s = ring.add_node(0, 8000);
    let a = ring.add_node(100, 8001);

    s.join(None).await?;
    assert_eq!(s.state()?, NodeState::Stable);
    assert_eq!(s.dht().successor()?.id, s.id());

    a.join(Some(TestRing::bootstrap(8000))).await?;
    assert_eq!(a.state()?, NodeState::Joining);
    ring.deliver_all().await;
    assert_eq!(a.state()?, NodeState::Stable);
    assert_eq!(a.dht().successor()?.id, NodeId(0));

    ring.stabilize(3).await;
    assert_eq!(s.dht().successor()?.id, NodeId(100));
    assert_eq!(a.dht().successor()?.id, NodeId(0));
    assert_eq!(a.dht().predecessor()?.map(|p| p.id), Some(NodeId(0)));
    assert_eq!(s.dht().predecessor()?.map(|p| p.id), Some(NodeId(100)));
    Ok(())
}

#[tokio::test]
async fn test_five_nodes_converge() -> Result<()> {
    let mut ring = TestRing::ring_of(8, &[0, 40, 100, 160, 220]).await;
    for node in ring.nodes() {
        assert_eq!(node.state()?, NodeState::Stable);
    }
    ring.stabilize(20).await;
    ring.assert_converged();

    // a late joiner behind an existing successor is picked up as well
    let late = ring.add_node(130, 8010);
    late.join(Some(TestRing::bootstrap(8002))).await?;
    ring.deliver_all().await;
    ring.stabilize(10).await;
    ring.assert_converged();
    assert_eq!(ring.node(100).dht().successor()?.id, NodeId(130));
    Ok(())
}

#[tokio::test]
async fn test_lookup_wraps_around() -> Result<()> {
    let mut ring = TestRing::ring_of(8, &[0, 85, 170]).await;
    ring.stabilize(20).await;
    ring.assert_converged();

    for node in ring.nodes() {
        assert_eq!(node.lookup_id(NodeId(200))?.id, NodeId(0));
        assert_eq!(node.lookup_id(NodeId(0))?.id, NodeId(0));
        assert_eq!(node.lookup_id(NodeId(85))?.id, NodeId(85));
        assert_eq!(node.lookup_id(NodeId(86))?.id, NodeId(170));
    }
    Ok(())
}

#[tokio::test]
async fn test_lookup_is_idempotent() -> Result<()> {
    let mut ring = TestRing::ring_of(8, &[0, 40, 100, 160, 220]).await;
    ring.stabilize(30).await;

    for key in ["alpha", "beta", "gamma", "39", "41", "255"] {
        for node in ring.nodes() {
            let first = node.lookup(key)?;
            let second = node.lookup(key)?;
            assert_eq!(first, second, "lookup({}) on {}", key, node.id());
        }
    }
    // resolving an owned id never leaves the node
    assert_eq!(ring.node(100).lookup("41")?.id, NodeId(100));
    assert!(ring.take_pending().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_join_retried_after_lost_request() -> Result<()> {
    let mut ring = TestRing::new(8);
    let s = ring.add_node(0, 8000);
    let a = ring.add_node(100, 8001);
    s.join(None).await?;
    a.join(Some(TestRing::bootstrap(8000))).await?;

    let lost = ring.take_pending();
    assert_eq!(lost.len(), 1);
    assert_eq!(lost[0].port, 8000);
    // the bootstrap id is unknown, so the path carries the joiner's id
    assert_eq!(lost[0].path_id, "64");
    assert_eq!(a.state()?, NodeState::Joining);

    // a joining node does not resolve lookups for others
    assert!(a.dht().find_successor(NodeId(50))?.is_none());

    ring.tick_all().await;
    assert_eq!(a.state()?, NodeState::Stable);
    assert_eq!(a.dht().successor()?.id, NodeId(0));

    ring.stabilize(3).await;
    ring.assert_converged();
    Ok(())
}

#[tokio::test]
async fn test_join_through_local_seed_by_id() -> Result<()> {
    // two members in one process, the second joins through the first by id
    let mut ring = TestRing::new(8);
    let s = ring.add_node(10, 8000);
    let a = ring.add_node(200, 8000);
    s.join(None).await?;
    a.join(Some(Bootstrap::from(&s.node_ref()))).await?;
    ring.deliver_all().await;
    assert_eq!(a.dht().successor()?.id, NodeId(10));

    ring.stabilize(3).await;
    ring.assert_converged();
    Ok(())
}

#[tokio::test]
async fn test_stabilizer_start_stop() -> Result<()> {
    let mut ring = TestRing::new(8);
    let s = Arc::new(
        ring.builder(0, 8000)
            .stabilize_interval(Duration::from_millis(10))
            .build()?,
    );
    ring.process(8000).register(s.clone())?;
    s.join(None).await?;

    let a = Arc::new(
        ring.builder(100, 8001)
            .stabilize_interval(Duration::from_millis(10))
            .build()?,
    );
    ring.process(8001).register(a.clone())?;
    a.join(Some(TestRing::bootstrap(8000))).await?;
    assert_eq!(ring.take_pending().len(), 1);

    assert!(!a.is_updating_fingers());
    a.start_update_fingers()?;
    assert!(a.is_updating_fingers());
    assert!(matches!(
        a.start_update_fingers(),
        Err(Error::StabilizerAlreadyRunning(NodeId(100)))
    ));

    // the periodic task sends the join request again
    let frame = timeout(Duration::from_secs(1), async {
        loop {
            if let Some(frame) = ring.take_pending().into_iter().next() {
                return frame;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("join request resent");
    let envelope = Envelope::from_json(&frame.text)?;
    assert_eq!(
        envelope.message,
        Message::FindSuccessorSend(FindSuccessorSend {
            id: NodeId(100),
            then: FindSuccessorThen::Join,
        })
    );

    a.stop_update_fingers()?;
    a.stop_update_fingers()?;
    sleep(Duration::from_millis(30)).await;
    assert!(!a.is_updating_fingers());
    Ok(())
}

#[test]
fn test_zero_stabilize_interval_rejected() {
    let ring = TestRing::new(8);
    let built = ring
        .builder(0, 8000)
        .stabilize_interval(Duration::ZERO)
        .build();
    assert!(matches!(built, Err(Error::InvalidStabilizeInterval)));

    assert!(ring
        .builder(0, 8000)
        .stabilize_interval(Duration::from_millis(1))
        .build()
        .is_ok());
}

#[tokio::test]
async fn test_refused_connections_leave_state_intact() -> Result<()> {
    let refusing_node = |id: u128, port: u16| {
        let (connector, _rx) = DummyConnector::new();
        connector.refuse(true);
        ChordNodeBuilder::new("127.0.0.1", port, Arc::new(SwarmTransport::new(connector)))
            .identifier_bits(8)
            .id(NodeId(id))
            .build()
    };

    // a seed that heard of a peer it can never reach
    let s = refusing_node(0, 8000)?;
    s.join(None).await?;
    let peer = NodeRef::new(NodeId(100), "127.0.0.1", 8001);
    s.dispatch(Envelope::new(
        Message::NotifyPredecessorSend(NotifyPredecessorSend { id: NodeId(0) }),
        peer.clone(),
        Some(s.node_ref()),
    ))
    .await?;
    for _ in 0..10 {
        s.tick().await?;
    }
    let settled = s.inspect()?;
    for _ in 0..10 {
        s.tick().await?;
    }
    assert_eq!(s.inspect()?, settled);
    assert_eq!(s.state()?, NodeState::Stable);
    assert_eq!(s.dht().predecessor()?, Some(peer));
    assert_eq!(s.lookup_id(NodeId(0))?.id, NodeId(0));

    // a joiner whose bootstrap refuses every connection keeps asking
    let a = refusing_node(100, 8001)?;
    a.join(Some(TestRing::bootstrap(8000))).await?;
    let fingers = a.dht().fingers()?;
    for _ in 0..10 {
        a.tick().await?;
    }
    assert_eq!(a.dht().fingers()?, fingers);
    assert_eq!(a.state()?, NodeState::Joining);
    assert_eq!(a.dht().successor()?.id, NodeId(100));
    assert_eq!(a.dht().predecessor()?, None);
    Ok(())
}
