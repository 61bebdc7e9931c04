use std::sync::Arc;

use serde_json::json;

use super::Recorder;
use super::TestRing;
use crate::dht::NodeId;
use crate::error::Result;
use crate::message::CustomMessage;
use crate::message::KeyedOperation;
use crate::message::Message;

async fn recorded_ring(ids: &[u128]) -> (TestRing, Vec<Arc<Recorder>>) {
    let mut ring = TestRing::ring_of(8, ids).await;
    ring.stabilize(20).await;
    ring.assert_converged();
    let recorders = ring
        .nodes()
        .iter()
        .map(|node| {
            let recorder = Arc::new(Recorder::default());
            node.set_callback(recorder.clone()).unwrap();
            recorder
        })
        .collect();
    (ring, recorders)
}

#[tokio::test]
async fn test_keyed_operation_on_own_id_is_local() -> Result<()> {
    let (mut ring, recorders) = recorded_ring(&[0, 85, 170]).await;

    let node = ring.node(85);
    node.send_keyed(KeyedOperation::Put {
        key: "85".to_string(),
        value: json!("v"),
    })
    .await?;

    assert!(ring.take_pending().is_empty());
    let ops = recorders[1].operations.lock().unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].0.message.id(), NodeId(85));
    assert_eq!(ops[0].1, KeyedOperation::Put {
        key: "85".to_string(),
        value: json!("v"),
    });
    Ok(())
}

#[tokio::test]
async fn test_keyed_operation_forwarded_to_owner() -> Result<()> {
    let (mut ring, recorders) = recorded_ring(&[0, 85, 170]).await;

    ring.node(0)
        .send_keyed(KeyedOperation::Get {
            key: "100".to_string(),
        })
        .await?;
    assert!(recorders.iter().all(|r| r.operations.lock().unwrap().is_empty()));

    assert!(ring.deliver_all().await > 0);
    assert!(recorders[0].operations.lock().unwrap().is_empty());
    assert!(recorders[1].operations.lock().unwrap().is_empty());
    let ops = recorders[2].operations.lock().unwrap();
    assert_eq!(ops.len(), 1);
    // forwarding keeps the origin
    assert_eq!(ops[0].0.from.id, NodeId(0));
    assert_eq!(ops[0].0.to.as_ref().map(|to| to.id), Some(NodeId(170)));
    Ok(())
}

#[tokio::test]
async fn test_keyed_operation_wraps_to_first_node() -> Result<()> {
    let (mut ring, recorders) = recorded_ring(&[0, 40, 100, 160, 220]).await;

    for from in [40, 100, 160, 220] {
        ring.node(from)
            .send_keyed(KeyedOperation::Get {
                key: "230".to_string(),
            })
            .await?;
        ring.deliver_all().await;
    }
    assert_eq!(recorders[0].operations.lock().unwrap().len(), 4);
    assert!(recorders[1..]
        .iter()
        .all(|r| r.operations.lock().unwrap().is_empty()));
    Ok(())
}

#[tokio::test]
async fn test_application_message_reaches_callback() -> Result<()> {
    let (mut ring, recorders) = recorded_ring(&[0, 85, 170]).await;

    let to = ring.node(170).node_ref();
    let content = json!({"hello": "world", "n": [1, 2, 3]});
    ring.node(0).send_message(&to, content.clone()).await?;
    ring.deliver_all().await;

    let messages = recorders[2].messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].from.id, NodeId(0));
    assert_eq!(
        messages[0].message,
        Message::CustomMessage(CustomMessage {
            id: NodeId(170),
            content,
        })
    );
    assert!(recorders[0].messages.lock().unwrap().is_empty());
    assert!(recorders[1].messages.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_application_message_to_self() -> Result<()> {
    let (mut ring, recorders) = recorded_ring(&[0, 85, 170]).await;

    let node = ring.node(85);
    node.send_message(&node.node_ref(), json!(null)).await?;
    assert!(ring.take_pending().is_empty());
    assert_eq!(recorders[1].messages.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_malformed_payloads_are_rejected() -> Result<()> {
    let (mut ring, _recorders) = recorded_ring(&[0, 85]).await;
    let before = ring.node(0).inspect()?;
    let process = ring.process(8000);

    for text in [
        "",
        "not json",
        r#"{"from": {"id": "55", "address": "127.0.0.1", "port": 8001}}"#,
        r#"{"message": {"type": 2, "id": "0"}}"#,
        r#"{"message": {"type": 42, "id": "0"}, "from": {"id": "55", "address": "127.0.0.1", "port": 8001}}"#,
        r#"{"message": {"type": 1, "id": "0"}, "from": {"id": "55", "address": "127.0.0.1", "port": 8001}}"#,
        r#"{"message": {"type": 2, "id": "xyz"}, "from": {"id": "55", "address": "127.0.0.1", "port": 8001}}"#,
    ] {
        assert!(process.deliver(Some("0"), text).await.is_err(), "{}", text);
    }

    assert_eq!(ring.node(0).inspect()?, before);
    assert!(ring.take_pending().is_empty());
    Ok(())
}
