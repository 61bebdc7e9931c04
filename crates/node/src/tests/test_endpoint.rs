use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::SinkExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::config::Config;
use crate::endpoint::run_endpoint;
use crate::prelude::chord_core::message::Message;
use crate::prelude::chord_core::message::NotifyPredecessorSend;
use crate::prelude::chord_core::swarm::callback::CallbackError;
use crate::prelude::Bootstrap;
use crate::prelude::Envelope;
use crate::prelude::KeyedOperation;
use crate::prelude::NodeCallback;
use crate::prelude::NodeId;
use crate::prelude::NodeRef;
use crate::processor::Processor;
use crate::processor::ProcessorBuilder;

fn config(port: u16, id: u128, join: Option<Bootstrap>) -> Config {
    Config {
        bind_addr: format!("127.0.0.1:{}", port),
        external_port: port,
        stabilize_interval: 50,
        node_id: Some(NodeId(id)),
        join,
        ..Default::default()
    }
}

async fn spawn_processor(config: Config) -> Arc<Processor> {
    let processor = Arc::new(ProcessorBuilder::from_config(&config).unwrap().build().unwrap());
    tokio::spawn(run_endpoint(processor.clone()));
    processor
}

#[derive(Default)]
struct OperationRecorder(Mutex<Vec<KeyedOperation>>);

#[async_trait]
impl NodeCallback for OperationRecorder {
    async fn on_keyed_operation(
        &self,
        _envelope: &Envelope,
        operation: &KeyedOperation,
    ) -> std::result::Result<(), CallbackError> {
        self.0.lock().unwrap().push(operation.clone());
        Ok(())
    }
}

/// Plain HTTP/1.1 GET, returns the whole response.
async fn http_get(port: u16, path: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: 127.0.0.1:{}\r\nConnection: close\r\n\r\n",
        path, port
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

async fn wait_until<F>(mut cond: F)
where F: FnMut() -> bool {
    timeout(Duration::from_secs(10), async {
        while !cond() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition reached in time")
}

#[tokio::test]
async fn test_two_processes_converge_over_websocket() {
    let a = spawn_processor(config(18701, 0x10, None)).await;
    sleep(Duration::from_millis(200)).await;
    let b = spawn_processor(config(
        18702,
        0x80,
        Some(Bootstrap::new("127.0.0.1", 18701)),
    ))
    .await;

    let (na, nb) = (a.node(), b.node());
    wait_until(|| {
        na.dht().successor().unwrap().id == nb.id()
            && nb.dht().successor().unwrap().id == na.id()
            && na.dht().predecessor().unwrap().map(|p| p.id) == Some(nb.id())
            && nb.dht().predecessor().unwrap().map(|p| p.id) == Some(na.id())
    })
    .await;

    a.stop().unwrap();
    b.stop().unwrap();
}

#[tokio::test]
async fn test_inbound_frames_reach_member() {
    let p = spawn_processor(config(18711, 0x100, None)).await;
    let node = p.node();
    wait_until(|| node.is_updating_fingers()).await;

    let url = format!("ws://127.0.0.1:18711/node/{}/receive", node.id());
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    // garbage is dropped without closing the channel
    socket
        .send(WsMessage::Text("not an envelope".to_string()))
        .await
        .unwrap();

    let candidate = NodeRef::new(NodeId(0x50), "127.0.0.1", 18712);
    let notify = Envelope::new(
        Message::NotifyPredecessorSend(NotifyPredecessorSend { id: node.id() }),
        candidate.clone(),
        Some(node.node_ref()),
    );
    socket
        .send(WsMessage::Text(notify.to_json().unwrap()))
        .await
        .unwrap();

    wait_until(|| node.dht().predecessor().unwrap() == Some(candidate.clone())).await;
    socket.close(None).await.unwrap();
    p.stop().unwrap();
}

#[tokio::test]
async fn test_keyed_api_reaches_owner() {
    let recorder = Arc::new(OperationRecorder::default());
    let processor = Arc::new(
        ProcessorBuilder::from_config(&config(18721, 0x20, None))
            .unwrap()
            .callback(recorder.clone())
            .build()
            .unwrap(),
    );
    tokio::spawn(run_endpoint(processor.clone()));
    let node = processor.node();
    wait_until(|| node.is_updating_fingers()).await;

    let response = http_get(18721, "/api/put?key=test&value=123").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("\"key\":\"test\""), "{}", response);

    let response = http_get(18721, "/api/get?key=test").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);

    // a put needs a value
    let response = http_get(18721, "/api/put?key=test").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{}", response);

    // a lone seed owns every key, so both operations resolve locally
    assert_eq!(*recorder.0.lock().unwrap(), vec![
        KeyedOperation::Put {
            key: "test".to_string(),
            value: serde_json::json!("123"),
        },
        KeyedOperation::Get {
            key: "test".to_string(),
        },
    ]);
    processor.stop().unwrap();
}
