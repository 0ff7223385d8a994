//! End-to-end WebSocket tests: a real listener, real upgrade handshakes
//! and real frames through tokio-tungstenite clients.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use atlas_db::{Database, DbConfig};
use atlas_realtime::actors::WarrantyActor;
use atlas_realtime::dispatch::LogDelivery;
use atlas_realtime::{router, AppState};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_server() -> String {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let warranty = Arc::new(WarrantyActor::new(&db, Arc::new(LogDelivery), 30));
    let state = AppState::new(db, warranty, 100);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    format!("ws://{addr}")
}

async fn connect(url: &str) -> WsClient {
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn send_json(client: &mut WsClient, value: Value) {
    client
        .send(Message::text(value.to_string()))
        .await
        .unwrap();
}

/// Reads frames until the next text frame, skipping pings.
async fn recv_json(client: &mut WsClient) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .unwrap();
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn assert_silent(client: &mut WsClient) {
    let result = timeout(Duration::from_millis(300), client.next()).await;
    if let Ok(Some(Ok(msg))) = result {
        match msg {
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("expected silence, got: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_notification_publish_history_and_fanout() {
    let base = spawn_server().await;
    let url = format!("{base}/notifications/connect");

    let mut alice = connect(&url).await;
    // Connection starts with a history replay (empty so far)
    let history = recv_json(&mut alice).await;
    assert_eq!(history["type"], "history");
    assert_eq!(history["messages"].as_array().unwrap().len(), 0);

    let mut bob = connect(&url).await;
    let _ = recv_json(&mut bob).await;

    send_json(
        &mut alice,
        json!({ "type": "message", "content": "registers close at 9", "sender": "alice" }),
    )
    .await;

    // Sender sees the broadcast first, then the ack for her frame
    let broadcast = recv_json(&mut alice).await;
    assert_eq!(broadcast["type"], "message");
    assert_eq!(broadcast["content"], "registers close at 9");
    assert_eq!(broadcast["sender"], "alice");
    let ack = recv_json(&mut alice).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["id"], broadcast["id"]);

    // Other sessions get the same broadcast
    let fanned = recv_json(&mut bob).await;
    assert_eq!(fanned["id"], broadcast["id"]);

    // A late joiner replays the message in its history
    let mut carol = connect(&url).await;
    let replay = recv_json(&mut carol).await;
    assert_eq!(replay["type"], "history");
    assert_eq!(replay["messages"][0]["content"], "registers close at 9");
}

#[tokio::test]
async fn test_inventory_updates_stay_inside_their_store() {
    let base = spawn_server().await;

    let mut store1 = connect(&format!("{base}/inventory/sync?storeId=store-1")).await;
    let mut store2 = connect(&format!("{base}/inventory/sync?storeId=store-2")).await;

    send_json(
        &mut store1,
        json!({ "type": "update", "productId": "sku-1", "action": "set", "quantity": 10 }),
    )
    .await;

    // Broadcast lands before the ack on the sending session
    let update = recv_json(&mut store1).await;
    assert_eq!(update["type"], "update");
    assert_eq!(update["storeId"], "store-1");
    assert_eq!(update["productId"], "sku-1");
    assert_eq!(update["quantity"], 10);
    let ack = recv_json(&mut store1).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["record"]["quantity"], 10);

    // The other store hears nothing
    assert_silent(&mut store2).await;
}

#[tokio::test]
async fn test_inventory_sync_requires_store_scope() {
    let base = spawn_server().await;

    let err = connect_async(format!("{base}/inventory/sync"))
        .await
        .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 400);
        }
        other => panic!("expected HTTP 400 rejection, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_pos_duplicate_create_returns_conflict_frame() {
    let base = spawn_server().await;
    let mut client = connect(&format!("{base}/pos/connect?storeId=store-1")).await;

    let create = json!({
        "type": "transaction",
        "action": "create",
        "transactionId": "txn-1",
        "payload": { "total": 42.5 }
    });

    send_json(&mut client, create.clone()).await;
    let broadcast = recv_json(&mut client).await;
    assert_eq!(broadcast["type"], "transaction");
    assert_eq!(broadcast["status"], "active");
    let ack = recv_json(&mut client).await;
    assert_eq!(ack["type"], "ack");

    send_json(&mut client, create).await;
    let error = recv_json(&mut client).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "conflict");
}

#[tokio::test]
async fn test_malformed_frame_gets_protocol_error() {
    let base = spawn_server().await;
    let mut client = connect(&format!("{base}/warranty/connect")).await;

    client
        .send(Message::text("this is not json"))
        .await
        .unwrap();
    let error = recv_json(&mut client).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "protocol");

    // The connection survives a bad frame
    send_json(&mut client, json!({ "type": "ping" })).await;
    let pong = recv_json(&mut client).await;
    assert_eq!(pong["type"], "pong");
}
