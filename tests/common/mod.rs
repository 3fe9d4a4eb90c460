//! Shared helpers for integration tests

#![allow(dead_code)]

use futures_util::StreamExt;
use quote_stream::store::StoreEvent;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub type ServerSocket = WebSocketStream<TcpStream>;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Local WebSocket server handing every accepted connection to the test
pub async fn spawn_server() -> (String, mpsc::UnboundedReceiver<ServerSocket>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                    let _ = tx.send(ws);
                }
            });
        }
    });

    (format!("ws://{}", addr), rx)
}

/// Wait for the next accepted connection
pub async fn accept(connections: &mut mpsc::UnboundedReceiver<ServerSocket>) -> ServerSocket {
    tokio::time::timeout(TIMEOUT, connections.recv())
        .await
        .expect("no connection within timeout")
        .expect("server stopped")
}

/// Read `count` subscribe messages and return their symbols
pub async fn read_subscriptions(ws: &mut ServerSocket, count: usize) -> Vec<String> {
    let mut symbols = Vec::new();
    while symbols.len() < count {
        let msg = tokio::time::timeout(TIMEOUT, ws.next())
            .await
            .expect("no subscribe within timeout")
            .expect("connection ended")
            .unwrap();
        if let Message::Text(text) = msg {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["type"], "subscribe");
            symbols.push(value["symbol"].as_str().unwrap().to_string());
        }
    }
    symbols
}

/// Wait for the next price change notification
pub async fn next_change(events: &mut broadcast::Receiver<StoreEvent>) -> (String, rust_decimal::Decimal) {
    loop {
        let event = tokio::time::timeout(TIMEOUT, events.recv())
            .await
            .expect("no store event within timeout")
            .unwrap();
        if let StoreEvent::QuoteChanged { symbol, price, .. } = event {
            return (symbol, price);
        }
    }
}

pub fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
