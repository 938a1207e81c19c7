//! End-to-end: polled markets are subscribed on the feed, and feed updates
//! reach dashboard WebSocket subscribers.

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use pmsports_aggregator::{AggregatorResult, MarketSource};
use pmsports_core::RawMarket;
use pmsports_server::{AppConfig, Application};
use pmsports_ws::ConnectionState;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};

struct FixedSource(Vec<RawMarket>);

impl MarketSource for FixedSource {
    fn fetch_active_markets(&self) -> BoxFuture<'_, AggregatorResult<Vec<RawMarket>>> {
        let markets = self.0.clone();
        Box::pin(async move { Ok(markets) })
    }
}

fn raw(id: &str, title: &str) -> RawMarket {
    RawMarket {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        ..Default::default()
    }
}

/// Accept one client, report its subscribe frames, then push `update`
/// once the first subscribe arrives.
async fn one_shot_feed(update: &'static str) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut pushed = false;
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let _ = tx.send(text.to_string());
                if !pushed {
                    pushed = true;
                    ws.send(Message::Text(update.into())).await.unwrap();
                }
            }
        }
    });

    (format!("ws://{addr}"), rx)
}

async fn next_of_type(rx: &mut broadcast::Receiver<String>, kind: &str) -> Value {
    timeout(Duration::from_secs(3), async {
        loop {
            let msg: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            if msg["type"] == kind {
                return msg;
            }
        }
    })
    .await
    .expect("dashboard message within timeout")
}

#[tokio::test]
async fn test_polled_markets_subscribed_and_updates_broadcast() {
    let (url, mut subscribes) = one_shot_feed(r#"{"event_type":"book","market":"nba-1"}"#).await;

    let mut config = AppConfig::default();
    config.feed.url = url;
    config.feed.reconnect_base_delay_ms = 20;
    config.feed.reconnect_max_delay_ms = 100;

    let app = Application::with_source(
        config,
        Arc::new(FixedSource(vec![
            raw("nba-1", "NBA: Lakers vs Celtics"),
            raw("pol-1", "Election winner"),
        ])),
    );
    let mut dashboard = app.broadcaster().subscribe();

    assert_eq!(app.poll_once().await.unwrap(), 1);
    let refreshed = next_of_type(&mut dashboard, "stats_refreshed").await;
    assert_eq!(refreshed["sports_market_count"], 1);

    let feed = app.feed().unwrap().clone();
    feed.connect();

    let subscribe: Value = serde_json::from_str(
        &timeout(Duration::from_secs(3), subscribes.recv())
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(subscribe["type"], "subscribe");
    assert_eq!(subscribe["market"], "nba-1");

    let update = next_of_type(&mut dashboard, "feed_update").await;
    assert_eq!(update["payload"]["event_type"], "book");
    assert_eq!(feed.state(), ConnectionState::Connected);

    feed.shutdown().await;
    assert_eq!(feed.state(), ConnectionState::Closed);
}
