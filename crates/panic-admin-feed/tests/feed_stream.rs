use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures_util::SinkExt;
use panic_admin_feed::{
    AlertFeed, ErrorCallback, FeedConfig, FeedError, FeedHandle, FeedStatus, ReconnectPolicy,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        base_delay_ms: 10,
        max_delay_ms: 40,
        max_attempts,
        jitter_ratio: 0.0,
    }
}

fn config_for(addr: std::net::SocketAddr, capacity: usize, policy: ReconnectPolicy) -> FeedConfig {
    FeedConfig {
        log_capacity: capacity,
        reconnect: policy,
        connect_timeout: Duration::from_secs(2),
        ..FeedConfig::new(&format!("ws://{addr}"), "/ws/alerts")
    }
}

fn error_recorder() -> (ErrorCallback, Arc<Mutex<Vec<FeedError>>>) {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let callback: ErrorCallback = Arc::new(move |error: &FeedError| {
        sink.lock().unwrap().push(error.clone());
    });
    (callback, errors)
}

async fn next(handle: &mut FeedHandle) -> Result<Value> {
    let event = timeout(WAIT, handle.next_event())
        .await?
        .ok_or_else(|| anyhow::anyhow!("feed stopped"))?;
    Ok(event.id().cloned().unwrap_or(Value::Null))
}

fn alert(id: u32) -> Message {
    Message::Text(json!({"id": id, "alert_type": "fire", "status": "pending"}).to_string())
}

#[tokio::test]
async fn events_are_prepended_into_bounded_log() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        let mut ws = accept_async(socket).await?;
        for id in 1..=4 {
            ws.send(alert(id)).await?;
        }
        tokio::time::sleep(WAIT).await;
        anyhow::Ok(())
    });

    let mut handle = AlertFeed::open(config_for(addr, 3, fast_policy(0)), None)?;
    let mut arrived = Vec::new();
    for _ in 0..4 {
        arrived.push(next(&mut handle).await?);
    }
    assert_eq!(arrived, vec![json!(1), json!(2), json!(3), json!(4)]);
    assert_eq!(handle.status(), FeedStatus::Connected);

    let ids = handle
        .snapshot()
        .iter()
        .filter_map(|event| event.id().cloned())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![json!(4), json!(3), json!(2)]);

    handle.close();
    server.abort();
    Ok(())
}

#[tokio::test]
async fn undrained_queue_stays_bounded_while_log_keeps_newest() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        let mut ws = accept_async(socket).await?;
        for id in 1..=200 {
            ws.send(alert(id)).await?;
        }
        tokio::time::sleep(WAIT).await;
        anyhow::Ok(())
    });

    let config = FeedConfig {
        queue_capacity: 5,
        ..config_for(addr, 5, fast_policy(0))
    };
    let mut handle = AlertFeed::open(config, None)?;
    timeout(WAIT, async {
        while handle
            .snapshot()
            .first()
            .and_then(|event| event.id().cloned())
            != Some(json!(200))
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    assert_eq!(handle.pending(), 5);
    assert_eq!(handle.snapshot().len(), 5);
    assert_eq!(next(&mut handle).await?, json!(1));
    assert_eq!(handle.pending(), 4);

    handle.close();
    server.abort();
    Ok(())
}

#[tokio::test]
async fn malformed_frames_are_reported_and_skipped() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        let mut ws = accept_async(socket).await?;
        ws.send(Message::Text("definitely not json".to_string())).await?;
        ws.send(Message::Text("[1, 2, 3]".to_string())).await?;
        ws.send(alert(7)).await?;
        tokio::time::sleep(WAIT).await;
        anyhow::Ok(())
    });

    let (callback, errors) = error_recorder();
    let mut handle = AlertFeed::open(config_for(addr, 10, fast_policy(0)), Some(callback))?;
    assert_eq!(next(&mut handle).await?, json!(7));

    let errors = errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|error| matches!(error, FeedError::Malformed { .. }))
    );
    assert_eq!(handle.snapshot().len(), 1);

    handle.close();
    server.abort();
    Ok(())
}

#[tokio::test]
async fn reconnects_after_server_closes() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        for id in [1, 2] {
            let (socket, _) = listener.accept().await?;
            let mut ws = accept_async(socket).await?;
            ws.send(alert(id)).await?;
            if id == 1 {
                ws.close(None).await?;
            } else {
                tokio::time::sleep(WAIT).await;
            }
        }
        anyhow::Ok(())
    });

    let mut handle = AlertFeed::open(config_for(addr, 10, fast_policy(3)), None)?;
    assert_eq!(next(&mut handle).await?, json!(1));
    assert_eq!(next(&mut handle).await?, json!(2));
    assert_eq!(handle.snapshot().len(), 2);

    handle.close();
    server.abort();
    Ok(())
}

#[tokio::test]
async fn gives_up_after_consecutive_connect_failures() -> Result<()> {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?
    };

    let (callback, errors) = error_recorder();
    let mut handle = AlertFeed::open(config_for(addr, 10, fast_policy(2)), Some(callback))?;

    assert!(timeout(WAIT, handle.next_event()).await?.is_none());
    assert_eq!(
        handle.wait_for_status(|status| status == FeedStatus::Closed).await,
        FeedStatus::Closed
    );

    let errors = errors.lock().unwrap().clone();
    let connect_failures = errors
        .iter()
        .filter(|error| matches!(error, FeedError::Connect(_) | FeedError::Timeout(_)))
        .count();
    assert_eq!(connect_failures, 2);
    assert_eq!(
        errors.last(),
        Some(&FeedError::ReconnectExhausted { attempts: 2 })
    );
    Ok(())
}

#[tokio::test]
async fn invalid_url_fails_fast() {
    let config = FeedConfig::new("http://localhost:8000", "/ws/alerts");
    assert!(matches!(
        AlertFeed::open(config, None),
        Err(FeedError::InvalidUrl(_))
    ));
}
