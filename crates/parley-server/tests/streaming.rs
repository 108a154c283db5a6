//! Streaming methods over SSE.

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use common::send_params;

#[tokio::test]
async fn test_stream_ends_with_final_state() -> Result<()> {
    let server = common::TestServer::start().await?;

    let events = server
        .rpc_stream("tasks/sendSubscribe", send_params("t1", "hello"))
        .await?;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["id"], "t1");
    assert_eq!(events[0]["status"]["state"], "working");
    assert_eq!(events[0]["final"], false);
    assert_eq!(events[1]["status"]["state"], "completed");
    assert_eq!(events[1]["final"], true);

    Ok(())
}

#[tokio::test]
async fn test_stream_forces_completion() -> Result<()> {
    let server = common::TestServer::start().await?;

    let events = server
        .rpc_stream("tasks/sendSubscribe", send_params("t1", "stall"))
        .await?;

    let finals: Vec<_> = events.iter().filter(|e| e["final"] == true).collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0]["status"]["state"], "completed");
    assert_eq!(events.last(), Some(finals[0]));

    let got = server.rpc("tasks/get", json!({"id": "t1"})).await?;
    assert_eq!(got["result"]["status"]["state"], "completed");

    Ok(())
}

#[tokio::test]
async fn test_stream_reports_failure_as_final_event() -> Result<()> {
    let server = common::TestServer::start().await?;

    let events = server
        .rpc_stream("tasks/sendSubscribe", send_params("t1", "boom"))
        .await?;

    let last = events.last().cloned().unwrap_or_default();
    assert_eq!(last["final"], true);
    assert_eq!(last["status"]["state"], "failed");
    assert!(events.iter().all(|e| e.get("code").is_none()));

    Ok(())
}

#[tokio::test]
async fn test_stream_carries_stored_artifacts() -> Result<()> {
    let server = common::TestServer::start().await?;

    let events = server
        .rpc_stream("tasks/sendSubscribe", send_params("t1", "artifacts"))
        .await?;

    let artifacts: Vec<_> = events.iter().filter(|e| e.get("artifact").is_some()).collect();
    assert_eq!(artifacts.len(), 4);
    assert!(artifacts.iter().all(|e| e["final"] == false));

    // The append event carries the merged artifact, not just the new chunk
    let merged = &artifacts[3]["artifact"];
    assert_eq!(merged["name"], "log");
    assert_eq!(merged["parts"].as_array().map(Vec::len), Some(2));

    Ok(())
}

#[tokio::test]
async fn test_stream_setup_errors_are_plain_json() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server
        .rpc("tasks/sendSubscribe", json!({"id": "t1"}))
        .await?;
    assert_eq!(resp["error"]["code"], -32602);

    Ok(())
}

#[tokio::test]
async fn test_resubscribe_to_finished_task() -> Result<()> {
    let server = common::TestServer::start().await?;
    server.send_text("t1", "hello").await?;

    let events = server
        .rpc_stream("tasks/resubscribe", json!({"id": "t1"}))
        .await?;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["status"]["state"], "completed");
    assert_eq!(events[0]["final"], true);

    Ok(())
}

#[tokio::test]
async fn test_resubscribe_follows_running_task() -> Result<()> {
    let server = Arc::new(common::TestServer::start().await?);

    let sender = server.clone();
    let send = tokio::spawn(async move { sender.send_text("t1", "slow").await });
    server.wait_for_state("t1", "working").await?;

    let watcher = server.clone();
    let watch = tokio::spawn(async move {
        watcher
            .rpc_stream("tasks/resubscribe", json!({"id": "t1"}))
            .await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.rpc("tasks/cancel", json!({"id": "t1"})).await?;

    let events = tokio::time::timeout(Duration::from_secs(5), watch).await???;
    let last = events.last().cloned().unwrap_or_default();
    assert_eq!(last["final"], true);
    assert_eq!(last["status"]["state"], "canceled");
    assert_eq!(events.iter().filter(|e| e["final"] == true).count(), 1);

    tokio::time::timeout(Duration::from_secs(5), send).await???;
    Ok(())
}

#[tokio::test]
async fn test_resubscribe_unknown_task() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server
        .rpc("tasks/resubscribe", json!({"id": "ghost"}))
        .await?;
    assert_eq!(resp["error"]["code"], -32001);

    Ok(())
}
