use std::process::Command;

use anyhow::Context as _;
use serde_json::Value;
use volley_testserver::TestServer;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn summary_line(stdout: &[u8]) -> anyhow::Result<Value> {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains("\"kind\":\"summary\""))
        .with_context(|| format!("no summary line in stdout:\n{stdout}"))?;
    Ok(serde_json::from_str(line)?)
}

#[tokio::test]
async fn http_get_against_the_test_server() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let url = server.urls().hello.clone();
    let exe = env!("CARGO_BIN_EXE_volley");

    let out = tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .args(["http-get", "-u", "2:3", "-c", "2"])
            .args(["--stream-stdout-progress", "false", "--output", "json"])
            .env("BASE_URL", &url)
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run volley binary")?;

    let served = server.stats().requests_total();
    server.shutdown().await;

    anyhow::ensure!(
        status_code(out.status) == 0,
        "expected exit code 0, got {}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stderr)
    );

    let v = summary_line(&out.stdout)?;
    anyhow::ensure!(v.get("topology").and_then(Value::as_str) == Some("local"));
    anyhow::ensure!(v.get("expected_total").and_then(Value::as_u64) == Some(10));
    anyhow::ensure!(v.get("success_total").and_then(Value::as_u64) == Some(10));
    anyhow::ensure!(v.get("hits_total").and_then(Value::as_u64) == Some(10));
    anyhow::ensure!(v.get("hits_success_rate").and_then(Value::as_f64) == Some(1.0));
    anyhow::ensure!(served == 10, "server saw {served} requests");
    Ok(())
}

#[tokio::test]
async fn error_statuses_are_failures() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let url = server.urls().status(500);
    let exe = env!("CARGO_BIN_EXE_volley");

    let out = tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .args(["http-get", "-u", "2", "-c", "1"])
            .args(["--stream-stdout-progress", "false", "--output", "json"])
            .env("BASE_URL", &url)
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run volley binary")?;

    server.shutdown().await;

    anyhow::ensure!(
        status_code(out.status) == 10,
        "expected exit code 10, got {}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stderr)
    );
    let v = summary_line(&out.stdout)?;
    anyhow::ensure!(v.get("failures_total").and_then(Value::as_u64) == Some(2));
    anyhow::ensure!(v.get("hits_success_rate").and_then(Value::as_f64) == Some(0.0));
    Ok(())
}
