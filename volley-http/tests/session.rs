use std::sync::Arc;

use anyhow::Context as _;
use parking_lot::Mutex;
use volley_core::{InvocationContext, ObserverError, ResultEvent, ResultSink, RunStatus};
use volley_http::{HttpClient, Session};
use volley_testserver::TestServer;

type Seen = Arc<Mutex<Vec<String>>>;

fn record_kinds(sink: &ResultSink) -> Seen {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    sink.add_observer(Arc::new(
        move |event: &ResultEvent| -> Result<(), ObserverError> {
            recorder.lock().push(event.kind().to_string());
            Ok(())
        },
    ));
    seen
}

fn ctx() -> InvocationContext {
    InvocationContext {
        status: RunStatus::from((1, 1, 1, 1)),
        worker_id: Some(Arc::from("agent-1")),
    }
}

#[tokio::test]
async fn each_request_records_one_hit() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let sink = Arc::new(ResultSink::new());
    let seen = record_kinds(&sink);
    let session = Session::new(HttpClient::default(), sink.clone(), &ctx());

    let ok_url = server.urls().hello.clone();
    let missing_url = server.urls().status(404);
    let ok = session.get(&ok_url).await?;
    let missing = session.get(&missing_url).await?;
    let served = server.stats().requests_total();
    server.shutdown().await;

    assert_eq!(served, 2);
    let per_request = ["socket_open", "add_hit", "socket_message", "socket_close"];
    assert_eq!(*seen.lock(), [per_request, per_request].concat());

    assert_eq!(ok.status, 200);
    assert_eq!(ok.text(), Some("hello"));
    assert_eq!(missing.status, 404);

    assert_eq!(sink.nb_hits(), 2);
    assert_eq!(sink.urls().len(), 2);
    assert!((sink.hits_success_rate(None, None) - 0.5).abs() < f64::EPSILON);
    assert!((sink.hits_success_rate(Some(&ok_url), Some(1)) - 1.0).abs() < f64::EPSILON);
    assert!(sink.average_request_time(None, None) > 0.0);
    assert_eq!(
        sink.socket_bytes_received(),
        ok.bytes_received + missing.bytes_received
    );

    assert_eq!(sink.sockets(), 0);

    let hits = sink.hits(Some(&ok_url), None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method, "GET");
    assert_eq!(hits[0].worker_id.as_deref(), Some("agent-1"));
    Ok(())
}

#[tokio::test]
async fn transport_failures_leave_no_hit() -> anyhow::Result<()> {
    let sink = Arc::new(ResultSink::new());
    let seen = record_kinds(&sink);
    let session = Session::new(
        HttpClient::new(Some(std::time::Duration::from_millis(200))),
        sink.clone(),
        &ctx(),
    );

    let res = session.get("http://192.0.2.1:81/").await;
    assert!(res.is_err());
    assert_eq!(sink.nb_hits(), 0);
    assert_eq!(sink.socket_bytes_received(), 0);
    assert_eq!(sink.sockets(), 0);
    assert_eq!(*seen.lock(), ["socket_open", "socket_close"]);
    Ok(())
}
