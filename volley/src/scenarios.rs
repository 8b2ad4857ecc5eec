use std::sync::Arc;
use std::time::Duration;

use volley_core::{InvocationContext, Outcome, Reporter, Scenario, ScenarioRegistry, TestCase};

pub const SLEEP_MS_ENV: &str = "SLEEP_MS";
#[cfg(feature = "http")]
pub const BASE_URL_ENV: &str = "BASE_URL";

const DEFAULT_SLEEP_MS: u64 = 10;
#[cfg(feature = "http")]
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/";

/// Scenarios shipped with the binary.
pub fn registry() -> ScenarioRegistry {
    let mut registry = ScenarioRegistry::default();
    registry
        .register("noop", noop)
        .register("sleep", sleep)
        .register("fail", fail)
        .register("error", error);
    #[cfg(feature = "http")]
    registry.register("http-get", http_get);
    registry
}

fn noop() -> Arc<dyn Scenario> {
    Arc::new(TestCase::new(
        "noop",
        |_: InvocationContext, _: Arc<dyn Reporter>| async { Ok(()) },
    ))
}

fn sleep() -> Arc<dyn Scenario> {
    let ms = std::env::var(SLEEP_MS_ENV)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_SLEEP_MS);
    let pause = Duration::from_millis(ms);

    Arc::new(TestCase::new(
        "sleep",
        move |_: InvocationContext, _: Arc<dyn Reporter>| async move {
            tokio::time::sleep(pause).await;
            Ok(())
        },
    ))
}

fn fail() -> Arc<dyn Scenario> {
    Arc::new(TestCase::new(
        "fail",
        |ctx: InvocationContext, _: Arc<dyn Reporter>| async move {
            let s = ctx.status;
            Err(Outcome::failure(format!(
                "expected failure (cycle {}/{}, user {}/{})",
                s.cycle, s.current_cycle, s.user, s.current_user
            )))
        },
    ))
}

fn error() -> Arc<dyn Scenario> {
    Arc::new(TestCase::new(
        "error",
        |_: InvocationContext, _: Arc<dyn Reporter>| async {
            Err(Outcome::error("expected error"))
        },
    ))
}

#[cfg(feature = "http")]
fn http_get() -> Arc<dyn Scenario> {
    use volley_http::{HttpClient, Session};

    let url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let url: Arc<str> = Arc::from(url);
    let client = HttpClient::default();

    Arc::new(TestCase::new(
        "http-get",
        move |ctx: InvocationContext, reporter: Arc<dyn Reporter>| {
            let session = Session::new(client.clone(), reporter, &ctx);
            let url = url.clone();
            async move {
                match session.get(&url).await {
                    Ok(res) if res.status >= 400 => Err(Outcome::failure(format!(
                        "GET {url} returned {}",
                        res.status
                    ))),
                    Ok(_) => Ok(()),
                    Err(err) => Err(Outcome::error(format!("{}: {err}", err.kind()))),
                }
            }
        },
    ))
}
