use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpListener;
use volley_testserver::TestBroker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut agent_exe: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--agent-exe" => {
                let exe = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--agent-exe requires a path"))?;
                agent_exe = Some(PathBuf::from(exe));
            }
            "-h" | "--help" => {
                eprintln!(
                    "volley-testserver\n\nUSAGE:\n  volley-testserver [--bind 127.0.0.1:0] [--agent-exe <path to volley>]\n\nOUTPUT:\n  Prints HTTP_URL=<url> (and BROKER_URL=<tcp url> with --agent-exe) to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let broker = match agent_exe {
        Some(exe) => Some(TestBroker::spawning(exe).await?),
        None => None,
    };

    let app = volley_testserver::router(volley_testserver::TestServerStats::default());

    println!("HTTP_URL=http://{addr}");
    if let Some(broker) = &broker {
        println!("BROKER_URL={}", broker.endpoint());
    }

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });
    serve.await?;

    if let Some(broker) = broker {
        broker.shutdown().await;
    }
    Ok(())
}
