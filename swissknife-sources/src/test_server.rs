//! Canned-response HTTP servers for exercising fetchers without the real
//! upstreams.
//!
//! Enabled by the `test-util` feature.
//!
//! ```rust,no_run
//! use swissknife_sources::{test_server, CurrencyFetcher, Fetcher, HttpClient};
//!
//! # async fn example() {
//! let base = test_server::serve(200, r#"{"serie":[{"valor":950.5}]}"#).await;
//! let usd = CurrencyFetcher::usd(HttpClient::new().unwrap()).with_base_url(&base);
//! assert!(usd.fetch().await.is_success());
//! # }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
enum Reply {
    Canned { status: StatusCode, body: Bytes },
    Hang,
}

/// Serve `body` as JSON with `status` to every request. Returns the base URL.
pub async fn serve(status: u16, body: impl Into<String>) -> String {
    let status = StatusCode::from_u16(status).expect("valid status code");
    spawn(Reply::Canned {
        status,
        body: Bytes::from(body.into()),
    })
    .await
}

/// Accept requests and never answer them.
pub async fn serve_hanging() -> String {
    spawn(Reply::Hang).await
}

/// A base URL nothing listens on.
pub async fn refused() -> String {
    let listener = bind().await;
    let addr = local_addr(&listener);
    drop(listener);
    format!("http://{}", addr)
}

async fn bind() -> TcpListener {
    TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener")
}

fn local_addr(listener: &TcpListener) -> SocketAddr {
    listener.local_addr().expect("listener address")
}

async fn spawn(reply: Reply) -> String {
    let listener = bind().await;
    let addr = local_addr(&listener);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let io = TokioIo::new(stream);
            let reply = reply.clone();

            tokio::spawn(async move {
                let service = service_fn(move |_req: Request<hyper::body::Incoming>| {
                    let reply = reply.clone();
                    async move { answer(reply).await }
                });

                // Clients hanging up mid-request are expected here
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    format!("http://{}", addr)
}

async fn answer(reply: Reply) -> Result<Response<Full<Bytes>>, Infallible> {
    match reply {
        Reply::Canned { status, body } => Ok(Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(body))
            .expect("static response parts")),
        Reply::Hang => std::future::pending().await,
    }
}
