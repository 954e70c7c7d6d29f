//! Local HTTP server for tests
//!
//! Serves pages with known geometry so captures from a real Chrome can be checked without
//! relying on external websites. Each server instance runs on a random available port.

use std::net::SocketAddr;
use tokio::sync::oneshot;
use warp::Filter;

/// Height of the striped page at `/tall`.
pub const TALL_PAGE_HEIGHT: u32 = 2000;

const TALL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Tall Page</title>
    <style>
        html, body { margin: 0; padding: 0; }
        .stripe { width: 100%; height: 200px; }
        .stripe:nth-child(odd) { background: #c0392b; }
        .stripe:nth-child(even) { background: #2980b9; }
    </style>
</head>
<body>
    <div class="stripe"></div><div class="stripe"></div><div class="stripe"></div>
    <div class="stripe"></div><div class="stripe"></div><div class="stripe"></div>
    <div class="stripe"></div><div class="stripe"></div><div class="stripe"></div>
    <div class="stripe"></div>
</body>
</html>"#;

const SCROLLABLE_ELEMENT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Scrollable Element</title>
    <style>
        html, body { margin: 0; padding: 0; }
        #list { position: absolute; left: 20px; top: 40px; width: 300px; height: 150px; overflow: auto; border: 0; }
        #list div { height: 100px; }
        #list div:nth-child(odd) { background: #27ae60; }
        #list div:nth-child(even) { background: #f1c40f; }
    </style>
</head>
<body>
    <div id="list"><div></div><div></div><div></div><div></div><div></div><div></div></div>
</body>
</html>"#;

/// Test server that serves pages for capture tests
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a new test server on a random available port
    pub async fn start() -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let tall = warp::path("tall").map(|| warp::reply::html(TALL_PAGE));
        let scrollable = warp::path("scrollable").map(|| warp::reply::html(SCROLLABLE_ELEMENT_PAGE));
        let routes = tall.or(scrollable);

        let (addr, server) =
            warp::serve(routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
                shutdown_rx.await.ok();
            });

        tokio::spawn(server);

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// URL of `path` on this server, e.g. `url("/tall")`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until the server accepts connections
    pub async fn wait_ready(&self) -> anyhow::Result<()> {
        let max_attempts = 10;

        for attempt in 1..=max_attempts {
            match tokio::net::TcpStream::connect(self.addr).await {
                Ok(_) => return Ok(()),
                Err(e) => println!("Attempt {}: server not ready - {}", attempt, e),
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }

        anyhow::bail!(
            "Server did not become ready after {} attempts",
            max_attempts
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
