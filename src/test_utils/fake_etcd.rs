//! Minimal stand-in for an etcd v2 member serving one directory listing.

use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::oneshot;
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::Filter;

#[derive(Debug, Clone)]
struct FakeReply {
    status: u16,
    body: String,
}

pub struct FakeEtcd {
    pub addr: SocketAddr,
    reply: Arc<Mutex<FakeReply>>,
    paths: Arc<Mutex<Vec<String>>>,
    hits: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl FakeEtcd {
    /// Starts a server answering every request with an empty listing.
    pub async fn start() -> Self {
        let reply = Arc::new(Mutex::new(FakeReply {
            status: 200,
            body: listing_body("testApp", 1, &[]),
        }));
        let paths = Arc::new(Mutex::new(Vec::new()));
        let hits = Arc::new(AtomicUsize::new(0));

        let route = {
            let reply = reply.clone();
            let paths = paths.clone();
            let hits = hits.clone();
            warp::any().and(warp::path::full()).map(move |path: FullPath| {
                hits.fetch_add(1, Ordering::SeqCst);
                paths.lock().push(path.as_str().to_string());
                let FakeReply { status, body } = reply.lock().clone();
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                warp::reply::with_status(
                    warp::reply::with_header(body, "content-type", "application/json"),
                    status,
                )
            })
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (addr, server) =
            warp::serve(route).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                let _ = shutdown_rx.await;
            });
        tokio::spawn(server);

        Self {
            addr,
            reply,
            paths,
            hits,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serves `toggles` (name, raw value, modifiedIndex) under `app`.
    pub fn set_listing(
        &self,
        app: &str,
        dir_index: u64,
        toggles: &[(&str, &str, u64)],
    ) {
        self.set_reply(200, listing_body(app, dir_index, toggles));
    }

    pub fn set_reply(
        &self,
        status: u16,
        body: impl Into<String>,
    ) {
        *self.reply.lock() = FakeReply {
            status,
            body: body.into(),
        };
    }

    pub fn set_key_not_found(
        &self,
        app: &str,
    ) {
        self.set_reply(404, key_not_found_body(app));
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }
}

impl Drop for FakeEtcd {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn listing_body(
    app: &str,
    dir_index: u64,
    toggles: &[(&str, &str, u64)],
) -> String {
    let nodes: Vec<_> = toggles
        .iter()
        .map(|(name, value, index)| {
            json!({
                "key": format!("/v1/toggles/{app}/{name}"),
                "value": value,
                "modifiedIndex": index,
                "createdIndex": index,
            })
        })
        .collect();

    json!({
        "action": "get",
        "node": {
            "key": format!("/v1/toggles/{app}"),
            "dir": true,
            "nodes": nodes,
            "modifiedIndex": dir_index,
            "createdIndex": dir_index,
        }
    })
    .to_string()
}

pub fn key_not_found_body(app: &str) -> String {
    json!({
        "errorCode": 100,
        "message": "Key not found",
        "cause": format!("/v1/toggles/{app}"),
        "index": 80,
    })
    .to_string()
}
