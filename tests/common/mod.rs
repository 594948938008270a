use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::sync::oneshot;
use toggle_cache::ClientConfig;
use toggle_cache::EtcdFetcher;
use toggle_cache::ToggleClient;
use warp::http::StatusCode;
use warp::Filter;

pub const APP: &str = "testApp";

// the client refreshes every second, so any event shows up well within this
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Directory listing captured from a real etcd 2.x member
pub const FIXTURE_LISTING: &str = r#"{"action":"get","node":{"key":"/v1/toggles/testApp","dir":true,"nodes":[{"key":"/v1/toggles/testApp/mytoggle","value":"true","modifiedIndex":78,"createdIndex":78}],"modifiedIndex":77,"createdIndex":77}}"#;

/// Address nothing listens on
pub const DEAD_ENDPOINT: &str = "http://127.0.0.1:9";

/// In-process etcd v2 member serving whatever listing the test sets.
pub struct EtcdStub {
    pub addr: SocketAddr,
    reply: Arc<Mutex<(u16, String)>>,
    hits: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl EtcdStub {
    pub async fn start() -> Self {
        let reply = Arc::new(Mutex::new((200, FIXTURE_LISTING.to_string())));
        let hits = Arc::new(AtomicUsize::new(0));

        let route = {
            let reply = reply.clone();
            let hits = hits.clone();
            warp::path!("v2" / "keys" / "v1" / "toggles" / String).map(move |_app: String| {
                hits.fetch_add(1, Ordering::SeqCst);
                let (status, body) = reply.lock().clone();
                warp::reply::with_status(
                    warp::reply::with_header(body, "content-type", "application/json"),
                    StatusCode::from_u16(status).unwrap(),
                )
            })
        };

        let (tx, rx) = oneshot::channel::<()>();
        let (addr, server) =
            warp::serve(route).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                let _ = rx.await;
            });
        tokio::spawn(server);

        Self {
            addr,
            reply,
            hits,
            shutdown: Some(tx),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serves `(name, raw value, modifiedIndex)` entries for [`APP`]
    pub fn serve(
        &self,
        toggles: &[(&str, &str, u64)],
    ) {
        let nodes: Vec<_> = toggles
            .iter()
            .map(|(name, value, index)| {
                json!({
                    "key": format!("/v1/toggles/{APP}/{name}"),
                    "value": value,
                    "modifiedIndex": index,
                    "createdIndex": index,
                })
            })
            .collect();
        let body = json!({
            "action": "get",
            "node": {
                "key": format!("/v1/toggles/{APP}"),
                "dir": true,
                "nodes": nodes,
                "modifiedIndex": 77,
                "createdIndex": 77,
            }
        });
        *self.reply.lock() = (200, body.to_string());
    }

    pub fn fail_with(
        &self,
        status: u16,
    ) {
        *self.reply.lock() = (status, "{}".to_string());
    }

    pub fn namespace_missing(&self) {
        let body = json!({
            "errorCode": 100,
            "message": "Key not found",
            "cause": format!("/v1/toggles/{APP}"),
            "index": 80,
        });
        *self.reply.lock() = (404, body.to_string());
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for EtcdStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn client_for(endpoints: Vec<String>) -> ToggleClient<EtcdFetcher> {
    let mut config = ClientConfig::for_app(endpoints, APP, 1);
    config.request_timeout_in_ms = 500;
    config.connect_timeout_in_ms = 200;
    ToggleClient::from_config(config).unwrap()
}

/// Next event on `rx`, failing the test if none arrives in time
pub async fn next_event<T: Clone>(rx: &mut broadcast::Receiver<T>) -> T {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("no event before timeout")
        .expect("conduit closed")
}
