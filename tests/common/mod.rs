//! Minimal configuration server for end-to-end tests.
//!
//! Speaks the two endpoints the client uses. Notification polls are answered
//! immediately with `304` when nothing changed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use apollo_client::ConfigMap;
use apollo_client::Notification;
use bytes::BytesMut;
use parking_lot::Mutex;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Releases {
    // namespace -> (release_key, configs, notification_id)
    namespaces: BTreeMap<String, (String, ConfigMap, i64)>,
}

pub struct ConfigServer {
    url: String,
    releases: Arc<Mutex<Releases>>,
    shutdown: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

pub fn config_map(pairs: &[(&str, &str)]) -> ConfigMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl ConfigServer {
    pub fn start() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let releases = Arc::new(Mutex::new(Releases::default()));
        let shutdown = CancellationToken::new();
        let thread = {
            let releases = releases.clone();
            let shutdown = shutdown.clone();
            std::thread::spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                runtime.block_on(async move {
                    let listener = TcpListener::from_std(listener).unwrap();
                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            accepted = listener.accept() => {
                                if let Ok((stream, _)) = accepted {
                                    tokio::spawn(serve(stream, releases.clone()));
                                }
                            }
                        }
                    }
                });
            })
        };

        Self {
            url,
            releases,
            shutdown,
            thread: Some(thread),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Publishes a release, bumping the namespace's notification id.
    pub fn publish(
        &self,
        namespace: &str,
        release_key: &str,
        configs: ConfigMap,
    ) {
        let mut releases = self.releases.lock();
        let id = releases.namespaces.get(namespace).map_or(1, |(_, _, id)| id + 1);
        releases
            .namespaces
            .insert(namespace.to_string(), (release_key.to_string(), configs, id));
    }
}

impl Drop for ConfigServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn serve(
    mut stream: TcpStream,
    releases: Arc<Mutex<Releases>>,
) {
    let mut buf = BytesMut::with_capacity(4096);
    let target = loop {
        match stream.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let mut headers = [httparse::EMPTY_HEADER; 32];
        let mut request = httparse::Request::new(&mut headers);
        if let Ok(httparse::Status::Complete(_)) = request.parse(&buf[..]) {
            break request.path.unwrap_or("/").to_string();
        }
    };

    let (status, body) = route(&target, &releases.lock());
    let head = format!(
        "HTTP/1.1 {status} X\r\nContent-Type: application/json;charset=UTF-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(body.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn route(
    target: &str,
    releases: &Releases,
) -> (u16, String) {
    let url = url::Url::parse(&format!("http://server{target}")).unwrap();
    let query = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if url.path() == "/notifications/v2" {
        let known: Vec<Notification> = query("notifications")
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        let changed: Vec<Notification> = known
            .into_iter()
            .filter_map(|n| {
                let (_, _, id) = releases.namespaces.get(&n.namespace_name)?;
                (*id != n.notification_id).then(|| Notification::new(n.namespace_name, *id))
            })
            .collect();
        if changed.is_empty() {
            return (304, String::new());
        }
        return (200, serde_json::to_string(&changed).unwrap());
    }

    let segments: Vec<&str> = url.path().trim_start_matches('/').split('/').collect();
    if let ["configs", app_id, cluster, namespace] = segments.as_slice() {
        let Some((release_key, configs, _)) = releases.namespaces.get(*namespace) else {
            return (404, String::new());
        };
        if query("releaseKey").as_deref() == Some(release_key.as_str()) {
            return (304, String::new());
        }
        let body = json!({
            "appId": app_id,
            "cluster": cluster,
            "namespaceName": namespace,
            "configurations": configs,
            "releaseKey": release_key,
        });
        return (200, body.to_string());
    }
    (404, String::new())
}
