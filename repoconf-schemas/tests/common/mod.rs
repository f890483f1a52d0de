use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tiny_http::{Response, Server, StatusCode};

/// A local HTTP server answering from a fixed path -> body table until dropped.
pub struct SchemaServer {
    pub base: String,
    hits: Arc<AtomicUsize>,
    server: Arc<Server>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SchemaServer {
    pub fn start(files: &[(&str, &[u8])]) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("http server"));
        let base = format!("http://{}", server.server_addr());
        let hits = Arc::new(AtomicUsize::new(0));
        let files: BTreeMap<String, Vec<u8>> = files
            .iter()
            .map(|(path, body)| (path.to_string(), body.to_vec()))
            .collect();

        let handle = {
            let server = Arc::clone(&server);
            let hits = Arc::clone(&hits);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let path = request.url().split('?').next().unwrap_or("").to_string();
                    let response = match files.get(&path) {
                        Some(body) => Response::from_data(body.clone()),
                        None => Response::from_data(b"not found".to_vec())
                            .with_status_code(StatusCode(404)),
                    };
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            base,
            hits,
            server,
            handle: Some(handle),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for SchemaServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Accepts connections and never answers. Returns the `http://` base address.
#[allow(dead_code)]
pub fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    base
}
