#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Static pages keyed by path (query string ignored); every request URL is recorded.
pub struct SiteStub {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SiteStub {
    pub fn spawn(pages: Vec<(String, u16, String)>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start site stub server");
        let base_url = format!("http://{}", server.server_addr());

        let pages = pages
            .into_iter()
            .map(|(path, status, body)| (path, (status, body)))
            .collect::<HashMap<_, _>>();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&hits);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                recorded.lock().unwrap().push(url.clone());
                let path = url.split('?').next().unwrap_or(&url);

                let (status, body) = match pages.get(path) {
                    Some((status, body)) => (*status, body.clone()),
                    None => (404, "not found".to_owned()),
                };
                let content_type = if body.trim_start().starts_with('{') {
                    &b"application/json"[..]
                } else {
                    &b"text/html; charset=utf-8"[..]
                };
                let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type)
                    .expect("build header");
                let _ = request.respond(
                    tiny_http::Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header),
                );
            }
        });

        Self {
            base_url,
            hits,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    /// Recorded request paths, without query strings.
    pub fn paths(&self) -> Vec<String> {
        self.hits()
            .into_iter()
            .map(|url| url.split('?').next().unwrap_or(&url).to_owned())
            .collect()
    }
}

impl Drop for SiteStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn page(path: &str, body: impl Into<String>) -> (String, u16, String) {
    (path.to_owned(), 200, body.into())
}
