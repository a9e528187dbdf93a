#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::sync::mpsc;
use todo_core::storage::{MemoryStore, TaskStore};
use todo_server::AppState;
use tokio::sync::oneshot;

/// Task service on an ephemeral port, running on its own runtime thread.
pub struct TestServer {
    pub url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn TaskStore>) -> Self {
        let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("build test runtime");

            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind test listener");
                addr_tx
                    .send(listener.local_addr().expect("local addr"))
                    .expect("report address");

                let shutdown = async move {
                    let _ = shutdown_rx.await;
                };
                todo_server::serve(listener, AppState::new(store), shutdown)
                    .await
                    .expect("serve");
            });
        });

        let address = addr_rx.recv().expect("server address");
        Self {
            url: format!("http://{address}"),
            shutdown: Some(shutdown_tx),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// A URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let address = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{address}")
}

/// The `todo` binary with a clean configuration environment.
pub fn todo_command(config_dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_todo"));
    command
        .env("TODOAPP_CONFIG_PATH", config_dir.join("config.json"))
        .env_remove("TODO_API_URL")
        .env_remove("DATABASE_URL")
        .env_remove("HOST")
        .env_remove("PORT")
        .env_remove("RUST_LOG");
    command
}

pub fn run(config_dir: &Path, api_url: &str, args: &[&str]) -> Output {
    todo_command(config_dir)
        .args(args)
        .args(["--api-url", api_url])
        .output()
        .expect("failed to run todo command")
}

pub fn run_interactive(config_dir: &Path, api_url: &str, input: &str) -> Output {
    let mut child = todo_command(config_dir)
        .env("TODO_API_URL", api_url)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    child
        .wait_with_output()
        .expect("failed to read interactive output")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
