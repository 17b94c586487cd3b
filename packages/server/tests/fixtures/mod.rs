//! Test fixtures shared by the integration tests.

use std::{
    net::TcpStream,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

/// A `plaza-server` process listening on localhost, killed on drop
pub struct TestServer {
    port: u16,
    child: Child,
}

impl TestServer {
    /// Start a server on `port` with the default client limit
    pub fn start(port: u16) -> Self {
        Self::start_with_args(port, &[])
    }

    /// Start a server on `port` that accepts at most `max_clients` clients
    #[allow(dead_code)]
    pub fn start_with_max_clients(port: u16, max_clients: usize) -> Self {
        Self::start_with_args(port, &["--max-clients", &max_clients.to_string()])
    }

    fn start_with_args(port: u16, extra: &[&str]) -> Self {
        let child = Command::new(env!("CARGO_BIN_EXE_plaza-server"))
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .args(extra)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start plaza-server");

        let server = Self { port, child };
        server.wait_until_ready();
        server
    }

    fn wait_until_ready(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while TcpStream::connect(("127.0.0.1", self.port)).is_err() {
            assert!(
                Instant::now() < deadline,
                "plaza-server did not start on port {}",
                self.port
            );
            thread::sleep(Duration::from_millis(50));
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    #[allow(dead_code)]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
