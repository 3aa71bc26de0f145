//! Integration tests for the TCP relay server.
//!
//! These tests run a real `RelayServer` on a loopback port and drive it with
//! plain TCP clients: broadcast fan-out, no echo, pruning, framing at the
//! end of a stream, bind failures and graceful shutdown.
//!
//! Tests CAN use `.unwrap()` and `.expect()`; production code is checked for
//! panic-free behavior through assertions.

use std::net::SocketAddr;
use std::time::Duration;

use linecast_core::PeerStats;
use linecastd::config::RelayConfig;
use linecastd::registry::{spawn_registry, RegistryHandle};
use linecastd::server::{RelayServer, ServerError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Monitor cadence used by the test server
const STATS_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound for anything the tests wait on
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a client waits before deciding nothing is coming
const SILENCE: Duration = Duration::from_millis(200);

// ============================================================================
// Test Helpers
// ============================================================================

/// Test server context that manages server lifecycle.
struct TestServer {
    addr: SocketAddr,
    registry: RegistryHandle,
    stats: watch::Receiver<PeerStats>,
    cancel_token: CancellationToken,
    task: tokio::task::JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(None).await
    }

    /// Spawns a server on an ephemeral loopback port.
    async fn spawn_with(max_line_length: Option<usize>) -> Self {
        let config = RelayConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            stats_interval: STATS_INTERVAL,
            max_line_length,
        };
        let registry = spawn_registry();
        let cancel_token = CancellationToken::new();

        let server = RelayServer::bind(config, registry.clone(), cancel_token.clone())
            .await
            .expect("bind loopback");
        let addr = server.local_addr().expect("local addr");
        let stats = server.subscribe_stats();
        let task = tokio::spawn(server.run());

        Self {
            addr,
            registry,
            stats,
            cancel_token,
            task,
        }
    }

    /// Connects a client and waits until the server has registered it.
    async fn connect(&self) -> TestClient {
        let before = self.registry.size().await.unwrap();
        let stream = TcpStream::connect(self.addr).await.expect("connect to server");
        self.wait_for_peers(before + 1).await;
        TestClient::new(stream)
    }

    /// Waits until the registry holds exactly `expected` peers.
    async fn wait_for_peers(&self, expected: usize) {
        timeout(WAIT_TIMEOUT, async {
            while self.registry.size().await.unwrap() != expected {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("registry never reached {expected} peers"));
    }

    /// Waits for a monitor sample reporting `expected` online peers.
    async fn wait_for_reported(&mut self, expected: usize) {
        timeout(WAIT_TIMEOUT, async {
            loop {
                self.stats.changed().await.unwrap();
                if self.stats.borrow().online == expected {
                    break;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("monitor never reported {expected} peers"));
    }

    /// Shuts down the server and waits for the accept loop to exit.
    async fn shutdown(self) {
        self.cancel_token.cancel();
        let result = timeout(WAIT_TIMEOUT, self.task)
            .await
            .expect("server stops after cancellation")
            .expect("server task does not panic");
        assert!(result.is_ok());
    }
}

/// Line-oriented TCP client.
struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    async fn send_raw(&mut self, data: &[u8]) {
        self.writer.write_all(data).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    /// Reads one line including its terminator.
    async fn recv(&mut self) -> String {
        let mut line = String::new();
        timeout(WAIT_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("line arrives in time")
            .unwrap();
        line
    }

    /// Returns `true` if nothing arrives within [`SILENCE`].
    async fn is_silent(&mut self) -> bool {
        let mut line = String::new();
        timeout(SILENCE, self.reader.read_line(&mut line)).await.is_err()
    }
}

// ============================================================================
// Broadcast Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_line_reaches_every_other_peer() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    let mut carol = server.connect().await;

    alice.send("hello").await;

    assert_eq!(bob.recv().await, "hello\n");
    assert_eq!(carol.recv().await, "hello\n");
    assert!(alice.is_silent().await, "sender must not receive its own line");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crlf_client_line_is_normalized() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.send_raw(b"from windows\r\n").await;

    assert_eq!(bob.recv().await, "from windows\n");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_per_sender_order_preserved() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    for i in 0..100 {
        alice.send(&format!("line {i}")).await;
    }

    for i in 0..100 {
        assert_eq!(bob.recv().await, format!("line {i}\n"));
    }

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_senders_do_not_interleave() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    let mut carol = server.connect().await;

    let payload_a = "a".repeat(1024);
    let payload_b = "b".repeat(1024);

    let (pa, pb) = (payload_a.clone(), payload_b.clone());
    tokio::join!(
        async {
            for _ in 0..20 {
                alice.send(&pa).await;
            }
        },
        async {
            for _ in 0..20 {
                bob.send(&pb).await;
            }
        }
    );

    let mut from_alice = 0;
    let mut from_bob = 0;
    for _ in 0..40 {
        let line = carol.recv().await;
        let body = line.trim_end_matches('\n');
        if body == payload_a {
            from_alice += 1;
        } else if body == payload_b {
            from_bob += 1;
        } else {
            panic!("interleaved line of {} bytes", line.len());
        }
    }
    assert_eq!((from_alice, from_bob), (20, 20));

    server.shutdown().await;
}

// ============================================================================
// Framing Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unterminated_tail_not_delivered() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.send_raw(b"complete\npartial").await;
    alice.writer.shutdown().await.unwrap();

    assert_eq!(bob.recv().await, "complete\n");
    server.wait_for_peers(1).await;
    assert!(bob.is_silent().await, "partial line must not be delivered");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlong_line_disconnects_sender() {
    let server = TestServer::spawn_with(Some(16)).await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.send("short").await;
    assert_eq!(bob.recv().await, "short\n");

    alice.send(&"x".repeat(64)).await;
    server.wait_for_peers(1).await;
    assert!(bob.is_silent().await);

    server.shutdown().await;
}

// ============================================================================
// Membership Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disconnected_peer_removed_and_count_reported() {
    let mut server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let bob = server.connect().await;
    server.wait_for_reported(2).await;

    drop(bob);
    alice.send("anyone there?").await;
    alice.send("still here").await;

    server.wait_for_peers(1).await;
    server.wait_for_reported(1).await;

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_monitor_reports_zero_without_peers() {
    let mut server = TestServer::spawn().await;

    for _ in 0..3 {
        timeout(WAIT_TIMEOUT, server.stats.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(server.stats.borrow().online, 0);
    }

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_joiner_only_sees_new_lines() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.send("before").await;
    assert_eq!(bob.recv().await, "before\n");

    let mut carol = server.connect().await;
    alice.send("after").await;

    assert_eq!(bob.recv().await, "after\n");
    assert_eq!(carol.recv().await, "after\n");

    server.shutdown().await;
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_bind_error_when_port_in_use() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = RelayConfig {
        listen_addr: taken.local_addr().unwrap().to_string(),
        ..RelayConfig::default()
    };

    let result = linecastd::server::start(config, spawn_registry(), CancellationToken::new()).await;

    match result {
        Err(ServerError::Bind { addr, .. }) => {
            assert_eq!(addr, taken.local_addr().unwrap().to_string());
        }
        other => panic!("expected bind error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_disconnects_clients() {
    let server = TestServer::spawn().await;
    let mut alice = server.connect().await;
    let registry = server.registry.clone();

    server.shutdown().await;

    let mut line = String::new();
    let read = timeout(WAIT_TIMEOUT, alice.reader.read_line(&mut line))
        .await
        .expect("client sees the connection close");
    assert_eq!(read.unwrap_or(0), 0);

    timeout(WAIT_TIMEOUT, async {
        while registry.size().await.unwrap() != 0 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("registry drained after shutdown");
}
