//! Chat sessions driven over loopback with scripted input.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ndog_chat::{ChatConfig, ChatError, ChatLine, ChatSession, InputEvent, Renderer, SessionEnd};
use ndog_transfer::TransferConfig;
use ndog_transport::{Connection, Endpoint, Listener, TransportConfig, TransportMode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
struct RecordingRenderer {
    lines: Arc<Mutex<Vec<String>>>,
    bells: Arc<Mutex<usize>>,
}

impl RecordingRenderer {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// Waits until some line satisfies `pred`.
    async fn wait_for(&self, pred: impl Fn(&str) -> bool) -> String {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(line) = self.lines().into_iter().find(|l| pred(l)) {
                return line;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out; lines so far: {:#?}",
                self.lines()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Renderer for RecordingRenderer {
    fn line(&mut self, line: &ChatLine) -> std::io::Result<()> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn clear(&mut self) -> std::io::Result<()> {
        self.lines.lock().unwrap().clear();
        Ok(())
    }

    fn notify(&mut self) -> std::io::Result<()> {
        *self.bells.lock().unwrap() += 1;
        Ok(())
    }

    fn dump(&mut self, lines: &[String]) -> std::io::Result<()> {
        self.lines.lock().unwrap().extend_from_slice(lines);
        Ok(())
    }
}

fn loopback() -> TransportConfig {
    TransportConfig {
        bind_host: "127.0.0.1".into(),
        ..TransportConfig::default()
    }
}

/// A connected TCP pair: (responder, initiator).
async fn tcp_pair() -> (Endpoint, Endpoint) {
    let listener = Listener::bind(0, TransportMode::Tcp, loopback())
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    let accept = tokio::spawn(async move { listener.accept().await });
    let client = Endpoint::connect("127.0.0.1", port, TransportMode::Tcp, loopback())
        .await
        .unwrap();
    (accept.await.unwrap().unwrap(), client)
}

struct Running {
    input: mpsc::Sender<InputEvent>,
    renderer: RecordingRenderer,
    task: JoinHandle<Result<SessionEnd, ChatError>>,
}

impl Running {
    async fn type_line(&self, line: &str) {
        self.input
            .send(InputEvent::Line(line.to_string()))
            .await
            .unwrap();
    }

    async fn finish(self) -> SessionEnd {
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("session should end")
            .unwrap()
            .unwrap()
    }
}

fn start(endpoint: Endpoint, config: ChatConfig) -> Running {
    let renderer = RecordingRenderer::default();
    let (input, input_rx) = mpsc::channel(16);
    let transfer = TransferConfig {
        header_settle: Duration::ZERO,
        ..TransferConfig::default()
    };
    let session = ChatSession::new(endpoint, renderer.clone(), config).transfer_config(transfer);
    let task = tokio::spawn(session.run(input_rx));
    Running {
        input,
        renderer,
        task,
    }
}

#[tokio::test]
async fn test_received_message_is_rendered() {
    let (server, client) = tcp_pair().await;
    let chat = start(server, ChatConfig::default());

    client.send(b"MSG:hello there\n").await.unwrap();
    let line = chat.renderer.wait_for(|l| l.contains("[RECV]")).await;
    assert!(line.ends_with("[RECV] hello there"), "got {line:?}");
    assert_eq!(*chat.renderer.bells.lock().unwrap(), 1);

    chat.type_line("/quit").await;
    assert_eq!(chat.finish().await, SessionEnd::Quit);
}

#[tokio::test]
async fn test_legacy_raw_text_is_rendered() {
    let (server, client) = tcp_pair().await;
    let chat = start(
        server,
        ChatConfig {
            notify_sound: false,
            ..ChatConfig::default()
        },
    );

    client.send(b"plain old line\n").await.unwrap();
    chat.renderer
        .wait_for(|l| l.ends_with("[RECV] plain old line"))
        .await;
    assert_eq!(*chat.renderer.bells.lock().unwrap(), 0);

    chat.type_line("/QUIT").await;
    assert_eq!(chat.finish().await, SessionEnd::Quit);
}

#[tokio::test]
async fn test_status_prints_without_sending() {
    let (server, client) = tcp_pair().await;
    let chat = start(server, ChatConfig::default());

    chat.type_line("/status").await;
    let status = chat.renderer.wait_for(|l| l.contains("peer")).await;
    assert!(status.contains("TCP responder"), "got {status:?}");
    assert!(status.contains(&client.local_addr().to_string()));

    chat.type_line("/quit").await;
    assert_eq!(chat.finish().await, SessionEnd::Quit);

    // The only thing the client sees is the close.
    let read = client.recv(4096).await.unwrap();
    assert!(read.is_none(), "status must not send anything: {read:?}");
}

#[tokio::test]
async fn test_whoami_and_help() {
    let (server, _client) = tcp_pair().await;
    let local = server.local_addr();
    let chat = start(server, ChatConfig::default());

    chat.type_line("/whoami").await;
    chat.renderer
        .wait_for(|l| l.ends_with(&format!("Your address: {local}")))
        .await;

    chat.type_line("/help").await;
    chat.renderer.wait_for(|l| l.contains("/whoami")).await;

    chat.type_line("/quit").await;
    chat.finish().await;
}

#[tokio::test]
async fn test_typed_keys_are_edited_and_sent() {
    let (server, client) = tcp_pair().await;
    let chat = start(server, ChatConfig::default());

    for event in [
        InputEvent::Char('h'),
        InputEvent::Char('i'),
        InputEvent::Backspace,
        InputEvent::Char('o'),
        InputEvent::Enter,
    ] {
        chat.input.send(event).await.unwrap();
    }

    let inbound = client.recv(4096).await.unwrap().expect("message");
    assert_eq!(inbound.bytes, b"MSG:ho");
    chat.renderer.wait_for(|l| l.ends_with("[YOU] ho")).await;

    chat.type_line("/quit").await;
    chat.finish().await;
}

#[tokio::test]
async fn test_unknown_command_and_empty_line() {
    let (server, client) = tcp_pair().await;
    let chat = start(server, ChatConfig::default());

    chat.type_line("").await;
    chat.type_line("/xyz").await;

    let inbound = client.recv(4096).await.unwrap().expect("message");
    assert_eq!(inbound.bytes, b"MSG:/xyz");

    chat.type_line("/quit").await;
    chat.finish().await;
}

#[tokio::test]
async fn test_clear_empties_the_screen() {
    let (server, _client) = tcp_pair().await;
    let chat = start(server, ChatConfig::default());
    chat.renderer.wait_for(|l| l.contains("/help")).await;

    chat.type_line("/clear").await;
    chat.type_line("/whoami").await;
    chat.renderer.wait_for(|l| l.contains("Your address")).await;
    assert!(
        !chat.renderer.lines().iter().any(|l| l.contains("Type /help")),
        "banner should have been cleared"
    );

    chat.type_line("/quit").await;
    chat.finish().await;
}

#[tokio::test]
async fn test_peer_close_ends_session() {
    let (server, client) = tcp_pair().await;
    let chat = start(server, ChatConfig::default());

    client.close().await.unwrap();
    assert_eq!(chat.finish().await, SessionEnd::PeerClosed);
}

#[tokio::test]
async fn test_input_end_ends_session() {
    let (server, _client) = tcp_pair().await;
    let chat = start(server, ChatConfig::default());

    drop(chat.input);
    let end = tokio::time::timeout(Duration::from_secs(5), chat.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(end, SessionEnd::InputClosed);
}

#[tokio::test]
async fn test_file_from_peer_is_saved_mid_chat() {
    let dir = tempfile::tempdir().unwrap();
    let (server, client) = tcp_pair().await;
    let chat = start(
        server,
        ChatConfig {
            download_dir: dir.path().to_path_buf(),
            ..ChatConfig::default()
        },
    );

    client.send(b"FILE:drop.txt:11").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.send(b"MSG:sneaky").await.unwrap();
    client.send(b"!").await.unwrap();

    chat.renderer.wait_for(|l| l.contains("Saved drop.txt")).await;
    let saved = tokio::fs::read(dir.path().join("drop.txt")).await.unwrap();
    assert_eq!(saved, b"MSG:sneaky!");
    assert!(
        !chat.renderer.lines().iter().any(|l| l.contains("[RECV]")),
        "body bytes must not render as chat lines"
    );

    client.send(b"MSG:after").await.unwrap();
    chat.renderer.wait_for(|l| l.ends_with("[RECV] after")).await;

    chat.type_line("/quit").await;
    chat.finish().await;
}

#[tokio::test]
async fn test_udp_responder_replies_to_latest_sender() {
    let listener = Listener::bind(0, TransportMode::Udp, loopback())
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = listener.accept().await.unwrap();
    let chat = start(server, ChatConfig::default());

    chat.type_line("too early").await;
    chat.renderer.wait_for(|l| l.contains("No peer yet")).await;

    let a = Endpoint::connect("127.0.0.1", port, TransportMode::Udp, loopback())
        .await
        .unwrap();
    let b = Endpoint::connect("127.0.0.1", port, TransportMode::Udp, loopback())
        .await
        .unwrap();

    a.send(b"MSG:from a").await.unwrap();
    chat.renderer.wait_for(|l| l.ends_with("[RECV] from a")).await;
    b.send(b"MSG:from b").await.unwrap();
    chat.renderer.wait_for(|l| l.ends_with("[RECV] from b")).await;

    chat.type_line("reply").await;
    let inbound = b.recv(0).await.unwrap().expect("reply");
    assert_eq!(inbound.bytes, b"MSG:reply");

    chat.type_line("/quit").await;
    assert_eq!(chat.finish().await, SessionEnd::Quit);
}

#[tokio::test]
async fn test_reconnect_once_after_peer_close() {
    let listener = Listener::bind(0, TransportMode::Tcp, loopback())
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    let accept = tokio::spawn(async move { listener.accept().await });
    let server = Endpoint::connect("127.0.0.1", port, TransportMode::Tcp, loopback())
        .await
        .unwrap();
    let first_peer = accept.await.unwrap().unwrap();

    // The initiator side chats and re-dials the same port once.
    let chat = start(
        server,
        ChatConfig {
            reconnect_once: true,
            ..ChatConfig::default()
        },
    );

    let relisten = Listener::bind(port, TransportMode::Tcp, loopback())
        .await
        .unwrap();
    let second = tokio::spawn(async move { relisten.accept().await });
    first_peer.close().await.unwrap();

    let second_peer = second.await.unwrap().unwrap();
    chat.renderer.wait_for(|l| l.contains("Reconnected")).await;

    second_peer.send(b"MSG:back again").await.unwrap();
    chat.renderer
        .wait_for(|l| l.ends_with("[RECV] back again"))
        .await;

    second_peer.close().await.unwrap();
    assert_eq!(chat.finish().await, SessionEnd::PeerClosed);
}

fn reconnecting() -> ChatConfig {
    ChatConfig {
        reconnect_once: true,
        ..ChatConfig::default()
    }
}

#[tokio::test]
async fn test_quit_while_waiting_to_reconnect() {
    let (server, client) = tcp_pair().await;
    let chat = start(server, reconnecting());

    // The responder goes back to waiting for a peer that never comes.
    client.close().await.unwrap();
    chat.renderer
        .wait_for(|l| l.contains("Reconnecting once"))
        .await;

    chat.type_line("hello?").await;
    chat.renderer.wait_for(|l| l.contains("Not connected")).await;

    chat.type_line("/quit").await;
    assert_eq!(chat.finish().await, SessionEnd::Quit);
}

#[tokio::test]
async fn test_interrupt_while_waiting_to_reconnect() {
    let (server, client) = tcp_pair().await;
    let chat = start(server, reconnecting());

    client.close().await.unwrap();
    chat.renderer
        .wait_for(|l| l.contains("Reconnecting once"))
        .await;

    chat.input.send(InputEvent::Interrupt).await.unwrap();
    assert_eq!(chat.finish().await, SessionEnd::Interrupted);
}

#[tokio::test]
async fn test_responder_accepts_a_new_peer_after_close() {
    let (server, client) = tcp_pair().await;
    let port = server.local_addr().port();
    let chat = start(server, reconnecting());

    client.close().await.unwrap();
    chat.renderer
        .wait_for(|l| l.contains("Reconnecting once"))
        .await;

    let mut second = None;
    for _ in 0..50 {
        match Endpoint::connect("127.0.0.1", port, TransportMode::Tcp, loopback()).await {
            Ok(endpoint) => {
                second = Some(endpoint);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    let second = second.expect("responder should listen again on its port");
    chat.renderer.wait_for(|l| l.contains("Reconnected")).await;

    second.send(b"MSG:new peer").await.unwrap();
    chat.renderer
        .wait_for(|l| l.ends_with("[RECV] new peer"))
        .await;

    // A second close is final.
    second.close().await.unwrap();
    assert_eq!(chat.finish().await, SessionEnd::PeerClosed);
}

#[tokio::test]
async fn test_interrupt_closes_endpoint() {
    let (server, client) = tcp_pair().await;
    let chat = start(server, ChatConfig::default());
    chat.renderer.wait_for(|l| l.contains("Type /help")).await;

    chat.input.send(InputEvent::Interrupt).await.unwrap();
    let renderer = chat.renderer.clone();
    assert_eq!(chat.finish().await, SessionEnd::Interrupted);
    assert!(renderer.lines().iter().any(|l| l.ends_with("Session closed.")));

    let read = tokio::time::timeout(Duration::from_secs(2), client.recv(4096))
        .await
        .expect("peer should see the close")
        .unwrap();
    assert!(read.is_none(), "got {read:?}");
}

#[tokio::test]
async fn test_interrupt_cancels_file_being_received() {
    let dir = tempfile::tempdir().unwrap();
    let (server, client) = tcp_pair().await;
    let chat = start(
        server,
        ChatConfig {
            download_dir: dir.path().to_path_buf(),
            ..ChatConfig::default()
        },
    );

    client.send(b"FILE:big.bin:100").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.send(b"only ten b").await.unwrap();
    chat.renderer
        .wait_for(|l| l.contains("Receiving file big.bin"))
        .await;

    chat.input.send(InputEvent::Interrupt).await.unwrap();
    let renderer = chat.renderer.clone();
    assert_eq!(chat.finish().await, SessionEnd::Interrupted);

    let lines = renderer.lines();
    let failed = lines
        .iter()
        .find(|l| l.contains("File transfer failed"))
        .unwrap_or_else(|| panic!("no failure line in {lines:#?}"));
    assert!(failed.contains("endpoint closed locally"), "got {failed:?}");
    assert!(!lines.iter().any(|l| l.contains("Saved big.bin")));
}

#[tokio::test]
async fn test_missing_download_dir_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let downloads = dir.path().join("nested").join("downloads");
    let (server, client) = tcp_pair().await;
    let chat = start(
        server,
        ChatConfig {
            download_dir: downloads.clone(),
            ..ChatConfig::default()
        },
    );

    for (name, body) in [("one.txt", b"first"), ("two.txt", b"other")] {
        client
            .send(format!("FILE:{name}:5").as_bytes())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.send(body).await.unwrap();
        chat.renderer
            .wait_for(|l| l.contains(&format!("Saved {name}")))
            .await;
    }

    assert!(downloads.is_dir());
    assert_eq!(std::fs::read(downloads.join("one.txt")).unwrap(), b"first");
    assert_eq!(std::fs::read(downloads.join("two.txt")).unwrap(), b"other");

    chat.type_line("/quit").await;
    chat.finish().await;
}

#[tokio::test]
async fn test_hex_dump_follows_received_line() {
    let (server, client) = tcp_pair().await;
    let chat = start(
        server,
        ChatConfig {
            hex_dump: true,
            ..ChatConfig::default()
        },
    );

    client.send(b"MSG:hi\x01").await.unwrap();
    let dump = chat
        .renderer
        .wait_for(|l| l.starts_with("00000000:"))
        .await;
    assert!(dump.starts_with("00000000: 4d 53 47 3a 68 69 01"), "got {dump:?}");
    assert!(dump.ends_with("  MSG:hi."), "got {dump:?}");

    chat.type_line("/quit").await;
    chat.finish().await;
}

#[tokio::test]
async fn test_transcript_keeps_plain_copy_of_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat.log");
    let (server, client) = tcp_pair().await;
    let chat = start(
        server,
        ChatConfig {
            transcript: Some(path.clone()),
            hex_dump: true,
            ..ChatConfig::default()
        },
    );

    client.send(b"MSG:\x1b[31mred\x1b[0m").await.unwrap();
    chat.renderer.wait_for(|l| l.contains("[RECV]")).await;
    chat.type_line("back").await;
    chat.renderer.wait_for(|l| l.ends_with("[YOU] back")).await;
    chat.type_line("/quit").await;
    chat.finish().await;

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains('\x1b'), "got {text:?}");
    assert!(text.contains("Type /help for commands."));
    assert!(text.contains("[RECV] red\n"));
    assert!(text.contains("00000000: 4d 53 47 3a 1b"));
    assert!(text.contains("[YOU] back\n"));
    assert!(text.trim_end().ends_with("Session closed."));
}

#[tokio::test]
async fn test_unopenable_transcript_fails_session() {
    let dir = tempfile::tempdir().unwrap();
    let (server, client) = tcp_pair().await;
    let chat = start(
        server,
        ChatConfig {
            transcript: Some(dir.path().to_path_buf()),
            ..ChatConfig::default()
        },
    );

    let err = tokio::time::timeout(Duration::from_secs(5), chat.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, ChatError::Transcript { .. }), "got {err:?}");

    let read = client.recv(4096).await.unwrap();
    assert!(read.is_none(), "endpoint should be closed: {read:?}");
}
