//! End-to-end tests for the client driver.
//!
//! Each test plays the server by hand on a loopback socket and feeds the
//! client scripted input, then checks what went over the wire, what the
//! user saw, and how the session ended.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatwire::{
    BufferedConsole, Client, ClientError, Ending, VIOLATION_NOTICE,
};
use chatwire_protocol::{BinaryCodec, MessageId, TextCodec, code, peek_header};
use chatwire_session::Phase;
use chatwire_transport::{
    ReliabilityConfig, TcpConnection, TransportError, UdpConnection,
};
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, UdpSocket};

const LIMIT: Duration = Duration::from_secs(5);

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(LIMIT, future)
        .await
        .expect("test took too long")
}

/// Input that never ends by itself: the caller keeps the writer alive.
async fn open_input(script: &str) -> (BufReader<DuplexStream>, DuplexStream) {
    let (mut writer, reader) = tokio::io::duplex(4096);
    writer.write_all(script.as_bytes()).await.unwrap();
    (BufReader::new(reader), writer)
}

fn never() -> impl Future<Output = ()> {
    std::future::pending()
}

// =========================================================================
// TCP harness
// =========================================================================

struct TcpServer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TcpServer {
    async fn expect(&mut self, line: &str) {
        let got = within(self.lines.next_line())
            .await
            .unwrap()
            .expect("client closed early");
        assert_eq!(got, line);
    }

    async fn say(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn expect_eof(&mut self) {
        assert_eq!(within(self.lines.next_line()).await.unwrap(), None);
    }
}

async fn tcp_pair(
) -> (Client<TcpConnection, TextCodec>, TcpServer, Arc<BufferedConsole>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (conn, accepted) =
        tokio::join!(TcpConnection::connect(addr), listener.accept());
    let (stream, _) = accepted.unwrap();
    let (read, writer) = stream.into_split();

    let console = Arc::new(BufferedConsole::new());
    let client = Client::new(conn.unwrap(), TextCodec, console.clone());
    let server = TcpServer {
        lines: BufReader::new(read).lines(),
        writer,
    };
    (client, server, console)
}

// =========================================================================
// TCP scenarios
// =========================================================================

#[tokio::test]
async fn test_tcp_auth_chat_and_end_of_input() {
    let (client, mut server, console) = tcp_pair().await;
    let input: &[u8] = b"/auth alice secret123 Alice\nhello everyone\n";

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            server.expect("AUTH alice AS Alice USING secret123").await;
            server.say("REPLY OK IS Auth success.").await;
            server.expect("MSG FROM Alice IS hello everyone").await;
            server.expect("BYE").await;
            server.expect_eof().await;
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::InputClosed);
    assert_eq!(console.stderr_lines(), ["Success: Auth success."]);
    assert_eq!(client.session().phase(), Phase::Ended);
}

#[tokio::test]
async fn test_tcp_failed_auth_then_retry() {
    let (client, mut server, console) = tcp_pair().await;
    let input: &[u8] =
        b"/auth alice wrong Alice\n/auth alice secret123 Alice\n/join general\n";

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            server.expect("AUTH alice AS Alice USING wrong").await;
            server.say("REPLY NOK IS Bad secret").await;
            server.expect("AUTH alice AS Alice USING secret123").await;
            server.say("REPLY OK IS Welcome").await;
            server.expect("JOIN general AS Alice").await;
            server.say("REPLY NOK IS Channel full").await;
            server.expect("BYE").await;
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::InputClosed);
    assert_eq!(
        console.stderr_lines(),
        ["Failure: Bad secret", "Success: Welcome", "Failure: Channel full"]
    );
}

#[tokio::test]
async fn test_tcp_incoming_chat_is_printed_and_peer_bye_ends() {
    let (client, mut server, console) = tcp_pair().await;
    let (input, _keep) = open_input("/auth alice secret123 Alice\n").await;

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            server.expect("AUTH alice AS Alice USING secret123").await;
            server.say("REPLY OK IS ok").await;
            server.say("MSG FROM Bob IS hi Alice").await;
            server.say("BYE").await;
            // No farewell after the server's own BYE.
            server.expect_eof().await;
        })
    })
    .await;

    let ending = ending.unwrap();
    assert_eq!(ending, Ending::PeerBye);
    assert!(ending.is_graceful());
    assert_eq!(console.stdout_lines(), ["Bob: hi Alice"]);
}

#[tokio::test]
async fn test_tcp_peer_error_is_reported_and_answered_with_bye() {
    let (client, mut server, console) = tcp_pair().await;
    let (input, _keep) = open_input("/auth alice secret123 Alice\n").await;

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            server.expect("AUTH alice AS Alice USING secret123").await;
            server.say("ERR FROM Server IS account locked").await;
            server.expect("BYE").await;
        })
    })
    .await;

    let ending = ending.unwrap();
    assert_eq!(ending, Ending::PeerError);
    assert!(!ending.is_graceful());
    assert_eq!(console.stderr_lines(), ["ERR FROM Server: account locked"]);
}

#[tokio::test]
async fn test_tcp_protocol_violation_sends_err_and_bye() {
    let (client, mut server, console) = tcp_pair().await;
    let (input, _keep) = open_input("/auth alice secret123 Alice\n").await;

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            server.expect("AUTH alice AS Alice USING secret123").await;
            server.say("REPLY OK IS ok").await;
            server.say("WHAT IS THIS").await;
            server
                .expect(&format!("ERR FROM Alice IS {VIOLATION_NOTICE}"))
                .await;
            server.expect("BYE").await;
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::ProtocolViolation);
    assert_eq!(
        console.stderr_lines(),
        ["Success: ok".to_owned(), format!("ERR: {VIOLATION_NOTICE}")]
    );
}

#[tokio::test]
async fn test_tcp_server_speaking_first_is_a_violation() {
    let (client, mut server, _console) = tcp_pair().await;
    let (input, _keep) = open_input("").await;

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            server.say("MSG FROM Server IS hello?").await;
            server
                .expect(&format!("ERR FROM chatwire IS {VIOLATION_NOTICE}"))
                .await;
            server.expect("BYE").await;
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::ProtocolViolation);
}

#[tokio::test]
async fn test_tcp_invalid_input_sends_nothing() {
    let (client, mut server, console) = tcp_pair().await;
    let long_name = "N".repeat(25);
    let script = format!(
        "hello before auth\n/auth alice secret {long_name}\n/frobnicate\n/join\n\n/help\n"
    );

    let (ending, ()) = within(async {
        tokio::join!(client.run(script.as_bytes(), never()), async {
            // Only the farewell reaches the server.
            server.expect("BYE").await;
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::InputClosed);
    let errors = console.stderr_lines();
    assert_eq!(errors.len(), 4, "{errors:?}");
    assert!(errors.iter().all(|e| e.starts_with("ERR: ")));
    assert!(console.stdout_lines()[0].contains("/auth"));
}

#[tokio::test]
async fn test_tcp_non_utf8_line_is_skipped() {
    let (client, mut server, console) = tcp_pair().await;
    let input: &[u8] = b"caf\xe9\n/auth alice secret123 Alice\n";

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            server.expect("AUTH alice AS Alice USING secret123").await;
            server.say("REPLY OK IS welcome").await;
            server.expect("BYE").await;
            server.expect_eof().await;
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::InputClosed);
    assert_eq!(
        console.stderr_lines(),
        ["ERR: input line is not valid UTF-8 text", "Success: welcome"]
    );
    assert_eq!(client.session().phase(), Phase::Ended);
}

#[tokio::test]
async fn test_tcp_rename_changes_sender_name() {
    let (client, mut server, _console) = tcp_pair().await;
    let input: &[u8] =
        b"/auth alice secret123 Alice\n/rename Queen-A\nlong live me\n";

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            server.expect("AUTH alice AS Alice USING secret123").await;
            server.say("REPLY OK IS ok").await;
            server.expect("MSG FROM Queen-A IS long live me").await;
            server.expect("BYE").await;
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::InputClosed);
}

#[tokio::test]
async fn test_tcp_interrupt_sends_bye() {
    let (client, mut server, _console) = tcp_pair().await;
    let (input, _keep) = open_input("").await;
    let (trigger, fired) = tokio::sync::oneshot::channel::<()>();
    let shutdown = async {
        let _ = fired.await;
    };

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, shutdown), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = trigger.send(());
            server.expect("BYE").await;
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::Interrupted);
}

#[tokio::test]
async fn test_tcp_connection_loss_is_a_transport_error() {
    let (client, server, _console) = tcp_pair().await;
    let (input, _keep) = open_input("").await;
    drop(server);

    let result = within(client.run(input, never())).await;
    assert!(matches!(
        result,
        Err(ClientError::Transport(TransportError::ConnectionClosed(_)))
    ));
}

// =========================================================================
// UDP
// =========================================================================

async fn udp_pair(
    config: ReliabilityConfig,
) -> (
    Client<UdpConnection, BinaryCodec>,
    UdpSocket,
    Arc<BufferedConsole>,
) {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let conn = UdpConnection::connect(addr, config).await.unwrap();
    let console = Arc::new(BufferedConsole::new());
    let client = Client::new(conn, BinaryCodec, console.clone());
    (client, server, console)
}

async fn next_datagram(server: &UdpSocket) -> (Vec<u8>, SocketAddr) {
    let mut buf = vec![0u8; 2048];
    let (len, from) = within(server.recv_from(&mut buf)).await.unwrap();
    buf.truncate(len);
    (buf, from)
}

fn confirm(id: MessageId) -> Vec<u8> {
    let mut datagram = vec![code::ACK];
    datagram.extend_from_slice(&id.0.to_le_bytes());
    datagram
}

fn reply(id: u16, success: bool, content: &str) -> Vec<u8> {
    let mut datagram = vec![code::REPLY];
    datagram.extend_from_slice(&id.to_le_bytes());
    datagram.push(u8::from(success));
    datagram.extend_from_slice(&[0, 0]);
    datagram.extend_from_slice(content.as_bytes());
    datagram.push(0);
    datagram
}

#[tokio::test]
async fn test_udp_auth_reply_and_bye_are_confirmed() {
    let config = ReliabilityConfig {
        confirm_timeout: Duration::from_millis(500),
        max_retransmissions: 3,
    };
    let (client, server, console) = udp_pair(config).await;
    let input: &[u8] = b"/auth alice secret123 Alice\n";

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            let (auth, from) = next_datagram(&server).await;
            let header = peek_header(&auth).unwrap();
            assert_eq!(header.code, code::AUTH);
            assert_eq!(&auth[3..], b"alice\0Alice\0secret123\0");
            server.send_to(&confirm(header.id), from).await.unwrap();

            server.send_to(&reply(1, true, "Hello"), from).await.unwrap();
            let (ack, _) = next_datagram(&server).await;
            assert_eq!(ack, confirm(MessageId(1)));

            let (bye, _) = next_datagram(&server).await;
            let header = peek_header(&bye).unwrap();
            assert_eq!(header.code, code::BYE);
            server.send_to(&confirm(header.id), from).await.unwrap();
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::InputClosed);
    assert_eq!(console.stderr_lines(), ["Success: Hello"]);
}

#[tokio::test]
async fn test_udp_unconfirmed_auth_is_fatal() {
    let config = ReliabilityConfig {
        confirm_timeout: Duration::from_millis(30),
        max_retransmissions: 3,
    };
    let (client, server, _console) = udp_pair(config).await;
    let (input, _keep) = open_input("/auth alice secret123 Alice\n").await;

    let result = within(client.run(input, never())).await;
    assert!(matches!(
        result,
        Err(ClientError::Transport(TransportError::Unconfirmed {
            attempts: 4,
            ..
        }))
    ));

    // Four identical AUTH datagrams reached the server.
    let (first, _) = next_datagram(&server).await;
    for _ in 0..3 {
        let (again, _) = next_datagram(&server).await;
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_udp_malformed_datagram_is_a_violation() {
    let config = ReliabilityConfig {
        confirm_timeout: Duration::from_millis(500),
        max_retransmissions: 1,
    };
    let (client, server, _console) = udp_pair(config).await;
    let (input, _keep) = open_input("/auth alice secret123 Alice\n").await;

    let (ending, ()) = within(async {
        tokio::join!(client.run(input, never()), async {
            let (auth, from) = next_datagram(&server).await;
            let auth_id = peek_header(&auth).unwrap().id;
            server.send_to(&confirm(auth_id), from).await.unwrap();

            // A chat message with its terminators missing.
            let mut broken = vec![code::MSG, 9, 0];
            broken.extend_from_slice(b"Server");
            server.send_to(&broken, from).await.unwrap();

            let (ack, _) = next_datagram(&server).await;
            assert_eq!(ack, confirm(MessageId(9)));

            let (err, _) = next_datagram(&server).await;
            let header = peek_header(&err).unwrap();
            assert_eq!(header.code, code::ERR);
            server.send_to(&confirm(header.id), from).await.unwrap();

            let (bye, _) = next_datagram(&server).await;
            let header = peek_header(&bye).unwrap();
            assert_eq!(header.code, code::BYE);
            server.send_to(&confirm(header.id), from).await.unwrap();
        })
    })
    .await;

    assert_eq!(ending.unwrap(), Ending::ProtocolViolation);
}
