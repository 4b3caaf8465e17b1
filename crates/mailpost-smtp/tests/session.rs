//! Integration tests for the SMTP session against a scripted server.
//!
//! A loopback TCP listener plays the server side of the protocol so the
//! full session lifecycle can be exercised without a real mail server.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use mailpost_smtp::{AuthMechanism, EnvelopeAddress, Error, Session, connect};

/// What the scripted server observed.
#[derive(Debug, Default)]
struct ServerLog {
    commands: Vec<String>,
    payload: Vec<String>,
}

async fn serve(stream: TcpStream, log: Arc<Mutex<ServerLog>>, reject_rcpt: &[&str]) {
    let mut reader = BufReader::new(stream);
    reader
        .get_mut()
        .write_all(b"220 test.local ESMTP scripted\r\n")
        .await
        .unwrap();

    let mut in_data = false;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
            return;
        }
        let line = line.trim_end().to_string();

        if in_data {
            if line == "." {
                in_data = false;
                reader.get_mut().write_all(b"250 OK queued\r\n").await.unwrap();
            } else {
                log.lock().await.payload.push(line);
            }
            continue;
        }

        log.lock().await.commands.push(line.clone());
        let upper = line.to_uppercase();

        let reply: String = if upper.starts_with("EHLO") {
            "250-test.local\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1048576\r\n".to_string()
        } else if upper.starts_with("AUTH PLAIN") {
            "235 2.7.0 accepted\r\n".to_string()
        } else if upper.starts_with("MAIL FROM") {
            "250 OK\r\n".to_string()
        } else if upper.starts_with("RCPT TO") {
            if reject_rcpt.iter().any(|r| line.contains(r)) {
                "550 5.1.1 no such user\r\n".to_string()
            } else {
                "250 OK\r\n".to_string()
            }
        } else if upper.starts_with("DATA") {
            in_data = true;
            "354 end with .\r\n".to_string()
        } else if upper.starts_with("QUIT") {
            reader.get_mut().write_all(b"221 bye\r\n").await.unwrap();
            return;
        } else {
            "500 unrecognized\r\n".to_string()
        };

        reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
    }
}

/// Spawns a one-connection scripted server that accepts everything except
/// the recipients listed in `reject_rcpt`.
async fn bind_server(reject_rcpt: &'static [&'static str]) -> (u16, Arc<Mutex<ServerLog>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let log = Arc::new(Mutex::new(ServerLog::default()));
    let shared = Arc::clone(&log);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream, shared, reject_rcpt).await;
    });

    (port, log)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mailpost_smtp=debug")
        .try_init();
}

#[tokio::test]
async fn full_session_lifecycle() {
    init_tracing();
    let (port, log) = bind_server(&[]).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let mut session = Session::open(stream).await.unwrap();
    assert_eq!(session.capabilities().hostname, "test.local");

    session = session.ehlo("localhost").await.unwrap();
    assert!(
        session
            .capabilities()
            .auth_mechanisms()
            .contains(&AuthMechanism::Plain)
    );

    session.auth_plain("user", "secret").await.unwrap();

    let from = EnvelopeAddress::new("me@example.com").unwrap();
    let one = EnvelopeAddress::new("one@example.com").unwrap();
    let two = EnvelopeAddress::new("two@example.com").unwrap();

    let session = session
        .mail_from(&from)
        .await
        .unwrap()
        .rcpt_to(&one)
        .await
        .unwrap()
        .rcpt_to(&two)
        .await
        .unwrap()
        .data()
        .await
        .unwrap()
        .send_payload(b"Subject: hi\r\n\r\nhello\r\n")
        .await
        .unwrap();

    session.quit().await.unwrap();

    let log = log.lock().await;
    assert_eq!(log.commands[0], "EHLO localhost");
    assert!(log.commands[1].starts_with("AUTH PLAIN "));
    assert_eq!(log.commands[2], "MAIL FROM:<me@example.com>");
    assert_eq!(log.commands[3], "RCPT TO:<one@example.com>");
    assert_eq!(log.commands[4], "RCPT TO:<two@example.com>");
    assert_eq!(log.commands[5], "DATA");
    assert_eq!(log.commands[6], "QUIT");
    assert_eq!(log.payload, vec!["Subject: hi", "", "hello"]);
}

#[tokio::test]
async fn leading_dots_are_byte_stuffed() {
    let (port, log) = bind_server(&[]).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let session = Session::open(stream).await.unwrap();
    let session = session.ehlo("localhost").await.unwrap();

    let from = EnvelopeAddress::new("me@example.com").unwrap();
    let to = EnvelopeAddress::new("you@example.com").unwrap();

    session
        .mail_from(&from)
        .await
        .unwrap()
        .rcpt_to(&to)
        .await
        .unwrap()
        .data()
        .await
        .unwrap()
        .send_payload(b"body\r\n.hidden line\r\nend\r\n")
        .await
        .unwrap()
        .quit()
        .await
        .unwrap();

    let log = log.lock().await;
    // The server sees the stuffed form; a compliant server would unstuff.
    assert!(log.payload.contains(&"..hidden line".to_string()));
}

#[tokio::test]
async fn rejected_recipient_is_a_permanent_error() {
    let (port, _log) = bind_server(&["nobody@example.com"]).await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let session = Session::open(stream).await.unwrap();
    let session = session.ehlo("localhost").await.unwrap();

    let from = EnvelopeAddress::new("me@example.com").unwrap();
    let to = EnvelopeAddress::new("nobody@example.com").unwrap();

    let tx = session.mail_from(&from).await.unwrap();
    let err = tx.rcpt_to(&to).await.unwrap_err();
    assert!(err.is_permanent());
    assert!(matches!(err, Error::Rejected { code: 550, .. }));
}

#[tokio::test]
async fn refused_greeting_fails_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream
            .write_all(b"554 go away\r\n")
            .await
            .unwrap();
    });

    let stream = connect("127.0.0.1", port).await.unwrap();
    let err = Session::open(stream).await.unwrap_err();
    assert!(matches!(err, Error::Rejected { code: 554, .. }));
}

#[tokio::test]
async fn connection_refused_is_an_io_error() {
    // Bind-then-drop guarantees nothing listens on the port.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = connect("127.0.0.1", port).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
