//! Integration tests for the mailer facade and backends.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use mailpost::{
    BackendRegistry, DummyTransport, Email, Error, Mailer, MailerRegistry, Settings, send_email,
};

/// Commands and DATA payload observed by the scripted SMTP server.
#[derive(Debug, Default)]
struct ServerLog {
    commands: Vec<String>,
    payload: Vec<String>,
}

/// Spawns a one-connection SMTP server that accepts everything.
async fn spawn_smtp_server() -> (u16, Arc<Mutex<ServerLog>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let log = Arc::new(Mutex::new(ServerLog::default()));
    let shared = Arc::clone(&log);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        reader
            .get_mut()
            .write_all(b"220 test.local ESMTP\r\n")
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
                    reader.get_mut().write_all(b"250 queued\r\n").await.unwrap();
                } else {
                    shared.lock().await.payload.push(line);
                }
                continue;
            }

            shared.lock().await.commands.push(line.clone());
            let upper = line.to_uppercase();
            let reply: &[u8] = if upper.starts_with("EHLO") {
                b"250-test.local\r\n250 AUTH PLAIN\r\n"
            } else if upper.starts_with("DATA") {
                in_data = true;
                b"354 go ahead\r\n"
            } else if upper.starts_with("QUIT") {
                reader.get_mut().write_all(b"221 bye\r\n").await.unwrap();
                return;
            } else {
                b"250 OK\r\n"
            };
            reader.get_mut().write_all(reply).await.unwrap();
        }
    });

    (port, log)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mailpost=debug")
        .try_init();
}

/// The capture transport behind a facade, for outbox assertions.
fn capture_of(mailer: &Mailer) -> &DummyTransport {
    mailer
        .transport()
        .as_any()
        .downcast_ref::<DummyTransport>()
        .expect("capture transport")
}

#[tokio::test]
async fn testing_mode_resolves_capture_even_with_invalid_backend() {
    let mut settings = Settings::new();
    settings.set("TESTING", true);
    settings.set("MAILER_BACKEND", "no.such.backend.Class");

    let backends = BackendRegistry::with_defaults();
    let mailer = Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap();
    assert_eq!(mailer.transport().name(), "dummy");
}

#[tokio::test]
async fn invalid_backend_outside_testing_is_a_config_error() {
    let mut settings = Settings::new();
    settings.set("MAILER_BACKEND", "no.such.backend.Class");

    let backends = BackendRegistry::with_defaults();
    let err = Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap_err();
    assert!(matches!(err, Error::UnknownBackend(_)));
}

#[tokio::test]
async fn capture_appends_one_entry_per_send() {
    let mut settings = Settings::new();
    settings.set("TESTING", true);
    let backends = BackendRegistry::with_defaults();
    let mailer = Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap();

    let mut mail = Email::new("hi", "body");
    mail.add_to("you@example.com").unwrap();

    mailer.send(&mut mail).await.unwrap();
    assert_eq!(capture_of(&mailer).sent_count(), 1);

    mailer.send_quiet(&mut mail).await.unwrap();
    assert_eq!(capture_of(&mailer).sent_count(), 2);
}

#[tokio::test]
async fn send_email_convenience_captures_one_message() {
    let mut settings = Settings::new();
    settings.set("TESTING", true);
    let backends = BackendRegistry::with_defaults();
    let mut registry = MailerRegistry::new();
    let mailer = registry
        .register(Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap())
        .unwrap();

    send_email(&mailer, "hello", "body", "you@example.com", true)
        .await
        .unwrap();

    let outbox = capture_of(&mailer).outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].subject().as_str(), "hello");
}

#[tokio::test]
async fn smtp_delivery_end_to_end() {
    init_tracing();
    let (port, log) = spawn_smtp_server().await;

    let mut settings = Settings::new();
    settings.set("MAILER_HOST", "127.0.0.1");
    settings.set("MAILER_PORT", i64::from(port));
    settings.set("MAILER_USERNAME", "user");
    settings.set("MAILER_PASSWORD", "secret");
    settings.set("MAILER_DEFAULT_SENDER", "webmaster@example.com");

    let backends = BackendRegistry::with_defaults();
    let mailer = Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap();
    assert_eq!(mailer.transport().name(), "smtp");

    // No explicit sender: the configured default must be filled in.
    let mut mail = Email::new("greetings", "hello there");
    mail.set_to(["one@example.com", "two@example.com"]).unwrap();
    mail.add_cc("two@example.com").unwrap();
    mail.add_bcc("hidden@example.com").unwrap();

    mailer.send(&mut mail).await.unwrap();

    let log = log.lock().await;
    assert_eq!(log.commands[0], "EHLO localhost");
    assert!(log.commands[1].starts_with("AUTH PLAIN"));
    assert_eq!(log.commands[2], "MAIL FROM:<webmaster@example.com>");

    // Envelope recipients: deduplicated union of To, Cc and Bcc.
    let rcpts: Vec<&String> = log
        .commands
        .iter()
        .filter(|c| c.starts_with("RCPT TO"))
        .collect();
    assert_eq!(rcpts.len(), 3);
    assert!(rcpts.iter().any(|r| r.contains("hidden@example.com")));

    // The Bcc recipient is in the envelope but never in the headers.
    let payload = log.payload.join("\n");
    assert!(payload.contains("From: webmaster@example.com"));
    assert!(payload.contains("To: one@example.com, two@example.com"));
    assert!(payload.contains("Cc: two@example.com"));
    assert!(!payload.contains("Bcc"));
    assert!(!payload.to_lowercase().contains("hidden@example.com"));
}

#[tokio::test]
async fn send_quiet_absorbs_delivery_errors() {
    // Bind-then-drop guarantees a connection-refused port.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut settings = Settings::new();
    settings.set("MAILER_HOST", "127.0.0.1");
    settings.set("MAILER_PORT", i64::from(port));

    let backends = BackendRegistry::with_defaults();
    let mailer = Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap();

    let mut mail = Email::new("hi", "body");
    mail.set_from("me@example.com").unwrap();
    mail.add_to("you@example.com").unwrap();

    // Loud send surfaces the failure...
    let err = mailer.send(&mut mail).await.unwrap_err();
    assert!(err.is_delivery());

    // ...while the quiet path absorbs it.
    mailer.send_quiet(&mut mail).await.unwrap();
}

#[tokio::test]
async fn send_quiet_still_propagates_validation_errors() {
    let mut settings = Settings::new();
    settings.set("MAILER_HOST", "127.0.0.1");
    settings.set("MAILER_DEFAULT_SENDER", "");

    let backends = BackendRegistry::with_defaults();
    let mailer = Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap();

    // No recipients and no sender: serialization must fail before any
    // network I/O, and the quiet path must not hide it.
    let mut incomplete = Email::new("hi", "body");
    let err = mailer.send_quiet(&mut incomplete).await.unwrap_err();
    assert!(matches!(err, Error::Message(_)));
    assert_eq!(err.to_string(), "fill in mailing parameters first");
}

#[tokio::test]
async fn credential_asymmetry_fails_at_construction() {
    let mut settings = Settings::new();
    settings.set("MAILER_USERNAME", "user-without-password");

    let backends = BackendRegistry::with_defaults();
    let err = Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap_err();
    assert!(matches!(err, Error::Credentials));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let backends = BackendRegistry::with_defaults();
    let mut registry = MailerRegistry::new();

    let mut settings = Settings::new();
    settings.set("TESTING", true);

    registry
        .register(Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap())
        .unwrap();
    let err = registry
        .register(Mailer::from_settings(&mut settings, "MAILER", &backends).unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateMailer(_)));
}
