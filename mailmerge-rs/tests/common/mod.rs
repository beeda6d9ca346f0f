//! In-process SMTP server for relay and batch tests

#![allow(dead_code)]

use mailmerge_rs::config::{RelayConfig, TlsMode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A message accepted by the fake server
#[derive(Debug, Clone)]
pub struct Delivered {
    pub recipients: Vec<String>,
    pub data: String,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSmtpOptions {
    /// Answer every AUTH with 535
    pub reject_auth: bool,
    /// Answer RCPT TO for these addresses with 550
    pub reject_recipients: Vec<String>,
}

pub struct FakeSmtp {
    pub port: u16,
    delivered: Arc<Mutex<Vec<Delivered>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeSmtp {
    pub async fn start(options: FakeSmtpOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let shared = Arc::clone(&delivered);
        let accepted = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                let options = options.clone();
                let delivered = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = handle_session(stream, options, delivered).await;
                });
            }
        });

        Self {
            port,
            delivered,
            connections,
        }
    }

    /// TCP connections accepted so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            host: "127.0.0.1".to_string(),
            port: self.port,
            tls: TlsMode::None,
            timeout_secs: 5,
        }
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_recipients(&self) -> Vec<String> {
        self.delivered()
            .into_iter()
            .flat_map(|message| message.recipients)
            .collect()
    }
}

fn angle_address(line: &str) -> String {
    match (line.find('<'), line.find('>')) {
        (Some(start), Some(end)) if start < end => line[start + 1..end].to_string(),
        _ => line.splitn(2, ':').nth(1).unwrap_or_default().trim().to_string(),
    }
}

async fn handle_session(
    stream: TcpStream,
    options: FakeSmtpOptions,
    delivered: Arc<Mutex<Vec<Delivered>>>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut recipients = Vec::new();

    write.write_all(b"220 fake.local ESMTP ready\r\n").await?;

    while let Some(line) = lines.next_line().await? {
        let upper = line.to_ascii_uppercase();

        let reply = if upper.starts_with("EHLO") {
            "250-fake.local\r\n250 AUTH PLAIN LOGIN\r\n"
        } else if upper.starts_with("HELO") {
            "250 fake.local\r\n"
        } else if upper.starts_with("AUTH") {
            if line.split_whitespace().count() < 3 {
                write.write_all(b"334 \r\n").await?;
                lines.next_line().await?;
            }
            if options.reject_auth {
                "535 5.7.8 Authentication credentials invalid\r\n"
            } else {
                "235 2.7.0 Authentication successful\r\n"
            }
        } else if upper == "RSET" {
            recipients.clear();
            "250 2.0.0 Reset\r\n"
        } else if upper.starts_with("MAIL FROM") {
            recipients.clear();
            "250 2.1.0 OK\r\n"
        } else if upper.starts_with("RCPT TO") {
            let address = angle_address(&line);
            if options.reject_recipients.contains(&address) {
                "550 5.1.1 Mailbox unavailable\r\n"
            } else {
                recipients.push(address);
                "250 2.1.5 OK\r\n"
            }
        } else if upper == "DATA" {
            write.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await?;
            let mut data = String::new();
            while let Some(line) = lines.next_line().await? {
                if line == "." {
                    break;
                }
                data.push_str(&line);
                data.push('\n');
            }
            delivered.lock().unwrap().push(Delivered {
                recipients: std::mem::take(&mut recipients),
                data,
            });
            "250 2.0.0 Queued\r\n"
        } else if upper == "QUIT" {
            write.write_all(b"221 2.0.0 Bye\r\n").await?;
            break;
        } else {
            // NOOP
            "250 2.0.0 OK\r\n"
        };

        write.write_all(reply.as_bytes()).await?;
    }

    Ok(())
}
