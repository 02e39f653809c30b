// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! A configurable mock language server for testing.
//!
//! Speaks Content-Length framed JSON-RPC over stdin/stdout, the framing
//! worker transports use. CLI flags control timing and failure modes.
//! Unlike a strict LSP server it tolerates repeated initialize/shutdown
//! cycles: worker-hosted servers get rebound by client restarts and only
//! go away on `exit`. No tokio — a blocking read loop is all this needs.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use serde_json::{Value, json};

/// Mock language server for integration testing.
#[derive(Parser, Debug)]
#[command(name = "mockls")]
struct Args {
    /// Reject the initialize request with an error.
    #[arg(long)]
    fail_initialize: bool,

    /// Sleep before every response (milliseconds).
    #[arg(long, default_value_t = 0)]
    response_delay: u64,

    /// Never respond to this method (repeatable).
    #[arg(long)]
    hang_on: Vec<String>,

    /// Exit after n responses (simulates a dying worker).
    #[arg(long)]
    drop_after: Option<u64>,
}

/// A JSON-RPC request or notification.
#[derive(Debug, Deserialize)]
struct Request {
    id: Option<Value>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
}

struct MockServer {
    args: Args,
    documents: HashMap<String, String>,
    response_count: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut server = MockServer {
        args,
        documents: HashMap::new(),
        response_count: 0,
    };
    server.run(&mut std::io::stdin().lock());
}

impl MockServer {
    fn run(&mut self, reader: &mut dyn Read) {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }

            while let Some((message, consumed)) = next_frame(&buffer) {
                buffer.drain(..consumed);

                let Ok(request) = serde_json::from_str::<Request>(&message) else {
                    continue;
                };
                self.handle(request);
            }
        }
    }

    fn handle(&mut self, request: Request) {
        let Some(method) = request.method.clone() else {
            return;
        };

        if self.args.hang_on.contains(&method) {
            tracing::debug!("hanging on {method} as instructed");
            return;
        }
        if self.args.response_delay > 0 {
            std::thread::sleep(Duration::from_millis(self.args.response_delay));
        }

        match request.id {
            Some(id) => self.handle_request(&method, id, &request.params),
            None => self.handle_notification(&method, &request.params),
        }
    }

    fn handle_request(&mut self, method: &str, id: Value, params: &Value) {
        match method {
            "initialize" => {
                if self.args.fail_initialize {
                    self.respond_error(id, -32603, "mockls was told to fail initialize");
                    return;
                }
                // A fresh session: forget documents from any prior binding.
                self.documents.clear();
                self.respond(
                    id,
                    json!({
                        "capabilities": {
                            "textDocumentSync": 1,
                            "hoverProvider": true
                        },
                        "serverInfo": {
                            "name": "mockls",
                            "version": env!("CARGO_PKG_VERSION")
                        }
                    }),
                );
            }
            "shutdown" => {
                self.respond(id, Value::Null);
            }
            "textDocument/hover" => {
                let uri = params["textDocument"]["uri"].as_str().unwrap_or("unknown");
                self.respond(
                    id,
                    json!({
                        "contents": {
                            "kind": "markdown",
                            "value": format!("mockls hover for {uri}")
                        }
                    }),
                );
            }
            other => {
                self.respond_error(id, -32601, &format!("method not supported: {other}"));
            }
        }
    }

    fn handle_notification(&mut self, method: &str, params: &Value) {
        match method {
            "exit" => {
                tracing::debug!("exit received, terminating");
                std::process::exit(0);
            }
            "textDocument/didOpen" => {
                let uri = params["textDocument"]["uri"].as_str().unwrap_or_default();
                let text = params["textDocument"]["text"].as_str().unwrap_or_default();
                self.documents.insert(uri.to_string(), text.to_string());
                self.publish_diagnostics(uri);
            }
            "textDocument/didChange" => {
                let uri = params["textDocument"]["uri"].as_str().unwrap_or_default();
                let text = params["contentChanges"][0]["text"].as_str().unwrap_or_default();
                self.documents.insert(uri.to_string(), text.to_string());
                self.publish_diagnostics(uri);
            }
            "textDocument/didClose" => {
                let uri = params["textDocument"]["uri"].as_str().unwrap_or_default();
                self.documents.remove(uri);
            }
            _ => {}
        }
    }

    /// Publishes one diagnostic per `!!` marker in the document, so tests
    /// can provoke diagnostics deterministically.
    fn publish_diagnostics(&mut self, uri: &str) {
        let Some(text) = self.documents.get(uri) else {
            return;
        };
        let diagnostics: Vec<Value> = text
            .match_indices("!!")
            .map(|(offset, _)| {
                json!({
                    "range": {
                        "start": { "line": 0, "character": offset },
                        "end": { "line": 0, "character": offset + 2 }
                    },
                    "severity": 1,
                    "source": "mockls",
                    "message": "mock diagnostic"
                })
            })
            .collect();

        let notification = json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": { "uri": uri, "diagnostics": diagnostics }
        });
        self.write_message(&notification);
    }

    fn respond(&mut self, id: Value, result: Value) {
        let response = json!({ "jsonrpc": "2.0", "id": id, "result": result });
        self.write_message(&response);
        self.count_response();
    }

    fn respond_error(&mut self, id: Value, code: i64, message: &str) {
        let response = json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        });
        self.write_message(&response);
        self.count_response();
    }

    fn write_message(&self, message: &Value) {
        let body = message.to_string();
        let frame = format!("Content-Length: {}\r\n\r\n{body}", body.len());
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(frame.as_bytes());
        let _ = stdout.flush();
    }

    fn count_response(&mut self) {
        self.response_count += 1;
        if let Some(limit) = self.args.drop_after
            && self.response_count >= limit
        {
            tracing::debug!("drop-after limit reached, terminating");
            std::process::exit(0);
        }
    }
}

/// Finds the next complete Content-Length frame in `buffer`, returning the
/// body and the total bytes consumed.
fn next_frame(buffer: &[u8]) -> Option<(String, usize)> {
    let header_end = buffer.windows(4).position(|w| w == b"\r\n\r\n")?;
    let headers = std::str::from_utf8(&buffer[..header_end]).ok()?;

    let content_length: usize = headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse().ok())?
    })?;

    let body_start = header_end + 4;
    let body_end = body_start + content_length;
    if buffer.len() < body_end {
        return None;
    }

    let body = String::from_utf8(buffer[body_start..body_end].to_vec()).ok()?;
    Some((body, body_end))
}
