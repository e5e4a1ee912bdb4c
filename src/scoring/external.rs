//! Neural metrics served by a long-lived helper process speaking JSON lines.
//!
//! Each request is one line on the child's stdin:
//! `{"metric": "comet", "hypothesis": "...", "reference": "...", "source": "..."}`
//! and each reply is one line on its stdout carrying exactly one of
//! `score`, `error` or `unavailable`. A process that does not answer within
//! the reply timeout is killed and its metrics become unavailable.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{MetricKind, ScoreRequest, ScoringError};

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(600);

pub struct ExternalScorer {
    program: String,
    args: Vec<String>,
    reply_timeout: Duration,
    session: OnceCell<Option<Mutex<Session>>>,
}

/// `Ok(None)` marks end of output.
type Reply = io::Result<Option<String>>;

struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    replies: Receiver<Reply>,
    reply_timeout: Duration,
    dead: bool,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    metric: &'a str,
    hypothesis: &'a str,
    reference: &'a str,
    source: Option<&'a str>,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    unavailable: Option<String>,
}

impl ExternalScorer {
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = match shell_words::split(command_line) {
            Ok(parts) => parts,
            Err(err) => bail!("failed to parse scorer command '{command_line}': {err}"),
        };
        if parts.is_empty() {
            bail!("scorer command is empty");
        }
        let program = parts.remove(0);

        Ok(Self {
            program,
            args: parts,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            session: OnceCell::new(),
        })
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn score(&self, kind: MetricKind, request: &ScoreRequest<'_>) -> Result<f64, ScoringError> {
        let Some(session) = self.session.get_or_init(|| self.spawn()) else {
            return Err(ScoringError::Unavailable {
                kind,
                reason: format!("scorer process '{}' could not be started", self.program),
            });
        };

        let mut session = session.lock().map_err(|_| ScoringError::Failed {
            kind,
            message: "scorer session lock poisoned".to_string(),
        })?;
        session.exchange(kind, request)
    }

    fn spawn(&self) -> Option<Mutex<Session>> {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                warn!(
                    program = %self.program,
                    error = %err,
                    "failed to start external scorer; neural metrics will be absent"
                );
                return None;
            }
        };

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            warn!(program = %self.program, "external scorer pipes unavailable");
            let _ = child.kill();
            let _ = child.wait();
            return None;
        };

        let (sender, replies) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("medbt-scorer-reader".to_string())
            .spawn(move || read_replies(stdout, sender));
        if let Err(err) = reader {
            warn!(program = %self.program, error = %err, "failed to start scorer reader thread");
            let _ = child.kill();
            let _ = child.wait();
            return None;
        }

        info!(program = %self.program, pid = child.id(), "started external scorer");
        Some(Mutex::new(Session {
            child,
            stdin: Some(stdin),
            replies,
            reply_timeout: self.reply_timeout,
            dead: false,
        }))
    }
}

fn read_replies(stdout: ChildStdout, sender: mpsc::Sender<Reply>) {
    let mut reader = BufReader::new(stdout);
    loop {
        let mut line = String::new();
        let reply = match reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            Err(err) => Err(err),
        };
        let finished = !matches!(reply, Ok(Some(_)));
        if sender.send(reply).is_err() || finished {
            break;
        }
    }
}

impl Session {
    fn exchange(&mut self, kind: MetricKind, request: &ScoreRequest<'_>) -> Result<f64, ScoringError> {
        if self.dead {
            return Err(ScoringError::Unavailable {
                kind,
                reason: "scorer process exited".to_string(),
            });
        }

        let wire = WireRequest {
            metric: kind.as_str(),
            hypothesis: request.hypothesis,
            reference: request.reference,
            source: request.source,
        };
        let mut line = serde_json::to_string(&wire).map_err(|err| ScoringError::Failed {
            kind,
            message: err.to_string(),
        })?;
        line.push('\n');

        let written = match self.stdin.as_mut() {
            Some(stdin) => stdin
                .write_all(line.as_bytes())
                .and_then(|()| stdin.flush()),
            None => Err(io::Error::from(io::ErrorKind::BrokenPipe)),
        };
        if let Err(err) = written {
            return Err(self.mark_dead(kind, format!("failed to write request: {err}")));
        }

        match self.replies.recv_timeout(self.reply_timeout) {
            Ok(Ok(Some(reply))) => parse_reply(kind, &reply),
            Ok(Ok(None)) => Err(self.mark_dead(kind, "scorer closed its output".to_string())),
            Ok(Err(err)) => Err(self.mark_dead(kind, format!("failed to read reply: {err}"))),
            Err(RecvTimeoutError::Timeout) => Err(self.mark_dead(
                kind,
                format!("no reply within {} ms", self.reply_timeout.as_millis()),
            )),
            Err(RecvTimeoutError::Disconnected) => {
                Err(self.mark_dead(kind, "scorer reader stopped".to_string()))
            }
        }
    }

    fn mark_dead(&mut self, kind: MetricKind, reason: String) -> ScoringError {
        warn!(metric = %kind, reason = %reason, "external scorer stopped responding");
        self.dead = true;
        let _ = self.child.kill();
        ScoringError::Unavailable { kind, reason }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Closing stdin lets a well-behaved scorer exit on its own.
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn parse_reply(kind: MetricKind, reply: &str) -> Result<f64, ScoringError> {
    let parsed: WireResponse =
        serde_json::from_str(reply.trim()).map_err(|err| ScoringError::Failed {
            kind,
            message: format!("unparseable reply: {err}"),
        })?;

    if let Some(reason) = parsed.unavailable {
        return Err(ScoringError::Unavailable { kind, reason });
    }
    if let Some(message) = parsed.error {
        return Err(ScoringError::Failed { kind, message });
    }
    match parsed.score {
        Some(score) if score.is_finite() => Ok(score),
        Some(score) => Err(ScoringError::Failed {
            kind,
            message: format!("non-finite score {score}"),
        }),
        None => Err(ScoringError::Failed {
            kind,
            message: "reply carried no score".to_string(),
        }),
    }
}
