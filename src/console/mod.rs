//! Interactive daemon console.
//!
//! # Data Flow
//! ```text
//! stdin ──reader thread──▶ channel ──handler thread──▶ command ──▶ output
//!                                                   └─ exit ──▶ request_stop
//! ```
//!
//! # Design Decisions
//! - The reader thread is detached: a blocking stdin read cannot be
//!   interrupted, and it holds nothing but the channel sender
//! - The handler thread owns all command execution and is joined on stop
//! - End of input only ends the console, never the node

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::engine::ChainEngine;
use crate::error::{RuntimeFault, StartupError};
use crate::lifecycle::{Shutdown, StateCell, StopCause};
use crate::net::ProtocolHandler;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Console input and output streams.
pub struct ConsoleIo {
    pub input: Box<dyn BufRead + Send>,
    pub output: Box<dyn Write + Send>,
}

impl ConsoleIo {
    pub fn stdio() -> Self {
        Self {
            input: Box::new(std::io::BufReader::new(std::io::stdin())),
            output: Box::new(std::io::stdout()),
        }
    }
}

/// What the console can look at.
#[derive(Clone)]
pub struct ConsoleContext {
    pub engine: Arc<ChainEngine>,
    pub protocol: Arc<ProtocolHandler>,
    pub state: Arc<StateCell>,
    pub shutdown: Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Help,
    Status,
    Height,
    Peers,
    Exit,
}

impl Command {
    const ALL: [(&'static str, Command, &'static str); 5] = [
        ("help", Command::Help, "Show this help"),
        ("status", Command::Status, "Show node status"),
        ("height", Command::Height, "Show blockchain height"),
        ("peers", Command::Peers, "List connected peers"),
        ("exit", Command::Exit, "Shut down the daemon"),
    ];

    fn parse(line: &str) -> Option<Self> {
        let word = line.split_whitespace().next()?;
        Self::ALL
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(word))
            .map(|(_, cmd, _)| *cmd)
    }
}

pub struct Console {
    stop: Arc<AtomicBool>,
    handler: Option<JoinHandle<()>>,
}

impl Console {
    pub fn start(io: ConsoleIo, ctx: ConsoleContext) -> Result<Self, StartupError> {
        let (tx, rx) = mpsc::channel::<String>();
        let ConsoleIo { mut input, mut output } = io;

        std::thread::Builder::new()
            .name("console-input".into())
            .spawn(move || {
                let mut line = String::new();
                loop {
                    line.clear();
                    match input.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            if tx.send(line.trim().to_string()).is_err() {
                                break;
                            }
                        }
                    }
                }
            })
            .map_err(|e| StartupError::Thread("console-input", e))?;

        let stop = Arc::new(AtomicBool::new(false));
        let handler = {
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("console".into())
                .spawn(move || {
                    while !stop.load(Ordering::Acquire) {
                        match rx.recv_timeout(POLL_INTERVAL) {
                            Ok(line) if line.is_empty() => {}
                            Ok(line) => {
                                if let Err(e) = execute(&line, &ctx, &mut output) {
                                    tracing::debug!(error = %e, "Console output failed");
                                }
                            }
                            Err(RecvTimeoutError::Timeout) => {}
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                })
                .map_err(|e| StartupError::Thread("console", e))?
        };

        tracing::debug!("Console started");
        Ok(Self {
            stop,
            handler: Some(handler),
        })
    }

    /// Stop handling commands and join the handler thread.
    pub fn stop(&mut self) -> Result<(), RuntimeFault> {
        self.stop.store(true, Ordering::Release);
        match self.handler.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| RuntimeFault::ThreadPanicked("console")),
            None => Ok(()),
        }
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "Console did not stop cleanly");
        }
    }
}

fn execute(line: &str, ctx: &ConsoleContext, out: &mut dyn Write) -> std::io::Result<()> {
    let Some(command) = Command::parse(line) else {
        writeln!(out, "Unknown command: {line}. Type 'help' for a list of commands.")?;
        return out.flush();
    };

    match command {
        Command::Help => {
            writeln!(out, "Available commands:")?;
            for (name, _, about) in Command::ALL {
                writeln!(out, "  {name:<8} {about}")?;
            }
        }
        Command::Status => {
            let endpoint = ctx.protocol.endpoint();
            writeln!(
                out,
                "state: {}, height: {}, peers: {}, p2p: {}",
                ctx.state.get(),
                ctx.engine.height(),
                ctx.protocol.connections().active_count(),
                endpoint.map_or_else(|| "detached".to_string(), |e| e.local_addr.to_string()),
            )?;
        }
        Command::Height => writeln!(out, "{}", ctx.engine.height())?,
        Command::Peers => {
            let sessions = ctx.protocol.connections().sessions();
            if sessions.is_empty() {
                writeln!(out, "No peers connected")?;
            }
            for session in sessions {
                writeln!(
                    out,
                    "{} {} {} {}s",
                    session.id,
                    session.addr,
                    session.direction.as_str(),
                    session.connected_secs()
                )?;
            }
        }
        Command::Exit => {
            writeln!(out, "Shutting down...")?;
            ctx.shutdown.request_stop(StopCause::Console);
        }
    }
    out.flush()
}
