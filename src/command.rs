//! Running external engines (pdftoppm, tesseract) with an optional deadline.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{after, never, select, tick};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished child process.
#[derive(Debug)]
pub(crate) struct Captured {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Captured {
    /// Fail with the child's stderr unless it exited successfully.
    pub fn check(self, program: &str) -> Result<Self> {
        if self.status.success() {
            return Ok(self);
        }
        let stderr = String::from_utf8_lossy(&self.stderr);
        Err(Error::Other(format!(
            "{} exited with {}: {}",
            program,
            self.status,
            stderr.trim()
        )))
    }
}

/// Check whether a program can be spawned at all.
pub(crate) fn is_available(program: &str) -> bool {
    Command::new(program)
        .arg("-v")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Spawn `command`, feed it `input`, and wait for it to exit.
///
/// The child is killed once `timeout` elapses. Pipes are drained on helper
/// threads so a chatty child cannot block on a full pipe.
pub(crate) fn run(
    mut command: Command,
    input: Option<Vec<u8>>,
    timeout: Option<Duration>,
) -> Result<Captured> {
    let program = command.get_program().to_string_lossy().to_string();

    command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::Other(format!("{} not found on PATH", program))
        } else {
            Error::Io(e)
        }
    })?;

    let writer = match (input, child.stdin.take()) {
        (Some(data), Some(mut stdin)) => Some(thread::spawn(move || {
            // A child that exits early closes the pipe; that is reported by
            // its exit status, not here.
            let _ = stdin.write_all(&data);
        })),
        _ => None,
    };
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait(&mut child, timeout, &program)?;

    if let Some(writer) = writer {
        let _ = writer.join();
    }

    Ok(Captured {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn wait(child: &mut Child, timeout: Option<Duration>, program: &str) -> Result<ExitStatus> {
    let deadline = timeout.map(after).unwrap_or_else(never);
    let ticker = tick(POLL_INTERVAL);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        select! {
            recv(deadline) -> _ => {
                log::warn!("{} exceeded its deadline, killing it", program);
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout(program.to_string(), timeout.unwrap_or_default()));
            }
            recv(ticker) -> _ => {}
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
