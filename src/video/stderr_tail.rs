use std::io::{ErrorKind, Read};
use std::process::ChildStderr;
use std::thread::JoinHandle;

/// Bytes of diagnostics kept from the end of a child's stderr
const TAIL_LIMIT: usize = 8 * 1024;

/// Drains a child's stderr on a background thread while frames flow through
/// its stdin/stdout, so the child never stalls on a full stderr pipe. Only the
/// last [`TAIL_LIMIT`] bytes are kept for error messages.
pub(crate) struct StderrTail {
    handle: Option<JoinHandle<Vec<u8>>>,
}

impl StderrTail {
    pub(crate) fn spawn(stderr: Option<ChildStderr>) -> Self {
        let handle = stderr.map(|mut pipe| {
            std::thread::spawn(move || {
                let mut tail = Vec::new();
                let mut chunk = [0u8; 4096];

                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => {
                            tail.extend_from_slice(&chunk[..n]);
                            if tail.len() > TAIL_LIMIT {
                                let excess = tail.len() - TAIL_LIMIT;
                                tail.drain(..excess);
                            }
                        }
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }

                tail
            })
        });

        Self { handle }
    }

    /// Wait for the child to close stderr and return the kept text. Call only
    /// once the child has exited.
    pub(crate) fn collect(&mut self) -> String {
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
            .unwrap_or_default()
    }
}
