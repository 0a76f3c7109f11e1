//! `ShareTarget` for a terminal: the payload is printed so it can be
//! copied or piped elsewhere.

use std::io::{self, ErrorKind, Write};
use std::sync::Mutex;

use domains::{DomainError, DomainResult, SharePayload, ShareTarget};
use tracing::debug;

pub struct ConsoleShare<W> {
    out: Mutex<W>,
}

impl ConsoleShare<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleShare<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> ShareTarget for ConsoleShare<W> {
    fn share(&self, payload: &SharePayload) -> DomainResult<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| DomainError::Transient("share output poisoned".into()))?;
        let written = writeln!(out, "{}\n\n{}", payload.title, payload.text).and_then(|()| out.flush());
        match written {
            Ok(()) => Ok(()),
            // Reader went away (e.g. `| head`): the user stopped the share.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("share output closed early");
                Err(DomainError::Cancelled("output closed".into()))
            }
            Err(e) => Err(DomainError::transient(e)),
        }
    }
}
