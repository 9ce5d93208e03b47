use std::{fmt, future::Future, io::Write, time::Duration};

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use wave_format::AudioFormatDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub descriptor: AudioFormatDescriptor,
    /// Only set when device switches should be reported.
    pub device_id: Option<String>,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor)?;
        if let Some(id) = &self.device_id {
            write!(f, " | Device: {}", id)?;
        }
        Ok(())
    }
}

pub trait FormatSource {
    fn current(&mut self) -> Result<Observation>;
}

pub enum Outcome<'a> {
    Changed(&'a Observation),
    Unchanged,
    Failed(anyhow::Error),
}

pub struct Watcher<S> {
    source: S,
    last: Option<Observation>,
}

impl<S: FormatSource> Watcher<S> {
    pub fn new(source: S) -> Self {
        Self { source, last: None }
    }

    /// Reads the source once and compares against the last successful read.
    /// Failures leave the remembered observation untouched.
    pub fn poll(&mut self) -> Outcome<'_> {
        match self.source.current() {
            Ok(obs) if self.last.as_ref() == Some(&obs) => Outcome::Unchanged,
            Ok(obs) => Outcome::Changed(self.last.insert(obs)),
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// Polls `watcher` every `interval` until `shutdown` resolves, writing a line
/// to `out` for every change.
pub async fn run<S, F, W>(
    watcher: &mut Watcher<S>,
    interval: Duration,
    shutdown: F,
    out: &mut W,
) -> Result<()>
where
    S: FormatSource,
    F: Future<Output = ()>,
    W: Write,
{
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                writeln!(out, "\nStopped.")?;
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        match watcher.poll() {
            Outcome::Changed(obs) => {
                tracing::debug!(?obs.descriptor, "Mix format changed");
                writeln!(out, "{} | Ctrl+C to stop.", obs)?;
                out.flush()?;
            }
            Outcome::Unchanged => {}
            Outcome::Failed(e) => {
                tracing::error!(?e, "Failed to read format");
            }
        }
    }
}
