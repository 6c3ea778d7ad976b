//! ETSI Stream Paced Emitter
//!
//! Pushes a materialized table onto a connection's send queue: the header
//! once, then the rows `loop + 1` times. Every frame is followed by the
//! pacing sleep, which a stop request cuts short. The caller terminates the
//! stream with [`end_of_data`] once it accepts the next command.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::command::Format;
use crate::materialize::{Table, END_OF_DATA};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// WebSocket close code for normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// A frame queued for the connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close(u16),
}

/// Pacing and repetition of one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pacing {
    pub interval: Duration,
    pub loop_count: u32,
    pub format: Format,
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Every pass was sent.
    Completed { rows: u64 },
    /// A stop request ended the stream early.
    Stopped { rows: u64 },
    /// The writer went away; nothing more can be sent.
    Disconnected { rows: u64 },
}

impl EmitOutcome {
    pub fn rows(&self) -> u64 {
        match self {
            Self::Completed { rows } | Self::Stopped { rows } | Self::Disconnected { rows } => *rows,
        }
    }
}

/// Emit `table` with the given pacing.
pub async fn emit(
    table: &Table,
    pacing: Pacing,
    tx: &mpsc::Sender<Outbound>,
    stop: &mut watch::Receiver<bool>,
) -> EmitOutcome {
    let mut rows = 0u64;

    if tx.send(Outbound::Text(table.header_frame(pacing.format))).await.is_err() {
        return EmitOutcome::Disconnected { rows };
    }
    let mut stopped = pause(pacing.interval, stop).await;

    'passes: for _ in 0..=pacing.loop_count {
        for index in 0..table.row_count() {
            if stopped || *stop.borrow() {
                stopped = true;
                break 'passes;
            }
            let Some(frame) = table.row_frame(index, pacing.format) else {
                break;
            };
            if tx.send(Outbound::Text(frame)).await.is_err() {
                return EmitOutcome::Disconnected { rows };
            }
            rows += 1;
            stopped = pause(pacing.interval, stop).await;
        }
    }

    if stopped {
        EmitOutcome::Stopped { rows }
    } else {
        EmitOutcome::Completed { rows }
    }
}

/// Send the terminator frame. Returns false when the writer is gone.
pub async fn end_of_data(tx: &mpsc::Sender<Outbound>) -> bool {
    tx.send(Outbound::Text(END_OF_DATA.to_string())).await.is_ok()
}

/// Sleep for `interval` unless a stop arrives first. Returns true when
/// stopped.
async fn pause(interval: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return true;
    }
    if interval.is_zero() {
        return false;
    }
    let stop_requested = async {
        if stop.wait_for(|stopped| *stopped).await.is_err() {
            // Sender gone: nobody can stop us, so only the sleep counts.
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        _ = tokio::time::sleep(interval) => {}
        _ = stop_requested => {}
    }
    let stopped = *stop.borrow();
    stopped
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> Table {
        Table {
            header: vec!["Time".to_string(), "v".to_string()],
            rows: (0..rows)
                .map(|i| vec![Some(i.to_string()), Some(format!("{}.0", i))])
                .collect(),
        }
    }

    async fn drain(mut rx: mpsc::Receiver<Outbound>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(Outbound::Text(frame)) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_loop_semantics() {
        let (tx, rx) = mpsc::channel(64);
        let (_stop_tx, mut stop) = watch::channel(false);
        let pacing = Pacing {
            loop_count: 2,
            ..Default::default()
        };

        let outcome = emit(&table(3), pacing, &tx, &mut stop).await;
        assert!(end_of_data(&tx).await);
        drop(tx);
        let frames = drain(rx).await;

        assert_eq!(outcome, EmitOutcome::Completed { rows: 9 });
        assert_eq!(frames.len(), 1 + 9 + 1);
        assert_eq!(frames[0], "Time,v");
        assert_eq!(frames.iter().filter(|f| f.as_str() == "Time,v").count(), 1);
        assert_eq!(frames[4], "0,0.0");
        assert_eq!(frames.last().map(String::as_str), Some(END_OF_DATA));
    }

    #[tokio::test]
    async fn test_empty_table() {
        let (tx, rx) = mpsc::channel(8);
        let (_stop_tx, mut stop) = watch::channel(false);

        let outcome = emit(&Table::default(), Pacing::default(), &tx, &mut stop).await;
        drop(tx);

        assert_eq!(outcome.rows(), 0);
        assert_eq!(drain(rx).await, vec!["".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_pacing() {
        let (tx, rx) = mpsc::channel(64);
        let (stop_tx, mut stop) = watch::channel(false);
        let pacing = Pacing {
            interval: Duration::from_secs(60),
            ..Default::default()
        };

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90)).await;
            stop_tx.send_replace(true);
        });
        let outcome = emit(&table(10), pacing, &tx, &mut stop).await;
        stopper.await.unwrap();
        drop(tx);
        let frames = drain(rx).await;

        // header at t=0, row 0 at t=60, stop at t=90
        assert_eq!(outcome, EmitOutcome::Stopped { rows: 1 });
        assert_eq!(frames, vec!["Time,v", "0,0.0"]);
    }

    #[tokio::test]
    async fn test_disconnected_writer() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let (_stop_tx, mut stop) = watch::channel(false);

        let outcome = emit(&table(2), Pacing::default(), &tx, &mut stop).await;
        assert_eq!(outcome, EmitOutcome::Disconnected { rows: 0 });
        assert!(!end_of_data(&tx).await);
    }
}
