//! Channel pump: a dedicated OS thread that owns the blocking channel.
//!
//! The thread alternates between draining queued writes and a short
//! bounded read, forwarding chunks into a tokio channel consumed by the
//! session engine. Dropping the `ChannelHandle` ends the thread and
//! closes the channel.

use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ChannelRead, ShellChannel};

/// Data flowing from the pump to the session engine
#[derive(Debug)]
pub enum ChunkEvent {
    Data(Vec<u8>),
    Closed,
}

/// Write side of a pumped channel. Writes are fire-and-forget; a failed
/// delivery surfaces as `ChunkEvent::Closed` on the read side.
pub struct ChannelHandle {
    write_tx: std_mpsc::Sender<Vec<u8>>,
}

impl ChannelHandle {
    /// Queue bytes for delivery. Returns false when the pump has exited.
    pub fn write(&self, bytes: Vec<u8>) -> bool {
        self.write_tx.send(bytes).is_ok()
    }
}

/// Start the pump thread for `channel`, polling at `poll_interval`.
pub fn spawn_pump(
    mut channel: Box<dyn ShellChannel>,
    poll_interval: Duration,
) -> (ChannelHandle, mpsc::Receiver<ChunkEvent>) {
    let (write_tx, write_rx) = std_mpsc::channel::<Vec<u8>>();
    let (data_tx, data_rx) = mpsc::channel::<ChunkEvent>(64);

    thread::spawn(move || {
        loop {
            // Drain queued writes before the next poll
            loop {
                match write_rx.try_recv() {
                    Ok(bytes) => {
                        if let Err(e) = channel.write(&bytes) {
                            warn!("Channel write failed: {e}");
                            let _ = data_tx.blocking_send(ChunkEvent::Closed);
                            channel.close();
                            return;
                        }
                    }
                    Err(std_mpsc::TryRecvError::Empty) => break,
                    Err(std_mpsc::TryRecvError::Disconnected) => {
                        debug!("Channel handle dropped; closing channel");
                        channel.close();
                        return;
                    }
                }
            }

            match channel.read_chunk(poll_interval) {
                Ok(ChannelRead::Data(bytes)) => {
                    if data_tx.blocking_send(ChunkEvent::Data(bytes)).is_err() {
                        channel.close();
                        return;
                    }
                }
                Ok(ChannelRead::Empty) => {}
                Ok(ChannelRead::Closed) => {
                    let _ = data_tx.blocking_send(ChunkEvent::Closed);
                    channel.close();
                    return;
                }
                Err(e) => {
                    warn!("Channel read failed: {e}");
                    let _ = data_tx.blocking_send(ChunkEvent::Closed);
                    channel.close();
                    return;
                }
            }
        }
    });

    (ChannelHandle { write_tx }, data_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use std::collections::VecDeque;

    /// Scripted channel: replays canned reads, records writes
    struct ScriptedChannel {
        reads: VecDeque<ChannelRead>,
    }

    impl ShellChannel for ScriptedChannel {
        fn read_chunk(&mut self, timeout: Duration) -> Result<ChannelRead, ChannelError> {
            match self.reads.pop_front() {
                Some(read) => Ok(read),
                None => {
                    // Honor the poll contract: no data means waiting out the timeout
                    thread::sleep(timeout);
                    Ok(ChannelRead::Empty)
                }
            }
        }

        fn write(&mut self, _bytes: &[u8]) -> Result<(), ChannelError> {
            Ok(())
        }

        fn close(&mut self) {}
    }

    #[tokio::test]
    async fn forwards_data_then_closed() {
        let channel = Box::new(ScriptedChannel {
            reads: VecDeque::from([
                ChannelRead::Data(b"hello".to_vec()),
                ChannelRead::Empty,
                ChannelRead::Data(b" world".to_vec()),
                ChannelRead::Closed,
            ]),
        });

        let (_handle, mut rx) = spawn_pump(channel, Duration::from_millis(1));

        let mut collected = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                ChunkEvent::Data(bytes) => collected.extend(bytes),
                ChunkEvent::Closed => break,
            }
        }
        assert_eq!(collected, b"hello world");
    }

    #[tokio::test]
    async fn dropping_handle_stops_pump() {
        let channel = Box::new(ScriptedChannel {
            reads: VecDeque::new(),
        });
        let (handle, mut rx) = spawn_pump(channel, Duration::from_millis(1));
        drop(handle);

        // Pump exits without emitting Closed; receiver just ends
        assert!(rx.recv().await.is_none());
    }
}
