use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use crate::transport::SerialTransport;

/// Undrained write outcomes kept before newer ones are dropped
pub const RESULT_BACKLOG: usize = 64;

enum Command {
    Frame(Vec<u8>),
    Stop,
}

/// Background writer: a worker thread owns the transport and writes encoded
/// frames in the order they were queued, reporting each outcome on a
/// second queue.
pub struct FrameSender {
    sender: SyncSender<Command>,
    results: Receiver<bool>,
    frames_sent: Arc<AtomicU64>,
    worker_handle: Option<thread::JoinHandle<SerialTransport>>,
}

impl FrameSender {
    /// Start a worker for an (ideally already open) transport
    pub fn new(transport: SerialTransport, queue_depth: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel::<Command>(queue_depth.max(1));
        let (result_tx, results) = mpsc::sync_channel::<bool>(RESULT_BACKLOG);
        let frames_sent = Arc::new(AtomicU64::new(0));

        let worker_frames_sent = Arc::clone(&frames_sent);
        let worker_handle = thread::spawn(move || {
            worker_thread(transport, receiver, result_tx, worker_frames_sent)
        });

        FrameSender {
            sender,
            results,
            frames_sent,
            worker_handle: Some(worker_handle),
        }
    }

    /// Queue a frame, blocking while the queue is full
    pub fn send_frame(&self, frame: Vec<u8>) -> bool {
        self.sender.send(Command::Frame(frame)).is_ok()
    }

    /// Queue a frame unless the queue is full (skip-ahead)
    pub fn try_send_frame(&self, frame: Vec<u8>) -> bool {
        match self.sender.try_send(Command::Frame(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("frame queue full, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Per-frame write outcomes, in queue order
    ///
    /// At most [`RESULT_BACKLOG`] undrained outcomes are kept; later ones are
    /// dropped until the caller drains this queue. `frames_sent` still counts
    /// every delivered frame.
    pub fn results(&self) -> &Receiver<bool> {
        &self.results
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Stop after the frames already queued and hand the transport back
    pub fn stop(&mut self) -> Option<SerialTransport> {
        let handle = self.worker_handle.take()?;
        let _ = self.sender.send(Command::Stop);
        match handle.join() {
            Ok(transport) => Some(transport),
            Err(_) => {
                log::error!("frame sender worker panicked");
                None
            }
        }
    }
}

impl Drop for FrameSender {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker thread function - blocks on the queue, writes each frame, checks for stop between writes
fn worker_thread(
    mut transport: SerialTransport,
    receiver: Receiver<Command>,
    results: SyncSender<bool>,
    frames_sent: Arc<AtomicU64>,
) -> SerialTransport {
    while let Ok(command) = receiver.recv() {
        match command {
            Command::Frame(frame) => {
                let ok = transport.write(&frame);
                if ok {
                    frames_sent.fetch_add(1, Ordering::Relaxed);
                }
                if let Err(TrySendError::Full(_)) = results.try_send(ok) {
                    log::debug!("result queue full, dropping outcome");
                }
            }
            Command::Stop => break,
        }
    }

    log::debug!("frame sender for {} stopped", transport.port_name());
    transport
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockPorts;
    use crate::transport::ConfigFailurePolicy;

    fn open_transport(ports: &MockPorts) -> SerialTransport {
        let mut transport = SerialTransport::new(Box::new(ports.clone()), ConfigFailurePolicy::Lenient);
        transport.open("mock0", 115_200).unwrap();
        transport
    }

    #[test]
    fn frames_are_written_in_order() {
        let ports = MockPorts::new();
        let mut sender = FrameSender::new(open_transport(&ports), 4);
        for i in 0..10u8 {
            assert!(sender.send_frame(vec![i; 3]));
        }
        let results: Vec<bool> = (0..10).map(|_| sender.results().recv().unwrap()).collect();
        assert!(results.iter().all(|ok| *ok));

        let transport = sender.stop().unwrap();
        assert!(transport.is_open());
        assert_eq!(sender.frames_sent(), 10);
        let frames = ports.frames();
        assert_eq!(frames.len(), 10);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame, &vec![i as u8; 3]);
        }
    }

    #[test]
    fn failures_are_reported() {
        let ports = MockPorts::new();
        let transport = SerialTransport::new(Box::new(ports.clone()), ConfigFailurePolicy::Lenient);
        let sender = FrameSender::new(transport, 1);
        assert!(sender.send_frame(vec![1, 2, 3]));
        assert!(!sender.results().recv().unwrap());
        assert_eq!(sender.frames_sent(), 0);
        assert_eq!(ports.write_calls(), 0);
    }

    #[test]
    fn undrained_results_are_bounded() {
        let ports = MockPorts::new();
        let mut sender = FrameSender::new(open_transport(&ports), 8);
        let total = RESULT_BACKLOG + 36;
        for i in 0..total {
            assert!(sender.send_frame(vec![i as u8]));
        }
        sender.stop();

        assert_eq!(sender.frames_sent(), total as u64);
        assert_eq!(ports.frames().len(), total);
        assert_eq!(sender.results().try_iter().count(), RESULT_BACKLOG);
    }

    #[test]
    fn stop_is_idempotent() {
        let ports = MockPorts::new();
        let mut sender = FrameSender::new(open_transport(&ports), 1);
        assert!(sender.stop().is_some());
        assert!(sender.stop().is_none());
        assert!(!sender.send_frame(vec![0]));
        assert!(!sender.try_send_frame(vec![0]));
    }
}
