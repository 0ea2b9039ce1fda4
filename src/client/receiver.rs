//! The receive loop and its controller handle.
//!
//! `TelemetryReceiver<D>` owns every piece of mutable stream state (socket,
//! cursor, backoff, recording) and runs on a single task. The controller
//! talks to it only through a [`ReceiverHandle`]: commands go in over a
//! bounded queue, frames come out over a bounded channel, and counters are
//! published through a watch channel.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::command::Command;
use super::config::ReceiverConfig;
use super::dispatch::{DispatchOutcome, FrameDispatcher, FrameReceiver};
use crate::core::{Decryptor, ReceiverError, TransportError};
use crate::stream::{Continuity, Frame, RecordingSink, RecordingSummary, SequenceTracker, StreamStats};
use crate::transport::{HeartbeatScheduler, Reconnector, RecoveryOutcome, TelemetrySocket};

/// The telemetry receive loop.
///
/// Generic over the decryption oracle `D`.
///
/// # Example
///
/// ```no_run
/// use gt7_telemetry::prelude::*;
///
/// # async fn demo() -> Result<(), ReceiverError> {
/// let config = ReceiverConfig::builder()
///     .remote_ip("192.168.1.20".parse().unwrap())
///     .build();
///
/// let handle = TelemetryReceiver::spawn(config, Gt7Decryptor::new());
/// let mut frames = handle.subscribe(64).await?;
///
/// while let Some(frame) = frames.recv().await {
///     println!("packet {}", frame.sequence());
/// }
/// handle.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct TelemetryReceiver<D: Decryptor> {
    config: ReceiverConfig,
    decryptor: D,
    socket: TelemetrySocket,
    reconnector: Reconnector,
    heartbeat: HeartbeatScheduler,
    tracker: SequenceTracker,
    recorder: RecordingSink,
    dispatcher: FrameDispatcher,
    stats: StreamStats,
    commands: mpsc::Receiver<Command>,
    shutdown: oneshot::Receiver<()>,
    stats_tx: watch::Sender<StreamStats>,
}

impl<D: Decryptor> TelemetryReceiver<D> {
    /// Create a receiver and its handle without starting it.
    ///
    /// Commands sent through the handle before [`run`](Self::run) are
    /// queued and applied on the first iterations.
    pub fn new(config: ReceiverConfig, decryptor: D) -> (Self, ReceiverHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (stats_tx, stats_rx) = watch::channel(StreamStats::default());

        let receiver = Self {
            socket: TelemetrySocket::new(config.endpoint()),
            reconnector: Reconnector::new(config.backoff()),
            heartbeat: HeartbeatScheduler::new(config.heartbeat_interval),
            tracker: SequenceTracker::new(),
            recorder: RecordingSink::new(config.recording_dir.clone()),
            dispatcher: FrameDispatcher::new(),
            stats: StreamStats::default(),
            commands: command_rx,
            shutdown: shutdown_rx,
            stats_tx,
            decryptor,
            config,
        };

        let handle = ReceiverHandle {
            commands: command_tx,
            shutdown: Some(shutdown_tx),
            stats: stats_rx,
            task: None,
        };

        (receiver, handle)
    }

    /// Create a receiver and run it on a new tokio task.
    pub fn spawn(config: ReceiverConfig, decryptor: D) -> ReceiverHandle {
        let (receiver, mut handle) = Self::new(config, decryptor);
        handle.task = Some(tokio::spawn(receiver.run()));
        handle
    }

    /// Run until the handle stops the loop or is dropped.
    ///
    /// Transport, decryption and recording failures are logged and
    /// recovered from; they never end the loop.
    pub async fn run(mut self) {
        info!(
            remote = %self.config.remote_send_addr(),
            recv_port = self.config.recv_port,
            "telemetry receiver starting"
        );
        self.connect().await;
        self.publish();

        loop {
            match self.shutdown.try_recv() {
                Err(oneshot::error::TryRecvError::Empty) => {}
                _ => break,
            }

            if let Ok(command) = self.commands.try_recv() {
                self.apply(command);
            }

            if self.reconnector.is_recovering() {
                if let Some(delay) = self.recover().await {
                    self.publish();
                    tokio::select! {
                        _ = &mut self.shutdown => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            } else {
                let received = tokio::select! {
                    _ = &mut self.shutdown => break,
                    received = self.socket.receive() => received,
                };
                self.on_received(received).await;
            }

            self.publish();
        }

        self.finish();
    }

    async fn connect(&mut self) {
        match self.socket.bind().await {
            Ok(addr) => {
                info!(%addr, "listening for telemetry");
                if let Err(e) = self.socket.send_heartbeat().await {
                    self.reconnector.on_fault(&e);
                }
            }
            Err(e) => self.reconnector.on_fault(&e),
        }
        self.heartbeat.mark();
    }

    /// One recovery attempt. Returns how long to wait if it failed.
    async fn recover(&mut self) -> Option<Duration> {
        self.stats.recoveries += 1;
        let outcome = self.reconnector.recover(&mut self.socket).await;
        self.heartbeat.mark();

        match outcome {
            RecoveryOutcome::Resumed => None,
            RecoveryOutcome::Rebound(_) => {
                self.stats.rebinds += 1;
                None
            }
            RecoveryOutcome::Failed { retry_in } => Some(retry_in),
        }
    }

    async fn on_received(&mut self, received: Result<(Vec<u8>, SocketAddr), TransportError>) {
        let (datagram, from) = match received {
            Ok(received) => received,
            Err(e) => {
                if e.is_timeout() {
                    self.stats.timeouts += 1;
                }
                self.reconnector.on_fault(&e);
                return;
            }
        };

        if self.socket.is_from_remote(from) {
            self.stats.datagrams += 1;
            self.reconnector.on_exchange();
            self.handle_datagram(datagram);
        } else {
            // Ignored, but still a successful receive for keep-alive.
            self.stats.foreign_datagrams += 1;
            trace!(%from, "ignoring datagram from unexpected source");
        }

        self.heartbeat_if_due().await;
    }

    /// Send the scheduled heartbeat; a failure starts recovery.
    async fn heartbeat_if_due(&mut self) {
        if !self.heartbeat.is_due() {
            return;
        }
        let sent = self.socket.send_heartbeat().await;
        self.heartbeat.mark();
        if let Err(e) = sent {
            self.reconnector.on_fault(&e);
        }
    }

    fn handle_datagram(&mut self, raw: Vec<u8>) {
        if self.recorder.is_recording() {
            match self.recorder.write(&raw) {
                Ok(()) => self.stats.bytes_recorded += raw.len() as u64,
                Err(e) => error!(error = %e, "recording write failed, session closed"),
            }
        }

        let frame = match self
            .decryptor
            .decrypt(&raw)
            .and_then(|payload| Frame::new(payload, raw))
        {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.decrypt_failures += 1;
                debug!(error = %e, "skipping undecodable datagram");
                return;
            }
        };

        let sequence = frame.sequence();
        let verdict = self.tracker.observe(sequence);

        if let Some(previous) = verdict.time_travel {
            self.stats.time_travels += 1;
            info!(previous, sequence, "sequence went backwards, resetting cursor");
        }

        match verdict.accepted {
            None => {
                self.stats.stale_frames += 1;
                trace!(sequence, "stale frame");
                return;
            }
            Some(Continuity::Gap(lost)) => {
                self.stats.loss_events += 1;
                self.stats.packets_lost += lost;
                warn!(gap = lost, sequence, "packets lost");
            }
            Some(Continuity::Primed) => debug!(sequence, "first frame"),
            Some(Continuity::InOrder | Continuity::Repeat) => {}
        }

        match self.dispatcher.dispatch(frame) {
            DispatchOutcome::Delivered => self.stats.frames_dispatched += 1,
            _ => self.stats.frames_dropped += 1,
        }
    }

    fn apply(&mut self, command: Command) {
        debug!(command = command.name(), "applying command");
        match command {
            Command::StartRecording(prefix) => match self.recorder.start(&prefix) {
                Ok((path, previous)) => {
                    if let Some(summary) = previous {
                        log_summary(&summary);
                    }
                    info!(path = %path.display(), "recording started");
                }
                Err(e) => error!(error = %e, "failed to start recording"),
            },
            Command::StopRecording => match self.recorder.stop() {
                Ok(Some(summary)) => log_summary(&summary),
                Ok(None) => debug!("no recording in progress"),
                Err(e) => error!(error = %e, "failed to close recording"),
            },
            Command::SetIgnoreSequence(ignore) => {
                self.tracker.set_ignore_sequence(ignore);
                info!(ignore, "sequence enforcement changed");
            }
            Command::AttachConsumer(consumer) => self.dispatcher.attach(consumer),
            Command::DetachConsumer => self.dispatcher.detach(),
        }
    }

    fn publish(&self) {
        let stats = self.stats;
        self.stats_tx.send_if_modified(|current| {
            if *current == stats {
                return false;
            }
            *current = stats;
            true
        });
    }

    fn finish(mut self) {
        match self.recorder.stop() {
            Ok(Some(summary)) => log_summary(&summary),
            Ok(None) => {}
            Err(e) => error!(error = %e, "failed to close recording"),
        }
        self.socket.close();
        self.publish();
        info!(
            datagrams = self.stats.datagrams,
            dispatched = self.stats.frames_dispatched,
            lost = self.stats.packets_lost,
            "telemetry receiver stopped"
        );
    }
}

fn log_summary(summary: &RecordingSummary) {
    info!(
        path = %summary.path.display(),
        datagrams = summary.datagrams,
        bytes = summary.bytes,
        "recording closed"
    );
}

/// Controller side of a [`TelemetryReceiver`].
///
/// Dropping the handle stops the loop.
#[derive(Debug)]
pub struct ReceiverHandle {
    commands: mpsc::Sender<Command>,
    shutdown: Option<oneshot::Sender<()>>,
    stats: watch::Receiver<StreamStats>,
    task: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    async fn send(&self, command: Command) -> Result<(), ReceiverError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ReceiverError::Stopped)
    }

    /// Start recording raw datagrams to a new file named after `prefix`.
    pub async fn start_recording(&self, prefix: impl Into<String>) -> Result<(), ReceiverError> {
        self.send(Command::StartRecording(prefix.into())).await
    }

    /// Close the current recording.
    pub async fn stop_recording(&self) -> Result<(), ReceiverError> {
        self.send(Command::StopRecording).await
    }

    /// Dispatch frames regardless of sequence order.
    pub async fn set_ignore_sequence(&self, ignore: bool) -> Result<(), ReceiverError> {
        self.send(Command::SetIgnoreSequence(ignore)).await
    }

    /// Deliver accepted frames to `consumer`, replacing any previous one.
    pub async fn attach_consumer(&self, consumer: mpsc::Sender<Frame>) -> Result<(), ReceiverError> {
        self.send(Command::AttachConsumer(consumer)).await
    }

    /// Stop delivering frames.
    pub async fn detach_consumer(&self) -> Result<(), ReceiverError> {
        self.send(Command::DetachConsumer).await
    }

    /// Attach a new bounded frame channel and return its receiving end.
    pub async fn subscribe(&self, capacity: usize) -> Result<FrameReceiver, ReceiverError> {
        let (tx, rx) = FrameReceiver::channel(capacity);
        self.attach_consumer(tx).await?;
        Ok(rx)
    }

    /// Latest published counters.
    pub fn stats(&self) -> StreamStats {
        *self.stats.borrow()
    }

    /// Watch channel of counters, updated after every loop iteration.
    pub fn watch_stats(&self) -> watch::Receiver<StreamStats> {
        self.stats.clone()
    }

    /// Check if the loop is still running.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Stop the loop and wait for it to close the recording and socket.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "receiver task failed");
            }
        }
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CryptoError, HEARTBEAT, SEQUENCE_OFFSET};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tempfile::TempDir;
    use tokio::net::UdpSocket;

    const WAIT: Duration = Duration::from_secs(5);

    fn passthrough(raw: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match raw.first() {
            Some(0xFF) => Err(CryptoError::DecryptionFailed),
            _ => Ok(raw.to_vec()),
        }
    }

    fn datagram(seq: i32) -> Vec<u8> {
        let mut raw = vec![0u8; 0x80];
        raw[SEQUENCE_OFFSET..SEQUENCE_OFFSET + 4].copy_from_slice(&seq.to_le_bytes());
        raw
    }

    /// Loopback stand-in for the console.
    struct Console {
        socket: UdpSocket,
        peer: Option<SocketAddr>,
    }

    impl Console {
        async fn new() -> Self {
            Self {
                socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
                peer: None,
            }
        }

        fn config(&self) -> ReceiverConfig {
            ReceiverConfig::builder()
                .remote_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
                .bind_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
                .send_port(self.socket.local_addr().unwrap().port())
                .recv_port(0)
                .recv_timeout(Duration::from_millis(500))
                .backoff(Duration::from_millis(20), Duration::from_millis(100))
                .build()
        }

        async fn expect_heartbeat(&mut self) -> SocketAddr {
            let mut buf = [0u8; 64];
            let (len, from) = tokio::time::timeout(WAIT, self.socket.recv_from(&mut buf))
                .await
                .expect("no heartbeat")
                .unwrap();
            assert_eq!(&buf[..len], HEARTBEAT);
            self.peer = Some(from);
            from
        }

        async fn send(&self, data: &[u8]) {
            self.socket.send_to(data, self.peer.unwrap()).await.unwrap();
        }

        async fn send_sequence(&self, seqs: &[i32]) {
            for &seq in seqs {
                self.send(&datagram(seq)).await;
            }
        }

        /// Count heartbeats arriving within `window`.
        async fn count_heartbeats(&self, window: Duration) -> usize {
            let deadline = tokio::time::Instant::now() + window;
            let mut buf = [0u8; 64];
            let mut count = 0;
            while let Ok(Ok((len, _))) =
                tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await
            {
                assert_eq!(&buf[..len], HEARTBEAT);
                count += 1;
            }
            count
        }
    }

    async fn wait_for(handle: &ReceiverHandle, done: impl Fn(&StreamStats) -> bool) -> StreamStats {
        let mut rx = handle.watch_stats();
        tokio::time::timeout(WAIT, async {
            loop {
                let stats = *rx.borrow_and_update();
                if done(&stats) {
                    return stats;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("stats condition not reached")
    }

    async fn collect(frames: &mut FrameReceiver, count: usize) -> Vec<i32> {
        let mut seqs = Vec::new();
        for _ in 0..count {
            let frame = tokio::time::timeout(WAIT, frames.recv()).await.unwrap().unwrap();
            seqs.push(frame.sequence());
        }
        seqs
    }

    #[tokio::test]
    async fn test_frames_dispatched_in_order() {
        let mut console = Console::new().await;
        let (receiver, handle) = TelemetryReceiver::new(console.config(), passthrough);
        let mut frames = handle.subscribe(16).await.unwrap();
        let task = tokio::spawn(receiver.run());

        console.expect_heartbeat().await;
        console.send_sequence(&[100, 101, 102]).await;

        assert_eq!(collect(&mut frames, 3).await, vec![100, 101, 102]);
        let stats = wait_for(&handle, |s| s.frames_dispatched == 3).await;
        assert_eq!(stats.packets_lost, 0);
        assert_eq!(stats.datagrams, 3);

        handle.stop().await;
        task.await.unwrap();
        assert!(frames.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_loss_time_travel_and_stale() {
        let mut console = Console::new().await;
        let (receiver, handle) = TelemetryReceiver::new(console.config(), passthrough);
        let mut frames = handle.subscribe(16).await.unwrap();
        let task = tokio::spawn(receiver.run());

        console.expect_heartbeat().await;
        console.send_sequence(&[10, 11, 14, 15, 3, 4, 4, 5]).await;

        assert_eq!(collect(&mut frames, 7).await, vec![10, 11, 14, 15, 3, 4, 5]);
        let stats = wait_for(&handle, |s| s.datagrams == 8).await;
        assert_eq!(stats.loss_events, 1);
        assert_eq!(stats.packets_lost, 2);
        assert_eq!(stats.time_travels, 1);
        assert_eq!(stats.stale_frames, 1);

        handle.stop().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_datagrams_are_skipped() {
        let mut console = Console::new().await;
        let (receiver, handle) = TelemetryReceiver::new(console.config(), passthrough);
        let mut frames = handle.subscribe(16).await.unwrap();
        let task = tokio::spawn(receiver.run());

        console.expect_heartbeat().await;
        console.send(&[0xFF; 0x80]).await;
        console.send(&[0u8; 10]).await;
        console.send_sequence(&[1]).await;

        assert_eq!(collect(&mut frames, 1).await, vec![1]);
        let stats = wait_for(&handle, |s| s.datagrams == 3).await;
        assert_eq!(stats.decrypt_failures, 2);
        assert_eq!(stats.frames_dispatched, 1);

        handle.stop().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_ignore_sequence_dispatches_repeats() {
        let mut console = Console::new().await;
        let (receiver, handle) = TelemetryReceiver::new(console.config(), passthrough);
        // One command per iteration: the first datagram arrives before the
        // consumer is attached.
        handle.set_ignore_sequence(true).await.unwrap();
        let mut frames = handle.subscribe(16).await.unwrap();
        let task = tokio::spawn(receiver.run());

        console.expect_heartbeat().await;
        console.send_sequence(&[1, 7, 7, 3]).await;

        assert_eq!(collect(&mut frames, 3).await, vec![7, 7, 3]);
        let stats = wait_for(&handle, |s| s.datagrams == 4).await;
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.stale_frames, 0);
        assert_eq!(stats.packets_lost, 5);
        assert_eq!(stats.time_travels, 1);

        handle.stop().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_consumer_drops_frames() {
        let mut console = Console::new().await;
        let handle = TelemetryReceiver::spawn(console.config(), passthrough);

        console.expect_heartbeat().await;
        console.send_sequence(&[1, 2, 3]).await;

        let stats = wait_for(&handle, |s| s.datagrams == 3).await;
        assert_eq!(stats.frames_dropped, 3);
        assert_eq!(stats.frames_dispatched, 0);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_recording_captures_raw_datagrams() {
        let dir = TempDir::new().unwrap();
        let mut console = Console::new().await;
        let mut config = console.config();
        config.recording_dir = dir.path().to_path_buf();

        let (receiver, handle) = TelemetryReceiver::new(config, passthrough);
        handle.start_recording("sessA").await.unwrap();
        let task = tokio::spawn(receiver.run());

        console.expect_heartbeat().await;
        console.send(&[0xFF; 0x80]).await;
        console.send_sequence(&[1, 2]).await;
        let stats = wait_for(&handle, |s| s.datagrams == 3).await;
        assert_eq!(stats.bytes_recorded, 3 * 0x80);

        // Stopping the loop closes the open session.
        handle.stop().await;
        task.await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sessArecording-"));
        assert!(name.ends_with(".gt7"));

        let mut expected = vec![0xFF; 0x80];
        expected.extend(datagram(1));
        expected.extend(datagram(2));
        assert_eq!(std::fs::read(&entries[0]).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_timeout_resends_heartbeat() {
        let mut console = Console::new().await;
        let mut config = console.config();
        config.recv_timeout = Duration::from_millis(100);
        let handle = TelemetryReceiver::spawn(config, passthrough);

        let first = console.expect_heartbeat().await;
        // Nothing sent: the loop times out and probes on the same socket.
        let second = console.expect_heartbeat().await;
        assert_eq!(first, second);

        let stats = wait_for(&handle, |s| s.recoveries >= 1).await;
        assert!(stats.timeouts >= 1);
        assert_eq!(stats.rebinds, 0);

        console.send_sequence(&[9]).await;
        wait_for(&handle, |s| s.datagrams == 1).await;
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_commands_fail_after_stop() {
        let console = Console::new().await;
        let (receiver, handle) = TelemetryReceiver::new(console.config(), passthrough);
        drop(receiver);

        assert!(!handle.is_running());
        assert!(matches!(
            handle.stop_recording().await,
            Err(ReceiverError::Stopped)
        ));
    }

    /// Send 32 datagrams from `source` to `peer`, one every 25ms.
    fn stream_from(source: &'static str, peer: SocketAddr) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let socket = UdpSocket::bind(source).await.unwrap();
            for seq in 0..32 {
                socket.send_to(&datagram(seq), peer).await.unwrap();
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        })
    }

    #[tokio::test]
    async fn test_heartbeats_scheduled_while_streaming() {
        let mut console = Console::new().await;
        let config = ReceiverConfig {
            heartbeat_interval: Duration::from_millis(100),
            recv_timeout: Duration::from_secs(5),
            ..console.config()
        };
        let handle = TelemetryReceiver::spawn(config, passthrough);
        let peer = console.expect_heartbeat().await;

        let streamer = stream_from("127.0.0.1:0", peer);
        let heartbeats = console.count_heartbeats(Duration::from_millis(700)).await;
        streamer.await.unwrap();

        assert!(heartbeats >= 3, "only {heartbeats} heartbeats");
        let stats = handle.stats();
        assert!(stats.datagrams > 0);
        assert_eq!(stats.timeouts, 0);
        assert_eq!(stats.recoveries, 0);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_foreign_traffic_keeps_heartbeats_going() {
        let mut console = Console::new().await;
        let config = ReceiverConfig {
            heartbeat_interval: Duration::from_millis(100),
            recv_timeout: Duration::from_secs(5),
            ..console.config()
        };
        let handle = TelemetryReceiver::spawn(config, passthrough);
        let peer = console.expect_heartbeat().await;

        // Another loopback address: not the console.
        let streamer = stream_from("127.0.0.2:0", peer);
        let heartbeats = console.count_heartbeats(Duration::from_millis(700)).await;
        streamer.await.unwrap();

        assert!(heartbeats >= 3, "only {heartbeats} heartbeats");
        let stats = handle.stats();
        assert!(stats.foreign_datagrams > 0);
        assert_eq!(stats.datagrams, 0);
        assert_eq!(stats.timeouts, 0);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_failed_scheduled_heartbeat_starts_recovery() {
        // Sending to port 0 always fails.
        let config = ReceiverConfig::builder()
            .remote_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .bind_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .send_port(0)
            .recv_port(0)
            .heartbeat_interval(Duration::ZERO)
            .build();
        let (mut receiver, _handle) = TelemetryReceiver::new(config, passthrough);
        receiver.socket.bind().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!receiver.reconnector.is_recovering());

        let from: SocketAddr = "10.0.0.9:4000".parse().unwrap();
        receiver.on_received(Ok((datagram(1), from))).await;

        assert_eq!(receiver.stats.foreign_datagrams, 1);
        assert!(receiver.reconnector.is_recovering());
    }

    #[tokio::test]
    async fn test_rebind_once_port_frees_up() {
        let mut console = Console::new().await;
        let blocker = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = blocker.local_addr().unwrap().port();
        let config = ReceiverConfig {
            recv_port: port,
            bind_attempts: 1,
            ..console.config()
        };
        let handle = TelemetryReceiver::spawn(config, passthrough);

        // The initial bind fails; each recovery retries it after a backoff.
        let stats = wait_for(&handle, |s| s.recoveries >= 2).await;
        assert_eq!(stats.rebinds, 0);
        drop(blocker);

        let peer = console.expect_heartbeat().await;
        assert_eq!(peer.port(), port);
        wait_for(&handle, |s| s.rebinds == 1).await;

        console.send_sequence(&[1]).await;
        wait_for(&handle, |s| s.datagrams == 1).await;
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_interrupts_backoff() {
        let console = Console::new().await;
        let config = ReceiverConfig {
            bind_attempts: 0,
            backoff_min: Duration::from_secs(30),
            backoff_max: Duration::from_secs(30),
            ..console.config()
        };
        let handle = TelemetryReceiver::spawn(config, passthrough);
        wait_for(&handle, |s| s.recoveries == 1).await;

        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop waited out the backoff");
    }

    #[tokio::test]
    async fn test_stop_interrupts_receive() {
        let dir = TempDir::new().unwrap();
        let mut console = Console::new().await;
        let config = ReceiverConfig {
            recv_timeout: Duration::from_secs(30),
            recording_dir: dir.path().to_path_buf(),
            ..console.config()
        };
        let (receiver, handle) = TelemetryReceiver::new(config, passthrough);
        handle.start_recording("cut").await.unwrap();
        let task = tokio::spawn(receiver.run());

        console.expect_heartbeat().await;
        console.send_sequence(&[1]).await;
        wait_for(&handle, |s| s.datagrams == 1).await;

        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop waited out the receive timeout");
        task.await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read(&files[0]).unwrap(), datagram(1));
    }
}
