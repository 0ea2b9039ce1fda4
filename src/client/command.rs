//! Control commands for a running receiver.

use tokio::sync::mpsc;

use crate::stream::Frame;

/// A request applied by the receive loop between datagrams.
///
/// Commands are applied in the order they were sent, at most one per loop
/// iteration.
#[derive(Debug)]
pub enum Command {
    /// Open a recording session with this file name prefix.
    StartRecording(String),
    /// Close the open recording session.
    StopRecording,
    /// Toggle dispatch of out-of-order frames.
    SetIgnoreSequence(bool),
    /// Deliver accepted frames to this channel.
    AttachConsumer(mpsc::Sender<Frame>),
    /// Stop delivering frames.
    DetachConsumer,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartRecording(_) => "start_recording",
            Command::StopRecording => "stop_recording",
            Command::SetIgnoreSequence(_) => "set_ignore_sequence",
            Command::AttachConsumer(_) => "attach_consumer",
            Command::DetachConsumer => "detach_consumer",
        }
    }
}
