//! Driver spawns and manages the stream processing task

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::controller::StreamController;
use crate::handle::{StreamEvent, StreamHandle};
use crate::source::FrameSource;
use crate::types::{BufferStatus, PerformanceMetrics, TargetFrameRate};
use crate::StreamConfig;

/// Requests served by the driver task
pub(crate) enum Command {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    ClearBuffer(oneshot::Sender<()>),
    SetTargetFrameRate(u32, oneshot::Sender<TargetFrameRate>),
    Status(oneshot::Sender<BufferStatus>),
    Metrics(oneshot::Sender<PerformanceMetrics>),
}

/// Driver spawns and manages the stream processing task
///
/// The spawned task owns both the frame source and the controller. Frames
/// and commands are handled one at a time on that task, so the buffer,
/// counters and lifecycle state are never touched concurrently.
pub struct StreamDriver;

impl StreamDriver {
    /// Spawn the processing task for `source` and `controller`.
    ///
    /// The controller keeps whatever state it was given; call
    /// [`StreamHandle::start`] to begin an activation. The task ends when
    /// cancelled or when every handle has been dropped.
    pub fn spawn<S>(source: S, controller: StreamController, config: &StreamConfig) -> StreamHandle
    where
        S: FrameSource,
    {
        let (command_tx, command_rx) = mpsc::channel(config.command_queue.max(1));
        let (event_tx, event_rx) = watch::channel(StreamEvent::StateChanged(controller.state()));
        let cancel = CancellationToken::new();
        let registry = controller.registry();

        let task = DriverTask {
            source,
            controller,
            commands: command_rx,
            events: event_tx,
            cancel: cancel.clone(),
            config: config.clone(),
        };

        tokio::spawn(task.run());

        StreamHandle::new(command_tx, registry, event_rx, cancel, config.subscription_queue)
    }
}

struct DriverTask<S> {
    source: S,
    controller: StreamController,
    commands: mpsc::Receiver<Command>,
    events: watch::Sender<StreamEvent>,
    cancel: CancellationToken,
    config: StreamConfig,
}

impl<S: FrameSource> DriverTask<S> {
    async fn run(mut self) {
        info!(source = self.source.name(), "Stream driver started");
        let mut frame_count = 0u64;
        let mut error_count = 0u32;
        let mut source_done = false;
        let mut retry_at: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!("Stream driver cancelled");
                    break;
                }

                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => {
                        debug!("All stream handles dropped, shutting down");
                        break;
                    }
                },

                _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    retry_at = None;
                }

                result = self.source.next_frame(), if !source_done && retry_at.is_none() => {
                    match result {
                        Ok(Some(frame)) => {
                            frame_count += 1;
                            error_count = 0;
                            trace!(sequence_number = frame.sequence_number, "Frame received");
                            self.controller.process_incoming_frame(frame);
                        }
                        Ok(None) => {
                            info!("Frame source ended after {} frames", frame_count);
                            source_done = true;
                            self.controller.source_terminated(None);
                            self.events.send_replace(StreamEvent::SourceEnded);
                        }
                        Err(e) => {
                            error_count += 1;
                            warn!(
                                "Frame source error ({}/{}): {}",
                                error_count, self.config.max_source_errors, e
                            );
                            self.controller.report_source_error(&e);

                            if !e.is_retryable() || error_count >= self.config.max_source_errors {
                                error!(
                                    retryable = e.is_retryable(),
                                    suggestions = ?e.recovery_suggestions(),
                                    "Frame source failed, deactivating stream"
                                );
                                source_done = true;
                                self.controller.source_terminated(Some(&e));
                                self.events
                                    .send_replace(StreamEvent::SourceFailed { reason: e.to_string() });
                            } else {
                                retry_at = Some(Instant::now() + self.config.backoff_for(error_count));
                            }
                        }
                    }
                }
            }
        }

        if self.controller.is_active() {
            self.controller.stop();
        }
        info!("Stream driver ended (received {} frames)", frame_count);
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                self.controller.start();
                self.publish_state();
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                self.controller.stop();
                self.publish_state();
                let _ = reply.send(());
            }
            Command::ClearBuffer(reply) => {
                self.controller.clear_buffer();
                let _ = reply.send(());
            }
            Command::SetTargetFrameRate(fps, reply) => {
                let _ = reply.send(self.controller.set_target_frame_rate(fps));
            }
            Command::Status(reply) => {
                let _ = reply.send(self.controller.get_status());
            }
            Command::Metrics(reply) => {
                let _ = reply.send(self.controller.get_performance_metrics());
            }
        }
    }

    fn publish_state(&self) {
        self.events.send_replace(StreamEvent::StateChanged(self.controller.state()));
    }
}
