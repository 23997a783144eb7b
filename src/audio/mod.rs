use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::AudioCommand;

mod engine;
mod transport;
mod voice;

pub use engine::{CompletedRecording, Engine, EngineReport};
pub use transport::TransportState;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    completed_rx: Receiver<CompletedRecording>,
    report_rx: Receiver<EngineReport>,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        let _ = self.tx.try_send(cmd);
    }

    /// Cloneable sender for parts that talk to the engine directly.
    pub fn command_sender(&self) -> Sender<AudioCommand> {
        self.tx.clone()
    }

    pub fn poll_completed_recording(&self) -> Option<CompletedRecording> {
        self.completed_rx.try_recv().ok()
    }

    /// Blocking wait, used when writing a capture to disk.
    pub fn wait_completed_recording(
        &self,
        timeout: std::time::Duration,
    ) -> Option<CompletedRecording> {
        self.completed_rx.recv_timeout(timeout).ok()
    }

    pub fn poll_report(&self) -> Option<EngineReport> {
        // take the freshest snapshot, dropping stale ones
        let mut latest = None;
        while let Ok(report) = self.report_rx.try_recv() {
            latest = Some(report);
        }
        latest
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    let (completed_tx, completed_rx) = crossbeam_channel::bounded::<CompletedRecording>(16);
    let (report_tx, report_rx) = crossbeam_channel::bounded::<EngineReport>(256);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(
                &device,
                &config.into(),
                rx,
                completed_tx,
                report_tx,
                sample_rate,
                channels,
            )?;
            output_stream
                .play()
                .context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                completed_rx,
                report_rx,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    completed_tx: Sender<CompletedRecording>,
    report_tx: Sender<EngineReport>,
    sample_rate: u32,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(sample_rate);
    engine.set_completed_tx(completed_tx);
    engine.set_report_tx(report_tx);

    // preallocated so the callback never touches the allocator
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(8192);

    let err_fn = |err| eprintln!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels;
            if scratch.len() < n_frames {
                scratch.resize(n_frames, StereoFrame::default());
            }
            engine.render_block(&mut scratch[..n_frames]);

            for (frame, out) in scratch.iter().zip(data.chunks_mut(channels)) {
                out[0] = frame.left;
                if out.len() > 1 {
                    out[1] = frame.right;
                }
                for extra in out.iter_mut().skip(2) {
                    *extra = 0.0;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
