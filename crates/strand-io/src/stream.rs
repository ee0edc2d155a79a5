//! Real-time output via cpal.
//!
//! The device callback and the control thread share one
//! [`Engine`] behind a [`parking_lot::Mutex`]. The callback locks it for one
//! tick at a time; a [`BlockAdapter`] bridges the engine's fixed blocks to
//! whatever buffer length and channel count the device asks for.

use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, Stream};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strand_core::Engine;

fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Output device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Default channel count.
    pub default_channels: u16,
    /// Whether this is the host's default output.
    pub is_default: bool,
}

/// List the output devices of the default host.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());

    let outputs = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;

    let mut devices = Vec::new();
    for device in outputs {
        let Ok(name) = device_name(&device) else {
            continue;
        };
        let (default_sample_rate, default_channels) = device
            .default_output_config()
            .map(|c| (c.sample_rate(), c.channels()))
            .unwrap_or((48000, 2));
        devices.push(AudioDevice {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            default_sample_rate,
            default_channels,
        });
    }
    Ok(devices)
}

/// Adapts fixed engine blocks to device-sized buffers.
///
/// Device channel `c` carries engine channel `c`; device channels beyond the
/// engine's are silent and extra engine channels are dropped.
#[derive(Debug)]
pub struct BlockAdapter {
    device_channels: usize,
    pending: Vec<f32>,
    pos: usize,
}

impl BlockAdapter {
    /// Adapter for a device with `device_channels` interleaved channels.
    pub fn new(device_channels: usize) -> Self {
        Self {
            device_channels: device_channels.max(1),
            pending: Vec::new(),
            pos: 0,
        }
    }

    /// Fill `data`, ticking `engine` whenever the pending block runs out.
    pub fn fill(&mut self, engine: &mut Engine, data: &mut [f32]) {
        let mut written = 0;
        while written < data.len() {
            if self.pos == self.pending.len() {
                self.refill(engine);
                if self.pending.is_empty() {
                    data[written..].fill(0.0);
                    return;
                }
            }
            let n = (self.pending.len() - self.pos).min(data.len() - written);
            data[written..written + n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
            self.pos += n;
            written += n;
        }
    }

    fn refill(&mut self, engine: &mut Engine) {
        let engine_channels = engine.config().channels.max(1);
        let block = engine.process_tick();
        self.pending.clear();
        self.pos = 0;
        for frame in block.chunks(engine_channels) {
            self.pending.extend(
                (0..self.device_channels).map(|c| frame.get(c).copied().unwrap_or(0.0)),
            );
        }
    }
}

/// Real-time output stream driving a shared engine.
pub struct AudioOutput {
    device: Device,
    running: Arc<AtomicBool>,
    _stream: Option<Stream>,
}

impl AudioOutput {
    /// Open an output device by index, exact name, or partial name;
    /// the host default when `device` is `None`.
    pub fn new(device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device {
            Some(name) => find_output_device(&host, name)?,
            None => host.default_output_device().ok_or(Error::NoDevice)?,
        };
        Ok(Self {
            device,
            running: Arc::new(AtomicBool::new(false)),
            _stream: None,
        })
    }

    /// Name of the opened device.
    pub fn device_name(&self) -> String {
        device_name(&self.device).unwrap_or_else(|_| "<unknown>".to_string())
    }

    /// Device channel count.
    pub fn channels(&self) -> u16 {
        self.device
            .default_output_config()
            .map(|c| c.channels())
            .unwrap_or(2)
    }

    /// Flag that keeps [`run`](Self::run) alive; clear it to return.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Stop the stream.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Play `engine` at its own sample rate until [`stop`](Self::stop).
    ///
    /// Blocks the calling thread.
    pub fn run(&mut self, engine: Arc<Mutex<Engine>>) -> Result<()> {
        let channels = self.channels();
        let sample_rate = engine.lock().config().sample_rate.round() as u32;
        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        self.running.store(true, Ordering::SeqCst);
        let output_running = Arc::clone(&self.running);
        let mut adapter = BlockAdapter::new(usize::from(channels));
        let stream = self
            .device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if output_running.load(Ordering::SeqCst) {
                        adapter.fill(&mut engine.lock(), data);
                    } else {
                        data.fill(0.0);
                    }
                },
                |err| tracing::error!(%err, "output stream error"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(device = %self.device_name(), sample_rate, channels, "output started");
        self._stream = Some(stream);

        while self.running.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        self._stream = None;
        Ok(())
    }
}

fn find_output_device(host: &Host, name_or_index: &str) -> Result<Device> {
    let devices: Vec<_> = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .collect();

    if let Ok(index) = name_or_index.parse::<usize>() {
        return devices.get(index).cloned().ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "output device index {} (only {} devices available)",
                index,
                devices.len()
            ))
        });
    }

    if let Some(device) = devices
        .iter()
        .find(|d| device_name(d).is_ok_and(|n| n == name_or_index))
    {
        return Ok(device.clone());
    }

    let search_lower = name_or_index.to_lowercase();
    let mut matches: Vec<_> = devices
        .iter()
        .filter_map(|d| {
            device_name(d)
                .ok()
                .filter(|name| name.to_lowercase().contains(&search_lower))
                .map(|name| (d.clone(), name))
        })
        .collect();

    match matches.len() {
        0 => Err(Error::DeviceNotFound(format!(
            "no output device matching '{}'",
            name_or_index
        ))),
        1 => Ok(matches.remove(0).0),
        _ => {
            let names: Vec<_> = matches.iter().map(|(_, n)| n.as_str()).collect();
            tracing::warn!(
                query = name_or_index,
                ?names,
                "multiple devices match, using the first"
            );
            Ok(matches.remove(0).0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::EngineConfig;
    use strand_core::kernels::Sig;

    fn engine(channels: usize) -> Engine {
        let mut engine = Engine::new();
        engine
            .boot(EngineConfig {
                buffer_size: 4,
                channels,
                ..EngineConfig::default()
            })
            .unwrap();
        engine.start().unwrap();
        engine
    }

    #[test]
    fn adapter_spans_blocks() {
        let mut e = engine(1);
        let sig = e.create(&Sig, &[("value", 0.25.into())]).unwrap();
        e.out(sig, 0, 1, 0.0, 0.0).unwrap();
        let mut adapter = BlockAdapter::new(1);
        let mut data = [0.0; 6];
        adapter.fill(&mut e, &mut data);
        assert_eq!(data, [0.25; 6]);
        assert_eq!(e.ticks(), 2);
        adapter.fill(&mut e, &mut data[..2]);
        // The rest of the second block is used before ticking again.
        assert_eq!(e.ticks(), 2);
    }

    #[test]
    fn adapter_maps_channels() {
        let mut e = engine(2);
        let sig = e
            .create(&Sig, &[("value", vec![1.0, 2.0].into())])
            .unwrap();
        e.out(sig, 0, 1, 0.0, 0.0).unwrap();

        let mut wide = BlockAdapter::new(3);
        let mut data = [9.0; 6];
        wide.fill(&mut e, &mut data);
        assert_eq!(data, [1.0, 2.0, 0.0, 1.0, 2.0, 0.0]);

        let mut narrow = BlockAdapter::new(1);
        let mut data = [9.0; 4];
        narrow.fill(&mut e, &mut data);
        assert_eq!(data, [1.0; 4]);
    }

    #[test]
    fn adapter_outputs_silence_without_engine() {
        let mut e = Engine::new();
        let mut adapter = BlockAdapter::new(2);
        let mut data = [1.0; 8];
        adapter.fill(&mut e, &mut data);
        assert_eq!(data, [0.0; 8]);
    }
}
