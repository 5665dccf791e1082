//! Camera barcode scanning.
//!
//! The decoder itself is an external program. [`ScanSession`] owns a started
//! decoder and always tears it down when dropped, so the camera is only held
//! while scanning is active.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use serde::{Deserialize, Serialize};

use crate::barcode;
use crate::config::ScannerConfig;
use crate::error::{DecoderFault, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    Code39,
    Itf,
    #[serde(alias = "qr")]
    QrCode,
}

impl Symbology {
    /// Retail and logistics barcodes recognized by default.
    pub const LINEAR: &'static [Symbology] = &[
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Code128,
        Symbology::Code39,
        Symbology::Itf,
    ];

    /// ZBar's configuration name.
    pub fn zbar_name(&self) -> &'static str {
        match self {
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::UpcA => "upca",
            Symbology::UpcE => "upce",
            Symbology::Code128 => "code128",
            Symbology::Code39 => "code39",
            Symbology::Itf => "i25",
            Symbology::QrCode => "qrcode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    NotStarted,
    Starting,
    Scanning,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    Decoded(String),
    /// Nothing recognizable in the frame.
    NoSymbol,
    Fault(DecoderFault),
}

/// A camera-backed barcode decoder.
pub trait CameraDecoder {
    fn start(&mut self, config: &ScannerConfig, device: Option<&str>) -> Result<(), DecoderFault>;

    /// Next pending event, without blocking.
    fn poll_event(&mut self) -> Option<DecoderEvent>;

    fn state(&self) -> DecoderState;

    fn stop(&mut self) -> Result<(), DecoderFault>;

    /// Free everything `start` allocated.
    fn clear(&mut self);

    fn active_device(&self) -> Option<String> {
        None
    }
}

/// Stop the decoder if it may be running, then clear it.
fn release<D: CameraDecoder>(decoder: &mut D) {
    if matches!(
        decoder.state(),
        DecoderState::Starting | DecoderState::Scanning
    ) {
        if let Err(e) = decoder.stop() {
            tracing::warn!(error = %e, "failed to stop scanner gracefully");
        }
    }
    decoder.clear();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPoll {
    Pending,
    Decoded(String),
    Failed(ScanError),
}

/// A started decoder. Released on `stop` or drop.
pub struct ScanSession<D: CameraDecoder> {
    decoder: Option<D>,
}

impl<D: CameraDecoder> ScanSession<D> {
    pub fn start(
        mut decoder: D,
        config: &ScannerConfig,
        device: Option<&str>,
    ) -> Result<Self, ScanError> {
        match decoder.start(config, device) {
            Ok(()) => Ok(Self {
                decoder: Some(decoder),
            }),
            Err(fault) => {
                release(&mut decoder);
                Err(fault.into())
            }
        }
    }

    pub fn active_device(&self) -> Option<String> {
        self.decoder.as_ref().and_then(|d| d.active_device())
    }

    /// Drain pending decoder events.
    pub fn poll(&mut self) -> SessionPoll {
        let Some(decoder) = self.decoder.as_mut() else {
            return SessionPoll::Pending;
        };

        while let Some(event) = decoder.poll_event() {
            match event {
                DecoderEvent::Decoded(text) => {
                    let text = barcode::normalize(&text);
                    if !text.is_empty() {
                        return SessionPoll::Decoded(text);
                    }
                }
                DecoderEvent::NoSymbol => {}
                DecoderEvent::Fault(DecoderFault::Other(message)) => {
                    tracing::warn!(%message, "scanner warning");
                }
                DecoderEvent::Fault(fault) => return SessionPoll::Failed(fault.into()),
            }
        }

        if decoder.state() == DecoderState::Stopped {
            return SessionPoll::Failed(ScanError::Start(
                "scanner stopped unexpectedly".to_string(),
            ));
        }
        SessionPoll::Pending
    }

    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            release(&mut decoder);
        }
    }
}

impl<D: CameraDecoder> Drop for ScanSession<D> {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrigin {
    Camera,
    Manual,
    Keyboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Barcode { code: String, origin: ScanOrigin },
    Failed(ScanError),
}

/// Camera scanning plus manual entry, emitting barcodes through one channel.
pub struct ScanInput<D: CameraDecoder> {
    factory: Box<dyn FnMut() -> D>,
    config: ScannerConfig,
    session: Option<ScanSession<D>>,
    last_device: Option<String>,
}

impl<D: CameraDecoder> ScanInput<D> {
    pub fn new(config: ScannerConfig, factory: impl FnMut() -> D + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            config,
            session: None,
            last_device: None,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn is_scanning(&self) -> bool {
        self.session.is_some()
    }

    pub fn last_device(&self) -> Option<&str> {
        self.last_device.as_deref()
    }

    /// Turn scanning on or off. Starting can fail immediately, in which case
    /// the failure is returned and scanning stays off.
    pub fn set_scanning(&mut self, active: bool) -> Option<ScanEvent> {
        match (active, self.is_scanning()) {
            (true, false) => self.activate(),
            (false, true) => {
                self.deactivate();
                None
            }
            _ => None,
        }
    }

    pub fn toggle(&mut self) -> Option<ScanEvent> {
        let active = !self.is_scanning();
        self.set_scanning(active)
    }

    /// Poll the running session. A decoded barcode or a camera failure ends
    /// the session.
    pub fn pump(&mut self) -> Option<ScanEvent> {
        let session = self.session.as_mut()?;
        match session.poll() {
            SessionPoll::Pending => None,
            SessionPoll::Decoded(code) => {
                self.deactivate();
                tracing::info!(%code, "barcode decoded");
                Some(ScanEvent::Barcode {
                    code,
                    origin: ScanOrigin::Camera,
                })
            }
            SessionPoll::Failed(error) => {
                self.deactivate();
                self.forget_device_on(&error);
                tracing::warn!(%error, "scanning failed");
                Some(ScanEvent::Failed(error))
            }
        }
    }

    /// Manual entry. Stops an active scan first.
    pub fn submit_manual(&mut self, text: &str) -> Option<ScanEvent> {
        let code = barcode::validate_manual(text)?;
        self.deactivate();
        Some(ScanEvent::Barcode {
            code,
            origin: ScanOrigin::Manual,
        })
    }

    fn activate(&mut self) -> Option<ScanEvent> {
        let device = if self.config.remember_last_camera {
            self.last_device.clone().or_else(|| self.config.device.clone())
        } else {
            self.config.device.clone()
        };

        let decoder = (self.factory)();
        match ScanSession::start(decoder, &self.config, device.as_deref()) {
            Ok(session) => {
                if self.config.remember_last_camera {
                    if let Some(active) = session.active_device() {
                        self.last_device = Some(active);
                    }
                }
                tracing::info!(device = ?device, "scanning started");
                self.session = Some(session);
                None
            }
            Err(error) => {
                self.forget_device_on(&error);
                tracing::warn!(%error, "could not start scanner");
                Some(ScanEvent::Failed(error))
            }
        }
    }

    fn deactivate(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
            tracing::info!("scanning stopped");
        }
    }

    fn forget_device_on(&mut self, error: &ScanError) {
        if error.is_camera_unavailable() {
            self.last_device = None;
        }
    }
}

/// Runs `zbarcam` and reads decoded symbols from its stdout.
pub struct ZbarCamDecoder {
    program: String,
    child: Option<Child>,
    events: Option<Receiver<DecoderEvent>>,
    state: DecoderState,
    device: Option<String>,
}

impl ZbarCamDecoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            child: None,
            events: None,
            state: DecoderState::NotStarted,
            device: None,
        }
    }

    pub fn command_args(config: &ScannerConfig, device: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "--raw".to_string(),
            "--nodisplay".to_string(),
            "-Sdisable".to_string(),
        ];
        for sym in config.symbology_set() {
            args.push(format!("-S{}.enable", sym.zbar_name()));
        }
        if let Some((width, height)) = config.capture_size() {
            args.push(format!("--prescale={}x{}", width, height));
        }
        if let Some(device) = device {
            args.push(device.to_string());
        }
        args
    }
}

fn mentions_video_device(lower: &str) -> bool {
    lower.contains("video device") || lower.contains("/dev/video") || lower.contains("v4l")
}

/// Map a line of zbarcam stderr to an event. Only failures to open the video
/// device count as a missing camera.
pub fn classify_stderr(line: &str) -> DecoderEvent {
    let lower = line.to_lowercase();
    if lower.contains("permission denied") {
        DecoderEvent::Fault(DecoderFault::PermissionDenied(line.trim().to_string()))
    } else if mentions_video_device(&lower)
        && (lower.contains("no such file")
            || lower.contains("no such device")
            || lower.contains("not found"))
    {
        DecoderEvent::Fault(DecoderFault::DeviceNotFound(line.trim().to_string()))
    } else {
        DecoderEvent::Fault(DecoderFault::Other(line.trim().to_string()))
    }
}

impl CameraDecoder for ZbarCamDecoder {
    fn start(&mut self, config: &ScannerConfig, device: Option<&str>) -> Result<(), DecoderFault> {
        self.state = DecoderState::Starting;
        self.device = device.map(str::to_string);

        let mut child = Command::new(&self.program)
            .args(Self::command_args(config, device))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DecoderFault::Other(format!("{} is not installed", self.program))
                } else {
                    DecoderFault::Other(format!("failed to run {}: {}", self.program, e))
                }
            })?;

        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            let tx = tx.clone();
            std::thread::spawn(move || {
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    let event = if line.trim().is_empty() {
                        DecoderEvent::NoSymbol
                    } else {
                        DecoderEvent::Decoded(line)
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let tx = tx.clone();
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if tx.send(classify_stderr(&line)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        tracing::debug!(program = %self.program, pid = child.id(), "decoder started");
        self.child = Some(child);
        self.events = Some(rx);
        self.state = DecoderState::Scanning;
        Ok(())
    }

    fn poll_event(&mut self) -> Option<DecoderEvent> {
        let events = self.events.as_ref()?;
        match events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // Both pipes closed: the process has exited.
                if let Some(mut child) = self.child.take() {
                    match child.wait() {
                        Ok(status) => tracing::debug!(%status, "decoder exited"),
                        Err(e) => tracing::warn!(error = %e, "failed to reap decoder"),
                    }
                }
                self.events = None;
                self.state = DecoderState::Stopped;
                None
            }
        }
    }

    fn state(&self) -> DecoderState {
        self.state
    }

    fn stop(&mut self) -> Result<(), DecoderFault> {
        self.state = DecoderState::Stopped;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        if let Err(e) = child.kill() {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                return Err(DecoderFault::Other(format!("failed to stop decoder: {}", e)));
            }
        }
        child
            .wait()
            .map(|_| ())
            .map_err(|e| DecoderFault::Other(format!("failed to reap decoder: {}", e)))
    }

    fn clear(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.events = None;
        self.state = DecoderState::NotStarted;
    }

    fn active_device(&self) -> Option<String> {
        self.device.clone()
    }
}

impl Drop for ZbarCamDecoder {
    fn drop(&mut self) {
        self.clear();
    }
}
