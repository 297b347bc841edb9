//! Mock sensor driver implementation for testing and development.
//!
//! The mock keeps its state behind a shared lock so a [`MockSensorHandle`]
//! can script driver behavior and inspect every call after the sensor has
//! been moved into a session.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dactyl_core::{ImageGeometry, SecurityLevel, TemplateFormat, TemplateMetadata};
use parking_lot::Mutex;
use tracing::trace;

use crate::{
    Result, SensorError,
    traits::SensorCapability,
    types::{DeviceClass, DeviceInfo},
};

/// Default image width reported by the mock.
pub const MOCK_IMAGE_WIDTH: u32 = 10;

/// Default image height reported by the mock.
pub const MOCK_IMAGE_HEIGHT: u32 = 10;

/// Default quality reported for every frame.
pub const MOCK_QUALITY: u32 = 80;

/// Default maximum template size.
pub const MOCK_MAX_TEMPLATE_SIZE: usize = 400;

/// Score reported for identical templates by the default scorer.
pub const MOCK_IDENTICAL_SCORE: i32 = 199;

/// Driver entry points that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorOp {
    Init,
    Open,
    Close,
    DeviceInfo,
    TemplateFormat,
    RawCommand,
    GetImage,
    ImageQuality,
    MaxTemplateSize,
    CreateTemplate,
    MatchTemplate,
    MatchingScore,
    Led,
    Brightness,
}

/// One recorded driver call, with the arguments it received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorCall {
    Init(DeviceClass),
    Open(u32),
    Close,
    GetDeviceInfo,
    SetTemplateFormat(TemplateFormat),
    WriteRawCommand { code: u8, value: u8 },
    GetImage { buffer_len: usize, timeout_ms: u32 },
    GetImageQuality { width: u32, height: u32 },
    GetMaxTemplateSize,
    CreateTemplate {
        metadata: TemplateMetadata,
        image_len: usize,
        template_len: usize,
    },
    MatchTemplate {
        first: Vec<u8>,
        second: Vec<u8>,
        level: SecurityLevel,
    },
    GetMatchingScore { first: Vec<u8>, second: Vec<u8> },
    SetLedOn(bool),
    SetBrightness(i32),
}

impl SensorCall {
    pub fn op(&self) -> SensorOp {
        match self {
            Self::Init(_) => SensorOp::Init,
            Self::Open(_) => SensorOp::Open,
            Self::Close => SensorOp::Close,
            Self::GetDeviceInfo => SensorOp::DeviceInfo,
            Self::SetTemplateFormat(_) => SensorOp::TemplateFormat,
            Self::WriteRawCommand { .. } => SensorOp::RawCommand,
            Self::GetImage { .. } => SensorOp::GetImage,
            Self::GetImageQuality { .. } => SensorOp::ImageQuality,
            Self::GetMaxTemplateSize => SensorOp::MaxTemplateSize,
            Self::CreateTemplate { .. } => SensorOp::CreateTemplate,
            Self::MatchTemplate { .. } => SensorOp::MatchTemplate,
            Self::GetMatchingScore { .. } => SensorOp::MatchingScore,
            Self::SetLedOn(_) => SensorOp::Led,
            Self::SetBrightness(_) => SensorOp::Brightness,
        }
    }
}

type ScoreFn = Arc<dyn Fn(&[u8], &[u8]) -> i32 + Send + Sync>;

struct MockState {
    device_info: DeviceInfo,
    image: Option<Vec<u8>>,
    quality: u32,
    max_template_size: usize,
    image_delay: Option<Duration>,
    hang_on_capture: bool,
    score_fn: Option<ScoreFn>,
    failures: HashMap<SensorOp, SensorError>,
    calls: Vec<SensorCall>,

    initialized: bool,
    open: bool,
    led_on: bool,
    brightness: Option<i32>,
    template_format: Option<TemplateFormat>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            device_info: DeviceInfo::new(MOCK_IMAGE_WIDTH, MOCK_IMAGE_HEIGHT)
                .with_dpi(500)
                .with_firmware_version("mock-1.0"),
            image: None,
            quality: MOCK_QUALITY,
            max_template_size: MOCK_MAX_TEMPLATE_SIZE,
            image_delay: None,
            hang_on_capture: false,
            score_fn: None,
            failures: HashMap::new(),
            calls: Vec::new(),
            initialized: false,
            open: false,
            led_on: false,
            brightness: None,
            template_format: None,
        }
    }
}

impl MockState {
    /// Record a call and return its scripted failure, if any.
    fn enter(&mut self, call: SensorCall) -> Result<()> {
        trace!(?call, "mock sensor call");
        let op = call.op();
        self.calls.push(call);
        match self.failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn require_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(SensorError::disconnected("mock sensor is not open"))
        }
    }
}

/// Mock fingerprint sensor driver.
///
/// Reports a 10x10 device with quality 80 and a 400-byte maximum template
/// unless scripted otherwise. Templates are derived deterministically from
/// the image and quality, so capturing the same frame twice yields the same
/// template. Matching is byte equality.
///
/// # Examples
///
/// ```
/// use dactyl_hardware::mock::MockSensor;
/// use dactyl_hardware::traits::SensorCapability;
/// use dactyl_hardware::DeviceClass;
///
/// #[tokio::main]
/// async fn main() -> dactyl_hardware::Result<()> {
///     let (mut sensor, handle) = MockSensor::new();
///     handle.set_quality(65);
///
///     sensor.init(DeviceClass::Auto).await?;
///     sensor.open(0).await?;
///     let mut buffer = vec![0u8; 100];
///     sensor.get_image(&mut buffer, 1_000).await?;
///     assert_eq!(sensor.get_image_quality(10, 10, &buffer).await?, 65);
///
///     Ok(())
/// }
/// ```
pub struct MockSensor {
    state: Arc<Mutex<MockState>>,
}

impl MockSensor {
    /// Create a new mock sensor and the handle that controls it.
    pub fn new() -> (Self, MockSensorHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockSensorHandle { state },
        )
    }

    fn derive_template(metadata: &TemplateMetadata, image: &[u8], template: &mut [u8]) {
        let quality = metadata.image_quality as u8;
        for (i, byte) in template.iter_mut().enumerate() {
            let sample = if image.is_empty() {
                0
            } else {
                image[i % image.len()]
            };
            *byte = sample ^ (i as u8) ^ quality;
        }
    }
}

impl fmt::Debug for MockSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockSensor")
            .field("open", &state.open)
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl SensorCapability for MockSensor {
    async fn init(&mut self, class: DeviceClass) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(SensorCall::Init(class))?;
        state.initialized = true;
        Ok(())
    }

    async fn open(&mut self, device_index: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(SensorCall::Open(device_index))?;
        if !state.initialized {
            return Err(SensorError::other("driver not initialized"));
        }
        state.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(SensorCall::Close)?;
        state.open = false;
        Ok(())
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        let mut state = self.state.lock();
        state.enter(SensorCall::GetDeviceInfo)?;
        state.require_open()?;
        Ok(state.device_info.clone())
    }

    async fn set_template_format(&mut self, format: TemplateFormat) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(SensorCall::SetTemplateFormat(format))?;
        state.template_format = Some(format);
        Ok(())
    }

    async fn write_raw_command(&mut self, code: u8, value: u8) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(SensorCall::WriteRawCommand { code, value })?;
        state.require_open()
    }

    async fn get_image(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<()> {
        let (delay, hang) = {
            let mut state = self.state.lock();
            state.enter(SensorCall::GetImage {
                buffer_len: buffer.len(),
                timeout_ms,
            })?;
            state.require_open()?;
            (state.image_delay, state.hang_on_capture)
        };

        if hang {
            std::future::pending::<()>().await;
        }

        if let Some(delay) = delay {
            if delay > Duration::from_millis(u64::from(timeout_ms)) {
                tokio::time::sleep(Duration::from_millis(u64::from(timeout_ms))).await;
                return Err(SensorError::timeout(u64::from(timeout_ms)));
            }
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        match &state.image {
            Some(image) => {
                let n = image.len().min(buffer.len());
                buffer[..n].copy_from_slice(&image[..n]);
                buffer[n..].fill(0);
            }
            None => buffer.fill(0),
        }
        Ok(())
    }

    async fn get_image_quality(&self, width: u32, height: u32, buffer: &[u8]) -> Result<u32> {
        let mut state = self.state.lock();
        state.enter(SensorCall::GetImageQuality { width, height })?;
        if ImageGeometry::new(width, height).pixel_count() != buffer.len() {
            return Err(SensorError::invalid_parameter(
                "image buffer does not match geometry",
            ));
        }
        Ok(state.quality)
    }

    async fn get_max_template_size(&self) -> Result<usize> {
        let mut state = self.state.lock();
        state.enter(SensorCall::GetMaxTemplateSize)?;
        Ok(state.max_template_size)
    }

    async fn create_template(
        &mut self,
        metadata: &TemplateMetadata,
        image: &[u8],
        template: &mut [u8],
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(SensorCall::CreateTemplate {
            metadata: *metadata,
            image_len: image.len(),
            template_len: template.len(),
        })?;
        Self::derive_template(metadata, image, template);
        Ok(())
    }

    async fn match_template(
        &self,
        first: &[u8],
        second: &[u8],
        level: SecurityLevel,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        state.enter(SensorCall::MatchTemplate {
            first: first.to_vec(),
            second: second.to_vec(),
            level,
        })?;
        Ok(first == second)
    }

    async fn get_matching_score(&self, first: &[u8], second: &[u8]) -> Result<i32> {
        let mut state = self.state.lock();
        state.enter(SensorCall::GetMatchingScore {
            first: first.to_vec(),
            second: second.to_vec(),
        })?;
        let score = match &state.score_fn {
            Some(score_fn) => score_fn(first, second),
            None if first == second => MOCK_IDENTICAL_SCORE,
            None => 0,
        };
        Ok(score)
    }

    async fn set_led_on(&mut self, on: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(SensorCall::SetLedOn(on))?;
        state.require_open()?;
        state.led_on = on;
        Ok(())
    }

    async fn set_brightness(&mut self, level: i32) -> Result<()> {
        let mut state = self.state.lock();
        state.enter(SensorCall::SetBrightness(level))?;
        state.require_open()?;
        state.brightness = Some(level);
        Ok(())
    }
}

/// Handle for scripting and inspecting a [`MockSensor`].
///
/// # Examples
///
/// ```
/// use dactyl_hardware::mock::{MockSensor, SensorOp};
/// use dactyl_hardware::SensorError;
///
/// let (_sensor, handle) = MockSensor::new();
/// handle.set_image(vec![0x80; 100]);
/// handle.fail(SensorOp::MatchTemplate, SensorError::driver(6, "invalid template"));
/// assert!(handle.calls().is_empty());
/// ```
#[derive(Clone)]
pub struct MockSensorHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockSensorHandle {
    pub fn set_device_info(&self, info: DeviceInfo) {
        self.state.lock().device_info = info;
    }

    /// Frame copied into the capture buffer; shorter frames are zero padded.
    pub fn set_image(&self, image: Vec<u8>) {
        self.state.lock().image = Some(image);
    }

    pub fn set_quality(&self, quality: u32) {
        self.state.lock().quality = quality;
    }

    pub fn set_max_template_size(&self, size: usize) {
        self.state.lock().max_template_size = size;
    }

    /// Delay acquisition; delays longer than the call timeout report a timeout.
    pub fn set_image_delay(&self, delay: Duration) {
        self.state.lock().image_delay = Some(delay);
    }

    /// Make acquisition never return, ignoring its own timeout.
    pub fn hang_on_capture(&self, hang: bool) {
        self.state.lock().hang_on_capture = hang;
    }

    /// Replace the default equality scorer.
    pub fn set_score_fn<F>(&self, score_fn: F)
    where
        F: Fn(&[u8], &[u8]) -> i32 + Send + Sync + 'static,
    {
        self.state.lock().score_fn = Some(Arc::new(score_fn));
    }

    /// Make every subsequent call to `op` fail with `error`.
    pub fn fail(&self, op: SensorOp, error: SensorError) {
        self.state.lock().failures.insert(op, error);
    }

    pub fn clear_failure(&self, op: SensorOp) {
        self.state.lock().failures.remove(&op);
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<SensorCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls received for `op`.
    pub fn call_count(&self, op: SensorOp) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn led_on(&self) -> bool {
        self.state.lock().led_on
    }

    pub fn brightness(&self) -> Option<i32> {
        self.state.lock().brightness
    }

    pub fn template_format(&self) -> Option<TemplateFormat> {
        self.state.lock().template_format
    }

    /// Raw commands written so far, as `(code, value)` pairs.
    pub fn raw_commands(&self) -> Vec<(u8, u8)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SensorCall::WriteRawCommand { code, value } => Some((*code, *value)),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Debug for MockSensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSensorHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn opened() -> (MockSensor, MockSensorHandle) {
        let (mut sensor, handle) = MockSensor::new();
        sensor.init(DeviceClass::Auto).await.unwrap();
        sensor.open(0).await.unwrap();
        (sensor, handle)
    }

    #[tokio::test]
    async fn test_open_requires_init() {
        let (mut sensor, handle) = MockSensor::new();
        assert!(sensor.open(0).await.is_err());
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_get_image_copies_scripted_frame() {
        let (mut sensor, handle) = opened().await;
        handle.set_image(vec![9, 8, 7]);

        let mut buffer = vec![1u8; 5];
        sensor.get_image(&mut buffer, 100).await.unwrap();
        assert_eq!(buffer, vec![9, 8, 7, 0, 0]);
    }

    #[tokio::test]
    async fn test_get_image_when_closed() {
        let (mut sensor, _handle) = MockSensor::new();
        let mut buffer = vec![0u8; 100];
        let result = sensor.get_image(&mut buffer, 100).await;
        assert!(matches!(result, Err(SensorError::Disconnected { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_delay_beyond_timeout() {
        let (mut sensor, handle) = opened().await;
        handle.set_image_delay(Duration::from_secs(30));

        let mut buffer = vec![0u8; 100];
        let result = sensor.get_image(&mut buffer, 1_000).await;
        assert_eq!(result, Err(SensorError::timeout(1_000)));
    }

    #[tokio::test]
    async fn test_scripted_failure_is_recorded() {
        let (sensor, handle) = opened().await;
        handle.fail(SensorOp::MatchTemplate, SensorError::driver(3, "bad"));

        let result = sensor
            .match_template(&[1], &[1], SecurityLevel::Normal)
            .await;
        assert!(result.is_err());
        assert_eq!(handle.call_count(SensorOp::MatchTemplate), 1);

        handle.clear_failure(SensorOp::MatchTemplate);
        assert!(
            sensor
                .match_template(&[1], &[1], SecurityLevel::Normal)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_template_is_deterministic() {
        let (mut sensor, _handle) = opened().await;
        let metadata = TemplateMetadata::for_capture(80);
        let image = vec![3u8; 100];

        let mut first = vec![0u8; 32];
        let mut second = vec![0u8; 32];
        sensor
            .create_template(&metadata, &image, &mut first)
            .await
            .unwrap();
        sensor
            .create_template(&metadata, &image, &mut second)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_quality_rejects_mismatched_geometry() {
        let (sensor, _handle) = opened().await;
        assert!(sensor.get_image_quality(10, 10, &[0u8; 50]).await.is_err());
        assert_eq!(sensor.get_image_quality(10, 10, &[0u8; 100]).await, Ok(80));
    }

    #[tokio::test]
    async fn test_custom_score_fn() {
        let (sensor, handle) = opened().await;
        handle.set_score_fn(|a, b| i32::from(a[0]) * 10 + i32::from(b[0]));

        assert_eq!(sensor.get_matching_score(&[1], &[2]).await, Ok(12));
        assert_eq!(sensor.get_matching_score(&[2], &[1]).await, Ok(21));
    }

    #[tokio::test]
    async fn test_led_and_brightness_tracking() {
        let (mut sensor, handle) = opened().await;
        sensor.set_led_on(true).await.unwrap();
        sensor.set_brightness(70).await.unwrap();

        assert!(handle.led_on());
        assert_eq!(handle.brightness(), Some(70));
    }
}
