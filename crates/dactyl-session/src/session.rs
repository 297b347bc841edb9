//! Device session: sensor handle lifetime, permission flow and geometry.
//!
//! A session owns one sensor driver and, optionally, the host USB
//! subsystem. Every operation that needs an open device checks the state
//! first and fails fast with `NotInitialized`.
//!
//! # Initialization Protocol
//!
//! Initialization is a caller-driven retry loop. When the host has not yet
//! granted USB access, `initialize()` issues a permission request, moves to
//! `PermissionPending` and returns [`Initialization::PermissionRequested`].
//! The caller retries once the host grants access.
//!
//! ```
//! use dactyl_hardware::mock::{MockSensor, MockUsbHost};
//! use dactyl_session::{DeviceSession, Initialization, SessionConfig, SessionState};
//!
//! #[tokio::main]
//! async fn main() -> dactyl_core::Result<()> {
//!     let (sensor, _sensor_handle) = MockSensor::new();
//!     let (usb, usb_handle) = MockUsbHost::new();
//!     let mut session = DeviceSession::new(sensor, Some(usb), SessionConfig::default());
//!
//!     assert_eq!(session.initialize().await?, Initialization::PermissionRequested);
//!     assert_eq!(session.state(), SessionState::PermissionPending);
//!
//!     usb_handle.grant_permission();
//!     assert_eq!(session.initialize().await?, Initialization::Opened);
//!     assert!(session.geometry().is_valid());
//!
//!     session.close().await;
//!     assert_eq!(session.image_width(), 0);
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;

use dactyl_core::constants::{SMART_CAPTURE_ON, WRITE_DATA_ENABLE_SMART_CAPTURE};
use dactyl_core::{Error, ImageGeometry, Result};
use dactyl_hardware::{SensorCapability, UsbHost};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::state::{SessionState, StateTransition};

/// Outcome of a successful `initialize()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    /// The device was opened and the session is now ready.
    Opened,

    /// The session was already ready; nothing was sent to the driver.
    AlreadyReady,

    /// USB permission was requested; retry once the host grants it.
    PermissionRequested,
}

/// One open hardware connection to a fingerprint sensor.
///
/// # Thread Safety
///
/// Operations take `&mut self` so a single owner serializes them. Share a
/// session across tasks through an exclusive-access wrapper such as
/// `tokio::sync::RwLock`.
pub struct DeviceSession<S, U> {
    id: Uuid,
    pub(crate) config: SessionConfig,
    pub(crate) sensor: S,
    usb: Option<U>,

    state: SessionState,
    history: VecDeque<StateTransition>,

    pub(crate) geometry: ImageGeometry,
    pub(crate) smart_capture_enabled: bool,
    led_on: bool,
    brightness: Option<i32>,
}

impl<S, U> DeviceSession<S, U>
where
    S: SensorCapability,
    U: UsbHost,
{
    /// Create a session in the `Uninitialized` state.
    ///
    /// Pass `None` for `usb` on hosts without a USB subsystem; initialization
    /// then fails with `NotSupported`.
    pub fn new(sensor: S, usb: Option<U>, config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "Creating device session");

        Self {
            id,
            history: VecDeque::new(),
            config,
            sensor,
            usb,
            state: SessionState::Uninitialized,
            geometry: ImageGeometry::ZERO,
            smart_capture_enabled: false,
            led_on: false,
            brightness: None,
        }
    }

    /// Open the sensor and move to `Ready`.
    ///
    /// Valid from `Uninitialized` and, for the permission retry, from
    /// `PermissionPending`. From `Ready` or `Capturing` this is a no-op
    /// returning [`Initialization::AlreadyReady`].
    ///
    /// # Errors
    ///
    /// - `NotSupported` if there is no USB subsystem or the driver does not
    ///   recognize the attached device
    /// - `InitializationFailed` if driver init fails for another reason, if
    ///   post-open setup fails, or if the session is in `Error`
    /// - `SensorNotFound` if no device is attached or open fails
    pub async fn initialize(&mut self) -> Result<Initialization> {
        match self.state {
            SessionState::Ready | SessionState::Capturing => {
                debug!(session = %self.id, "Initialize on ready session ignored");
                return Ok(Initialization::AlreadyReady);
            }
            SessionState::Error => {
                return Err(Error::InitializationFailed(
                    "Session is in error state; close it before initializing again".to_string(),
                ));
            }
            SessionState::Uninitialized | SessionState::PermissionPending => {}
        }

        self.usb_host()?;
        self.smart_capture_enabled = false;

        info!(session = %self.id, class = ?self.config.device_class, "Initializing sensor driver");
        if let Err(e) = self.sensor.init(self.config.device_class).await {
            error!(session = %self.id, "Driver initialization failed: {}", e);
            return Err(if e.is_device_not_found() {
                Error::NotSupported("The attached fingerprint device is not supported".to_string())
            } else {
                Error::InitializationFailed(format!(
                    "Fingerprint device initialization failed: {}",
                    e
                ))
            });
        }

        let permitted = {
            let usb = self.usb_host()?;
            let device = usb.attached_device().ok_or_else(|| {
                Error::SensorNotFound("Fingerprint sensor not found".to_string())
            })?;

            if usb.has_permission(&device) {
                true
            } else {
                warn!(session = %self.id, %device, "Requesting USB permission");
                usb.request_permission(&device);
                false
            }
        };

        if !permitted {
            self.transition_to(SessionState::PermissionPending);
            return Ok(Initialization::PermissionRequested);
        }

        info!(session = %self.id, index = self.config.device_index, "Opening sensor");
        if let Err(e) = self.sensor.open(self.config.device_index).await {
            warn!(session = %self.id, "Failed to open device: {}", e);
            return Err(Error::SensorNotFound(format!("Failed to open device: {}", e)));
        }

        let geometry = match self.configure_open_device().await {
            Ok(geometry) => geometry,
            Err(e) => {
                error!(session = %self.id, "Post-open setup failed: {}", e);
                if let Err(close_err) = self.sensor.close().await {
                    warn!(
                        session = %self.id,
                        "Error closing device after failed setup: {}", close_err
                    );
                }
                self.transition_to(SessionState::Error);
                return Err(e);
            }
        };

        self.geometry = geometry;
        self.transition_to(SessionState::Ready);
        info!(
            session = %self.id,
            %geometry,
            smart_capture = self.smart_capture_enabled,
            "Sensor ready"
        );
        Ok(Initialization::Opened)
    }

    /// Query geometry, fix the template format and enable smart capture.
    async fn configure_open_device(&mut self) -> Result<ImageGeometry> {
        let info = self.sensor.get_device_info().await.map_err(|e| {
            Error::InitializationFailed(format!("Failed to query device info: {}", e))
        })?;

        let geometry = info.geometry();
        if !geometry.is_valid() {
            return Err(Error::InitializationFailed(format!(
                "Device reported invalid image geometry {}",
                geometry
            )));
        }

        self.sensor
            .set_template_format(self.config.template_format)
            .await
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to set template format: {}", e))
            })?;

        if self.config.enable_smart_capture_on_open {
            match self
                .sensor
                .write_raw_command(WRITE_DATA_ENABLE_SMART_CAPTURE, SMART_CAPTURE_ON)
                .await
            {
                Ok(()) => self.smart_capture_enabled = true,
                Err(e) => warn!(session = %self.id, "Failed to enable smart capture: {}", e),
            }
        }

        Ok(geometry)
    }

    /// Release the sensor and return to `Uninitialized`.
    ///
    /// Valid from any state and idempotent. Driver close failures are logged
    /// and otherwise ignored.
    pub async fn close(&mut self) {
        if self.state.is_ready() {
            info!(session = %self.id, "Closing sensor");
            if let Err(e) = self.sensor.close().await {
                warn!(session = %self.id, "Error closing device: {}", e);
            }
        }

        self.geometry = ImageGeometry::ZERO;
        self.smart_capture_enabled = false;
        self.led_on = false;
        self.brightness = None;
        self.transition_to(SessionState::Uninitialized);
    }

    /// Switch the sensor LED.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` unless the session is ready
    /// - `SensorNotFound` if the driver rejects the command
    pub async fn set_led(&mut self, enabled: bool) -> Result<()> {
        self.require_ready()?;

        self.sensor.set_led_on(enabled).await.map_err(|e| {
            warn!(session = %self.id, "Failed to set LED: {}", e);
            Error::SensorNotFound(format!("Failed to set LED: {}", e))
        })?;

        self.led_on = enabled;
        debug!(session = %self.id, enabled, "LED updated");
        Ok(())
    }

    /// Toggle the local smart capture policy. Nothing is sent to the driver.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` unless the session is ready.
    pub fn set_smart_capture(&mut self, enabled: bool) -> Result<()> {
        self.require_ready()?;
        self.smart_capture_enabled = enabled;
        debug!(session = %self.id, enabled, "Smart capture policy updated");
        Ok(())
    }

    /// Set the sensor brightness.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` unless the session is ready
    /// - `SensorNotFound` if the driver rejects the command
    pub async fn set_brightness(&mut self, level: i32) -> Result<()> {
        self.require_ready()?;

        self.sensor.set_brightness(level).await.map_err(|e| {
            warn!(session = %self.id, "Failed to set brightness: {}", e);
            Error::SensorNotFound(format!("Failed to set brightness: {}", e))
        })?;

        self.brightness = Some(level);
        debug!(session = %self.id, level, "Brightness updated");
        Ok(())
    }

    pub(crate) fn require_ready(&self) -> Result<()> {
        if self.state.is_ready() {
            Ok(())
        } else {
            Err(Error::not_initialized())
        }
    }

    fn usb_host(&self) -> Result<&U> {
        self.usb
            .as_ref()
            .ok_or_else(|| Error::NotSupported("USB subsystem not available".to_string()))
    }
}

impl<S, U> DeviceSession<S, U> {
    /// Move to `new_state`, recording the transition.
    ///
    /// Same-state transitions are not recorded.
    pub(crate) fn transition_to(&mut self, new_state: SessionState) {
        if self.state == new_state {
            return;
        }

        debug_assert!(
            self.state.can_transition_to(&new_state),
            "invalid session transition {} -> {}",
            self.state,
            new_state
        );
        debug!(session = %self.id, from = %self.state, to = %new_state, "State transition");

        let transition = StateTransition::new(self.state, new_state);
        if self.config.history_capacity > 0 {
            if self.history.len() >= self.config.history_capacity {
                self.history.pop_front();
            }
            self.history.push_back(transition);
        }

        self.state = new_state;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Image geometry; zero unless the device is open.
    pub fn geometry(&self) -> ImageGeometry {
        self.geometry
    }

    pub fn image_width(&self) -> u32 {
        self.geometry.width
    }

    pub fn image_height(&self) -> u32 {
        self.geometry.height
    }

    pub fn smart_capture_enabled(&self) -> bool {
        self.smart_capture_enabled
    }

    /// Last LED value successfully sent to the driver.
    pub fn led_on(&self) -> bool {
        self.led_on
    }

    /// Last brightness successfully sent to the driver.
    pub fn brightness(&self) -> Option<i32> {
        self.brightness
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last N state transitions.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }
}

impl<S, U> std::fmt::Debug for DeviceSession<S, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("geometry", &self.geometry)
            .field("smart_capture_enabled", &self.smart_capture_enabled)
            .field("led_on", &self.led_on)
            .finish()
    }
}

impl<S, U> Drop for DeviceSession<S, U> {
    fn drop(&mut self) {
        if self.state.is_ready() {
            warn!(
                session = %self.id,
                "DeviceSession dropped while open - call close() on shutdown"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dactyl_core::ErrorKind;
    use dactyl_hardware::mock::{
        MockSensor, MockSensorHandle, MockUsbHandle, MockUsbHost, SensorOp,
    };
    use dactyl_hardware::{DeviceInfo, SensorError};

    type MockSession = DeviceSession<MockSensor, MockUsbHost>;

    fn session() -> (MockSession, MockSensorHandle, MockUsbHandle) {
        let (sensor, sensor_handle) = MockSensor::new();
        let (usb, usb_handle) = MockUsbHost::with_permission();
        (
            DeviceSession::new(sensor, Some(usb), SessionConfig::default()),
            sensor_handle,
            usb_handle,
        )
    }

    #[tokio::test]
    async fn test_new_session_is_uninitialized() {
        let (session, _, _) = session();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.geometry(), ImageGeometry::ZERO);
        assert!(!session.smart_capture_enabled());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_opens_device() {
        let (mut session, handle, _) = session();

        let outcome = session.initialize().await.unwrap();
        assert_eq!(outcome, Initialization::Opened);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.geometry(), ImageGeometry::new(10, 10));
        assert!(session.smart_capture_enabled());
        assert!(handle.is_open());
        assert_eq!(handle.template_format(), Some(dactyl_core::TemplateFormat::Iso19794));
        assert_eq!(
            handle.raw_commands(),
            vec![(WRITE_DATA_ENABLE_SMART_CAPTURE, SMART_CAPTURE_ON)]
        );
    }

    #[tokio::test]
    async fn test_driver_init_not_found_is_not_supported() {
        let (mut session, handle, _) = session();
        handle.fail(SensorOp::Init, SensorError::DeviceNotFound);

        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_driver_init_other_failure() {
        let (mut session, handle, _) = session();
        handle.fail(SensorOp::Init, SensorError::driver(2, "function failed"));

        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InitializationFailed);
        assert!(err.message().contains("function failed"));
    }

    #[tokio::test]
    async fn test_no_attached_device() {
        let (mut session, _, usb_handle) = session();
        usb_handle.detach();

        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SensorNotFound);
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_open_failure_keeps_state() {
        let (mut session, handle, _) = session();
        handle.fail(SensorOp::Open, SensorError::Usb("pipe error".to_string()));

        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SensorNotFound);
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.geometry(), ImageGeometry::ZERO);
    }

    #[tokio::test]
    async fn test_zero_geometry_enters_error() {
        let (mut session, handle, _) = session();
        handle.set_device_info(DeviceInfo::new(0, 0));

        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InitializationFailed);
        assert_eq!(session.state(), SessionState::Error);
        assert!(!handle.is_open());

        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InitializationFailed);

        session.close().await;
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_smart_capture_command_failure_leaves_policy_off() {
        let (mut session, handle, _) = session();
        handle.fail(SensorOp::RawCommand, SensorError::driver(9, "unsupported"));

        session.initialize().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(!session.smart_capture_enabled());
    }

    #[tokio::test]
    async fn test_smart_capture_on_open_disabled_by_config() {
        let (sensor, handle) = MockSensor::new();
        let (usb, _usb_handle) = MockUsbHost::with_permission();
        let config = SessionConfig::default().enable_smart_capture_on_open(false);
        let mut session = DeviceSession::new(sensor, Some(usb), config);

        session.initialize().await.unwrap();
        assert!(!session.smart_capture_enabled());
        assert!(handle.raw_commands().is_empty());
    }

    #[tokio::test]
    async fn test_led_and_brightness() {
        let (mut session, handle, _) = session();
        session.initialize().await.unwrap();

        session.set_led(true).await.unwrap();
        session.set_brightness(55).await.unwrap();

        assert!(session.led_on());
        assert_eq!(session.brightness(), Some(55));
        assert!(handle.led_on());
        assert_eq!(handle.brightness(), Some(55));
    }

    #[tokio::test]
    async fn test_led_driver_failure() {
        let (mut session, handle, _) = session();
        session.initialize().await.unwrap();
        handle.fail(SensorOp::Led, SensorError::disconnected("FDU05"));

        let err = session.set_led(true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SensorNotFound);
        assert!(!session.led_on());
    }

    #[tokio::test]
    async fn test_set_smart_capture_does_not_reach_driver() {
        let (mut session, handle, _) = session();
        session.initialize().await.unwrap();
        handle.clear_calls();

        session.set_smart_capture(false).unwrap();
        assert!(!session.smart_capture_enabled());
        session.set_smart_capture(true).unwrap();
        assert!(session.smart_capture_enabled());
        assert!(handle.calls().is_empty());
    }

    #[tokio::test]
    async fn test_commands_before_initialize() {
        let (mut session, handle, _) = session();

        assert_eq!(session.set_led(true).await.unwrap_err().kind(), ErrorKind::NotInitialized);
        assert_eq!(session.set_brightness(1).await.unwrap_err().kind(), ErrorKind::NotInitialized);
        assert_eq!(session.set_smart_capture(true).unwrap_err().kind(), ErrorKind::NotInitialized);
        assert!(handle.calls().is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut session, handle, _) = session();
        session.initialize().await.unwrap();

        session.close().await;
        session.close().await;

        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(handle.call_count(SensorOp::Close), 1);
    }

    #[tokio::test]
    async fn test_history_records_transitions() {
        let (mut session, _, _) = session();
        session.initialize().await.unwrap();
        session.close().await;

        let history: Vec<_> = session.history().iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            history,
            vec![
                (SessionState::Uninitialized, SessionState::Ready),
                (SessionState::Ready, SessionState::Uninitialized),
            ]
        );
        assert_eq!(session.last_transitions(1)[0].to, SessionState::Uninitialized);
    }

    fn session_with_history(capacity: usize) -> (MockSession, MockSensorHandle) {
        let (sensor, handle) = MockSensor::new();
        let (usb, _usb_handle) = MockUsbHost::with_permission();
        let config = SessionConfig {
            history_capacity: capacity,
            ..SessionConfig::default()
        };
        (DeviceSession::new(sensor, Some(usb), config), handle)
    }

    #[tokio::test]
    async fn test_history_evicts_oldest_transitions() {
        let (mut session, _handle) = session_with_history(2);

        for _ in 0..3 {
            session.initialize().await.unwrap();
            session.capture_plain(false).await.unwrap();
            session.close().await;
        }

        let history: Vec<_> = session.history().iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            history,
            vec![
                (SessionState::Capturing, SessionState::Ready),
                (SessionState::Ready, SessionState::Uninitialized),
            ]
        );
        assert_eq!(session.last_transitions(10).len(), 2);
    }

    #[tokio::test]
    async fn test_zero_history_capacity_records_nothing() {
        let (mut session, _handle) = session_with_history(0);

        session.initialize().await.unwrap();
        session.capture_plain(false).await.unwrap();
        session.close().await;

        assert!(session.history().is_empty());
        assert!(session.last_transitions(5).is_empty());
    }

    #[tokio::test]
    async fn test_huge_history_capacity_does_not_preallocate() {
        let (mut session, _handle) = session_with_history(usize::MAX);
        assert!(session.history().is_empty());

        session.initialize().await.unwrap();
        session.close().await;
        assert_eq!(session.history().len(), 2);
    }
}
