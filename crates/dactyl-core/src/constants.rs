//! Constants fixed by the fingerprint sensor protocol.
//!
//! These values are shared by the session, the capture pipeline and the
//! command facade. Changing them changes observable behavior for callers.

// ============================================================================
// Capture
// ============================================================================

/// Default acquisition timeout used by plain captures, in milliseconds.
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u32 = 10_000;

/// Extra time the pipeline waits beyond the driver's own timeout before it
/// declares the acquisition hung, in milliseconds.
pub const DEFAULT_TIMEOUT_GRACE_MS: u32 = 500;

/// Minimum quality meaning "no gating".
pub const NO_QUALITY_GATE: u32 = 0;

/// Highest quality score a sensor reports.
///
/// Quality scores range from 0 (lowest) to 100 (highest).
pub const MAX_QUALITY_SCORE: u32 = 100;

// ============================================================================
// Device
// ============================================================================

/// Unit index opened on the physical device.
pub const DEFAULT_DEVICE_INDEX: u32 = 0;

/// Raw command code that toggles smart capture on the sensor.
pub const WRITE_DATA_ENABLE_SMART_CAPTURE: u8 = 0x10;

/// Value written with [`WRITE_DATA_ENABLE_SMART_CAPTURE`] to turn it on.
pub const SMART_CAPTURE_ON: u8 = 1;

/// USB vendor id assigned to SecuGen.
pub const SECUGEN_VENDOR_ID: u16 = 0x1162;

// ============================================================================
// Templates
// ============================================================================

/// View number recorded for every capture; one impression per template.
pub const TEMPLATE_VIEW_NUMBER: u32 = 1;

/// Byte width of the quality value in a capture response.
pub const QUALITY_WIRE_BYTES: usize = 4;

/// Maximum number of state transitions kept in a session's history.
pub const MAX_HISTORY_SIZE: usize = 100;

/// Largest history capacity a configuration may request.
pub const MAX_HISTORY_CAPACITY: usize = 10_000;
