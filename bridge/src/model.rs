use serde::Deserialize;

/// Measurement every decoded point is written under. Fixed for compatibility
/// with data written by earlier versions of the bridge.
pub const MEASUREMENT: &str = "sensores_esp32";
pub const TAG_ORIGIN: &str = "Satelite";
pub const TAG_DEVICE: &str = "Myriota_UltraLite";

/// One raw device message as returned by the telemetry API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    /// Arrival timestamp in provider clock units (nanoseconds).
    pub time: i64,
    /// Raw payload, possibly quoted or padded by the device or the API.
    pub value: String,
}

/// Envelope of the TagoIO `/data` endpoint.
#[derive(Debug, Deserialize)]
pub struct TagoResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub result: Vec<RawMessage>,
}

/// Which clock produced the resolved timestamp of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    /// Epoch embedded by the device inside a 16-character payload.
    Satellite,
    /// Arrival timestamp recorded by the telemetry provider.
    Server,
}

impl TimestampSource {
    /// Literal stored in the `timestamp_source` field. The Spanish values are
    /// what the original bridge wrote, so they must not change.
    pub fn as_field(&self) -> &'static str {
        match self {
            TimestampSource::Satellite => "satelite",
            TimestampSource::Server => "servidor",
        }
    }

    /// Short tag used in log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            TimestampSource::Satellite => "SAT",
            TimestampSource::Server => "SRV",
        }
    }
}

/// A decoded sensor reading, ready to be written as a single point.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReading {
    pub measurement: &'static str,
    pub origin: &'static str,
    pub device: &'static str,
    /// Nanosecond-resolution event timestamp.
    pub timestamp: i64,
    pub temperature: f64,
    pub humidity: f64,
    /// Payload after quote stripping and padding removal.
    pub raw_hex: String,
    pub timestamp_source: TimestampSource,
}
