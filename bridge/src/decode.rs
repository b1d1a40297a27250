use crate::errors::Error;
use crate::metrics::SATELLITE_TS_FALLBACK_TOTAL;
use crate::model::{DecodedReading, TimestampSource, MEASUREMENT, TAG_DEVICE, TAG_ORIGIN};
use std::ops::Range;

/// Minimum payload length carrying temperature and humidity.
const MIN_PAYLOAD_LEN: usize = 8;
/// Payload length that additionally carries the satellite epoch.
const TIMESTAMPED_PAYLOAD_LEN: usize = 16;
/// Fill pattern the Myriota modem appends to short messages.
const FILL_PATTERN: &str = "CCCC";

/// Outcome of decoding one raw message value.
#[derive(Debug)]
pub enum DecodeOutcome {
    Success(DecodedReading),
    /// Payload was recognizably not a reading (e.g. too short). Not an error.
    Skipped(&'static str),
    /// Payload looked like a reading but could not be parsed.
    Failed(Error),
}

/// Decodes a raw payload string against its arrival time (provider clock,
/// nanoseconds).
///
/// Never panics or propagates: every malformed input maps to `Skipped` or
/// `Failed`, so the caller can keep advancing its watermark past bad data.
pub fn decode(raw_value: &str, arrival_time: i64) -> DecodeOutcome {
    let cleaned = normalize(raw_value);

    if cleaned.len() < MIN_PAYLOAD_LEN {
        return DecodeOutcome::Skipped("payload too short");
    }

    let temperature = match parse_hex_field(&cleaned, 0..4) {
        Ok(v) => v as f64 / 100.0,
        Err(detail) => return failed(raw_value, detail),
    };
    let humidity = match parse_hex_field(&cleaned, 4..8) {
        Ok(v) => v as f64 / 100.0,
        Err(detail) => return failed(raw_value, detail),
    };

    let (timestamp, timestamp_source) = resolve_timestamp(&cleaned, arrival_time);

    DecodeOutcome::Success(DecodedReading {
        measurement: MEASUREMENT,
        origin: TAG_ORIGIN,
        device: TAG_DEVICE,
        timestamp,
        temperature,
        humidity,
        raw_hex: cleaned,
        timestamp_source,
    })
}

/// Strips quote and comma characters, trims whitespace, then truncates at the
/// first fill pattern occurrence.
fn normalize(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | ','))
        .collect();
    let trimmed = stripped.trim();

    match trimmed.find(FILL_PATTERN) {
        Some(at) => trimmed[..at].to_string(),
        None => trimmed.to_string(),
    }
}

fn parse_hex_field(payload: &str, range: Range<usize>) -> Result<u64, String> {
    let Some(slice) = payload.get(range.clone()) else {
        return Err(format!(
            "no hex field at bytes {}..{}",
            range.start, range.end
        ));
    };
    u64::from_str_radix(slice, 16).map_err(|e| format!("bad hex {slice:?}: {e}"))
}

/// Two-tier timestamp policy: a 16-character payload carries a big-endian hex
/// epoch-seconds value in [8,16); when it parses to a positive number it wins
/// over the arrival time. Anything else falls back to the arrival time
/// without surfacing an error; the fallback counter makes the frequency
/// observable.
fn resolve_timestamp(payload: &str, arrival_time: i64) -> (i64, TimestampSource) {
    if payload.len() == TIMESTAMPED_PAYLOAD_LEN {
        match parse_hex_field(payload, 8..16) {
            Ok(epoch) if epoch > 0 => {
                return (epoch as i64 * 1_000_000_000, TimestampSource::Satellite);
            }
            _ => SATELLITE_TS_FALLBACK_TOTAL.inc(),
        }
    }
    (arrival_time, TimestampSource::Server)
}

fn failed(raw: &str, detail: String) -> DecodeOutcome {
    DecodeOutcome::Failed(Error::Decode {
        raw: raw.to_string(),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_success(outcome: DecodeOutcome) -> DecodedReading {
        match outcome {
            DecodeOutcome::Success(reading) => reading,
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_with_satellite_epoch() {
        // temp 0x0960 = 2400, hum 0x1388 = 5000, epoch 0x01 = 1s
        let reading = expect_success(decode("0960138800000001", 42));

        assert_eq!(reading.temperature, 24.00);
        assert_eq!(reading.humidity, 50.00);
        assert_eq!(reading.timestamp, 1_000_000_000);
        assert_eq!(reading.timestamp_source, TimestampSource::Satellite);
        assert_eq!(reading.raw_hex, "0960138800000001");
        assert_eq!(reading.measurement, "sensores_esp32");
        assert_eq!(reading.origin, "Satelite");
        assert_eq!(reading.device, "Myriota_UltraLite");
    }

    #[test]
    fn test_short_payload_is_skipped() {
        assert!(matches!(
            decode("0960", 42),
            DecodeOutcome::Skipped("payload too short")
        ));
    }

    #[test]
    fn test_padding_is_stripped_before_length_check() {
        // After truncating at CCCC the payload is 8 chars, not 16, so the
        // trailing bytes never get interpreted as an epoch.
        let reading = expect_success(decode("09601388CCCCextra", 42));

        assert_eq!(reading.temperature, 24.00);
        assert_eq!(reading.humidity, 50.00);
        assert_eq!(reading.raw_hex, "09601388");
        assert_eq!(reading.timestamp, 42);
        assert_eq!(reading.timestamp_source, TimestampSource::Server);
    }

    #[test]
    fn test_quotes_and_commas_are_stripped() {
        let reading = expect_success(decode("  \"'0960,1388'\"  ", 42));

        assert_eq!(reading.raw_hex, "09601388");
        assert_eq!(reading.temperature, 24.00);
        assert_eq!(reading.humidity, 50.00);
    }

    #[test]
    fn test_malformed_hex_fails() {
        match decode("ZZZZ1388", 42) {
            DecodeOutcome::Failed(Error::Decode { raw, .. }) => {
                assert_eq!(raw, "ZZZZ1388");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_epoch_falls_back_to_server_time() {
        let reading = expect_success(decode("0960138800000000", 42));

        assert_eq!(reading.timestamp, 42);
        assert_eq!(reading.timestamp_source, TimestampSource::Server);
    }

    #[test]
    fn test_unparseable_epoch_falls_back_to_server_time() {
        let reading = expect_success(decode("09601388GGGGGGGG", 42));

        assert_eq!(reading.timestamp, 42);
        assert_eq!(reading.timestamp_source, TimestampSource::Server);
        assert_eq!(reading.temperature, 24.00);
    }

    #[test]
    fn test_intermediate_length_uses_server_time() {
        // 12 chars: valid fields, but not the exact epoch-carrying length.
        let reading = expect_success(decode("096013880000", 42));

        assert_eq!(reading.timestamp, 42);
        assert_eq!(reading.timestamp_source, TimestampSource::Server);
    }

    #[test]
    fn test_payload_of_only_padding_is_skipped() {
        assert!(matches!(
            decode("CCCCCCCCCCCC", 42),
            DecodeOutcome::Skipped(_)
        ));
    }

    #[test]
    fn test_multibyte_garbage_does_not_panic() {
        assert!(!matches!(
            decode("ññññññññ", 42),
            DecodeOutcome::Success(_)
        ));
    }
}
