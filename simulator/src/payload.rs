use chrono::Utc;
use rand::Rng;
use serde::Serialize;

/// One simulated device message in the TagoIO `/data` shape.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Arrival timestamp in nanoseconds.
    pub time: i64,
    pub value: String,
}

impl Message {
    /// Generates a message the way the Myriota modem emits them: hex-encoded
    /// temperature and humidity, usually followed by an embedded epoch, with
    /// the occasional padded, quoted or garbage payload mixed in.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let temperature: f64 = rng.gen_range(15.0..35.0);
        let humidity: f64 = rng.gen_range(30.0..80.0);
        let fields = format!(
            "{:04X}{:04X}",
            (temperature * 100.0) as u16,
            (humidity * 100.0) as u16
        );

        let now = Utc::now();
        let value = match rng.gen_range(0..10) {
            0 => format!("\"{fields}CCCCCCCC\""),
            1 => "ZZ".to_string(),
            2..=4 => fields.clone(),
            _ => format!("{fields}{:08X}", now.timestamp()),
        };

        Message {
            time: now.timestamp_nanos_opt().unwrap_or_default(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_message_has_arrival_time() {
        let message = Message::random();
        assert!(message.time > 0);
        assert!(!message.value.is_empty());
    }
}
