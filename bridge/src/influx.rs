use crate::errors::{Error, Result};
use crate::model::DecodedReading;
use crate::process::PointWriter;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal InfluxDB 1.x client: line protocol over HTTP.
pub struct InfluxClient {
    http: Client,
    write_url: String,
    query_url: String,
    database: String,
}

impl InfluxClient {
    pub fn new(host: &str, port: u16, database: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base = format!("http://{host}:{port}");

        Ok(InfluxClient {
            http,
            write_url: format!("{base}/write?db={database}&precision=ns"),
            query_url: format!("{base}/query"),
            database: database.to_string(),
        })
    }

    /// Creates the target database. Idempotent on the Influx side, so safe to
    /// run at every startup; also doubles as the startup connectivity check.
    pub async fn ensure_database(&self) -> Result<()> {
        let response = self
            .http
            .post(&self.query_url)
            .form(&[("q", format!("CREATE DATABASE \"{}\"", self.database))])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "create database returned {status}: {body}"
            )));
        }

        info!("Store ready, database {:?}", self.database);
        Ok(())
    }
}

#[async_trait]
impl PointWriter for InfluxClient {
    async fn write_point(&self, reading: &DecodedReading) -> Result<()> {
        let response = self
            .http
            .post(&self.write_url)
            .body(line_protocol(reading))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!("write returned {status}: {body}")));
        }

        Ok(())
    }
}

/// Renders one reading as an InfluxDB line protocol point.
fn line_protocol(reading: &DecodedReading) -> String {
    format!(
        "{},origin={},device={} temperature={},humidity={},raw_hex=\"{}\",timestamp_source=\"{}\" {}",
        escape_measurement(reading.measurement),
        escape_tag(reading.origin),
        escape_tag(reading.device),
        reading.temperature,
        reading.humidity,
        escape_string_field(&reading.raw_hex),
        reading.timestamp_source.as_field(),
        reading.timestamp,
    )
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_string_field(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TimestampSource, MEASUREMENT, TAG_DEVICE, TAG_ORIGIN};

    fn reading() -> DecodedReading {
        DecodedReading {
            measurement: MEASUREMENT,
            origin: TAG_ORIGIN,
            device: TAG_DEVICE,
            timestamp: 1_000_000_000,
            temperature: 24.0,
            humidity: 50.5,
            raw_hex: "0960138A".to_string(),
            timestamp_source: TimestampSource::Satellite,
        }
    }

    #[test]
    fn test_line_protocol_shape() {
        assert_eq!(
            line_protocol(&reading()),
            "sensores_esp32,origin=Satelite,device=Myriota_UltraLite \
             temperature=24,humidity=50.5,raw_hex=\"0960138A\",\
             timestamp_source=\"satelite\" 1000000000"
        );
    }

    #[test]
    fn test_server_source_literal() {
        let mut r = reading();
        r.timestamp_source = TimestampSource::Server;
        assert!(line_protocol(&r).contains("timestamp_source=\"servidor\""));
    }

    #[test]
    fn test_tag_escaping() {
        assert_eq!(escape_tag("a b,c=d"), "a\\ b\\,c\\=d");
        assert_eq!(escape_string_field("he said \"hi\"\\"), "he said \\\"hi\\\"\\\\");
    }
}
