pub mod decode;
pub mod errors;
pub mod influx;
pub mod metrics;
pub mod model;
pub mod process;
pub mod tago;
