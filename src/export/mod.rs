pub mod influxdb;
pub mod point;

pub use influxdb::*;
pub use point::*;
