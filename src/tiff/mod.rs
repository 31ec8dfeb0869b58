pub mod data_types;
pub mod geo_keys;
pub mod georef;
pub mod ifd;
pub mod reader;
pub mod tags;
pub mod writer;
