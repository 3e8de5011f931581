//! Output sinks for bulk export files

pub mod sink;

pub use sink::{ByteStream, DirectorySink, OutputSink};
