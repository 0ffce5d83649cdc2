pub mod config;
mod convert;
mod endpoint;
mod sink;
mod source;

pub use convert::{DecodePipeline, EncodePipeline};
pub use endpoint::{ReadEndpoint, WriteEndpoint};
pub use sink::produce;
pub use source::{consume, ConsumeMode, ConsumeSummary};
