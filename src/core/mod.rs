pub mod emitter;
pub mod etl;
pub mod fetcher;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod retriever;
pub mod throttle;

pub use crate::domain::model::{ExtractResult, HoldingRecord, LoadResult, RunReport, TransformResult};
pub use crate::domain::ports::{ConfigProvider, HoldingsApi, Pipeline, Storage};
pub use crate::utils::error::Result;
