use crate::domain::model::{ExtractResult, LoadResult, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn api_key(&self) -> &str;
    fn api_base_url(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn output_prefix(&self) -> &str;
    fn source_code(&self) -> &str;
    fn rate_limit(&self) -> usize;
    fn rate_period(&self) -> Duration;
    fn max_in_flight(&self) -> usize;
    fn request_timeout(&self) -> Duration;
}

/// One entry of the list-holdings response. Only `holding_id` matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingEntry {
    pub holding_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoldingList {
    #[serde(default)]
    pub holding: Vec<HoldingEntry>,
    #[serde(default)]
    pub total_record_count: Option<u64>,
}

/// Read-only access to the catalog's holdings endpoints.
#[async_trait]
pub trait HoldingsApi: Send + Sync {
    /// `GET /bibs/{mms_id}/holdings`
    async fn list_holdings(&self, mms_id: &str) -> Result<HoldingList>;

    /// `GET /bibs/{mms_id}/holdings/{holding_id}`, returning the MARCXML body.
    async fn get_holding(&self, mms_id: &str, holding_id: &str) -> Result<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractResult>;
    async fn transform(&self, data: ExtractResult) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadResult>;
}
