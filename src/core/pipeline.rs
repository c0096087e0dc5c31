use crate::adapters::AlmaClient;
use crate::core::emitter::{encode_records, filter_annotated, output_file_name};
use crate::core::fetcher::RateLimitedFetcher;
use crate::core::normalizer::{current_timestamp, normalize, NormalizationContext};
use crate::core::resolver::resolve_holdings;
use crate::core::retriever::retrieve_records;
use crate::core::throttle::Throttle;
use crate::core::{ConfigProvider, HoldingsApi, Pipeline, Storage};
use crate::domain::model::{ExtractResult, HoldingRecord, LoadResult, TransformResult};
use crate::marc::{binary, extract_identifiers};
use crate::utils::error::Result;
use chrono::Local;
use std::path::Path;
use std::sync::Arc;

/// Alma holdings export: input MARC file → holdings → normalized MARC file.
pub struct HoldingsPipeline<S: Storage, C: ConfigProvider, A: HoldingsApi> {
    storage: S,
    config: C,
    api: A,
    holding_ids: RateLimitedFetcher,
    holding_records: RateLimitedFetcher,
}

impl<S: Storage, C: ConfigProvider> HoldingsPipeline<S, C, AlmaClient> {
    pub fn from_config(storage: S, config: C) -> Result<Self> {
        let api = AlmaClient::new(config.api_base_url(), config.api_key(), config.request_timeout())?;
        Ok(Self::new(storage, config, api))
    }
}

impl<S: Storage, C: ConfigProvider, A: HoldingsApi> HoldingsPipeline<S, C, A> {
    pub fn new(storage: S, config: C, api: A) -> Self {
        // 兩種呼叫各自一個節流器
        let fetcher = |name| {
            let throttle = Arc::new(Throttle::new(config.rate_limit(), config.rate_period()));
            RateLimitedFetcher::new(name, throttle, config.max_in_flight())
        };
        let holding_ids = fetcher("GetHoldingIDs");
        let holding_records = fetcher("GetHoldingXML");

        Self {
            storage,
            config,
            api,
            holding_ids,
            holding_records,
        }
    }

    async fn read_identifiers(&self) -> Result<Vec<String>> {
        let bytes = self.storage.read_file(self.config.input_path()).await?;

        let mut records = Vec::new();
        for (index, result) in binary::read_records(&bytes).enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping input record #{}: {}", index + 1, e),
            }
        }
        tracing::debug!("Decoded {} input record(s)", records.len());

        Ok(extract_identifiers(&records))
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, A: HoldingsApi> Pipeline for HoldingsPipeline<S, C, A> {
    async fn extract(&self) -> Result<ExtractResult> {
        println!("Extracting MMS IDs...");
        let mms_ids = self.read_identifiers().await?;
        let identifiers = mms_ids.len();
        println!("Extraction finished, {} MMS ID(s) extracted.", identifiers);

        println!("Gathering Holding IDs...");
        let references = resolve_holdings(&self.holding_ids, &self.api, mms_ids).await;
        let holding_references = references.len();
        println!("{} holding ID(s) gathered.", holding_references);

        println!("Gathering Holding Record XML...");
        let records = retrieve_records(&self.holding_records, &self.api, references).await;
        tracing::debug!("Retrieved {} holding record(s)", records.len());

        Ok(ExtractResult {
            identifiers,
            holding_references,
            records,
        })
    }

    async fn transform(&self, data: ExtractResult) -> Result<TransformResult> {
        println!("Parsing Holding Record XML...");
        let mut normalized = Vec::new();
        let mut skipped = 0;

        for HoldingRecord { reference, record } in data.records {
            if !record.has_action_note() {
                tracing::debug!("No 583 on {}, not exported", reference);
                skipped += 1;
                continue;
            }
            let context = NormalizationContext::new(&reference, self.config.source_code(), current_timestamp());
            normalized.push(normalize(&record, &context));
        }

        println!("{} holding record(s) gathered.", normalized.len());
        Ok(TransformResult { normalized, skipped })
    }

    async fn load(&self, result: TransformResult) -> Result<LoadResult> {
        println!("Converting from MARCXML to a MARC21 binary file...");
        let filtered = filter_annotated(result.normalized);
        let (bytes, records_written) = encode_records(&filtered.records);

        let file_name = output_file_name(self.config.output_prefix(), Local::now().date_naive());
        let output_path = Path::new(self.config.output_dir())
            .join(file_name)
            .to_string_lossy()
            .into_owned();

        tracing::debug!("Writing {} bytes to {}", bytes.len(), output_path);
        self.storage.write_file(&output_path, &bytes).await?;

        println!(
            "Finished. {} MARCXML records converted to MARC21 binary.",
            records_written
        );
        Ok(LoadResult {
            output_path,
            records_written,
            records_rejected: filtered.rejected.len(),
        })
    }
}
