use crate::core::fetcher::{Outcome, RateLimitedFetcher};
use crate::domain::model::{HoldingRecord, HoldingReference};
use crate::domain::ports::HoldingsApi;
use crate::marc::xml;
use crate::utils::error::EtlError;

/// Fetch and parse the MARCXML body of every holding reference.
///
/// A body that cannot be parsed is treated like a failed call: logged by the
/// fetcher and left out of the result.
pub async fn retrieve_records<A: HoldingsApi + ?Sized>(
    fetcher: &RateLimitedFetcher,
    api: &A,
    references: Vec<HoldingReference>,
) -> Vec<HoldingRecord> {
    let outcomes = fetcher
        .fetch_all(references, |reference| async move {
            let body = api.get_holding(&reference.mms_id, &reference.holding_id).await?;
            let record = xml::parse_record(&body)?;
            Ok::<_, EtlError>(record)
        })
        .await;

    outcomes
        .into_iter()
        .filter_map(Outcome::into_fetched)
        .map(|(reference, record)| HoldingRecord { reference, record })
        .collect()
}
