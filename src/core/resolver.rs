use crate::core::fetcher::{Outcome, RateLimitedFetcher};
use crate::domain::model::HoldingReference;
use crate::domain::ports::HoldingsApi;

/// Turn MMS ids into (MMS id, holding id) pairs via list-holdings.
///
/// Entries without a `holding_id` are ignored. An id whose call failed
/// contributes nothing; the failure was already logged by the fetcher.
pub async fn resolve_holdings<A: HoldingsApi + ?Sized>(
    fetcher: &RateLimitedFetcher,
    api: &A,
    mms_ids: Vec<String>,
) -> Vec<HoldingReference> {
    let outcomes = fetcher
        .fetch_all(mms_ids, |mms_id| async move { api.list_holdings(&mms_id).await })
        .await;

    outcomes
        .into_iter()
        .filter_map(Outcome::into_fetched)
        .flat_map(|(mms_id, list)| {
            list.holding
                .into_iter()
                .filter_map(|entry| entry.holding_id)
                .map(move |holding_id| HoldingReference::new(mms_id.clone(), holding_id))
        })
        .collect()
}
