use afz_core::{FetchContext, FetchRequest};
use tracing::debug;

use super::{Strategies, StrategyResult};

pub(super) async fn run(strategies: &Strategies, request: &FetchRequest) -> StrategyResult {
    match strategies.fetch(request).await {
        Ok(response) => {
            strategies.remember(request, &response).await;
            Ok((response, FetchContext::network()))
        }
        Err(error) => match strategies.cached(request).await {
            Some((response, store)) => {
                debug!(url = %request.url, %error, %store, "network failed, serving stored copy");
                Ok((response, FetchContext::hit(store)))
            }
            None => Err(error.into()),
        },
    }
}
