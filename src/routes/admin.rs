use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::{info, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, Reply};
use warp::Filter;

use super::response::SuccessResponse;

pub fn make_healthz_route(
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone + Send + Sync + 'static {
    warp::path("healthz").and(warp::get()).map(|| {
        json(&SuccessResponse::Healthz {
            revision: ::info::REVISION,
            timestamp: ::info::BUILD_TIMESTAMP,
            version: ::info::VERSION,
        })
    })
}

type TerminationFuture = BoxFuture<'static, ()>;

pub type TerminationFunctionWrapper = Arc<dyn Fn() -> TerminationFuture + Send + Sync>;

/// Shuts down both servers when called.
pub fn make_termination_route(
    logger: Arc<Logger>,
    terminate: TerminationFunctionWrapper,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone + Send + Sync + 'static {
    let handler = move || -> BoxFuture<'static, Result<StatusCode, std::convert::Infallible>> {
        let logger = logger.clone();
        let terminate = terminate.clone();

        async move {
            info!(logger, "Termination requested");
            terminate().await;
            Ok(StatusCode::NO_CONTENT)
        }
        .boxed()
    };

    warp::path("terminate").and(warp::post()).and_then(handler)
}
