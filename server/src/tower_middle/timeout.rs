use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use hyper::{Request, Response, StatusCode};
use tokio::time;
use tower::{Layer, Service};

use crate::ResponseBody;
use crate::handlers::http::utils::deliver_error_json;

/// Tower layer for request timeouts
///
/// If the inner service does not respond within the configured
/// duration, a 408 Request Timeout error envelope is returned.
#[derive(Clone, Debug)]
pub struct TimeoutLayer {
    duration: Duration,
}

impl TimeoutLayer {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            duration: self.duration,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TimeoutService<S> {
    inner: S,
    duration: Duration,
}

impl<S, ReqBody> Service<Request<ReqBody>> for TimeoutService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResponseBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let duration = self.duration;
        // Swap in a fresh clone so the ready service is the one called.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match time::timeout(duration, inner.call(req)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Request timed out after {:?}", duration);
                    Ok(timeout_response())
                }
            }
        })
    }
}

fn timeout_response() -> Response<ResponseBody> {
    deliver_error_json(
        "REQUEST_TIMEOUT",
        "Request timed out",
        StatusCode::REQUEST_TIMEOUT,
    )
    .unwrap_or_else(|_| {
        let mut response = Response::new(ResponseBody::default());
        *response.status_mut() = StatusCode::REQUEST_TIMEOUT;
        response
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{ServiceExt, service_fn};

    #[tokio::test]
    async fn slow_service_gets_408() {
        let slow = service_fn(|_req: Request<()>| async {
            time::sleep(Duration::from_secs(60)).await;
            Ok::<_, Infallible>(Response::new(ResponseBody::default()))
        });
        let svc = TimeoutLayer::new(Duration::from_millis(20)).layer(slow);

        let response = svc.oneshot(Request::new(())).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn fast_service_passes_through() {
        let fast = service_fn(|_req: Request<()>| async {
            Ok::<_, Infallible>(Response::new(ResponseBody::default()))
        });
        let svc = TimeoutLayer::new(Duration::from_secs(5)).layer(fast);

        let response = svc.oneshot(Request::new(())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
