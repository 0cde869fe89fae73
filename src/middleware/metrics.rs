use crate::state::AppState;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::Instant,
};

/// Bucket for requests that match no registered route
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

const STANDARD_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
];

/// Counts requests and errors per endpoint into `AppState::metrics`.
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService { service }))
    }
}

/// Metrics key of a request: "METHOD /route/pattern".
///
/// Unrouted paths and non-standard methods each share one bucket, so clients cannot
/// grow the metrics map by inventing paths or verbs.
pub fn endpoint_key(req: &ServiceRequest) -> String {
    let method = if STANDARD_METHODS.contains(req.method()) {
        req.method().as_str()
    } else {
        "OTHER"
    };
    let pattern = req
        .match_pattern()
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    format!("{} {}", method, pattern)
}

pub struct MetricsMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let endpoint = endpoint_key(&req);

        // Grab the state up front so failed requests are counted too
        let app_state = req.app_data::<web::Data<AppState>>().cloned();
        if let Some(state) = &app_state {
            state.increment_request_count();
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            let is_error = match &result {
                Ok(response) => response.status().is_client_error() || response.status().is_server_error(),
                Err(_) => true,
            };

            if let Some(state) = app_state {
                state.record_endpoint_request(&endpoint, duration_ms, is_error);
                if is_error {
                    state.increment_error_count();
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::transcript::testing::FakeProvider;
    use actix_web::{test, App, HttpResponse};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_counts_requests_and_errors() {
        let state = AppState::new(AppConfig::default(), Arc::new(FakeProvider::english(&[])));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(MetricsMiddleware)
                .route("/ok", web::get().to(HttpResponse::Ok))
                .route("/bad", web::get().to(HttpResponse::BadRequest)),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/ok").to_request()).await;
        test::call_service(&app, test::TestRequest::get().uri("/bad").to_request()).await;

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.endpoint_metrics["GET /bad"].error_count, 1);
        assert_eq!(snapshot.endpoint_metrics["GET /ok"].request_count, 1);
    }

    #[actix_web::test]
    async fn test_unknown_paths_share_one_entry() {
        let state = AppState::new(AppConfig::default(), Arc::new(FakeProvider::english(&[])));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(MetricsMiddleware)
                .service(web::scope("/api").route("/items/{id}", web::get().to(HttpResponse::Ok))),
        )
        .await;

        for i in 0..50 {
            let uri = format!("/junk-{}", i);
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
            let uri = format!("/api/items/{}", i);
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        }
        let req = test::TestRequest::default()
            .method(Method::from_bytes(b"BREW").unwrap())
            .uri("/junk")
            .to_request();
        test::call_service(&app, req).await;

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.endpoint_metrics.len(), 3);
        assert_eq!(snapshot.endpoint_metrics["GET <unmatched>"].request_count, 50);
        assert_eq!(snapshot.endpoint_metrics["GET <unmatched>"].error_count, 50);
        assert_eq!(snapshot.endpoint_metrics["GET /api/items/{id}"].request_count, 50);
        assert_eq!(snapshot.endpoint_metrics["OTHER <unmatched>"].request_count, 1);
    }
}
