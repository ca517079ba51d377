//! Request logging middleware: one line when a request starts, one when it ends.
//!
//! Query strings are not logged; `/callback` carries the authorization code.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::StatusCode;
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::auth::SESSION_COOKIE;

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
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
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        // Presence only; the cookie value is never printed
        let session = if req.cookie(SESSION_COOKIE).is_some() {
            "present"
        } else {
            "none"
        };

        info!(
            target: "http",
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            session = %session,
            "→ Request started"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            log_finished(&method, &path, res.status(), start.elapsed());
            Ok(res)
        })
    }
}

fn log_finished(method: &str, path: &str, status: StatusCode, elapsed: Duration) {
    let status_code = status.as_u16();
    let duration_ms = elapsed.as_millis();

    if status.is_client_error() {
        warn!(target: "http", method, path, status = status_code, duration_ms, "← Client error");
    } else if status.is_server_error() {
        warn!(target: "http", method, path, status = status_code, duration_ms, "← Server error");
    } else {
        // Redirects count as success; most browser routes answer with one
        info!(target: "http", method, path, status = status_code, duration_ms, "← Request completed");
    }
}
