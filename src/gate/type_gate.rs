//! Type gate Tower layer.
//!
//! Rejects requests whose bearer credential is not a valid access
//! credential before they reach the wrapped service.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::{HeaderValue, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::debug;

use crate::metrics;
use crate::service::TokenService;

const BEARER_PREFIX: &str = "Bearer ";

/// Type gate layer for Tower
#[derive(Clone)]
pub struct TypeGateLayer {
    tokens: Arc<TokenService>,
}

impl TypeGateLayer {
    /// Creates a gate validating credentials through `tokens`
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl<S> Layer<S> for TypeGateLayer {
    type Service = TypeGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TypeGateService {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

/// Type gate service wrapper
pub struct TypeGateService<S> {
    inner: S,
    tokens: Arc<TokenService>,
}

impl<S: Clone> Clone for TypeGateService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

/// Bearer credential carried by the request, if any.
///
/// `Err(())` means an `Authorization` header that cannot be read as text.
fn bearer_token<B>(req: &Request<B>) -> Result<Option<String>, ()> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| ())?;
    Ok(value.strip_prefix(BEARER_PREFIX).map(str::to_string))
}

fn unauthorized<B: Default>() -> Response<B> {
    let mut res = Response::new(B::default());
    *res.status_mut() = StatusCode::UNAUTHORIZED;
    res.headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TypeGateService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let tokens = self.tokens.clone();
        // The instance polled ready is the one that gets called
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let token = match bearer_token(&req) {
                Ok(Some(token)) => token,
                Ok(None) => return inner.call(req).await,
                Err(()) => {
                    metrics::record_gate_rejection("MALFORMED_HEADER");
                    return Ok(unauthorized());
                }
            };

            match tokens.authenticate(&token).await {
                Ok(principal) => {
                    req.extensions_mut().insert(principal);
                    inner.call(req).await
                }
                Err(e) => {
                    let code = e.code();
                    metrics::record_gate_rejection(code.as_str());
                    debug!(code = code.as_str(), path = %req.uri().path(), "Type gate rejected request");
                    Ok(unauthorized())
                }
            }
        })
    }
}
