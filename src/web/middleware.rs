use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web::Bytes,
};
use futures_util::{future::LocalBoxFuture, FutureExt};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use tracing::{debug, warn};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Decode a `sha256=<hex>` signature header value.
pub fn parse_signature(value: &[u8]) -> Result<Vec<u8>, actix_web::Error> {
    let value = std::str::from_utf8(value).map_err(actix_web::error::ErrorBadRequest)?;

    let hex_digest = value
        .strip_prefix("sha256=")
        .ok_or_else(|| actix_web::error::ErrorBadRequest("missing prefix"))?;

    hex::decode(hex_digest).map_err(actix_web::error::ErrorBadRequest)
}

pub struct VerifySignature<S> {
    service: Rc<S>,
    verify_signature: bool,
    hasher: Hmac<Sha256>,
}

impl<S, B> Service<ServiceRequest> for VerifySignature<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        // Clone the Rc pointers so we can move them into the async block.
        let srv = self.service.clone();
        let mut hasher = self.hasher.clone();

        let verify_signature = self.verify_signature;

        async move {
            if verify_signature {
                let signature_header = req
                    .headers()
                    .get(SIGNATURE_HEADER)
                    .ok_or_else(|| actix_web::error::ErrorBadRequest("missing signature header"))?;

                let signature_bytes = parse_signature(signature_header.as_bytes())?;

                let body = req.extract::<Bytes>().await?;

                hasher.update(&body);

                hasher.verify_slice(&signature_bytes).map_err(|e| {
                    warn!("Signature mismatch for {}", req.path());
                    actix_web::error::ErrorUnauthorized(e)
                })?;

                debug!("Signature verified");

                // re-insert body back into request to be used by handlers
                req.set_payload(bytes_to_payload(body));
            }

            srv.call(req).await
        }
        .boxed_local()
    }
}

#[derive(Clone)]
pub struct VerifySignatureFactory {
    verify_signature: bool,
    hasher: Hmac<Sha256>,
}

impl VerifySignatureFactory {
    pub fn new(verify_signature: bool, secret: &str) -> anyhow::Result<Self> {
        let hasher = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid signature secret: {e}"))?;

        Ok(Self {
            verify_signature,
            hasher,
        })
    }
}

impl<S, B> Transform<S, ServiceRequest> for VerifySignatureFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = VerifySignature<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(VerifySignature {
            service: Rc::new(service),
            verify_signature: self.verify_signature,
            hasher: self.hasher.clone(),
        }))
    }
}

fn bytes_to_payload(buf: Bytes) -> actix_web::dev::Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    actix_web::dev::Payload::from(pl)
}
