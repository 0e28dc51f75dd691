use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::ApiError;
use crate::policy::CallerIdentity;

/// Handlers receive the caller by value; the middleware has already verified
/// the token, so extraction is a plain extensions lookup.
impl FromRequest for CallerIdentity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CallerIdentity>()
                .cloned()
                .ok_or(ApiError::TokenInvalid),
        )
    }
}
