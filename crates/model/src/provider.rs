use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// An error raised by a model provider, classified by [`ErrorKind`].
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A backend that samples chat completions.
///
/// Callers treat a provider as stateless: every request carries the whole
/// conversation and its options, and the provider may be dropped between
/// requests.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts a request.
    ///
    /// The returned future resolves once the provider has accepted the
    /// request; the answer itself is then streamed by the response. Failures
    /// are reported as they are, and retrying is up to the caller.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
