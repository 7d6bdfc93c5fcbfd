pub mod api_client;
pub mod endpoint;
pub mod transport;

pub use api_client::{ApiClient, ApiRequest, RetryPolicy, MAX_ATTEMPTS};
pub use endpoint::{Endpoint, EndpointKind, EndpointResolver};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};
