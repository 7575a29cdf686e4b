//! Networking contracts: site URLs, request/response messages, and the fetch seam.

pub mod fetch;
pub mod http;
pub mod url;

pub use fetch::Fetcher;
pub use fetch::MemoryFetcher;
pub use fetch::StaticSiteFetcher;
pub use http::Header;
pub use http::Method;
pub use http::Request;
pub use http::Response;
pub use http::ResponseType;
pub use http::StatusCode;
pub use url::SiteUrl;

/// Builds a GET request for `reference` resolved against `base`.
pub fn get_request(base: &SiteUrl, reference: &str) -> sdt_core::ShellResult<Request> {
    Ok(Request::get(base.join(reference)?))
}
