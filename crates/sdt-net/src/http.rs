//! Request/response contracts shared by the page, the router and the navigation cache.

use crate::url::SiteUrl;
use sdt_core::ShellError;
use sdt_core::ShellResult;

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

/// Single header with a wire-safe name/value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: &str, value: &str) -> ShellResult<Self> {
        if !is_valid_header_name(name) {
            return Err(ShellError::new(
                "net.http.header_name_invalid",
                format!("invalid header name `{name}`"),
            ));
        }

        if value.bytes().any(|byte| matches!(byte, b'\r' | b'\n' | 0)) {
            return Err(ShellError::new(
                "net.http.header_value_invalid",
                format!("invalid characters found in header `{name}`"),
            ));
        }

        Ok(Self {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// Outgoing request as seen by fetch interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: SiteUrl,
    pub headers: Vec<Header>,
}

impl Request {
    pub fn get(url: SiteUrl) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// Key under which a response to this request is cached.
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }
}

/// Status code wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: Self = Self(200);
    pub const NOT_FOUND: Self = Self(404);
    pub const METHOD_NOT_ALLOWED: Self = Self(405);
    pub const REQUEST_TIMEOUT: Self = Self(408);
    pub const SERVICE_UNAVAILABLE: Self = Self(503);

    pub fn new(code: u16) -> ShellResult<Self> {
        if (100..=599).contains(&code) {
            return Ok(Self(code));
        }

        Err(ShellError::new(
            "net.http.status_invalid",
            format!("status code must be 100-599, got `{code}`"),
        ))
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn is_success(self) -> bool {
        (200..=299).contains(&self.0)
    }

    pub fn canonical_reason(self) -> &'static str {
        match self.0 {
            200 => "OK",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "",
        }
    }
}

/// How the response relates to the requesting origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// Same-origin network response.
    Basic,
    /// Cross-origin response readable by the page.
    Cors,
    /// Cross-origin response whose body and status are hidden.
    Opaque,
    /// Constructed locally rather than received from the network.
    Synthetic,
}

/// Response handed back to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: StatusCode,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(url: &SiteUrl, status: StatusCode, response_type: ResponseType, body: Vec<u8>) -> Self {
        Self {
            url: url.as_str().to_owned(),
            status,
            status_text: status.canonical_reason().to_owned(),
            response_type,
            headers: Vec::new(),
            body,
        }
    }

    /// Locally constructed response, e.g. the offline stand-ins the navigation cache returns.
    pub fn synthetic(status: StatusCode, status_text: &str, body: &str) -> Self {
        Self {
            url: String::new(),
            status,
            status_text: status_text.to_owned(),
            response_type: ResponseType::Synthetic,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> ShellResult<Self> {
        self.headers.push(Header::new(name, value)?);
        Ok(self)
    }

    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("application/octet-stream")
    }
}

fn header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str())
}

fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|byte| {
            matches!(
                byte,
                b'!' | b'#'
                    | b'$'
                    | b'%'
                    | b'&'
                    | b'\''
                    | b'*'
                    | b'+'
                    | b'-'
                    | b'.'
                    | b'^'
                    | b'_'
                    | b'`'
                    | b'|'
                    | b'~'
                    | b'0'..=b'9'
                    | b'a'..=b'z'
                    | b'A'..=b'Z'
            )
        })
}

#[cfg(test)]
mod tests {
    use super::Header;
    use super::Response;
    use super::ResponseType;
    use super::StatusCode;

    #[test]
    fn rejects_header_injection() {
        assert!(Header::new("Content-Type", "text/html\r\nX-Evil: 1").is_err());
        assert!(Header::new("Bad Name", "x").is_err());
        assert!(Header::new("Content-Type", "text/html").is_ok());
    }

    #[test]
    fn status_code_range_is_validated() {
        assert!(StatusCode::new(99).is_err());
        assert!(StatusCode::new(600).is_err());
        assert_eq!(StatusCode::new(204).map(StatusCode::is_success), Ok(true));
    }

    #[test]
    fn synthetic_response_carries_status_text() {
        let response = Response::synthetic(StatusCode::REQUEST_TIMEOUT, "Request Timeout", "Network error");
        assert_eq!(response.status.as_u16(), 408);
        assert_eq!(response.response_type, ResponseType::Synthetic);
        assert_eq!(response.body, b"Network error");
        assert!(!response.ok());
    }

    #[test]
    fn content_type_lookup_is_case_insensitive() {
        let response = Response::synthetic(StatusCode::OK, "OK", "")
            .with_header("Content-Type", "text/css");
        assert_eq!(response.map(|value| value.content_type().to_owned()), Ok("text/css".to_owned()));
    }
}
