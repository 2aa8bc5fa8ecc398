use crate::error::{ServerError, ServerResult};
use std::collections::HashMap;

/// HTTP status codes produced by this server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 200,
    NotFound = 404,
}

impl Status {
    /// Get the reason phrase for this status code
    pub fn reason(&self) -> &'static str {
        match *self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
        }
    }
}

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    /// Parse a method from a request-line token
    pub fn from_str(s: &str) -> ServerResult<Self> {
        match s {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            _ => Err(ServerError::HttpParse(format!("Invalid method: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

/// A parsed HTTP request head
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// The raw request target, query string and fragment included
    pub target: String,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
}

/// Try to parse a request head from the bytes accumulated so far.
///
/// Returns `Ok(None)` while the head terminator has not arrived yet, so the
/// caller keeps reading; a request body, if any, is never consumed — this
/// server only ever needs the request line and headers.
pub fn parse_request_head(data: &[u8]) -> ServerResult<Option<Request>> {
    let Some(head_end) = find_head_end(data) else {
        return Ok(None);
    };

    let head = std::str::from_utf8(&data[..head_end])
        .map_err(|_| ServerError::HttpParse("request head is not valid UTF-8".to_string()))?;

    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();

    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ServerError::HttpParse(format!(
            "invalid request line: {:?}",
            request_line
        )));
    };

    if !version.starts_with("HTTP/") {
        return Err(ServerError::HttpParse(format!(
            "invalid protocol version: {:?}",
            version
        )));
    }

    let method = Method::from_str(method)?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.find(':') else {
            return Err(ServerError::HttpParse(format!("invalid header: {:?}", line)));
        };
        let name = line[..colon].trim().to_lowercase();
        let value = line[colon + 1..].trim().to_string();
        headers.insert(name, value);
    }

    Ok(Some(Request {
        method,
        target: target.to_string(),
        headers,
    }))
}

fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|window| window == b"\r\n\r\n")
}

/// The head of an HTTP response: status line and headers.
///
/// Bodies are not part of this type because they are streamed through the
/// connection buffer rather than held in memory.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: Status,
    headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Create a new response head
    pub fn new(status: Status) -> Self {
        Self {
            status,
            headers: vec![
                (
                    "Server".to_string(),
                    format!("servir/{}", env!("CARGO_PKG_VERSION")),
                ),
                ("Connection".to_string(), "close".to_string()),
            ],
        }
    }

    /// Set a header, replacing any existing value for the same name
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Serialize the status line and headers, including the blank line that
    /// terminates the head
    pub fn serialize(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status as u16, self.status.reason());
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }
}
