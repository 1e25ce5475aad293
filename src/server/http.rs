//! Minimal HTTP/1.1 request parsing and response building.

use crate::error::{ChatError, Result};
use serde::Serialize;
use std::collections::HashMap;

const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Parse a complete raw request (head and body).
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let head_end = find_subslice(raw, HEADER_END)
            .ok_or_else(|| ChatError::InvalidRequest("incomplete request head".to_string()))?;
        let head = std::str::from_utf8(&raw[..head_end])
            .map_err(|_| ChatError::InvalidRequest("request head is not UTF-8".to_string()))?;

        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let (method, target) = match (parts.next(), parts.next()) {
            (Some(m), Some(t)) => (m.to_string(), t),
            _ => return Err(ChatError::InvalidRequest("malformed request line".to_string())),
        };

        let (raw_path, query_string) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };

        // Normalize path (remove trailing slash except for root)
        let mut path = raw_path.trim_end_matches('/').to_string();
        if path.is_empty() {
            path = "/".to_string();
        }

        let query = query_string.map(parse_query).unwrap_or_default();

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((key, value)) = line.split_once(':') {
                headers.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }

        let mut body = raw[head_end + HEADER_END.len()..].to_vec();
        if let Some(len) = headers.get("content-length").and_then(|v| v.parse::<usize>().ok()) {
            body.truncate(len);
        }

        Ok(Self {
            method,
            path,
            query,
            headers,
            body,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Err(ChatError::InvalidRequest("JSON body required".to_string()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Content-Length announced in a partially read head, if any.
pub fn content_length(head: &[u8]) -> Option<usize> {
    let head = std::str::from_utf8(head).ok()?;
    head.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_query(qs: &str) -> HashMap<String, String> {
    qs.split('&')
        .filter(|p| !p.is_empty())
        .map(|param| match param.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(param), String::new()),
        })
        .collect()
}

/// Decode `%XX` escapes and `+` as space. Malformed escapes are kept verbatim.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match decoded {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// The file part of a `multipart/form-data` body: (filename, content).
pub fn multipart_file(body: &[u8], content_type: &str) -> Option<(String, Vec<u8>)> {
    let boundary = content_type
        .split(';')
        .map(str::trim)
        .find_map(|p| p.strip_prefix("boundary="))?
        .trim_matches('"');
    let delimiter = format!("--{}", boundary);
    let delimiter = delimiter.as_bytes();

    let mut rest = body;
    while let Some(start) = find_subslice(rest, delimiter) {
        rest = &rest[start + delimiter.len()..];
        if rest.starts_with(b"--") {
            break;
        }
        let part_end = find_subslice(rest, delimiter).unwrap_or(rest.len());
        let part = &rest[..part_end];

        if let Some(head_end) = find_subslice(part, HEADER_END) {
            let head = String::from_utf8_lossy(&part[..head_end]);
            if let Some(filename) = disposition_filename(&head) {
                let mut content = &part[head_end + HEADER_END.len()..];
                if content.ends_with(b"\r\n") {
                    content = &content[..content.len() - 2];
                }
                return Some((filename, content.to_vec()));
            }
        }
        rest = &rest[part_end..];
    }
    None
}

fn disposition_filename(head: &str) -> Option<String> {
    head.split("\r\n")
        .filter(|line| line.to_lowercase().starts_with("content-disposition"))
        .flat_map(|line| line.split(';'))
        .map(str::trim)
        .find_map(|p| p.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self { status, body },
            Err(e) => Self {
                status: 500,
                body: serde_json::json!({ "error": e.to_string() }).to_string(),
            },
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: String::new(),
        }
    }

    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            status_text(self.status),
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        _ => "Internal Server Error",
    }
}
