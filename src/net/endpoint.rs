//! API routes and the prepared-request form handed to a transport.

use serde::Serialize;

use crate::error::NetworkError;

/// The API surface, one case per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    InitializeApp,
    SendEvent,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::InitializeApp => "/initializeApp",
            Self::SendEvent => "/sendEvent",
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::InitializeApp | Self::SendEvent => "POST",
        }
    }
}

/// Request body forms a transport must support.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Vec<u8>),
    /// A single file field plus optional parameter fields. The multipart
    /// boundary is generated fresh by the transport on every call.
    Multipart {
        field_name: String,
        file_name: String,
        bytes: Vec<u8>,
        params: Vec<(String, String)>,
    },
}

/// A fully assembled request: everything a transport needs, nothing more.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl PreparedRequest {
    pub fn json<B: Serialize>(
        base_url: &str,
        endpoint: Endpoint,
        body: &B,
        headers: Vec<(String, String)>,
    ) -> Result<Self, NetworkError> {
        let bytes = serde_json::to_vec(body).map_err(NetworkError::Encode)?;
        let mut headers = headers;
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
        Ok(Self {
            method: endpoint.method().to_string(),
            url: format!("{}{}", base_url.trim_end_matches('/'), endpoint.path()),
            headers,
            body: RequestBody::Json(bytes),
        })
    }

    pub fn multipart(
        base_url: &str,
        endpoint: Endpoint,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        params: Vec<(String, String)>,
        headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            method: endpoint.method().to_string(),
            url: format!("{}{}", base_url.trim_end_matches('/'), endpoint.path()),
            headers,
            body: RequestBody::Multipart {
                field_name: field_name.into(),
                file_name: file_name.into(),
                bytes,
                params,
            },
        }
    }

    /// cURL-equivalent rendering of this request, for debugging. Headers and
    /// body are echoed verbatim; embedded single quotes in the body are
    /// escaped as `'\''` so the line pastes into a shell.
    pub fn to_curl(&self) -> String {
        let mut curl = format!("curl -X {} '{}' ", self.method, self.url);
        for (key, value) in &self.headers {
            curl.push_str(&format!("-H '{key}: {value}' "));
        }
        if let RequestBody::Json(bytes) = &self.body {
            if let Ok(body) = std::str::from_utf8(bytes) {
                if !body.is_empty() {
                    let escaped = body.replace('\'', "'\\''");
                    curl.push_str(&format!("--data '{escaped}'"));
                }
            }
        }
        curl.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Probe {
        note: String,
    }

    #[test]
    fn json_request_targets_route_and_sets_content_type() {
        let req = PreparedRequest::json(
            "https://onboarding.example.com/",
            Endpoint::InitializeApp,
            &Probe { note: "hi".into() },
            vec![],
        )
        .unwrap();
        assert_eq!(req.url, "https://onboarding.example.com/initializeApp");
        assert_eq!(req.method, "POST");
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/json"));
    }

    #[test]
    fn curl_escapes_embedded_single_quotes() {
        let req = PreparedRequest::json(
            "http://localhost:5001",
            Endpoint::SendEvent,
            &Probe {
                note: "it's fine".into(),
            },
            vec![("Authorization".into(), "Bearer tok".into())],
        )
        .unwrap();
        let curl = req.to_curl();
        assert!(curl.starts_with("curl -X POST 'http://localhost:5001/sendEvent'"));
        assert!(curl.contains("-H 'Authorization: Bearer tok'"));
        assert!(curl.contains(r#"it'\''s fine"#));
    }

    #[test]
    fn curl_omits_data_for_multipart() {
        let req = PreparedRequest::multipart(
            "http://localhost:5001",
            Endpoint::SendEvent,
            "image",
            "bg.png",
            vec![1, 2, 3],
            vec![],
            vec![],
        );
        assert!(!req.to_curl().contains("--data"));
    }
}
