//! Decoding of inbound GraphQL HTTP requests

use crate::core::error::{BridgeError, RequestError};
use crate::server::engine::TransportRequest;
use axum::body::Bytes;
use axum::Form;
use axum::extract::{FromRequest, Multipart, Query, Request};
use axum::http::{HeaderMap, Method, header};
use serde_json::{Map, Value};

/// The parameters of an HTTP request, as seen by the bridge
///
/// Query-string parameters are merged with the body; body fields win. A JSON
/// array body is a batch and is kept as is. File parts of a multipart body
/// are counted, never read into memory beyond the extractor's buffering.
#[derive(Debug, Clone)]
pub struct DecodedRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub query_string: Option<String>,
    pub body: Value,
    pub uploads: usize,
}

impl DecodedRequest {
    pub fn new(body: Value) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            query_string: None,
            body,
            uploads: 0,
        }
    }

    pub fn with_uploads(mut self, uploads: usize) -> Self {
        self.uploads = uploads;
        self
    }

    /// No parameter and no file at all
    pub fn is_empty(&self) -> bool {
        let no_fields = match &self.body {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        no_fields && self.uploads == 0
    }

    pub fn has_uploads(&self) -> bool {
        self.uploads > 0
    }

    pub fn into_transport(self) -> TransportRequest {
        TransportRequest {
            method: self.method,
            headers: self.headers,
            query_string: self.query_string,
            body: self.body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Multipart,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        BodyKind::Multipart
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        BodyKind::Form
    } else {
        BodyKind::Json
    }
}

fn merge(target: &mut Map<String, Value>, pairs: Vec<(String, String)>) {
    for (key, value) in pairs {
        target.insert(key, Value::String(value));
    }
}

impl<S> FromRequest<S> for DecodedRequest
where
    S: Send + Sync,
{
    type Rejection = BridgeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let headers = req.headers().clone();
        let query_string = req.uri().query().map(str::to_string);

        let mut params = Map::new();
        if query_string.is_some() {
            let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
                .map_err(|e| RequestError::InvalidBody {
                    message: e.body_text(),
                })?;
            merge(&mut params, pairs);
        }

        let mut uploads = 0;
        let mut batch = None;

        match body_kind(&headers) {
            BodyKind::Multipart => {
                let mut multipart = Multipart::from_request(req, state).await.map_err(|e| {
                    RequestError::InvalidMultipart {
                        message: e.body_text(),
                    }
                })?;
                while let Some(field) = multipart.next_field().await.map_err(|e| {
                    RequestError::InvalidMultipart {
                        message: e.body_text(),
                    }
                })? {
                    if field.file_name().is_some() {
                        uploads += 1;
                        continue;
                    }
                    let Some(name) = field.name().map(str::to_string) else {
                        continue;
                    };
                    let text = field.text().await.map_err(|e| RequestError::InvalidMultipart {
                        message: e.body_text(),
                    })?;
                    params.insert(name, Value::String(text));
                }
            }
            BodyKind::Form => {
                let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                    .await
                    .map_err(|e| RequestError::InvalidBody {
                        message: e.body_text(),
                    })?;
                merge(&mut params, pairs);
            }
            BodyKind::Json => {
                let bytes = Bytes::from_request(req, state)
                    .await
                    .map_err(|e| RequestError::InvalidBody {
                        message: e.body_text(),
                    })?;
                if !bytes.iter().all(u8::is_ascii_whitespace) {
                    match serde_json::from_slice::<Value>(&bytes) {
                        Ok(Value::Object(map)) => params.extend(map),
                        Ok(Value::Array(items)) => batch = Some(Value::Array(items)),
                        Ok(Value::Null) => {}
                        Ok(_) => {
                            return Err(RequestError::InvalidJson {
                                message: "expected a JSON object or array".to_string(),
                            }
                            .into());
                        }
                        Err(e) => {
                            return Err(RequestError::InvalidJson {
                                message: e.to_string(),
                            }
                            .into());
                        }
                    }
                }
            }
        }

        let body = batch.unwrap_or(Value::Object(params));
        Ok(Self {
            method,
            headers,
            query_string,
            body,
            uploads,
        })
    }
}
