//! Dereferencing and publishing of RDF resources.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use oxigraph::model::Quad;
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, Response, Url};
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::error::{ContextError, Result};
use crate::rdf::trig::{self, ACCEPTED_CONTENT_TYPES, TRIG};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONTENT_TYPE: &str = "text/turtle";

/// Where RDF documents and key material come from.
pub trait RdfSource {
    /// Dereference `url` and parse it as RDF. Non-RDF resources fail with
    /// [`ContextError::UnsupportedContentType`].
    fn load_quads(&self, url: &str) -> impl Future<Output = Result<Vec<Quad>>> + Send;

    /// Dereference `url` as plain text, used for JWK documents.
    fn load_text(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMethod {
    /// Create a new resource in a container; the server names it.
    Post,
    /// Overwrite the resource at the given URL.
    Put,
}

/// Media type of a `Content-Type` header value, without parameters. A
/// missing header is read as Turtle.
pub fn media_type(header: Option<&str>) -> String {
    header
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Content type of a local file, from its extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match extension.as_str() {
        "trig" => TRIG,
        "nq" => "application/n-quads",
        "ttl" => "text/turtle",
        "nt" => "application/n-triples",
        "n3" => "text/n3",
        "jsonld" | "json" => "application/ld+json",
        "rdf" | "owl" | "xml" => "application/rdf+xml",
        _ => return None,
    })
}

/// Local path named by `location`: `file://` URLs and anything that is not
/// an absolute URL.
fn local_path(location: &str) -> Option<PathBuf> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
        Ok(url) if url.scheme().len() > 1 => None,
        // single letter "schemes" are Windows drive letters
        _ => Some(PathBuf::from(location)),
    }
}

async fn read_local(path: &Path) -> Result<String> {
    let display = path.display().to_string();
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ContextError::fetch(&display, e))
}

fn file_base(path: &Path) -> String {
    std::path::absolute(path)
        .ok()
        .and_then(|path| Url::from_file_path(path).ok())
        .map(String::from)
        .unwrap_or_default()
}

/// HTTP and file system access, sharing one client.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &HttpConfig) -> Result<Fetcher> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .gzip(true)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ContextError::Config(format!("unable to build HTTP client: {e}")))?;
        Ok(Fetcher { client })
    }

    /// Media type announced for `url` by a HEAD request. Servers that refuse
    /// HEAD are asked again with a GET whose headers are read instead.
    pub async fn content_type(&self, url: &str) -> Result<String> {
        let response = match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => response,
            refused => {
                let reason = match refused {
                    Ok(response) => response.status().to_string(),
                    Err(e) => e.to_string(),
                };
                debug!(target: "fetch", "HEAD {url} failed ({reason}), asking with GET");
                self.client
                    .get(url)
                    .header(header::ACCEPT, ACCEPTED_CONTENT_TYPES.join(", "))
                    .send()
                    .await
                    .and_then(Response::error_for_status)
                    .map_err(|e| ContextError::fetch(url, e))?
            }
        };
        let header = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        Ok(media_type(header))
    }

    /// Whether `url` announces one of the accepted RDF media types.
    pub async fn is_rdf_resource(&self, url: &str) -> Result<bool> {
        if let Some(path) = local_path(url) {
            return Ok(content_type_for_path(&path).is_some());
        }
        let content_type = self.content_type(url).await?;
        Ok(trig::is_accepted(&content_type))
    }

    /// Send a TriG document to `url`, returning the location of the stored
    /// resource.
    pub async fn publish(&self, url: &str, body: &str, method: PublishMethod) -> Result<String> {
        let request = match method {
            PublishMethod::Post => self.client.post(url),
            PublishMethod::Put => self.client.put(url),
        };
        let response = request
            .header(header::CONTENT_TYPE, HeaderValue::from_static(TRIG))
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| ContextError::publish(url, e))?;
        if response.error_for_status_ref().is_err() {
            let code = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ContextError::publish(url, format!("{code} {text}")));
        }

        let location = match method {
            PublishMethod::Put => url.to_string(),
            PublishMethod::Post => {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| ContextError::publish(url, "response has no Location header"))?;
                Url::parse(url)
                    .and_then(|base| base.join(location))
                    .map(String::from)
                    .map_err(|e| ContextError::publish(url, e))?
            }
        };
        info!(target: "fetch", "published to {location}");
        Ok(location)
    }

    async fn get(&self, url: &str, accept: &str) -> Result<(String, Option<String>)> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| ContextError::fetch(url, e))?;
        if let Err(error) = response.error_for_status_ref() {
            return Err(ContextError::fetch(url, error));
        }
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| media_type(Some(value)));
        let body = response
            .text()
            .await
            .map_err(|e| ContextError::fetch(url, e))?;
        Ok((body, content_type))
    }
}

impl RdfSource for Fetcher {
    async fn load_quads(&self, url: &str) -> Result<Vec<Quad>> {
        if let Some(path) = local_path(url) {
            let content_type = content_type_for_path(&path).ok_or_else(|| {
                ContextError::UnsupportedContentType {
                    url: url.to_string(),
                    content_type: path
                        .extension()
                        .map(|e| e.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                }
            })?;
            let body = read_local(&path).await?;
            debug!(target: "fetch", "read {} as {content_type}", path.display());
            return trig::parse_document(&body, content_type, &file_base(&path));
        }

        let announced = self.content_type(url).await?;
        if !trig::is_accepted(&announced) {
            return Err(ContextError::UnsupportedContentType {
                url: url.to_string(),
                content_type: announced,
            });
        }
        let (body, content_type) = self.get(url, &ACCEPTED_CONTENT_TYPES.join(", ")).await?;
        let content_type = content_type
            .filter(|c| trig::is_accepted(c))
            .unwrap_or(announced);
        debug!(target: "fetch", "retrieved {url} as {content_type}");
        trig::parse_document(&body, &content_type, url)
    }

    async fn load_text(&self, url: &str) -> Result<String> {
        if let Some(path) = local_path(url) {
            return read_local(&path).await;
        }
        let (body, _) = self.get(url, "application/json, */*").await?;
        Ok(body)
    }
}

/// Documents held in memory, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<String, (String, String)>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    pub fn insert(&mut self, url: &str, content_type: &str, body: &str) {
        self.documents.insert(
            url.to_string(),
            (media_type(Some(content_type)), body.to_string()),
        );
    }

    pub fn with(mut self, url: &str, content_type: &str, body: &str) -> MemorySource {
        self.insert(url, content_type, body);
        self
    }

    fn document(&self, url: &str) -> Result<&(String, String)> {
        self.documents
            .get(url)
            .ok_or_else(|| ContextError::fetch(url, "no such document"))
    }
}

impl RdfSource for MemorySource {
    async fn load_quads(&self, url: &str) -> Result<Vec<Quad>> {
        let (content_type, body) = self.document(url)?;
        if !trig::is_accepted(content_type) {
            return Err(ContextError::UnsupportedContentType {
                url: url.to_string(),
                content_type: content_type.clone(),
            });
        }
        trig::parse_document(body, content_type, url)
    }

    async fn load_text(&self, url: &str) -> Result<String> {
        Ok(self.document(url)?.1.clone())
    }
}
