use std::time::Duration;

use log::{error, trace, warn};
use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::{Error, Result};

/// One blocking JSON round trip. No retries.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Value>;
    fn post(&self, url: &str, body: &Value) -> Result<Value>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

fn print_status_error(prefix: &str, res: Response) {
    let status = res.status();
    if status == 400 {
        if let Ok(j) = res.json::<Value>() {
            error!("{} [400 BAD REQUEST]: {:?}", prefix, j);
        } else {
            error!("{} [400 BAD REQUEST]", prefix);
        }
    } else {
        error!("{} [{}]", prefix, status);
    }
}

fn read_json(prefix: &str, res: Response) -> Result<Value> {
    let status = res.status();

    if status.is_success() {
        res.json::<Value>()
            .map_err(|e| Error::ResponseParseFailed(e.to_string()))
    } else {
        print_status_error(prefix, res);
        Err(Error::RequestFailed(status.as_u16()))
    }
}

impl HttpTransport {
    /// `headers` are sent with every request made through this transport.
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        headers: &[(&str, &str)],
    ) -> Result<Self> {
        let mut map = HeaderMap::new();
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes());
            let value = HeaderValue::from_str(value);

            match (name, value) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => warn!("Skipping invalid header '{}'", key),
            }
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(map)
            .build()
            .map_err(Error::ClientBuildFailed)?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Value> {
        trace!("GET {}", url);

        let res = self
            .client
            .get(url)
            .send()
            .map_err(Error::SendRequestFailed)?;

        read_json(&format!("GET {}", url), res)
    }

    fn post(&self, url: &str, body: &Value) -> Result<Value> {
        trace!("POST {}: {}", url, body);

        let res = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body.to_string())
            .send()
            .map_err(Error::SendRequestFailed)?;

        read_json(&format!("POST {}", url), res)
    }
}
