use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use crate::codec::modbus_frame::ModbusFunction;
use crate::error::Error;
use crate::transport::Transport;

const DEFAULT_BASE_URL: &str = "https://monitor.eg4electronics.com";

/// Cloud HTTP adapter. Speaks to the vendor's REST surface and hands the
/// JSON payload to the data-class decoders (`from_http_response`), which
/// produce the same structures the Modbus transports produce. Register-
/// level operations are meaningless over this transport and return
/// `Error::UnsupportedOperation`.
pub struct HttpTransport {
    base_url: Url,
    client: Client,
    username: String,
    password: String,
    authenticated: Mutex<bool>,
}

impl HttpTransport {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_URL, username, password)
    }

    pub fn with_base_url(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::connection(format!("invalid base url {:?}: {}", base_url, e)))?;
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| Error::connection(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            base_url,
            client,
            username: username.into(),
            password: password.into(),
            authenticated: Mutex::new(false),
        })
    }

    async fn login(&self) -> Result<(), Error> {
        let url = self
            .base_url
            .join("WManage/web/login")
            .map_err(|e| Error::connection(e.to_string()))?;
        let resp = self
            .client
            .post(url)
            .form(&[("account", &self.username), ("password", &self.password)])
            .send()
            .await
            .map_err(|e| Error::connection(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::connection(format!(
                "login failed with status {}",
                resp.status()
            )));
        }
        *self.authenticated.lock().await = true;
        Ok(())
    }

    /// Issues a GET to a relative path, retrying exactly once after a
    /// silent re-authentication on a 401.
    pub async fn get_json(&self, path: &str) -> Result<Value, Error> {
        if !*self.authenticated.lock().await {
            self.login().await?;
        }

        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::connection(e.to_string()))?;

        let first = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::connection(e.to_string()))?;

        if first.status() == StatusCode::UNAUTHORIZED {
            debug!("http: session expired, re-authenticating once");
            self.login().await?;
            let second = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| Error::connection(e.to_string()))?;
            if second.status() == StatusCode::UNAUTHORIZED {
                return Err(Error::connection("re-authentication did not restore session"));
            }
            return second
                .json::<Value>()
                .await
                .map_err(|e| Error::read(e.to_string()));
        }

        if !first.status().is_success() {
            warn!("http: GET {} returned {}", path, first.status());
            return Err(Error::connection(format!(
                "request failed with status {}",
                first.status()
            )));
        }

        first.json::<Value>().await.map_err(|e| Error::read(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn connect(&self) -> Result<(), Error> {
        self.login().await
    }

    async fn disconnect(&self) -> Result<(), Error> {
        *self.authenticated.lock().await = false;
        Ok(())
    }

    async fn read_registers(
        &self,
        _function: ModbusFunction,
        _start: u16,
        _count: u16,
    ) -> Result<Vec<u16>, Error> {
        Err(Error::unsupported("read_registers", "http"))
    }

    async fn write_single(&self, _start: u16, _value: u16) -> Result<(), Error> {
        Err(Error::unsupported("write_single", "http"))
    }

    async fn write_multiple(&self, _start: u16, _values: &[u16]) -> Result<(), Error> {
        Err(Error::unsupported("write_multiple", "http"))
    }

    fn supports_cloud_only_operations(&self) -> bool {
        true
    }

    async fn fetch_json(&self, path: &str) -> Result<Value, Error> {
        self.get_json(path).await
    }
}
