//! HTTP client for the iGPSPORT web API.
//!
//! This module provides a reqwest-based implementation of the
//! [`ActivityApi`](crate::ActivityApi) trait: login, activity paging and
//! signed download URL resolution.

use crate::config::{APP_ID, Config, Endpoints, PAGE_SIZE};
use crate::{ActivityApi, ActivityPage, ExportFormat, IgpsportError};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("igpsport-export/", env!("CARGO_PKG_VERSION"));

/// Builder carrying the headers every outgoing request shares.
pub(crate) fn http_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().user_agent(USER_AGENT)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    app_id: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginResponse {
    #[serde(rename = "Code", alias = "code")]
    code: Option<i64>,
    #[serde(rename = "Message", alias = "message")]
    message: Option<String>,
    #[serde(rename = "data", alias = "Data")]
    data: Option<LoginData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginData {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    #[serde(rename = "boundPhone")]
    bound_phone: Option<bool>,
}

/// `{message, code, data}` wrapper used by the activity endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    data: Option<T>,
}

/// Client for the iGPSPORT API using reqwest.
///
/// Holds the credentials and, once logged in (or when a token was supplied
/// in the [`Config`]), the bearer token attached to every protected request.
#[derive(Clone, Debug)]
pub struct ReqwestIgpsportClient {
    endpoints: Endpoints,
    username: String,
    password: SecretString,
    token: Option<SecretString>,
    client: reqwest::Client,
}

impl ReqwestIgpsportClient {
    pub fn new(config: &Config) -> Result<Self, IgpsportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        let client = http_client_builder().default_headers(headers).build()?;
        Ok(Self {
            endpoints: config.endpoints.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            token: config.token.clone(),
            client,
        })
    }

    /// Build a GET request carrying the bearer token, if any.
    fn get_request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Execute a request and decode its JSON body.
    ///
    /// The body is read in full before decoding so malformed payloads surface
    /// as [`IgpsportError::Decode`] rather than as a transport error.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, IgpsportError> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %resp.url(), "request rejected");
            return Err(IgpsportError::from_status(status));
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ActivityApi for ReqwestIgpsportClient {
    fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn login(&mut self) -> Result<(), IgpsportError> {
        if self.username.is_empty() || self.password.expose_secret().is_empty() {
            return Err(IgpsportError::Validation(
                "username or password is empty".into(),
            ));
        }
        let url = self.endpoints.login_url();
        debug!(%url, username = %self.username, "logging in");

        let body = LoginRequest {
            app_id: APP_ID,
            username: &self.username,
            password: self.password.expose_secret(),
        };
        let resp: LoginResponse = self
            .execute_json(self.client.post(&url).json(&body))
            .await?;

        let data = resp.data.unwrap_or_default();
        let token = data
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(IgpsportError::EmptyToken)?;
        debug!(
            code = ?resp.code,
            message = ?resp.message,
            token_type = ?data.token_type,
            expires_in = ?data.expires_in,
            bound_phone = ?data.bound_phone,
            "login succeeded"
        );
        self.token = Some(SecretString::new(token.into()));
        Ok(())
    }

    async fn list_activities(
        &self,
        page_no: i64,
        format: &str,
    ) -> Result<ActivityPage, IgpsportError> {
        if page_no < 1 {
            return Err(IgpsportError::Validation(
                "pageNo must be greater than 0".into(),
            ));
        }
        let req_type = ExportFormat::from_name(format).request_code();
        let query = [
            ("pageNo", page_no.to_string()),
            ("pageSize", PAGE_SIZE.to_string()),
            ("sort", "1".to_string()),
            ("reqType", req_type.to_string()),
        ];
        let url = self.endpoints.query_url();
        debug!(%url, page_no, req_type, "listing activities");

        let resp: Envelope<ActivityPage> = self
            .execute_json(self.get_request(&url).query(&query))
            .await?;
        debug!(code = ?resp.code, message = ?resp.message, "activity page received");
        Ok(resp.data.unwrap_or_default())
    }

    async fn download_url(&self, ride_id: i64) -> Result<String, IgpsportError> {
        if ride_id == 0 {
            return Err(IgpsportError::Validation("rideId is empty".into()));
        }
        let url = self.endpoints.download_url(ride_id);
        debug!(%url, ride_id, "resolving download url");

        // Only the HTTP status gates the outcome; the envelope code is not checked.
        let resp: Envelope<String> = self.execute_json(self.get_request(&url)).await?;
        debug!(code = ?resp.code, message = ?resp.message, "download url received");
        Ok(resp.data.unwrap_or_default())
    }
}
