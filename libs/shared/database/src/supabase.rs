use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::identity::{Identity, PatientRef, ProviderRef};

/// Thin PostgREST client. Persistence is an external collaborator; every
/// cell talks to it through this one type.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
            );
        }

        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    /// Same as `request` but with caller-supplied extra headers, e.g.
    /// `Prefer: return=representation` on writes.
    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                409 => anyhow!("Conflict: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Fire-and-forget write. PostgREST answers bodiless 2xx unless a
    /// representation is requested, so callers that discard the result must
    /// not try to parse one.
    pub async fn request_no_content(&self, method: Method, path: &str,
                                    auth_token: Option<&str>, body: Option<Value>)
                                    -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers(auth_token));

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                409 => anyhow!("Conflict: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        Ok(())
    }

    /// Resolve the role context for an account: at most one provider row and
    /// at most one patient row, looked up by account id equality. Performed
    /// once per request so downstream logic never repeats existence checks.
    pub async fn resolve_identity(&self, account_id: &str, auth_token: &str) -> Result<Identity> {
        let provider = self.find_provider_ref(account_id, auth_token).await?;
        let patient = self.find_patient_ref(account_id, auth_token).await?;

        Ok(Identity {
            account_id: account_id.to_string(),
            provider,
            patient,
        })
    }

    async fn find_provider_ref(&self, account_id: &str, auth_token: &str) -> Result<Option<ProviderRef>> {
        let path = format!(
            "/rest/v1/providers?account_id=eq.{}&select=id,account_id,first_name,last_name",
            urlencoding::encode(account_id)
        );
        let rows: Vec<ProviderRef> = self.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_patient_ref(&self, account_id: &str, auth_token: &str) -> Result<Option<PatientRef>> {
        let path = format!(
            "/rest/v1/patients?account_id=eq.{}&select=id,account_id,first_name,last_name",
            urlencoding::encode(account_id)
        );
        let rows: Vec<PatientRef> = self.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(rows.into_iter().next())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
