use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateProviderRequest, Provider, ProviderError, ProviderSearchQuery, UpdateProviderRequest,
};

pub struct ProviderService {
    supabase: SupabaseClient,
}

impl ProviderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Create the provider profile for an account. One account maps to at
    /// most one provider, enforced here by an existence check (and by a
    /// unique index on account_id in the store).
    pub async fn create_provider(
        &self,
        account_id: &str,
        request: CreateProviderRequest,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        debug!("Creating provider profile for account: {}", account_id);

        let existing_path = format!(
            "/rest/v1/providers?account_id=eq.{}",
            urlencoding::encode(account_id)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(ProviderError::ProfileAlreadyExists);
        }

        let provider_data = json!({
            "account_id": account_id,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "gender": request.gender,
            "occupation": request.occupation,
            "address": request.address,
            "specialization": request.specialization,
            "experience_years": request.experience_years.unwrap_or(0),
            "languages": request.languages,
            "bio": request.bio,
            "verified": true,
            "created_at": chrono::Utc::now().to_rfc3339(),
            "updated_at": chrono::Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/providers",
                Some(auth_token),
                Some(provider_data),
                Some(headers),
            )
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::DatabaseError("Failed to create provider profile".to_string()))?;

        let provider: Provider = serde_json::from_value(row)
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;
        debug!("Provider profile created with ID: {}", provider.id);

        Ok(provider)
    }

    pub async fn get_provider(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        debug!("Fetching provider profile: {}", provider_id);

        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ProviderError::NotFound)?;
        serde_json::from_value(row).map_err(|e| ProviderError::DatabaseError(e.to_string()))
    }

    /// Self-service profile update, keyed to the caller's own provider row.
    pub async fn update_provider(
        &self,
        provider_id: Uuid,
        request: UpdateProviderRequest,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        debug!("Updating provider profile: {}", provider_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }
        if let Some(occupation) = request.occupation {
            update_data.insert("occupation".to_string(), json!(occupation));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(specialization) = request.specialization {
            update_data.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(experience_years) = request.experience_years {
            update_data.insert("experience_years".to_string(), json!(experience_years));
        }
        if let Some(languages) = request.languages {
            update_data.insert("languages".to_string(), json!(languages));
        }
        if let Some(bio) = request.bio {
            update_data.insert("bio".to_string(), json!(bio));
        }

        update_data.insert("updated_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ProviderError::NotFound)?;
        serde_json::from_value(row).map_err(|e| ProviderError::DatabaseError(e.to_string()))
    }

    /// Directory search, ordered by last name then first name.
    pub async fn search_providers(
        &self,
        query: ProviderSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Provider>, ProviderError> {
        debug!("Searching providers with query: {:?}", query);

        let mut query_parts = vec![];

        if let Some(specialization) = query.specialization {
            query_parts.push(format!(
                "specialization=ilike.%{}%",
                urlencoding::encode(&specialization)
            ));
        }
        if let Some(language) = query.language {
            query_parts.push(format!("languages=ilike.%{}%", urlencoding::encode(&language)));
        }
        if let Some(search) = query.search {
            let term = urlencoding::encode(&search).into_owned();
            query_parts.push(format!(
                "or=(first_name.ilike.%{t}%,last_name.ilike.%{t}%,specialization.ilike.%{t}%,bio.ilike.%{t}%)",
                t = term
            ));
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        query_parts.push("order=last_name.asc,first_name.asc".to_string());
        query_parts.push(format!("limit={}&offset={}", limit, offset));

        let path = format!("/rest/v1/providers?{}", query_parts.join("&"));

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Provider>, _>>()
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))
    }
}
