use std::sync::Arc;
use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn provider(email: &str) -> Self {
        Self::new(email, "provider")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn provider_response(provider_id: &str, account_id: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": provider_id,
            "account_id": account_id,
            "first_name": "Asha",
            "last_name": last_name,
            "email": "provider@example.com",
            "gender": "female",
            "occupation": "Therapist",
            "address": "12 Harbour Row",
            "specialization": "Cognitive Behavioural Therapy",
            "experience_years": 8,
            "languages": "English, French",
            "bio": "Experienced CBT practitioner",
            "verified": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(patient_id: &str, account_id: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "account_id": account_id,
            "first_name": "Rowan",
            "last_name": last_name,
            "email": "patient@example.com",
            "dob": "1992-04-11",
            "gender": "other",
            "address": "4 Mill Lane",
            "emergency_contact_name": "Jo Deane",
            "emergency_contact_phone": "+353 85 000 0000",
            "insurance_provider": "Laya",
            "insurance_id": "LY-4411",
            "therapy_description": "Anxiety management",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn availability_response(
        availability_id: &str,
        provider_id: &str,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
    ) -> serde_json::Value {
        json!({
            "id": availability_id,
            "provider_id": provider_id,
            "day_of_week": day_of_week,
            "start_time": start_time,
            "end_time": end_time,
            "is_available": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn plan_type_response(plan_type_id: &str, name: &str, base_cost: f64) -> serde_json::Value {
        json!({
            "id": plan_type_id,
            "name": name,
            "description": "Weekly one-to-one sessions",
            "base_cost": base_cost,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn therapy_plan_response(
        plan_id: &str,
        patient_id: &str,
        provider_id: &str,
        plan_type_id: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": plan_id,
            "patient_id": patient_id,
            "provider_id": provider_id,
            "plan_type_id": plan_type_id,
            "status": status,
            "start_date": "2024-06-01",
            "notes": null,
            "cost": 90.0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn session_response(
        session_id: &str,
        plan_id: &str,
        provider_id: &str,
        patient_id: &str,
        session_date: &str,
        session_time: &str,
    ) -> serde_json::Value {
        json!({
            "id": session_id,
            "therapy_plan_id": plan_id,
            "provider_id": provider_id,
            "patient_id": patient_id,
            "session_date": session_date,
            "session_time": session_time,
            "duration_minutes": 60,
            "status": "scheduled",
            "session_type": "video",
            "notes": null,
            "payment_status": "unpaid",
            "follow_up_required": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn message_response(
        message_id: &str,
        plan_id: &str,
        sender_account_id: &str,
        recipient_account_id: &str,
        created_at: &str,
    ) -> serde_json::Value {
        json!({
            "id": message_id,
            "therapy_plan_id": plan_id,
            "sender_account_id": sender_account_id,
            "recipient_account_id": recipient_account_id,
            "body": "See you on Monday",
            "is_read": false,
            "created_at": created_at
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::provider("asha@example.com");
        assert_eq!(user.email, "asha@example.com");
        assert_eq!(user.role, "provider");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_token_roundtrip_through_validator() {
        let user = TestUser::patient("rowan@example.com");
        let secret = "roundtrip-secret-long-enough-for-hmac";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        let validated = crate::jwt::validate_token(&token, secret).expect("token should validate");
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.email, Some(user.email.clone()));
    }

    #[test]
    fn test_expired_token_rejected() {
        let user = TestUser::default();
        let secret = "roundtrip-secret-long-enough-for-hmac";
        let token = JwtTestUtils::create_expired_token(&user, secret);

        assert!(crate::jwt::validate_token(&token, secret).is_err());
    }
}
