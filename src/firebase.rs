use crate::bigcommerce::Credentials;
use crate::http::build_client;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use urlencoding::encode;

/// Firestore collection holding one credential document per verified user.
const CREDENTIALS_COLLECTION: &str = "user_credentials";

/// REST client for the Firebase identity + Firestore services. Constructed
/// once at startup and passed in explicitly; a missing configuration leaves
/// the credential store disabled without taking the service down.
#[derive(Debug, Clone)]
pub struct FirebaseClient {
    project_id: String,
    api_key: String,
    identity_url: String,
    firestore_url: String,
    http: Client,
}

#[derive(Debug, Error)]
pub enum FirebaseError {
    #[error("identity token rejected: {0}")]
    Unauthorized(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Deserialize(String),
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "localId", default)]
    local_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

impl FirebaseClient {
    pub fn from_env() -> Option<Self> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID").ok()?;
        let api_key = std::env::var("FIREBASE_API_KEY").ok()?;
        let identity_url = std::env::var("FIREBASE_IDENTITY_URL")
            .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com/v1".to_string());
        let firestore_url = std::env::var("FIREBASE_FIRESTORE_URL")
            .unwrap_or_else(|_| "https://firestore.googleapis.com/v1".to_string());
        Some(Self {
            project_id,
            api_key,
            identity_url: identity_url.trim_end_matches('/').to_string(),
            firestore_url: firestore_url.trim_end_matches('/').to_string(),
            http: build_client(),
        })
    }

    /// Verify a Firebase ID token and return the account's UID.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<String, FirebaseError> {
        let url = format!(
            "{}/accounts:lookup?key={}",
            self.identity_url,
            encode(&self.api_key)
        );
        let response = self
            .http
            .post(url)
            .json(&json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(|err| FirebaseError::Request(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(FirebaseError::Unauthorized(body));
        }
        if !status.is_success() {
            return Err(FirebaseError::Request(format!("HTTP {status}")));
        }

        let payload: LookupResponse = response
            .json()
            .await
            .map_err(|err| FirebaseError::Deserialize(err.to_string()))?;
        payload
            .users
            .into_iter()
            .map(|user| user.local_id)
            .find(|uid| !uid.is_empty())
            .ok_or_else(|| FirebaseError::Unauthorized("no matching account".to_string()))
    }

    /// Persist one user's credential triple. Last write wins; there is no
    /// optimistic-concurrency guard on the document.
    pub async fn save_credentials(
        &self,
        uid: &str,
        credentials: &Credentials,
    ) -> Result<(), FirebaseError> {
        let response = self
            .http
            .patch(self.document_url(uid))
            .json(&credentials_document(credentials))
            .send()
            .await
            .map_err(|err| FirebaseError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FirebaseError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn load_credentials(&self, uid: &str) -> Result<Option<Credentials>, FirebaseError> {
        let response = self
            .http
            .get(self.document_url(uid))
            .send()
            .await
            .map_err(|err| FirebaseError::Request(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FirebaseError::Request(format!("HTTP {status}")));
        }

        let document: FirestoreDocument = response
            .json()
            .await
            .map_err(|err| FirebaseError::Deserialize(err.to_string()))?;
        Ok(Some(credentials_from_document(&document)))
    }

    fn document_url(&self, uid: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}?key={}",
            self.firestore_url,
            encode(&self.project_id),
            CREDENTIALS_COLLECTION,
            encode(uid),
            encode(&self.api_key)
        )
    }
}

fn credentials_document(credentials: &Credentials) -> Value {
    json!({
        "fields": {
            "store_hash": { "stringValue": credentials.store_hash },
            "client_id": { "stringValue": credentials.client_id },
            "access_token": { "stringValue": credentials.access_token },
        }
    })
}

fn credentials_from_document(document: &FirestoreDocument) -> Credentials {
    let field = |name: &str| -> String {
        document
            .fields
            .get(name)
            .and_then(|value| value.get("stringValue"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Credentials {
        store_hash: field("store_hash"),
        client_id: field("client_id"),
        access_token: field("access_token"),
    }
}
