//! The REST client for the laboratory backend.
//!
//! Thin wrapper over `reqwest`: every authenticated call carries the
//! session's bearer token (an empty credential when no token is held), and
//! every non-2xx response is normalised into [`ApiError::Server`] with the
//! server's message. Timeouts are the transport defaults; there is no
//! retry. After any mutation callers re-fetch rather than patching local
//! state, so this client holds no entity cache.

use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use lis_core::{
    Backend, LabResult, NewOrder, NewPatient, NewProtocol, NewResult, Order, OrderUpdate, Patient,
    Protocol, ResultRecord,
};

use crate::error::GENERIC_REQUEST_ERROR;
use crate::{ApiError, ApiResult, ClientConfig, SessionStore, User};

/// Successful login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Error body shape the backend uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Extracts the server's message from a non-2xx response body, falling back
/// to a generic message when the body is not parseable.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| GENERIC_REQUEST_ERROR.to_string())
}

/// Client for the lab backend's REST contract.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: SessionStore,
}

impl ApiClient {
    /// Creates a client for the given backend and session store.
    pub fn new(config: ClientConfig, session: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    /// Attaches the session credential. With no token held this sends an
    /// empty `Authorization` value, mirroring the backend contract.
    async fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token().await {
            Some(token) => req.bearer_auth(token),
            None => req.header(AUTHORIZATION, ""),
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        tracing::debug!(%status, %message, "backend rejected request");
        Err(ApiError::Server(message))
    }

    // =====================
    // Auth
    // =====================

    /// Exchanges credentials for an identity and installs it in the
    /// session store. The login call itself carries no credential.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        let login: LoginResponse = self.handle_response(response).await?;
        self.session
            .establish(login.user.clone(), login.token.clone())
            .await?;
        tracing::info!(user = %login.user.username, "logged in");
        Ok(login)
    }

    /// Clears the session and the persisted token.
    pub async fn logout(&self) {
        self.session.clear().await;
    }

    // =====================
    // Patients
    // =====================

    /// Lists patients, optionally with a server-side search term.
    pub async fn list_patients(&self, search: Option<&str>) -> ApiResult<Vec<Patient>> {
        let mut req = self.http.get(self.url("/patients"));
        if let Some(search) = search {
            req = req.query(&[("search", search)]);
        }
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    pub async fn get_patient(&self, id: &str) -> ApiResult<Patient> {
        let req = self.http.get(self.url(&format!("/patients/{}", id)));
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    pub async fn create_patient(&self, patient: &NewPatient) -> ApiResult<Patient> {
        let req = self.http.post(self.url("/patients")).json(patient);
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    pub async fn update_patient(&self, id: &str, patient: &NewPatient) -> ApiResult<Patient> {
        let req = self
            .http
            .put(self.url(&format!("/patients/{}", id)))
            .json(patient);
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    // =====================
    // Protocols
    // =====================

    pub async fn list_protocols(&self) -> ApiResult<Vec<Protocol>> {
        let req = self.http.get(self.url("/protocols"));
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    pub async fn create_protocol(&self, protocol: &NewProtocol) -> ApiResult<Protocol> {
        let req = self.http.post(self.url("/protocols")).json(protocol);
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    pub async fn update_protocol(&self, id: &str, protocol: &NewProtocol) -> ApiResult<Protocol> {
        let req = self
            .http
            .put(self.url(&format!("/protocols/{}", id)))
            .json(protocol);
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    /// Deletes a protocol. This is a hard delete on the backend; orders
    /// that reference the protocol keep their study snapshots regardless.
    pub async fn delete_protocol(&self, id: &str) -> ApiResult<()> {
        let req = self.http.delete(self.url(&format!("/protocols/{}", id)));
        let response = self.authed(req).await.send().await?;
        let _: serde_json::Value = self.handle_response(response).await?;
        Ok(())
    }

    // =====================
    // Orders and results
    // =====================

    async fn fetch_orders(&self) -> ApiResult<Vec<Order>> {
        let req = self.http.get(self.url("/orders"));
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    async fn fetch_order(&self, id: &str) -> ApiResult<Order> {
        let req = self.http.get(self.url(&format!("/orders/{}", id)));
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    async fn post_order(&self, order: &NewOrder) -> ApiResult<Order> {
        let req = self.http.post(self.url("/orders")).json(order);
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    async fn put_order(&self, id: &str, update: &OrderUpdate) -> ApiResult<Order> {
        let req = self
            .http
            .put(self.url(&format!("/orders/{}", id)))
            .json(update);
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    async fn post_result(&self, result: &NewResult) -> ApiResult<ResultRecord> {
        let req = self.http.post(self.url("/results")).json(result);
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    async fn fetch_results(&self, order_id: &str) -> ApiResult<Vec<ResultRecord>> {
        let req = self
            .http
            .get(self.url("/results"))
            .query(&[("orderId", order_id)]);
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }

    // =====================
    // Reports
    // =====================

    /// Asks the backend to generate a report artefact for an order. The
    /// response shape is owned by the backend and passed through as-is.
    pub async fn generate_report(&self, order_id: &str) -> ApiResult<serde_json::Value> {
        let req = self
            .http
            .post(self.url("/reports/generate"))
            .json(&serde_json::json!({ "orderId": order_id }));
        let response = self.authed(req).await.send().await?;
        self.handle_response(response).await
    }
}

impl Backend for ApiClient {
    async fn list_orders(&self) -> LabResult<Vec<Order>> {
        Ok(self.fetch_orders().await?)
    }

    async fn get_order(&self, id: &str) -> LabResult<Order> {
        Ok(self.fetch_order(id).await?)
    }

    async fn create_order(&self, order: &NewOrder) -> LabResult<Order> {
        Ok(self.post_order(order).await?)
    }

    async fn update_order(&self, id: &str, update: &OrderUpdate) -> LabResult<Order> {
        Ok(self.put_order(id, update).await?)
    }

    async fn create_result(&self, result: &NewResult) -> LabResult<ResultRecord> {
        Ok(self.post_result(result).await?)
    }

    async fn results_for_order(&self, order_id: &str) -> LabResult<Vec<ResultRecord>> {
        Ok(self.fetch_results(order_id).await?)
    }
}
