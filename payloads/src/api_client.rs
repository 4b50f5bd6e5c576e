use crate::{ChallengeId, requests, responses};
use reqwest::StatusCode;
use serde::Serialize;

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the backend.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        self.inner_client
            .post(self.format_url(path))
            .json(body)
            .send()
            .await
    }

    async fn empty_post(&self, path: &str) -> ReqwestResult {
        self.inner_client.post(self.format_url(path)).send().await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        self.inner_client.get(self.format_url(path)).send().await
    }
}

/// Methods on the backend API
impl APIClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.empty_get("health_check").await?;
        ok_empty(response).await
    }

    pub async fn create_account(
        &self,
        details: &requests::CreateAccount,
    ) -> Result<(), ClientError> {
        let response = self.post("create_account", details).await?;
        ok_empty(response).await
    }

    pub async fn login(
        &self,
        details: &requests::LoginCredentials,
    ) -> Result<(), ClientError> {
        let response = self.post("login", &details).await?;
        ok_empty(response).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.empty_post("logout").await?;
        ok_empty(response).await
    }

    /// Check if the user is logged in.
    pub async fn login_check(&self) -> Result<bool, ClientError> {
        let response = self.empty_post("login_check").await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::UNAUTHORIZED => Ok(false),
            _ => Err(ClientError::APIError(
                response.status(),
                response.text().await?,
            )),
        }
    }

    pub async fn create_challenge(
        &self,
        details: &requests::CreateChallenge,
    ) -> Result<responses::Challenge, ClientError> {
        let response = self.post("create_challenge", details).await?;
        ok_body(response).await
    }

    pub async fn respond_to_challenge(
        &self,
        details: &requests::RespondToChallenge,
    ) -> Result<responses::Challenge, ClientError> {
        let response = self.post("respond_to_challenge", details).await?;
        ok_body(response).await
    }

    /// Score an active challenge and apply the rating changes.
    pub async fn complete_challenge(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<responses::ChallengeResult, ClientError> {
        let response = self.post("complete_challenge", challenge_id).await?;
        ok_body(response).await
    }

    /// All challenges the current user takes part in, newest first.
    pub async fn list_challenges(
        &self,
    ) -> Result<Vec<responses::Challenge>, ClientError> {
        let response = self.empty_post("challenges").await?;
        ok_body(response).await
    }

    pub async fn ranking_profile(
        &self,
    ) -> Result<responses::RankingProfile, ClientError> {
        let response = self.empty_post("ranking_profile").await?;
        ok_body(response).await
    }

    pub async fn leaderboard(
        &self,
        page: &requests::LeaderboardPage,
    ) -> Result<responses::Leaderboard, ClientError> {
        let response = self.post("leaderboard", page).await?;
        ok_body(response).await
    }

    pub async fn ranking_stats(
        &self,
    ) -> Result<responses::RankingStats, ClientError> {
        let response = self.empty_post("ranking_stats").await?;
        ok_body(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}
