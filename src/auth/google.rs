use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OAuthConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoogleUser {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

pub struct GoogleAuth {
    config: OAuthConfig,
    client: Client,
}

impl GoogleAuth {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Authorization URL the browser is redirected to.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20profile%20email&state={}",
            AUTHORIZE_URL,
            self.config.client_id,
            urlencoding::encode(&self.config.redirect_uri),
            state
        )
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ];

        let response = self.client.post(TOKEN_URL).form(&params).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("token exchange failed: HTTP {}", response.status());
        }
        Ok(response.json::<TokenResponse>().await?)
    }

    /// Fetches the signed-in user's profile.
    pub async fn fetch_user(&self, access_token: &str) -> Result<GoogleUser> {
        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("userinfo request failed: HTTP {}", response.status());
        }
        Ok(response.json::<GoogleUser>().await?)
    }
}
