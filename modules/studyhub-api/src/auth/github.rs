//! GitHub OAuth app: authorize redirect, code exchange and identity lookup.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use url::Url;

use studyhub_common::Config;

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "studyhub";

/// The identity a successful sign-in resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct GithubIdentity {
    pub email: String,
    pub name: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Clone)]
pub struct GithubOAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: reqwest::Client,
}

impl GithubOAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
            redirect_uri: format!(
                "{}/api/auth/callback/github",
                config.base_url.trim_end_matches('/')
            ),
            http: reqwest::Client::new(),
        }
    }

    /// Where to send the browser to start a sign-in.
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", "read:user user:email"),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange the callback `code` for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let resp: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .context("GitHub token request failed")?
            .error_for_status()?
            .json()
            .await
            .context("GitHub token response was not JSON")?;

        if let Some(error) = resp.error {
            bail!(
                "GitHub rejected the code: {error} ({})",
                resp.error_description.unwrap_or_default()
            );
        }
        resp.access_token
            .ok_or_else(|| anyhow!("GitHub token response had no access_token"))
    }

    /// Resolve the signed-in user's display name and primary verified email.
    pub async fn fetch_identity(&self, access_token: &str) -> Result<GithubIdentity> {
        let user: GithubUser = self.get(access_token, "/user").await?;

        let email = match user.email {
            Some(email) => email,
            None => {
                let emails: Vec<GithubEmail> = self.get(access_token, "/user/emails").await?;
                primary_verified_email(&emails)
                    .ok_or_else(|| anyhow!("GitHub account has no verified primary email"))?
            }
        };

        Ok(GithubIdentity {
            email,
            name: user.name.unwrap_or(user.login),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, access_token: &str, path: &str) -> Result<T> {
        self.http
            .get(format!("{API_URL}{path}"))
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .with_context(|| format!("GitHub request to {path} failed"))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("GitHub response from {path} was not JSON"))
    }
}

fn primary_verified_email(emails: &[GithubEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email.clone())
}
