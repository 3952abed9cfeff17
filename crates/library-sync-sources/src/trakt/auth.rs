use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const TOKEN_PATH: &str = "/oauth/token";
const AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Authorization happens on the web frontend, not the API host.
const WEB_URL: &str = "https://trakt.tv";

pub fn create_http_client() -> Client {
    Client::builder()
        .user_agent(concat!("watchvault/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Obtain a usable token pair: refresh when a refresh token is available,
/// fall back to a fresh authorization-code flow otherwise.
pub async fn authenticate(
    api_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: Option<&str>,
) -> Result<TokenInfo> {
    let client = create_http_client();

    if let Some(refresh_token) = refresh_token {
        match refresh_access_token(&client, api_url, client_id, client_secret, refresh_token).await
        {
            Ok(token_info) => return Ok(token_info),
            Err(e) => {
                tracing::info!("Token refresh failed ({}), starting new authorization", e);
            }
        }
    }

    authorize_new(&client, api_url, client_id, client_secret).await
}

async fn refresh_access_token(
    client: &Client,
    api_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenInfo> {
    let payload = serde_json::json!({
        "refresh_token": refresh_token,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "refresh_token"
    });

    let response = client
        .post(format!("{}{}", api_url, TOKEN_PATH))
        .json(&payload)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("Token refresh failed: {}", response.status()));
    }

    let token_response: TokenResponse = response.json().await?;
    Ok(token_info_from_response(token_response))
}

async fn authorize_new(
    client: &Client,
    api_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenInfo> {
    let auth_url = format!(
        "{}{}?response_type=code&client_id={}&redirect_uri={}",
        WEB_URL, AUTHORIZE_PATH, client_id, REDIRECT_URI
    );

    println!("\nPlease visit the following URL to authorize this application:");
    println!("{}\n", auth_url);

    use std::io::{self, Write};
    print!("Please enter the authorization code from the URL: ");
    io::stdout().flush()?;

    let mut code = String::new();
    io::stdin().read_line(&mut code)?;
    let code = code.trim();

    if code.is_empty() {
        return Err(anyhow!("Authorization code cannot be empty"));
    }

    let payload = serde_json::json!({
        "code": code,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "authorization_code"
    });

    let response = client
        .post(format!("{}{}", api_url, TOKEN_PATH))
        .json(&payload)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "Failed to exchange authorization code: {} - {}",
            status,
            error_text
        ));
    }

    let token_response: TokenResponse = response.json().await?;
    Ok(token_info_from_response(token_response))
}

fn token_info_from_response(response: TokenResponse) -> TokenInfo {
    // Shave two minutes off the advertised lifetime so a token never expires
    // mid-request
    let expires_at = Utc::now() + Duration::seconds(response.expires_in as i64 - 120);
    TokenInfo {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_at,
    }
}
