use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Subcommand;
use serde_json::{json, Value};
use url::Url;

use crate::cli::config::session_file;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::GateConfig;
use crate::propagator::{PropagationError, TokenPropagator, TokenStore};

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "Sign in to a server and store the token")]
    Login {
        #[arg(help = "Server base URL, e.g. http://localhost:3000")]
        url: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (read from stdin if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Show the stored token and the admin URL that carries it")]
    Show,

    #[command(about = "Sign out and clear the stored token")]
    Logout,
}

pub async fn handle(cmd: SessionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let gate = GateConfig::default();
    let path = session_file()?;

    match cmd {
        SessionCommands::Login { url, email, password } => {
            let base_url = Url::parse(&url)?;
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };

            let store = TokenStore::open(&path, base_url.clone(), gate.cookie_name.clone())?;
            let client = reqwest::Client::builder()
                .cookie_provider(store.cookie_jar())
                .build()?;

            let response = client
                .post(base_url.join("/api/auth/signin")?)
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;

            let status = response.status();
            let body: Value = response.json().await?;
            if !status.is_success() {
                let message = body["error"].as_str().unwrap_or("signin failed");
                output_error(&output_format, message, body["code"].as_str())?;
                anyhow::bail!("signin failed with status {}", status);
            }

            let token = body["data"]["token"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("signin response carried no token"))?;
            store.store(token)?;

            let propagator = TokenPropagator::new(Arc::new(store), &gate, true);
            let admin_url = propagator.navigation_url(&gate.protected_prefix)?;

            output_success(
                &output_format,
                &format!("Signed in to {} as {}", base_url, email),
                Some(json!({
                    "user": body["data"]["user"],
                    "expires_in": body["data"]["expires_in"],
                    "admin_url": admin_url.as_str(),
                })),
            )
        }
        SessionCommands::Show => {
            let Some(base_url) = TokenStore::saved_base_url(&path)? else {
                return output_success(&output_format, "No active session", None);
            };
            let store = TokenStore::open(&path, base_url.clone(), gate.cookie_name.clone())?;

            let token = match store.current() {
                Ok(token) => token,
                Err(PropagationError::Diverged) => {
                    tracing::warn!("Stored tokens disagreed; resynced from {}", path.display());
                    store.resync()?
                }
                Err(e) => return Err(e.into()),
            };
            let Some(token) = token else {
                return output_success(&output_format, "No active session", None);
            };

            let propagator = TokenPropagator::new(Arc::new(store), &gate, true);
            let admin_url = propagator.navigation_url(&gate.protected_prefix)?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Active session",
                    Some(json!({
                        "server": base_url.as_str(),
                        "token": token,
                        "admin_url": admin_url.as_str(),
                    })),
                ),
                OutputFormat::Text => {
                    println!("Server:    {}", base_url);
                    println!("Token:     {}", token_preview(&token));
                    println!("Admin URL: {}", admin_url);
                    Ok(())
                }
            }
        }
        SessionCommands::Logout => {
            let Some(base_url) = TokenStore::saved_base_url(&path)? else {
                return output_success(&output_format, "No active session", None);
            };
            let store = TokenStore::open(&path, base_url.clone(), gate.cookie_name.clone())?;

            if let Some(token) = store.resync()? {
                let client = reqwest::Client::new();
                match client
                    .post(base_url.join("/api/auth/signout")?)
                    .bearer_auth(&token)
                    .send()
                    .await
                {
                    Ok(response) if response.status().is_success() => {}
                    Ok(response) => tracing::warn!("Server refused signout: {}", response.status()),
                    Err(e) => tracing::warn!("Could not reach {} to sign out: {}", base_url, e),
                }
            }

            store.clear()?;
            output_success(&output_format, &format!("Signed out of {}", base_url), None)
        }
    }
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("no password given");
    }
    Ok(password)
}
