use clap::Subcommand;
use serde_json::json;

use crate::auth::Subject;
use crate::cli::config::load_server_state;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::normalize_email;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a token for a registered principal")]
    Issue {
        #[arg(help = "Principal email")]
        email: String,
    },

    #[command(about = "Verify a token and show its claims")]
    Verify {
        #[arg(help = "Bearer token")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = load_server_state().await?;

    match cmd {
        TokenCommands::Issue { email } => {
            let principal = state.principals().require_by_email(&normalize_email(&email)).await?;
            let role = state.accounts().role_for(&principal.id).await;
            let issued = state.tokens.issue(&Subject {
                subject_id: principal.id.clone(),
                email: principal.email.clone(),
                role,
            })?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    &format!("Issued token for {}", principal.email),
                    Some(json!({
                        "token": issued.token,
                        "expires_in": issued.expires_in(),
                        "claims": issued.claims,
                    })),
                ),
                OutputFormat::Text => {
                    println!("{}", issued.token);
                    Ok(())
                }
            }
        }
        TokenCommands::Verify { token } => {
            let claims = match state.tokens.verify(&token).await {
                Ok(claims) => claims,
                Err(e) => {
                    output_error(&output_format, &e.to_string(), Some("INVALID_TOKEN"))?;
                    anyhow::bail!("token rejected");
                }
            };
            let is_admin = state.resolver.is_admin(&claims).await;

            output_success(
                &output_format,
                &format!(
                    "Valid token for {} (role '{}', admin: {}, expires {})",
                    claims.email,
                    claims.role,
                    is_admin,
                    claims.expires_at().format("%Y-%m-%d %H:%M UTC")
                ),
                Some(json!({ "claims": claims, "is_admin": is_admin })),
            )
        }
    }
}
