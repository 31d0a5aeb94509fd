use clap::Subcommand;
use serde_json::json;

use crate::audit::{self, AuditEvent};
use crate::cli::config::load_server_state;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::normalize_email;

#[derive(Subcommand)]
pub enum GrantCommands {
    #[command(about = "Grant an elevated role to a registered principal")]
    Add {
        #[arg(help = "Principal email")]
        email: String,
        #[arg(long, default_value = "admin", help = "Role to grant")]
        role: String,
    },

    #[command(about = "Remove every grant held by a principal")]
    Revoke {
        #[arg(help = "Principal email")]
        email: String,
    },

    #[command(about = "List all admin grants")]
    List,
}

pub async fn handle(cmd: GrantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = load_server_state().await?;
    let principals = state.principals();
    let grants = state.grants();

    match cmd {
        GrantCommands::Add { email, role } => {
            let principal = principals.require_by_email(&normalize_email(&email)).await?;
            let grant = grants.create(&principal.id, &role).await?;
            audit::record(AuditEvent::GrantAdded, Some(&principal.id), &format!("role '{}'", grant.role));

            output_success(
                &output_format,
                &format!("Granted '{}' to {}", grant.role, principal.email),
                Some(json!({ "grant": grant })),
            )
        }
        GrantCommands::Revoke { email } => {
            let principal = principals.require_by_email(&normalize_email(&email)).await?;
            let removed = grants.revoke(&principal.id).await?;
            audit::record(AuditEvent::GrantRevoked, Some(&principal.id), &format!("{} grant(s) removed", removed));

            output_success(
                &output_format,
                &format!("Removed {} grant(s) from {}", removed, principal.email),
                Some(json!({ "removed": removed })),
            )
        }
        GrantCommands::List => {
            let all = grants.list().await?;
            if all.is_empty() {
                return output_empty_collection(&output_format, "grants", "No admin grants");
            }

            let mut rows = Vec::with_capacity(all.len());
            for grant in all {
                let email = principals
                    .find_by_id(&grant.principal_id)
                    .await?
                    .map(|p| p.email)
                    .unwrap_or_default();
                rows.push((grant, email));
            }

            match output_format {
                OutputFormat::Json => {
                    let grants: Vec<_> = rows
                        .iter()
                        .map(|(grant, email)| {
                            json!({
                                "id": grant.id,
                                "principal_id": grant.principal_id,
                                "email": email,
                                "role": grant.role,
                                "created_at": grant.created_at,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&json!({ "grants": grants }))?);
                }
                OutputFormat::Text => {
                    println!("{:<30} {:<12} {:<20} {}", "EMAIL", "ROLE", "GRANTED", "PRINCIPAL");
                    println!("{}", "-".repeat(100));
                    for (grant, email) in &rows {
                        println!(
                            "{:<30} {:<12} {:<20} {}",
                            email,
                            grant.role,
                            grant.created_at.format("%Y-%m-%d %H:%M"),
                            grant.principal_id
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
