use std::fs;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::state::AppState;

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("FINTRACK_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("fintrack").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Persistent tier of the client token store
pub fn session_file() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("session.json"))
}

/// Server-side state for commands that work on the credential store directly.
/// Requires `JWT_SECRET`: an ephemeral secret would mint tokens no server accepts.
pub async fn load_server_state() -> anyhow::Result<AppState> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env();
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set to match the server's signing secret");
    }

    let config = config.validate()?;
    Ok(AppState::initialize(config).await?)
}
