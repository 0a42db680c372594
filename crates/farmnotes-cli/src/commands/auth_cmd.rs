use farmnotes_core::auth::{KvSessionStore, SessionPersistence};

use crate::auth::{auth_client, describe_session};
use crate::cli::AuthCommands;
use crate::commands::common::CliContext;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, ctx: &CliContext) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let auth_service = auth_client(&ctx.config, ctx.open_storage()?)?
                .ok_or_else(|| CliError::NotConfigured(ctx.profile_name.clone()))?;
            let session = auth_service
                .sign_in(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in profile '{}' as {email_label}", ctx.profile_name);
            Ok(())
        }
        AuthCommands::Status => {
            let storage = ctx.open_storage()?;
            let session = match auth_client(&ctx.config, storage.clone())? {
                Some(service) if !ctx.offline => service.restore_session().await,
                Some(service) => service.stored_session(),
                None => KvSessionStore::new(storage).load_session(),
            }
            .map_err(|error| CliError::Auth(error.to_string()))?;

            if let Some(session) = session {
                println!(
                    "Profile '{}' is signed in as {}",
                    ctx.profile_name,
                    describe_session(&session)
                );
            } else {
                println!("Profile '{}' is not signed in.", ctx.profile_name);
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let storage = ctx.open_storage()?;
            let store = KvSessionStore::new(storage.clone());
            let stored_session = store
                .load_session()
                .map_err(|error| CliError::Auth(error.to_string()))?;

            match (auth_client(&ctx.config, storage)?, stored_session) {
                (Some(service), Some(session)) if !ctx.offline => {
                    if let Err(error) = service.sign_out(&session.access_token).await {
                        tracing::warn!("Remote sign-out failed, local session cleared: {}", error);
                    }
                }
                _ => store
                    .clear_session()
                    .map_err(|error| CliError::Auth(error.to_string()))?,
            }

            println!("Signed out profile '{}'", ctx.profile_name);
            Ok(())
        }
    }
}
