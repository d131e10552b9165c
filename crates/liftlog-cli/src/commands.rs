//! Command handlers for the LiftLog CLI.
//!
//! Each handler resolves the stored session first, then gates on the
//! published state: protected commands redirect to `liftlog login` when no
//! live session is available.

use anyhow::Result;
use auth_engine::{AuthError, AuthGate, NewUser, SessionManager, SessionState};
use std::io::{self, Write};

const LOGIN_HINT: &str = "Not logged in. Run 'liftlog login' first.";

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

/// Resolve the stored session and wait for the first definite state.
async fn resolve(manager: &SessionManager) -> Result<SessionState> {
    let mut gate = AuthGate::new(manager.subscribe());
    manager.resolve().await?;
    Ok(gate.wait_until_resolved().await)
}

/// Login with username and password.
pub async fn login(manager: &SessionManager) -> Result<()> {
    if let SessionState::Authenticated(session) = resolve(manager).await? {
        println!("Already logged in as {}", session.identity.username);
        return Ok(());
    }

    let username = prompt("Username")?;
    if username.is_empty() {
        println!("Username is required");
        return Ok(());
    }
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        println!("Password is required");
        return Ok(());
    }

    match manager.login(&username, &password).await {
        Ok(session) => {
            println!("Logged in as {}", session.identity.username);
        }
        Err(AuthError::InvalidCredentials(detail)) => {
            println!("{}", detail);
        }
        Err(err) if err.is_transient() => {
            println!("Could not reach the server, try again: {}", err);
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

/// Logout and clear the stored session.
pub async fn logout(manager: &SessionManager) -> Result<()> {
    resolve(manager).await?;
    manager.logout().await;
    println!("Logged out");
    Ok(())
}

/// Show session status.
pub async fn status(manager: &SessionManager) -> Result<()> {
    match resolve(manager).await? {
        SessionState::Authenticated(session) => {
            println!("Logged in as:     {}", session.identity.username);
            println!("Access token exp: {}", session.access_token.expires_at);
            println!("Refresh token exp:{}", session.refresh_token.expires_at);
        }
        _ => {
            println!("Not logged in");
        }
    }
    Ok(())
}

/// Show the logged-in user's profile.
pub async fn whoami(manager: &SessionManager) -> Result<()> {
    if !resolve(manager).await?.is_authenticated() {
        println!("{}", LOGIN_HINT);
        return Ok(());
    }

    match manager.profile().await {
        Ok(profile) => {
            println!("Username:  {}", profile.username);
            if let Some(email) = profile.email {
                println!("Email:     {}", email);
            }
            if let Some(full_name) = profile.full_name {
                println!("Full name: {}", full_name);
            }
        }
        Err(AuthError::SessionExpired) | Err(AuthError::NotAuthenticated) => {
            println!("{}", LOGIN_HINT);
        }
        Err(err) if err.is_transient() => {
            println!("Could not reach the server, try again: {}", err);
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

/// Create a new account.
pub async fn register(manager: &SessionManager) -> Result<()> {
    let username = prompt("Username")?;
    let password = rpassword::prompt_password("Password: ")?;
    let email = prompt("Email")?;
    let full_name = prompt("Full name")?;

    let new_user = NewUser {
        username,
        password,
        email,
        full_name,
    };

    match manager.register(&new_user).await {
        Ok(username) => {
            println!("User '{}' created", username);
        }
        Err(AuthError::Rejected(detail)) => {
            println!("{}", detail);
        }
        Err(err) if err.is_transient() => {
            println!("Could not reach the server, try again: {}", err);
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

/// Delete the account and clear the session.
pub async fn delete_account(manager: &SessionManager) -> Result<()> {
    let state = resolve(manager).await?;
    let SessionState::Authenticated(session) = state else {
        println!("{}", LOGIN_HINT);
        return Ok(());
    };

    let confirmation = prompt(&format!(
        "Type '{}' to permanently delete this account",
        session.identity.username
    ))?;
    if confirmation != session.identity.username {
        println!("Aborted");
        return Ok(());
    }

    match manager.delete_account().await {
        Ok(()) => {
            println!("Account deleted");
        }
        Err(err) => {
            // The local session is gone either way.
            println!("Server reported an error: {}. Logged out locally.", err);
        }
    }
    Ok(())
}
