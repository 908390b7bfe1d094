//! Account and session command handlers

use crate::notify::{InvalidInput, Notification};
use crate::state::AppState;
use anyhow::Context;
use std::io::{BufRead, Write};

/// Uses `--password` when given, otherwise reads one line from stdin.
fn read_password(flag: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }

    eprint!("Password: ");
    std::io::stderr().flush().ok();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_register(
    state: &AppState,
    email: &str,
    username: Option<&str>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(InvalidInput(format!("Invalid email address: {email}")).into());
    }

    let password = read_password(password)?;
    if password.is_empty() {
        return Err(InvalidInput("Password cannot be empty".to_string()).into());
    }

    state.store.register(email, &password, username).await?;

    println!(
        "{}",
        Notification::success("Registration successful! Please log in.")
    );
    Ok(())
}

pub async fn cmd_login(
    state: &AppState,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = read_password(password)?;
    let user = state.store.login(email.trim(), &password).await?;

    state.session.save(&user)?;

    println!("{}", Notification::success("Login successful!"));
    Ok(())
}

pub fn cmd_logout(state: &AppState) -> anyhow::Result<()> {
    if state.session.clear()? {
        println!("{}", Notification::success("Logged out."));
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

pub fn cmd_whoami(state: &AppState) -> anyhow::Result<()> {
    match state.session.load()? {
        Some(user) => {
            println!("Email:    {}", user.email);
            if let Some(name) = &user.username {
                println!("Username: {name}");
            }
            println!("User ID:  {}", user.id);
        }
        None => {
            println!("Not signed in.");
            println!();
            println!("Sign in with: chatkeep login <email>");
        }
    }
    Ok(())
}
