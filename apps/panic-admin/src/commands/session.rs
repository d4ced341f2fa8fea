use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use tracing::info;

use super::Console;
use crate::LoginArgs;

impl Console {
    pub async fn login(&self, args: LoginArgs) -> Result<()> {
        let password = match args.password {
            Some(password) => password,
            None => prompt_line("Password: ")?,
        };
        if password.is_empty() {
            bail!("password must not be empty");
        }
        let token = self
            .client()?
            .login(args.email.trim(), &password)
            .await
            .context("login failed")?;
        self.session.login(&token).context("failed to store session token")?;
        info!(email = %args.email.trim(), "signed in");
        println!("Signed in as {}", args.email.trim());
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.session.logout().context("failed to clear session token")?;
        println!("Signed out");
        Ok(())
    }

    pub fn whoami(&self) -> Result<()> {
        let Some(session) = self.session.current().context("failed to read session token")? else {
            println!("Not signed in");
            return Ok(());
        };
        println!("email:   {}", session.email.as_deref().unwrap_or("-"));
        println!("subject: {}", session.subject.as_deref().unwrap_or("-"));
        println!("admin:   {}", if session.is_admin { "yes" } else { "no" });
        match session.expires_at {
            Some(expires_at) => println!("expires: {}", expires_at.to_rfc3339()),
            None => println!("expires: -"),
        }
        Ok(())
    }
}

pub(super) fn prompt_line(prompt: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
