//! `coworkers sign-in` and `coworkers sign-out`

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use coworkers_core::{config, Account};
use coworkers_directory::{DirectoryClient, UreqTransport};
use coworkers_store::file;
use coworkers_sync::{pipeline, run_state};

/// Environment variable read when `--password` is omitted.
const PASSWORD_ENV: &str = "COWORKERS_PASSWORD";

#[derive(Args, Debug)]
pub struct SignInArgs {
    /// URL of the employee list, e.g. https://intranet.example.com/rest/coworkers
    #[arg(long)]
    pub endpoint: String,

    /// Directory user name.
    #[arg(long, short = 'u')]
    pub username: String,

    /// Directory password. Falls back to $COWORKERS_PASSWORD.
    #[arg(long)]
    pub password: Option<String>,

    /// Save the account without contacting the directory.
    #[arg(long)]
    pub no_verify: bool,

    /// HTTP timeout in seconds for the verification request.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

impl SignInArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let username = self.username.trim().to_string();
        let password = self
            .password
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .unwrap_or_default();
        if username.is_empty() {
            bail!("username must not be empty");
        }
        if password.is_empty() {
            bail!("password must not be empty (pass --password or set {PASSWORD_ENV})");
        }

        if let Some(existing) =
            config::find_account_at(&home).context("failed to read the account file")?
        {
            bail!(
                "already signed in as '{}'; run `coworkers sign-out` first",
                existing.name()
            );
        }

        let account = Account {
            username,
            password,
            endpoint: self.endpoint.trim().to_string(),
        };

        if self.no_verify {
            println!("{} skipping credential check", "!".yellow().bold());
        } else {
            let directory =
                DirectoryClient::new(UreqTransport::new(Duration::from_secs(self.timeout)));
            let visible = pipeline::verify_account(&directory, &account)
                .with_context(|| format!("could not sign in to {}", account.endpoint))?;
            println!("✓ Credentials accepted ({visible} employees visible)");
        }

        config::create_account_at(&home, &account).context("failed to save the account")?;
        println!("✓ Signed in as '{}'", account.name());
        println!("  Saved to: {}", config::account_path_at(&home).display());
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct SignOutArgs {
    /// Also delete the local contact group and its photos.
    #[arg(long)]
    pub purge: bool,
}

impl SignOutArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let Some(account) =
            config::find_account_at(&home).context("failed to read the account file")?
        else {
            println!("Not signed in.");
            return Ok(());
        };

        let key = account.key();
        config::remove_account_at(&home).context("failed to remove the account file")?;
        run_state::remove_at(&home, &key).context("failed to remove the run state")?;

        if self.purge {
            remove_file_if_present(&file::store_path_at(&home, &key))?;
            remove_dir_if_present(&file::photos_dir_at(&home, &key))?;
            println!("✓ Removed local contacts for '{}'", account.name());
        }

        println!("✓ Signed out '{}'", account.name());
        Ok(())
    }
}

fn remove_file_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}

fn remove_dir_if_present(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}
