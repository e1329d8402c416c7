//! `booking-cli`: drive the booking client against the hosted backend.
//!
//! Connection settings are read from `BOOKINGS_*` environment variables; each
//! subcommand signs in (or up) within the same process and prints JSON.

use std::io::{self, Write};
use std::sync::Arc;

use booking_client::ClientSettings;
use booking_client::domain::{
    BookingService, DisplayName, ProfileUpdate, RemoteSignOut, SessionSynchronizer,
};
use booking_client::outbound::rest::RestBackend;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig;
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `booking-cli` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "booking-cli",
    about = "Sign in and manage profile and bookings on the hosted backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account and its profile.
    SignUp {
        #[command(flatten)]
        login: Login,
        /// Display name stored on the profile.
        #[arg(long)]
        name: String,
    },
    /// Sign in and print the profile.
    SignIn {
        #[command(flatten)]
        login: Login,
    },
    /// Sign in, optionally update profile fields, and print the profile.
    Profile {
        #[command(flatten)]
        login: Login,
        /// New display name.
        #[arg(long)]
        name: Option<String>,
        /// New postal address.
        #[arg(long)]
        address: Option<String>,
        /// New gender.
        #[arg(long)]
        gender: Option<String>,
        /// New date of birth as `YYYY-MM-DD`.
        #[arg(long, value_parser = parse_birthday)]
        birthday: Option<NaiveDate>,
    },
    /// Sign in and list bookings, latest departure first.
    Bookings {
        #[command(flatten)]
        login: Login,
    },
    /// Sign in and re-validate the session and profile.
    Check {
        #[command(flatten)]
        login: Login,
    },
}

#[derive(Debug, Args)]
struct Login {
    /// Account email.
    #[arg(long)]
    email: String,
    /// Account password.
    #[arg(long)]
    password: String,
}

type Synchronizer = SessionSynchronizer<RestBackend, RestBackend>;

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(run(cli.command))
}

async fn run(command: Command) -> Result<()> {
    let settings = ClientSettings::load_from_iter([std::ffi::OsString::from("booking-cli")])
        .map_err(|err| eyre!("load settings: {err}"))?;
    let backend = Arc::new(
        RestBackend::new(settings.url()?, settings.anon_key()?, settings.request_timeout())
            .wrap_err("build HTTP client")?,
    );
    let sync = Arc::new(SessionSynchronizer::start(Arc::clone(&backend), Arc::clone(&backend)).await);

    let outcome = dispatch(command, &backend, &sync).await;
    report_sign_out(sync.sign_out().await);
    sync.shutdown();
    outcome
}

async fn dispatch(command: Command, backend: &Arc<RestBackend>, sync: &Arc<Synchronizer>) -> Result<()> {
    match command {
        Command::SignUp { login, name } => {
            let profile = sync
                .sign_up(&login.email, &login.password, &name)
                .await
                .wrap_err("sign-up failed")?;
            emit(&profile)
        }
        Command::SignIn { login } => {
            sign_in(sync, &login).await?;
            emit(&sync.profile())
        }
        Command::Profile {
            login,
            name,
            address,
            gender,
            birthday,
        } => {
            sign_in(sync, &login).await?;
            let update = build_update(name, address, gender, birthday)?;
            if !update.is_empty() {
                sync.update_profile(update)
                    .await
                    .wrap_err("profile update failed")?;
            }
            emit(&sync.profile())
        }
        Command::Bookings { login } => {
            sign_in(sync, &login).await?;
            let bookings = BookingService::new(Arc::clone(backend), Arc::clone(sync))
                .list()
                .await
                .wrap_err("list bookings")?;
            emit(&bookings)
        }
        Command::Check { login } => {
            sign_in(sync, &login).await?;
            emit(&sync.check_user().await)
        }
    }
}

async fn sign_in(sync: &Synchronizer, login: &Login) -> Result<()> {
    sync.sign_in(&login.email, &login.password)
        .await
        .wrap_err("sign-in failed")
}

fn build_update(
    name: Option<String>,
    address: Option<String>,
    gender: Option<String>,
    birthday: Option<NaiveDate>,
) -> Result<ProfileUpdate> {
    let mut update = ProfileUpdate::default();
    if let Some(raw) = name {
        update = update.name(DisplayName::new(raw).map_err(|err| eyre!("invalid name: {err}"))?);
    }
    if let Some(value) = address {
        update = update.address(value);
    }
    if let Some(value) = gender {
        update = update.gender(value);
    }
    if let Some(value) = birthday {
        update = update.birthday(value);
    }
    Ok(update)
}

fn parse_birthday(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

fn report_sign_out(outcome: RemoteSignOut) {
    match outcome {
        RemoteSignOut::Pending { reason } => warn!(%reason, "remote sign-out pending"),
        RemoteSignOut::Confirmed | RemoteSignOut::NotRequested => info!("signed out"),
    }
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).wrap_err("render output")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").wrap_err("write output")
}
