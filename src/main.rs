mod config;

use anyhow::{Context, Result};
use apple_client_secret::{
    create_client_secret, decode, parse_lifetime, Audience, LifetimePreset, TokenRequest,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

// ─── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "apple-client-secret",
    version,
    about = "Generate Sign in with Apple client secrets"
)]
struct Cli {
    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: Format,

    /// Override data directory (default: ./apple-client-secret or ~/.apple-client-secret).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Hour,
    Day,
    Week,
    Month,
    SixMonths,
    Year,
}

impl From<Preset> for LifetimePreset {
    fn from(p: Preset) -> Self {
        match p {
            Preset::Hour => LifetimePreset::Hour,
            Preset::Day => LifetimePreset::Day,
            Preset::Week => LifetimePreset::Week,
            Preset::Month => LifetimePreset::Month,
            Preset::SixMonths => LifetimePreset::SixMonths,
            Preset::Year => LifetimePreset::Year,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Create a new data directory with a template config.
    Init {
        /// Create in ~/.apple-client-secret instead of ./apple-client-secret.
        #[arg(long)]
        global: bool,
    },

    /// Sign a new client secret.
    Sign(SignArgs),

    /// Show the header and claims of a token. Does NOT verify the signature.
    Decode {
        /// The token, or `-` to read it from stdin.
        token: String,
    },

    /// List configured profiles.
    Profiles,
}

#[derive(Args)]
struct SignArgs {
    /// Profile from config.toml to start from.
    #[arg(long)]
    profile: Option<String>,
    /// Key identifier (10 characters, from the key's download name).
    #[arg(long)]
    key_id: Option<String>,
    /// Team identifier, used as `iss`.
    #[arg(long)]
    team_id: Option<String>,
    /// Services ID or bundle ID, used as `sub`.
    #[arg(long)]
    client_id: Option<String>,
    /// Path to an `AuthKey_*.p8` file, or the key text itself.
    #[arg(long)]
    private_key: Option<String>,
    /// Lifetime in seconds (at most 15777000).
    #[arg(long, conflicts_with = "preset")]
    lifetime: Option<String>,
    /// Named lifetime instead of --lifetime.
    #[arg(long, value_enum)]
    preset: Option<Preset>,
    /// Value of the `aud` claim, or `none` to omit it.
    #[arg(long)]
    audience: Option<String>,
}

// ─── Entry ───────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apple_client_secret=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, format);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Cmd::Init { global } = &cli.cmd {
        return cmd_init(*global);
    }
    if let Cmd::Decode { token } = &cli.cmd {
        return cmd_decode(token, cli.format);
    }

    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref())?;
    debug!(data_dir = %data_dir.display(), "resolved data directory");

    match cli.cmd {
        Cmd::Init { .. } | Cmd::Decode { .. } => unreachable!(),
        Cmd::Sign(args) => cmd_sign(&data_dir, &args, cli.format),
        Cmd::Profiles => cmd_profiles(&data_dir, cli.format),
    }
}

fn report_error(err: &anyhow::Error, fmt: Format) {
    let (kind, message) = match err.downcast_ref::<apple_client_secret::Error>() {
        Some(e) => (e.kind(), e.message().to_string()),
        None => ("Error", format!("{err:#}")),
    };
    match fmt {
        Format::Json => {
            let out = serde_json::json!({ "error": { "kind": kind, "message": message } });
            println!("{out:#}");
        }
        Format::Text => eprintln!("error: {err:#}"),
    }
}

// ─── init ────────────────────────────────────────────────────────────────────

fn cmd_init(global: bool) -> Result<()> {
    let dir = config::init_data_dir(global)?;
    std::fs::create_dir_all(&dir)?;

    let cfg_path = dir.join(config::CONFIG_FILE);
    if cfg_path.exists() {
        eprintln!("Config already exists: {}", cfg_path.display());
    } else {
        std::fs::write(&cfg_path, config::CONFIG_TEMPLATE)?;
        eprintln!("Created {}", cfg_path.display());
    }

    eprintln!("Initialized in {}", dir.display());
    eprintln!();
    eprintln!("Next steps:");
    eprintln!(
        "  1. Copy your AuthKey_*.p8 into {} and edit {}",
        dir.display(),
        cfg_path.display()
    );
    eprintln!("  2. Run `apple-client-secret sign --profile web`");
    Ok(())
}

// ─── sign ────────────────────────────────────────────────────────────────────

fn cmd_sign(data_dir: &Path, args: &SignArgs, fmt: Format) -> Result<()> {
    let base = match config::Config::load_optional(data_dir)? {
        Some(cfg) => cfg.settings(args.profile.as_deref())?,
        None => {
            if let Some(name) = &args.profile {
                anyhow::bail!(
                    "profile '{name}' requested but no config found.\n\
                     Looked in: {}",
                    data_dir.display()
                );
            }
            config::Settings::default()
        }
    };

    let lifetime_secs = match (&args.lifetime, args.preset) {
        (Some(text), _) => parse_lifetime(text)?,
        (None, Some(preset)) => LifetimePreset::from(preset).seconds(),
        (None, None) => base
            .lifetime
            .unwrap_or_else(|| LifetimePreset::Month.seconds()),
    };

    let request = TokenRequest {
        key_id: args.key_id.clone().or(base.key_id).unwrap_or_default(),
        issuer: args.team_id.clone().or(base.team_id).unwrap_or_default(),
        subject: args.client_id.clone().or(base.client_id).unwrap_or_default(),
        audience: args
            .audience
            .clone()
            .map(Audience::from)
            .or(base.audience)
            .unwrap_or_default(),
        lifetime_secs,
    };

    let key_value = match (&args.private_key, base.private_key) {
        (Some(v), _) => Some((v.clone(), PathBuf::from("."))),
        (None, Some(v)) => Some((v, data_dir.to_path_buf())),
        (None, None) => None,
    };

    // Caller input is checked before the key is even read from disk.
    request.validate(key_value.is_some())?;

    let key_text = match key_value {
        Some((value, relative_to)) => config::resolve_key(&value, &relative_to)?,
        None => String::new(),
    };

    let token = create_client_secret(&request, &key_text)?;

    match fmt {
        Format::Text => println!("{token}"),
        Format::Json => {
            let decoded = decode(token.as_str())?;
            let out = serde_json::json!({
                "token": token,
                "header": decoded.header,
                "claims": decoded.claims,
                "issued_at": decoded.issued_at,
                "expires_at": decoded.expires_at,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

// ─── decode ──────────────────────────────────────────────────────────────────

fn cmd_decode(token: &str, fmt: Format) -> Result<()> {
    let token = if token == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("could not read token from stdin")?;
        buf
    } else {
        token.to_string()
    };

    let decoded = decode(&token)?;
    let expired = decoded.is_expired_at(Utc::now());

    match fmt {
        Format::Json => {
            let out = serde_json::json!({
                "header": decoded.header,
                "claims": decoded.claims,
                "issued_at": decoded.issued_at,
                "expires_at": decoded.expires_at,
                "expired": expired,
                "signature_verified": false,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Text => {
            println!("Header");
            println!("{}", "─".repeat(40));
            println!("{}", serde_json::to_string_pretty(&decoded.header)?);
            println!();
            println!("Claims");
            println!("{}", "─".repeat(40));
            println!("{}", serde_json::to_string_pretty(&decoded.claims)?);
            println!();
            println!("Issued:     {}", decoded.issued_at_display());
            let status = if expired == Some(true) { " (expired)" } else { "" };
            println!("Expires:    {}{status}", decoded.expires_at_display());
            println!("Signature:  present, NOT verified");
        }
    }
    Ok(())
}

// ─── profiles ────────────────────────────────────────────────────────────────

fn cmd_profiles(data_dir: &Path, fmt: Format) -> Result<()> {
    if !data_dir.join(config::CONFIG_FILE).exists() {
        anyhow::bail!(
            "No config found. Run `apple-client-secret init` first.\n\
             Looked in: {}",
            data_dir.display()
        );
    }
    let cfg = config::Config::load(data_dir)?;

    match fmt {
        Format::Json => {
            let out: Vec<serde_json::Value> = cfg
                .profiles
                .iter()
                .map(|p| {
                    let s = p.settings.clone().or(&cfg.defaults);
                    serde_json::json!({
                        "name": p.name,
                        "client_id": s.client_id,
                        "team_id": s.team_id,
                        "key_id": s.key_id,
                        "audience": s.audience.unwrap_or_default().to_string(),
                        "lifetime": s.lifetime,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Text => {
            if cfg.profiles.is_empty() {
                println!("No profiles configured.");
                return Ok(());
            }
            println!(
                "{:<16} {:<32} {:<12} AUDIENCE",
                "NAME", "CLIENT ID", "KEY ID"
            );
            println!("{}", "-".repeat(90));
            for p in &cfg.profiles {
                let s = p.settings.clone().or(&cfg.defaults);
                println!(
                    "{:<16} {:<32} {:<12} {}",
                    p.name,
                    s.client_id.as_deref().unwrap_or("-"),
                    s.key_id.as_deref().unwrap_or("-"),
                    s.audience.unwrap_or_default(),
                );
            }
        }
    }
    Ok(())
}
