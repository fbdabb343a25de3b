//! PpkVault CLI - Command line interface for key pair operations.
//!
//! This tool drives key pair generation, password sealing and master key
//! re-encryption on JSON files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use ppkvault_common::KeyId;
use ppkvault_crypto::{
    EncryptionConfig, EncryptionMethod, EncryptionScheme, EncryptionService, KdfParams,
    MasterKeyEntity,
};
use ppkvault_ppk::{
    EnsureOutcome, JsonFileSyncInfoStore, KeyPair, PpkConfig, PpkService, SyncInfo,
    SyncInfoStore,
};

#[derive(Parser)]
#[command(name = "ppkvault")]
#[command(about = "PpkVault - Key pair protection for master keys")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with optional "ppk" and "encryption" sections.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// KDF strength: "interactive", "moderate", or "sensitive".
    #[arg(long, global = true)]
    kdf: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key pair.
    Keygen {
        /// Where to write the key pair.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Check a key pair password.
    Check {
        /// Key pair file.
        #[arg(short, long)]
        key_pair: PathBuf,
    },

    /// Seal a file under a password.
    Seal {
        /// Password method: "KeyV1" or "StringV1".
        #[arg(short, long, default_value = "StringV1")]
        method: String,

        /// Plaintext file.
        #[arg(short, long)]
        input: PathBuf,

        /// Sealed output file.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Open a file produced by `seal`.
    Open {
        /// Password method: "KeyV1" or "StringV1".
        #[arg(short, long, default_value = "StringV1")]
        method: String,

        /// Sealed file.
        #[arg(short, long)]
        input: PathBuf,

        /// Plaintext output file.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Master key operations.
    MasterKey {
        #[command(subcommand)]
        command: MasterKeyCommands,
    },

    /// Make sure a sync info file carries a key pair.
    Ensure {
        /// Local sync info file.
        #[arg(short, long)]
        sync_info: PathBuf,

        /// Remote sync info file.
        #[arg(short, long)]
        remote: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MasterKeyCommands {
    /// Generate a master key, under a key pair if given, else a password.
    New {
        /// Key pair protecting the master key.
        #[arg(short, long)]
        key_pair: Option<PathBuf>,

        /// Where to write the master key.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Print the decrypted master key.
    Decrypt {
        /// Master key file.
        #[arg(short, long)]
        master_key: PathBuf,

        /// Key pair, for key pair protected master keys.
        #[arg(short, long)]
        key_pair: Option<PathBuf>,
    },

    /// Move a password protected master key under a key pair.
    ToPpk {
        /// Master key file.
        #[arg(short, long)]
        master_key: PathBuf,

        /// Target key pair.
        #[arg(short, long)]
        key_pair: PathBuf,

        /// Output file (default: overwrite the master key file).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Move a key pair protected master key under a password.
    ToPassword {
        /// Master key file.
        #[arg(short, long)]
        master_key: PathBuf,

        /// Key pair currently protecting the master key.
        #[arg(short, long)]
        key_pair: PathBuf,

        /// Output file (default: overwrite the master key file).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Move a key pair protected master key to another key pair.
    Rotate {
        /// Master key file.
        #[arg(short, long)]
        master_key: PathBuf,

        /// Key pair currently protecting the master key.
        #[arg(long)]
        from: PathBuf,

        /// New key pair.
        #[arg(long)]
        to: PathBuf,

        /// Output file (default: overwrite the master key file).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Contents of the `--config` file.
#[derive(Default, Deserialize)]
#[serde(default)]
struct CliConfig {
    ppk: PpkConfig,
    encryption: EncryptionConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let service = build_service(cli.config.as_deref(), cli.kdf.as_deref()).await?;

    match cli.command {
        Commands::Keygen { out } => cmd_keygen(&service, &out).await,

        Commands::Check { key_pair } => cmd_check(&service, &key_pair).await,

        Commands::Seal {
            method,
            input,
            output,
        } => cmd_seal(&service, &method, &input, &output).await,

        Commands::Open {
            method,
            input,
            output,
        } => cmd_open(&service, &method, &input, &output).await,

        Commands::MasterKey { command } => match command {
            MasterKeyCommands::New { key_pair, out } => {
                cmd_master_key_new(&service, key_pair.as_deref(), &out).await
            }
            MasterKeyCommands::Decrypt {
                master_key,
                key_pair,
            } => cmd_master_key_decrypt(&service, &master_key, key_pair.as_deref()).await,
            MasterKeyCommands::ToPpk {
                master_key,
                key_pair,
                out,
            } => cmd_master_key_to_ppk(&service, &master_key, &key_pair, out.as_deref()).await,
            MasterKeyCommands::ToPassword {
                master_key,
                key_pair,
                out,
            } => {
                cmd_master_key_to_password(&service, &master_key, &key_pair, out.as_deref())
                    .await
            }
            MasterKeyCommands::Rotate {
                master_key,
                from,
                to,
                out,
            } => cmd_master_key_rotate(&service, &master_key, &from, &to, out.as_deref()).await,
        },

        Commands::Ensure { sync_info, remote } => {
            cmd_ensure(&service, &sync_info, remote.as_deref()).await
        }
    }
}

/// Build the service from the optional config file and KDF override.
async fn build_service(config_path: Option<&Path>, kdf: Option<&str>) -> Result<PpkService> {
    let mut config = match config_path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<CliConfig>(&json).context("Invalid config file")?
        }
        None => CliConfig::default(),
    };

    if let Some(name) = kdf {
        let params = KdfParams::from_name(name)?;
        config.encryption = config.encryption.with_kdf(params);
    }

    PpkService::standard(config.encryption, config.ppk).context("Invalid configuration")
}

/// Prompt for password securely.
fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(Zeroizing::new(password))
}

/// Prompt for a new password twice.
fn prompt_new_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = prompt_password(prompt)?;
    let confirm = prompt_password("Confirm password: ")?;

    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    Ok(password)
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Write `text` to a temp file, then rename it over `path`.
async fn write_text(path: &Path, text: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, text)
        .await
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))
}

async fn read_key_pair(path: &Path) -> Result<KeyPair> {
    let json = read_text(path).await?;
    KeyPair::from_json(&json).with_context(|| format!("Invalid key pair {}", path.display()))
}

async fn read_master_key(path: &Path) -> Result<MasterKeyEntity> {
    let json = read_text(path).await?;
    MasterKeyEntity::from_json(&json)
        .with_context(|| format!("Invalid master key {}", path.display()))
}

fn format_time(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

/// Generate a key pair.
async fn cmd_keygen(service: &PpkService, out: &Path) -> Result<()> {
    info!("Generating {}-bit key pair", service.config().key_size);

    let password = prompt_new_password("Enter key pair password: ")?;
    let key_pair = service
        .generate_key_pair(&password)
        .await
        .context("Failed to generate key pair")?;

    write_text(out, &key_pair.to_json()?).await?;

    println!("Key pair created successfully!");
    println!("  ID: {}", key_pair.id);
    println!("  Key size: {} bits", key_pair.key_size);
    println!("  Created: {}", format_time(key_pair.created_time));
    println!("  Location: {}", out.display());

    Ok(())
}

/// Check a key pair password.
async fn cmd_check(service: &PpkService, key_pair_path: &Path) -> Result<()> {
    let key_pair = read_key_pair(key_pair_path).await?;
    let password = prompt_password("Enter key pair password: ")?;

    if !service.validate_password(&key_pair, &password).await {
        anyhow::bail!("Password does not open key pair {}", key_pair.id);
    }

    println!("Password is valid for key pair {}", key_pair.id);
    Ok(())
}

/// Seal a file.
async fn cmd_seal(service: &PpkService, method: &str, input: &Path, output: &Path) -> Result<()> {
    let method: EncryptionMethod = method.parse()?;
    let plaintext = Zeroizing::new(read_text(input).await?);
    let password = prompt_new_password("Enter password: ")?;

    let sealed = service
        .encryption()
        .encrypt(method, &password, &plaintext)
        .await
        .context("Failed to seal")?;
    write_text(output, &sealed).await?;

    println!("Sealed {} with {}", input.display(), method);
    Ok(())
}

/// Open a sealed file.
async fn cmd_open(service: &PpkService, method: &str, input: &Path, output: &Path) -> Result<()> {
    let method: EncryptionMethod = method.parse()?;
    let sealed = read_text(input).await?;
    let password = prompt_password("Enter password: ")?;

    let plaintext = service
        .encryption()
        .decrypt(method, &password, &sealed)
        .await
        .context("Failed to open")?;
    write_text(output, &plaintext).await?;

    println!("Opened {} into {}", input.display(), output.display());
    Ok(())
}

/// Generate a master key.
async fn cmd_master_key_new(
    service: &PpkService,
    key_pair_path: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let master_key = match key_pair_path {
        Some(path) => {
            let key_pair = read_key_pair(path).await?;
            let password = prompt_password("Enter key pair password: ")?;
            service.generate_master_key(&key_pair, &password).await
        }
        None => {
            let password = prompt_new_password("Enter master key password: ")?;
            service
                .encryption()
                .generate_master_key(EncryptionScheme::Password(&password))
                .await
        }
    }
    .context("Failed to generate master key")?;

    write_text(out, &master_key.to_json()?).await?;

    println!("Master key created successfully!");
    println!("  ID: {}", master_key.id);
    println!("  Method: {}", master_key.encryption_method);
    println!("  Location: {}", out.display());

    Ok(())
}

/// Print a decrypted master key.
async fn cmd_master_key_decrypt(
    service: &PpkService,
    master_key_path: &Path,
    key_pair_path: Option<&Path>,
) -> Result<()> {
    let master_key = read_master_key(master_key_path).await?;

    let content = match key_pair_path {
        Some(path) => {
            let key_pair = read_key_pair(path).await?;
            let password = prompt_password("Enter key pair password: ")?;
            service
                .decrypt_master_key_content(&master_key, &key_pair, &password)
                .await
        }
        None => {
            let password = prompt_password("Enter master key password: ")?;
            service
                .encryption()
                .decrypt_master_key_content(&master_key, EncryptionScheme::Password(&password))
                .await
        }
    }
    .context("Failed to decrypt master key")?;

    println!("{}", content.as_str());
    Ok(())
}

/// Move a password protected master key under a key pair.
async fn cmd_master_key_to_ppk(
    service: &PpkService,
    master_key_path: &Path,
    key_pair_path: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let master_key = read_master_key(master_key_path).await?;
    let key_pair = read_key_pair(key_pair_path).await?;
    let password = prompt_password("Enter master key password: ")?;

    let updated = service
        .reencrypt_from_password_to_public_key(&master_key, &password, &key_pair)
        .await
        .context("Failed to re-encrypt master key")?;

    write_text(out.unwrap_or(master_key_path), &updated.to_json()?).await?;

    println!("Master key {} now protected by key pair {}", updated.id, key_pair.id);
    Ok(())
}

/// Move a key pair protected master key under a password.
async fn cmd_master_key_to_password(
    service: &PpkService,
    master_key_path: &Path,
    key_pair_path: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let master_key = read_master_key(master_key_path).await?;
    let key_pair = read_key_pair(key_pair_path).await?;
    let password = prompt_password("Enter key pair password: ")?;
    let new_password = prompt_new_password("Enter new master key password: ")?;

    let updated = service
        .reencrypt_from_public_key_to_password(&master_key, &key_pair, &password, &new_password)
        .await
        .context("Failed to re-encrypt master key")?;

    write_text(out.unwrap_or(master_key_path), &updated.to_json()?).await?;

    println!("Master key {} now protected by password", updated.id);
    Ok(())
}

/// Move a master key between key pairs.
async fn cmd_master_key_rotate(
    service: &PpkService,
    master_key_path: &Path,
    from_path: &Path,
    to_path: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let master_key = read_master_key(master_key_path).await?;
    let from = read_key_pair(from_path).await?;
    let to = read_key_pair(to_path).await?;
    let password = prompt_password("Enter current key pair password: ")?;

    let updated = service
        .reencrypt_master_key(&master_key, &from, &password, &to)
        .await
        .context("Failed to rotate master key")?;

    write_text(out.unwrap_or(master_key_path), &updated.to_json()?).await?;

    println!("Master key {} moved from {} to {}", updated.id, from.id, to.id);
    Ok(())
}

/// Generate a key pair for a sync info file if it needs one.
async fn cmd_ensure(
    service: &PpkService,
    sync_info_path: &Path,
    remote_path: Option<&Path>,
) -> Result<()> {
    let store = JsonFileSyncInfoStore::new(sync_info_path);
    let mut local = store
        .load_local()
        .await
        .context("Failed to load sync info")?
        .unwrap_or_default();

    let remote = match remote_path {
        Some(path) => JsonFileSyncInfoStore::new(path)
            .load_local()
            .await
            .context("Failed to load remote sync info")?
            .unwrap_or_default(),
        None => SyncInfo::default(),
    };

    let passwords = |id: &KeyId| {
        rpassword::prompt_password(format!("Enter password for master key {}: ", id))
            .ok()
            .filter(|p| !p.is_empty())
    };

    let outcome = service
        .ensure_exists(&mut local, &remote, &passwords, &store)
        .await
        .context("Failed to ensure key pair")?;

    match outcome {
        EnsureOutcome::Generated(key_pair) => {
            println!("Key pair {} generated and saved", key_pair.id)
        }
        EnsureOutcome::AlreadyExists => println!("A key pair already exists"),
        EnsureOutcome::NoActiveMasterKey => {
            println!("No active master key; nothing to protect a key pair with")
        }
        EnsureOutcome::NoPassword => println!("No master key password; key pair not generated"),
    }

    Ok(())
}
