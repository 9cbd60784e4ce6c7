//! Evidence Vault - CLI
//!
//! Command-line interface for vault operations. The capture subcommand
//! substitutes a file-backed sensor for the camera, so the full silent
//! pipeline (mute, strip, encrypt, erase) can be exercised on any machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};

use evidence_vault::{
    capture::CaptureHardware, crypto::SoftwareKeyStore, decrypt_stream, encrypt_stream, shake,
    verify, volume::SharedVolume, ArtifactHandle, ArtifactKind, CaptureOrchestrator, KeyCustodian,
    RecordStore, SqliteRecordStore, VaultConfig, VaultError, VaultResult, WipeOrchestrator,
};

#[derive(Parser)]
#[command(name = "evidence-vault")]
#[command(version = evidence_vault::VERSION)]
#[command(about = "Evidence Vault - silent capture, encrypted storage, panic wipe")]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = "./vault.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vault layout and provision the master key
    Init,

    /// Run the silent-capture pipeline on a photo file
    Capture {
        /// Source photo (stands in for the camera sensor)
        path: PathBuf,

        /// Owning user id
        #[arg(short, long, default_value = "local")]
        owner: String,
    },

    /// Encrypt a single file
    Encrypt {
        input: PathBuf,
        output: PathBuf,
    },

    /// Decrypt a single file
    Decrypt {
        input: PathBuf,
        output: PathBuf,
    },

    /// List protected artifacts
    List {
        #[arg(short, long, default_value = "local")]
        owner: String,
    },

    /// Export one artifact as plaintext
    Export {
        /// Artifact id
        id: String,

        /// Output path
        output: PathBuf,

        #[arg(short, long, default_value = "local")]
        owner: String,
    },

    /// SHA-256 content digest of a file
    Verify {
        path: PathBuf,
    },

    /// PANIC WIPE: destroy every artifact and record for an owner
    Wipe {
        #[arg(short, long, default_value = "local")]
        owner: String,

        /// Required; the wipe is irreversible
        #[arg(long)]
        yes: bool,
    },

    /// Feed a synthetic impulse train through the shake detector
    ShakeSim {
        /// Number of impulses
        #[arg(long, default_value_t = 3)]
        impulses: u32,

        /// Gap between impulses in milliseconds
        #[arg(long, default_value_t = 300)]
        interval_ms: u64,
    },
}

/// File-backed stand-in for the camera sensor
struct FileSensor {
    source: PathBuf,
}

#[async_trait]
impl CaptureHardware for FileSensor {
    async fn capture(&self, output: &Path) -> VaultResult<()> {
        tokio::fs::copy(&self.source, output).await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn custodian(config: &VaultConfig) -> Arc<KeyCustodian> {
    Arc::new(KeyCustodian::new(Arc::new(SoftwareKeyStore::new(
        config.key_path(),
    ))))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = VaultConfig::load(&cli.config)?;

    match cli.command {
        Commands::Init => {
            println!("🔐 Initializing evidence vault...");
            std::fs::create_dir_all(&config.data_dir)?;
            std::fs::create_dir_all(&config.temp_cache_dir)?;
            std::fs::create_dir_all(config.artifact_dir())?;

            custodian(&config).ensure_key_exists()?;
            SqliteRecordStore::open(config.store_path())?;
            config.save(&cli.config)?;

            println!("✅ Vault ready at: {}", config.data_dir.display());
            println!("   Config:    {}", cli.config.display());
            println!("   Artifacts: {}", config.artifact_dir().display());
            println!("   Key:       {} (software keystore)", config.key_path().display());
        }

        Commands::Capture { path, owner } => {
            println!("📸 Silent capture: {}", path.display());

            let store = SqliteRecordStore::open(config.store_path())?;
            let orchestrator = CaptureOrchestrator::new(
                Arc::new(FileSensor { source: path }),
                Arc::new(SharedVolume::new(7)),
                custodian(&config),
                config.temp_cache_dir.clone(),
                config.artifact_dir(),
            );

            let artifact = orchestrator.capture_silently().await?;
            store
                .insert(&ArtifactHandle {
                    id: artifact.id.clone(),
                    owner_id: owner,
                    path: artifact.path.clone(),
                    kind: ArtifactKind::Evidence,
                    mime_type: artifact.mime_type.clone(),
                    size: artifact.size,
                    created_at: artifact.captured_at,
                })
                .await?;

            println!("✅ Evidence protected: {}", artifact.id);
            println!("   {} ({} bytes encrypted)", artifact.path.display(), artifact.size);
        }

        Commands::Encrypt { input, output } => {
            let key = custodian(&config).master_key()?;
            let written = encrypt_stream(&key, &input, &output).await?;
            println!("✅ Encrypted {} bytes to: {}", written, output.display());
        }

        Commands::Decrypt { input, output } => {
            let key = custodian(&config).master_key()?;
            decrypt_stream(&key, &input, &output).await?;
            println!("✅ Decrypted to: {}", output.display());
        }

        Commands::List { owner } => {
            let store = SqliteRecordStore::open(config.store_path())?;
            let artifacts = store.enumerate(&owner).await?;

            if artifacts.is_empty() {
                println!("📭 No protected artifacts for {owner}");
            } else {
                println!("🔒 Protected artifacts ({}):", artifacts.len());
                println!("{:-<72}", "");
                for a in artifacts {
                    println!(
                        "{}  {}  {}  {} bytes  {}",
                        a.id,
                        a.created_at.format("%Y-%m-%d %H:%M"),
                        a.mime_type,
                        a.size,
                        a.path.display()
                    );
                }
            }
        }

        Commands::Export { id, output, owner } => {
            let store = SqliteRecordStore::open(config.store_path())?;
            let artifact = store
                .enumerate(&owner)
                .await?
                .into_iter()
                .find(|a| a.id == id)
                .with_context(|| format!("no artifact with id {id}"))?;

            let key = custodian(&config).master_key()?;
            decrypt_stream(&key, &artifact.path, &output).await?;
            println!("📤 Exported to: {}", output.display());
        }

        Commands::Verify { path } => {
            let digest = verify::sha256_file(&path).await?;
            println!("SHA-256: {digest}");

            match verify::anchor_digest(&digest).await {
                Ok(receipt) => println!("⚓ Anchored: {receipt}"),
                Err(VaultError::Unsupported(_)) => {
                    println!("   (anchoring backend not configured)");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Wipe { owner, yes } => {
            anyhow::ensure!(yes, "panic wipe is irreversible; pass --yes to confirm");

            let store = Arc::new(SqliteRecordStore::open(config.store_path())?);
            let orchestrator = WipeOrchestrator::new(store, config.temp_cache_dir.clone());
            let result = orchestrator.execute(&owner).await?;

            println!(
                "🗑️ Wiped {}/{} artifacts in {}ms",
                result.artifacts_wiped,
                result.artifacts_attempted,
                result.elapsed.as_millis()
            );
            for failure in &result.failures {
                println!("   ⚠️ {} survived: {}", failure.path.display(), failure.reason);
            }
        }

        Commands::ShakeSim { impulses, interval_ms } => {
            let mut detector = shake::ShakeDetector::new(config.shake.clone());
            let mut triggered_at = None;

            for i in 0..impulses {
                let t = u64::from(i) * interval_ms;
                if let Some(event) = detector.on_sample(30.0, 0.0, 9.8, t) {
                    triggered_at = Some(event.at_ms);
                    break;
                }
            }

            match triggered_at {
                Some(at) => println!("💥 Wipe would trigger at t={at}ms"),
                None => println!(
                    "🤷 No trigger: {impulses} impulses every {interval_ms}ms \
                     (need {} within {}ms)",
                    config.shake.required_count, config.shake.window_ms
                ),
            }
        }
    }

    Ok(())
}
