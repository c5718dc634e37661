//! zkparity CLI
//!
//! Trusted setup, proving, devnet deployment and vote submission for the
//! parity vote circuit.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use zkparity_client::{
    ArtifactProvider, ChainSubmitter, ClientConfig, FsArtifacts, LocalLedger, TallyReader,
    VotePipeline, CIRCUIT_SOURCE_FILE,
};
use zkparity_compiler::{
    compile, compile_default, parse_vote_input, KeyManager, NativeProver, DEFAULT_CIRCUIT_SOURCE,
};
use zkparity_runtime::{Parity, Tally, VoteCalldata};

#[derive(Parser)]
#[command(name = "zkparity")]
#[command(about = "Private parity vote with Groth16 proofs over BN254", long_about = None)]
struct Cli {
    /// Client configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the compiled circuit
    Info,

    /// Run the trusted setup and write keys
    Setup {
        /// Output directory for keys
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Deterministic setup randomness, for tests only
        #[arg(long)]
        seed: Option<u64>,

        /// Overwrite existing keys
        #[arg(long)]
        force: bool,
    },

    /// Create a devnet ledger with a fresh tally contract
    Deploy {
        /// Key directory written by `setup`
        #[arg(short, long)]
        keys: Option<PathBuf>,

        #[arg(short, long)]
        ledger: Option<PathBuf>,

        /// Replace an existing ledger file
        #[arg(long)]
        force: bool,
    },

    /// Prove a vote and write its calldata
    Prove {
        /// Vote, an integer in [0, 255]
        #[arg(short, long)]
        vote: String,

        #[arg(short, long)]
        keys: Option<PathBuf>,

        /// Output file for the calldata JSON
        #[arg(short, long, default_value = "proof.json")]
        output: PathBuf,
    },

    /// Submit calldata written by `prove`
    Submit {
        #[arg(short, long)]
        proof: PathBuf,

        #[arg(short, long)]
        ledger: Option<PathBuf>,

        /// Confirmation timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Prove and submit a vote in one step
    Vote {
        #[arg(short, long)]
        vote: String,

        #[arg(short, long)]
        keys: Option<PathBuf>,

        #[arg(short, long)]
        ledger: Option<PathBuf>,

        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Execute pending devnet transactions
    Mine {
        #[arg(short, long)]
        ledger: Option<PathBuf>,
    },

    /// Print both counters
    Tally {
        #[arg(short, long)]
        ledger: Option<PathBuf>,
    },
}

fn show_circuit_info() -> Result<()> {
    let circuit = compile_default()?;

    println!("📋 Circuit: {}", circuit.name());
    println!("   Version: {}", circuit.version());
    println!("   Fingerprint: {}", circuit.fingerprint_hex());
    println!("   Wires: {}", circuit.num_wires());
    println!("   Constraints: {}", circuit.num_constraints());
    println!("   Public inputs: {} (parity)", circuit.num_public());
    println!("   Private witnesses: {} (vote, {} bits)", circuit.num_private(), circuit.bits());
    println!();
    println!("   Layout:");
    println!("     w0          constant one");
    println!("     w1          parity (public)");
    println!("     w2          vote (private)");
    println!("     w3..w{}     bits b0..b{} (private)", 2 + circuit.bits(), circuit.bits() - 1);
    Ok(())
}

fn setup_keys(out: &Path, seed: Option<u64>, force: bool) -> Result<()> {
    let circuit = compile_default()?;
    let manager = KeyManager::new(out)?;

    if manager.has_keys() && !force {
        manager.load_keys(&circuit).context(
            "Existing keys do not fit the circuit; rerun with --force to replace them",
        )?;
        println!("🔑 Keys already present in {:?}", out);
        return Ok(());
    }

    println!("🔑 Running trusted setup for {}...", circuit.name());
    let (_, components) = match seed {
        Some(seed) => {
            println!("   ⚠️  Seeded setup, not for production use");
            manager.setup(&circuit, &mut StdRng::seed_from_u64(seed))?
        }
        None => manager.setup(&circuit, &mut OsRng)?,
    };

    let source_path = out.join(CIRCUIT_SOURCE_FILE);
    fs::write(&source_path, DEFAULT_CIRCUIT_SOURCE)
        .context(format!("Failed to write circuit source to {:?}", source_path))?;

    println!("✅ Keys generated");
    println!("   Proving key: {:?}", manager.proving_key_path());
    println!("   Verification key: {:?}", manager.verification_key_path());
    println!("   Key id: {}", components.key_id()?);
    Ok(())
}

fn deploy_ledger(keys: &Path, ledger_path: &Path, config: &ClientConfig, force: bool) -> Result<()> {
    if ledger_path.exists() && !force {
        bail!("Ledger {:?} already exists; rerun with --force to replace it", ledger_path);
    }

    let components = KeyManager::new(keys)?.load_verification_key()?;
    let key_id = components.key_id()?;
    LocalLedger::create(ledger_path, components, config.ledger)
        .context(format!("Failed to deploy ledger at {:?}", ledger_path))?;

    println!("🚀 Tally contract deployed");
    println!("   Ledger: {:?}", ledger_path);
    println!("   Verification key: {}", key_id);
    Ok(())
}

fn load_prover(keys: &Path) -> Result<NativeProver> {
    let artifacts = FsArtifacts::new(keys);
    let circuit = compile(&artifacts.circuit_source()?)?;
    Ok(NativeProver::from_base64(circuit, &artifacts.proving_key_base64()?)?)
}

fn prove_vote(vote: &str, keys: &Path, output: &Path) -> Result<Parity> {
    let prover = load_prover(keys)?;

    println!("📊 Generating proof...");
    let value = parse_vote_input(vote)?;
    let proof = prover.prove(value, &mut OsRng)?;
    let calldata = proof.to_calldata();

    let json = serde_json::to_string_pretty(&calldata).context("Failed to serialize calldata")?;
    fs::write(output, json).context(format!("Failed to write proof to {:?}", output))?;

    println!("✅ Proof generated successfully!");
    println!("   Public parity: {}", proof.parity);
    println!("   Output: {:?}", output);
    Ok(proof.parity)
}

fn load_calldata(path: &Path) -> Result<VoteCalldata> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read proof file: {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse proof JSON")
}

fn open_ledger(path: &Path, config: &ClientConfig) -> Result<Arc<LocalLedger>> {
    let ledger = LocalLedger::open(path, config.ledger)
        .context(format!("Failed to open ledger {:?}; run `zkparity deploy` first", path))?;
    Ok(Arc::new(ledger))
}

fn print_tally(tally: &Tally) {
    println!("📊 Tally");
    println!("   A (even): {}", tally.even);
    println!("   B (odd):  {}", tally.odd);
}

async fn submit_proof(proof: &Path, ledger_path: &Path, config: &ClientConfig) -> Result<()> {
    let calldata = load_calldata(proof)?;
    let ledger = open_ledger(ledger_path, config)?;
    let submitter = ChainSubmitter::new(ledger, config);

    println!("📨 Submitting vote...");
    let handle = submitter.submit(&calldata).await?;
    println!("   Transaction: {}", handle.hash().short());

    let result = submitter.await_receipt(&handle).await?;
    if !result.success {
        println!("❌ Vote rejected in block {}", result.block);
        bail!("Transaction reverted: {}", result.revert_reason.unwrap_or_default());
    }

    println!("✅ Vote counted in block {}", result.block);
    Ok(())
}

async fn cast_vote(vote: &str, keys: &Path, ledger_path: &Path, config: &ClientConfig) -> Result<()> {
    let ledger = open_ledger(ledger_path, config)?;
    let pipeline = VotePipeline::new(&FsArtifacts::new(keys), ledger, config)?;

    println!("🗳️  Casting vote...");
    let receipt = pipeline.cast_vote(vote).await?;

    println!("✅ Vote counted for candidate {}", receipt.parity.candidate());
    println!("   Transaction: {}", receipt.tx_hash.short());
    println!("   Block: {}", receipt.block);
    print_tally(&receipt.tally);
    Ok(())
}

async fn read_tally(ledger_path: &Path, config: &ClientConfig) -> Result<Tally> {
    let ledger = open_ledger(ledger_path, config)?;
    Ok(TallyReader::new(ledger).read_tally().await?)
}

fn with_timeout(config: &ClientConfig, timeout_secs: Option<u64>) -> ClientConfig {
    let mut config = config.clone();
    if let Some(secs) = timeout_secs {
        config.confirmation_timeout = Duration::from_secs(secs);
    }
    config
}

async fn run(command: Commands, config: &ClientConfig) -> Result<()> {
    let keys_or_default = |keys: Option<PathBuf>| keys.unwrap_or_else(|| config.artifact_dir.clone());
    let ledger_or_default = |ledger: Option<PathBuf>| ledger.unwrap_or_else(|| config.ledger_path.clone());

    match command {
        Commands::Info => show_circuit_info()?,
        Commands::Setup { out, seed, force } => {
            setup_keys(&keys_or_default(out), seed, force)?;
        }
        Commands::Deploy { keys, ledger, force } => {
            deploy_ledger(&keys_or_default(keys), &ledger_or_default(ledger), config, force)?;
        }
        Commands::Prove { vote, keys, output } => {
            prove_vote(&vote, &keys_or_default(keys), &output)?;
        }
        Commands::Submit { proof, ledger, timeout_secs } => {
            let config = with_timeout(config, timeout_secs);
            submit_proof(&proof, &ledger_or_default(ledger), &config).await?;
        }
        Commands::Vote { vote, keys, ledger, timeout_secs } => {
            let config = with_timeout(config, timeout_secs);
            cast_vote(&vote, &keys_or_default(keys), &ledger_or_default(ledger), &config).await?;
        }
        Commands::Mine { ledger } => {
            let ledger = open_ledger(&ledger_or_default(ledger), config)?;
            let pending = ledger.pending_count().await;
            let block = ledger.mine_block().await?;
            println!("⛏️  Block {} mined with {} transaction(s)", block, pending);
        }
        Commands::Tally { ledger } => {
            let tally = read_tally(&ledger_or_default(ledger), config).await?;
            print_tally(&tally);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref())?;
    run(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};
    use zkparity_client::LedgerSettings;

    fn test_config(dir: &Path) -> ClientConfig {
        ClientConfig {
            confirmation_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(5),
            artifact_dir: dir.join("keys"),
            ledger_path: dir.join("devnet.json"),
            ledger: LedgerSettings::default(),
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["zkparity", "vote", "--vote", "4", "--timeout-secs", "3"]).unwrap();
        match cli.command {
            Commands::Vote { vote, timeout_secs, keys, .. } => {
                assert_eq!(vote, "4");
                assert_eq!(timeout_secs, Some(3));
                assert!(keys.is_none());
            }
            _ => panic!("expected vote"),
        }

        let cli = Cli::try_parse_from(["zkparity", "tally", "--config", "zk.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("zk.toml")));
    }

    #[test]
    fn test_load_calldata_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();
        assert!(load_calldata(file.path()).is_err());
    }

    #[test]
    fn test_load_calldata_missing_file() {
        assert!(load_calldata(Path::new("/nonexistent/proof.json")).is_err());
    }

    #[test]
    fn test_with_timeout_override() {
        let config = ClientConfig::default();
        assert_eq!(with_timeout(&config, Some(2)).confirmation_timeout, Duration::from_secs(2));
        assert_eq!(with_timeout(&config, None), config);
    }

    #[test]
    fn test_setup_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let keys = temp_dir.path().join("keys");

        setup_keys(&keys, Some(1), false).unwrap();
        let first = KeyManager::new(&keys).unwrap().load_verification_key().unwrap();
        setup_keys(&keys, Some(2), false).unwrap();
        let second = KeyManager::new(&keys).unwrap().load_verification_key().unwrap();

        assert_eq!(first, second);
        assert!(keys.join(CIRCUIT_SOURCE_FILE).exists());
    }

    #[test]
    fn test_deploy_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        setup_keys(&config.artifact_dir, Some(3), false).unwrap();
        deploy_ledger(&config.artifact_dir, &config.ledger_path, &config, false).unwrap();
        assert!(deploy_ledger(&config.artifact_dir, &config.ledger_path, &config, false).is_err());
        deploy_ledger(&config.artifact_dir, &config.ledger_path, &config, true).unwrap();
    }

    #[tokio::test]
    async fn test_prove_submit_tally() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        let proof = temp_dir.path().join("proof.json");

        setup_keys(&config.artifact_dir, Some(4), false).unwrap();
        deploy_ledger(&config.artifact_dir, &config.ledger_path, &config, false).unwrap();

        assert_eq!(prove_vote("4", &config.artifact_dir, &proof).unwrap(), Parity::Even);
        submit_proof(&proof, &config.ledger_path, &config).await.unwrap();
        assert_eq!(read_tally(&config.ledger_path, &config).await.unwrap(), Tally::new(1, 0));

        // Same calldata again is a replay.
        assert!(submit_proof(&proof, &config.ledger_path, &config).await.is_err());
        assert_eq!(read_tally(&config.ledger_path, &config).await.unwrap(), Tally::new(1, 0));
    }

    #[tokio::test]
    async fn test_vote_command_flow() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        setup_keys(&config.artifact_dir, Some(5), false).unwrap();
        deploy_ledger(&config.artifact_dir, &config.ledger_path, &config, false).unwrap();

        cast_vote("7", &config.artifact_dir, &config.ledger_path, &config).await.unwrap();
        assert!(cast_vote("256", &config.artifact_dir, &config.ledger_path, &config).await.is_err());
        assert_eq!(read_tally(&config.ledger_path, &config).await.unwrap(), Tally::new(0, 1));
    }

    #[tokio::test]
    async fn test_missing_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        assert!(read_tally(&config.ledger_path, &config).await.is_err());
    }
}
