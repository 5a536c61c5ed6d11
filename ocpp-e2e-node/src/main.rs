//! OCPP E2E Node - CLI for OCPP message signatures
//!
//! Generates key pairs, signs OCPP-J frames (or binary DataTransfer frames)
//! and verifies them under a policy file.
//!
//! # Usage
//!
//! ```bash
//! # New secp256r1 key pair
//! ocpp-e2e-node keygen --out csms.key.json
//!
//! # Publish the public half
//! ocpp-e2e-node public-key --key csms.key.json > csms.pub.json
//!
//! # Sign a frame
//! ocpp-e2e-node sign --key csms.key.json --message boot.json --name CSMS > boot.signed.json
//!
//! # Verify (exit status 2 when the message must not be acted upon)
//! ocpp-e2e-node verify --policy policy.json --message boot.signed.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use ocpp_e2e::{
    BinaryDataTransferRequest, CurveAlgorithm, KeyEncoding, KeyPair, KeySerialization,
    OcppMessage, PolicyConfig, SignInfo, SignableMessage, SignaturePolicy, SigningMethod,
    VerificationStatus,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Exit status for messages that verify but must not be accepted
const EXIT_NOT_ACCEPTED: i32 = 2;

/// OCPP end-to-end signature tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a key pair
    Keygen {
        /// Curve name (secp256r1, secp256k1)
        #[arg(short, long, default_value = "secp256r1")]
        algorithm: String,

        /// Public key serialization (raw, compressed)
        #[arg(long, default_value = "raw")]
        serialization: String,

        /// Key text encoding (base64, hex)
        #[arg(long, default_value = "base64")]
        encoding: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the public key of a key pair
    PublicKey {
        /// Key pair JSON file
        #[arg(short, long)]
        key: PathBuf,
    },

    /// Sign a message
    Sign {
        /// Key pair JSON file
        #[arg(short, long)]
        key: PathBuf,

        /// Message file
        #[arg(short, long)]
        message: PathBuf,

        /// Message format
        #[arg(long, value_enum, default_value_t = Format::OcppJ)]
        format: Format,

        /// Signer name written into the signature
        #[arg(long)]
        name: Option<String>,

        /// Canonical form to sign (json, binary); defaults to the message's own
        #[arg(long)]
        method: Option<String>,

        /// Stamp the signature with the current time
        #[arg(long)]
        timestamp: bool,

        /// Write to file instead of stdout (binary frames are printed as hex)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Verify a message under a policy
    Verify {
        /// Policy JSON file
        #[arg(short, long)]
        policy: PathBuf,

        /// Message file
        #[arg(short, long)]
        message: PathBuf,

        /// Message format
        #[arg(long, value_enum, default_value_t = Format::OcppJ)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// OCPP-J JSON frame `[2, id, action, payload]`
    OcppJ,
    /// Binary DataTransfer frame
    Binary,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Keygen {
            algorithm,
            serialization,
            encoding,
            out,
        } => {
            let algorithm = CurveAlgorithm::from(algorithm.as_str());
            let serialization: KeySerialization = serialization.parse()?;
            let encoding: KeyEncoding = encoding.parse()?;
            let key_pair = KeyPair::generate_with(&algorithm, serialization, encoding)?;
            emit(out.as_deref(), serde_json::to_string_pretty(&key_pair.to_json())?.as_bytes())?;
        }

        Command::PublicKey { key } => {
            let key_pair = load_key(&key)?;
            println!("{}", serde_json::to_string_pretty(&key_pair.public_key().to_json())?);
        }

        Command::Sign {
            key,
            message,
            format,
            name,
            method,
            timestamp,
            out,
        } => {
            let mut info = SignInfo::new(load_key(&key)?);
            info.name = name;
            info.include_timestamp = timestamp;
            info.signing_method = method.as_deref().map(SigningMethod::from);
            let policy = SignaturePolicy::new();

            let bytes = fs::read(&message)?;
            let signed = match format {
                Format::OcppJ => {
                    let OcppMessage::Call(call) = OcppMessage::parse(&bytes)? else {
                        return Err("only CALL frames carry signatures".into());
                    };
                    let mut call = call.with_sign_info(info);
                    policy.sign_message(&mut call)?;
                    OcppMessage::Call(call).to_bytes()?
                }
                Format::Binary => {
                    let mut request = BinaryDataTransferRequest::parse_binary(&bytes)?.with_sign_info(info);
                    policy.sign_message(&mut request)?;
                    let frame = request.to_binary()?;
                    if out.is_none() {
                        hex::encode(&frame).into_bytes()
                    } else {
                        frame
                    }
                }
            };
            info!("Signed {}", message.display());
            emit(out.as_deref(), &signed)?;
        }

        Command::Verify {
            policy,
            message,
            format,
        } => {
            let policy = PolicyConfig::from_file(&policy)?.build();
            let bytes = fs::read(&message)?;

            let status = match format {
                Format::OcppJ => match OcppMessage::parse(&bytes)? {
                    OcppMessage::Call(call) => verify_and_report(&policy, &call),
                    other => {
                        return Err(format!("{} is not a CALL frame", other.message_id()).into())
                    }
                },
                Format::Binary => {
                    let request = BinaryDataTransferRequest::parse_binary(&bytes)?;
                    verify_and_report(&policy, &request)
                }
            };

            if !status.accepts_message() {
                warn!("{} must not be acted upon", message.display());
                std::process::exit(EXIT_NOT_ACCEPTED);
            }
        }
    }

    Ok(())
}

fn load_key(path: &Path) -> Result<KeyPair, Box<dyn std::error::Error>> {
    Ok(KeyPair::parse_str(&fs::read_to_string(path)?)?)
}

fn verify_and_report<M: SignableMessage>(policy: &SignaturePolicy, message: &M) -> VerificationStatus {
    let status = policy.verify_message(message);
    for (i, signature) in message.signatures().iter().enumerate() {
        let name = signature.name().unwrap_or("-");
        let status = signature
            .status()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Unverified".to_string());
        println!("signature {:<3} {:<24} {}", i, truncate(name, 24), status);
    }
    println!("{} {}", message.action(), status);
    status
}

/// Write to `out`, or stdout with a trailing newline
fn emit(out: Option<&Path>, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    match out {
        Some(path) => {
            fs::write(path, bytes)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", String::from_utf8_lossy(bytes)),
    }
    Ok(())
}

/// Truncate string with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
