//! Hubble CLI
//!
//! Command-line interface for inspecting, decrypting, and producing encrypted
//! Hubble BLE advertisements.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use colored::*;
use rand::RngCore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zeroize::Zeroize;

use hubble_core::constants::{AES128_KEY_SIZE, AES256_KEY_SIZE, DEFAULT_SEARCH_WINDOW_DAYS};
use hubble_core::types::{
    counter_to_time, time_to_counter, EncryptedPacket, MasterKey, SequenceCounter, TimeCounter,
};
use hubble_decoder::{
    decrypt, decrypt_with_known_counter, encrypt_packet, find_time_counter, parse_packet,
    BatchDecryptor, DecryptOptions, DecryptResult,
};

/// Hubble - offline decoder for encrypted BLE advertisements
#[derive(Parser)]
#[command(name = "hubble")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a packet into its wire fields
    Parse {
        /// Raw packet (hex)
        packet: String,
    },

    /// Decrypt a packet
    Decrypt {
        /// Raw packet (hex)
        packet: String,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// Skip the search and use this day
        #[arg(long)]
        counter: Option<TimeCounter>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the day whose keys authenticate a packet, without decrypting
    FindCounter {
        /// Raw packet (hex)
        packet: String,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Encrypt a payload into a wire packet
    Encrypt {
        /// Payload (UTF-8, or hex with --hex)
        payload: String,
        #[command(flatten)]
        key: KeyArgs,
        /// Sequence counter (0-1023)
        #[arg(short, long, default_value_t = 0)]
        seq: SequenceCounter,
        /// Day to encrypt for; defaults to today
        #[arg(long)]
        counter: Option<TimeCounter>,
        /// Treat the payload as hex
        #[arg(long)]
        hex: bool,
    },

    /// Decrypt a JSON capture log
    Batch {
        /// JSON array of captured packets
        input: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
        /// Days tried on each side of each packet's receive time
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_WINDOW_DAYS)]
        window: u32,
        /// Device id attached to decrypted packets
        #[arg(long)]
        device_id: Option<String>,
        /// Stop after the first packet that decrypts
        #[arg(long)]
        stop_on_first: bool,
        /// Write decrypted packets to this file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a random master key
    Keygen {
        /// Key size in bits
        #[arg(short, long, default_value_t = 256)]
        bits: u16,
    },
}

#[derive(Args)]
struct KeyArgs {
    /// Master key (hex, 16 or 32 bytes)
    #[arg(short, long, env = "HUBBLE_KEY", hide_env_values = true)]
    key: String,
}

impl KeyArgs {
    fn master_key(&self) -> Result<MasterKey> {
        MasterKey::from_hex(&self.key).context("Invalid master key")
    }
}

#[derive(Args)]
struct SearchArgs {
    /// Days tried on each side of the expected day
    #[arg(short, long, default_value_t = DEFAULT_SEARCH_WINDOW_DAYS)]
    window: u32,
    /// Expected send time (RFC 3339); defaults to now
    #[arg(short, long, conflicts_with = "day")]
    time: Option<DateTime<Utc>>,
    /// Expected send day (days since the Unix epoch)
    #[arg(long)]
    day: Option<TimeCounter>,
}

impl SearchArgs {
    fn options(&self) -> DecryptOptions {
        let options = DecryptOptions::new().search_window(self.window);
        match (self.time, self.day) {
            (Some(time), _) => options.expected_time(time),
            (None, Some(day)) => options.expected_time(counter_to_time(day)),
            (None, None) => options,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "hubble_decoder=debug,hubble_crypto=debug,info"
    } else {
        "warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match cli.command {
        Commands::Parse { packet } => cmd_parse(&packet),
        Commands::Decrypt {
            packet,
            key,
            search,
            counter,
            json,
        } => cmd_decrypt(&packet, &key, &search, counter, json),
        Commands::FindCounter {
            packet,
            key,
            search,
        } => cmd_find_counter(&packet, &key, &search),
        Commands::Encrypt {
            payload,
            key,
            seq,
            counter,
            hex,
        } => cmd_encrypt(&payload, &key, seq, counter, hex),
        Commands::Batch {
            input,
            key,
            window,
            device_id,
            stop_on_first,
            output,
        } => cmd_batch(
            &input,
            &key,
            window,
            device_id,
            stop_on_first,
            output.as_deref(),
        ),
        Commands::Keygen { bits } => cmd_keygen(bits),
    }
}

fn read_packet(packet: &str) -> Result<EncryptedPacket> {
    EncryptedPacket::from_hex(packet).context("Packet is not valid hex")
}

/// Print the wire fields of a packet
fn cmd_parse(packet: &str) -> Result<()> {
    let packet = read_packet(packet)?;
    let parsed = parse_packet(&packet.payload)?;

    println!("{}", "📦 Packet fields".cyan().bold());
    println!("   {} {}", "Length:".dimmed(), packet.payload.len());
    println!("   {} {}", "Sequence:".yellow(), parsed.sequence_number);
    println!("   {} {:#04x}", "Format bits:".dimmed(), parsed.format_bits());
    println!("   {} {}", "Auth data:".dimmed(), hex::encode(parsed.auth_data()));
    println!("   {} {}", "Auth tag:".yellow(), hex::encode(parsed.auth_tag));
    println!(
        "   {} {} ({} bytes)",
        "Ciphertext:".yellow(),
        hex::encode(&parsed.encrypted_payload),
        parsed.encrypted_payload.len()
    );

    Ok(())
}

fn print_result(result: &DecryptResult) {
    println!("{}", "✅ Decrypted".green().bold());
    println!("   {} {}", "Day:".yellow(), result.time_counter);
    println!(
        "   {} {}",
        "Date:".dimmed(),
        counter_to_time(result.time_counter).format("%Y-%m-%d")
    );
    println!("   {} {}", "Sequence:".yellow(), result.seq_counter);
    println!("   {} {}", "Payload:".green(), hex::encode(&result.payload));
    if let Ok(text) = std::str::from_utf8(&result.payload) {
        if !text.is_empty() && !text.chars().any(char::is_control) {
            println!("   {} {}", "Text:".dimmed(), text);
        }
    }
}

/// Decrypt a single packet
fn cmd_decrypt(
    packet: &str,
    key: &KeyArgs,
    search: &SearchArgs,
    counter: Option<TimeCounter>,
    json: bool,
) -> Result<()> {
    let key = key.master_key()?;
    let packet = read_packet(packet)?;

    let result = match counter {
        Some(counter) => decrypt_with_known_counter(key.as_bytes(), &packet, counter)
            .with_context(|| format!("Packet does not authenticate for day {counter}"))?,
        None => decrypt(key.as_bytes(), &packet, &search.options())
            .context("No day in the search window authenticates the packet")?,
    };

    if json {
        let decrypted = result.into_decrypted_packet(&packet);
        println!("{}", serde_json::to_string_pretty(&decrypted)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

/// Find the authenticating day of a packet
fn cmd_find_counter(packet: &str, key: &KeyArgs, search: &SearchArgs) -> Result<()> {
    let key = key.master_key()?;
    let packet = read_packet(packet)?;

    let counter = find_time_counter(key.as_bytes(), &packet, &search.options())
        .context("No day in the search window authenticates the packet")?;

    println!(
        "{} {} ({})",
        "✅ Day:".green().bold(),
        counter,
        counter_to_time(counter).format("%Y-%m-%d")
    );
    Ok(())
}

/// Encrypt a payload into a packet
fn cmd_encrypt(
    payload: &str,
    key: &KeyArgs,
    seq: SequenceCounter,
    counter: Option<TimeCounter>,
    is_hex: bool,
) -> Result<()> {
    let key = key.master_key()?;
    let plaintext = if is_hex {
        hex::decode(payload.trim()).context("Payload is not valid hex")?
    } else {
        payload.as_bytes().to_vec()
    };
    let counter = counter.unwrap_or_else(|| time_to_counter(Utc::now()));

    let raw = encrypt_packet(key.as_bytes(), counter, seq, &plaintext)
        .context("Failed to encrypt packet")?;

    println!("{}", hex::encode(&raw));
    info!(day = counter, seq, len = raw.len(), "encrypted packet");
    Ok(())
}

fn load_packets(path: &Path) -> Result<Vec<EncryptedPacket>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Decrypt a capture log
fn cmd_batch(
    input: &Path,
    key: &KeyArgs,
    window: u32,
    device_id: Option<String>,
    stop_on_first: bool,
    output: Option<&Path>,
) -> Result<()> {
    let key = key.master_key()?;
    let packets = load_packets(input)?;
    info!(count = packets.len(), "loaded capture log");

    println!(
        "{} {} packets from {}",
        "🔎 Decrypting".cyan().bold(),
        packets.len(),
        input.display()
    );

    let mut decryptor =
        BatchDecryptor::from_key(key, DecryptOptions::new().search_window(window));
    if let Some(id) = device_id {
        decryptor = decryptor.device_id(id);
    }
    if stop_on_first {
        decryptor = decryptor.stop_on_first();
    }

    let summary = decryptor.decrypt_all(&packets);
    let stats = &summary.stats;

    println!("\n{}", "📈 Results:".green().bold());
    println!("   {} {}", "Processed:".dimmed(), stats.total);
    println!("   {} {}", "Decrypted:".green(), stats.decrypted);
    println!("   {} {}", "Not for this key:".yellow(), stats.failed);
    println!("   {} {}", "Malformed:".red(), stats.malformed);
    if stats.errors > 0 {
        println!("   {} {}", "Errors:".red().bold(), stats.errors);
    }
    println!("   {} {:.1}%", "Success rate:".dimmed(), stats.success_rate());

    match output {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&summary.packets)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("\n{} {}", "✅ Saved to:".green(), path.display());
        }
        None => {
            for packet in &summary.packets {
                println!(
                    "   {} day {} seq {}: {}",
                    "•".cyan(),
                    packet.time_counter,
                    packet.sequence_number,
                    packet.payload_hex()
                );
            }
        }
    }

    Ok(())
}

/// Generate a random master key
fn cmd_keygen(bits: u16) -> Result<()> {
    let len = match bits {
        128 => AES128_KEY_SIZE,
        256 => AES256_KEY_SIZE,
        other => bail!("Unsupported key size: {other} bits"),
    };

    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let key = MasterKey::from_bytes(&bytes);
    bytes.zeroize();
    let key = key?;

    println!("{}", hex::encode(key.as_bytes()));
    eprintln!("{}", "⚠️  Keep this key secret.".red().bold());
    Ok(())
}
