use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odin_core::{ClientConfig, NusbTransport, OdinClient, UsbTransport};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Samsung Odin download-mode tool (Pure Rust)", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// USB vendor ID, hex (overrides config)
    #[arg(long, global = true, value_parser = parse_hex_u16)]
    vid: Option<u16>,

    /// USB product ID, hex (overrides config)
    #[arg(long, global = true, value_parser = parse_hex_u16)]
    pid: Option<u16>,

    /// Send an end-transfer when a transfer is cut short
    #[arg(long, global = true)]
    end_transfer_on_abort: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print device information
    Info {
        /// Also save the raw block to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Dump the partition information table (PIT)
    DumpPit {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Reboot the device
    Reboot,
    /// Power off the device
    Shutdown,
    /// Reboot back into download mode
    RebootDownload,
    /// Write the effective configuration to a TOML file
    WriteConfig { path: PathBuf },
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex id '{}': {}", s, e))
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(vid) = args.vid {
        config.vendor_id = vid;
    }
    if let Some(pid) = args.pid {
        config.product_id = Some(pid);
    }
    if args.end_transfer_on_abort {
        config.end_transfer_on_abort = true;
    }
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    if let Cmd::WriteConfig { path } = &args.command {
        config.save_to_file(path)?;
        info!(path = %path.display(), "Configuration written");
        return Ok(());
    }

    let transport = NusbTransport::open(&config)?;
    info!(
        vid = %format!("{:04X}", transport.vendor_id()),
        pid = %format!("{:04X}", transport.product_id()),
        "Device bound"
    );
    let mut client = OdinClient::new(transport).configure(&config);
    client.connect()?;

    match &args.command {
        Cmd::Info { output } => {
            let device_info = client.get_device_info()?;
            for line in device_info.strings(4) {
                println!("{}", line);
            }
            if let Some(path) = output {
                std::fs::write(path, device_info.as_bytes())
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "Device info saved");
            }
        }
        Cmd::DumpPit { output } => {
            let file =
                File::create(output).with_context(|| format!("creating {}", output.display()))?;
            let mut writer = BufWriter::new(file);
            let bytes = client.dump_partition_table(&mut writer)?;
            info!(path = %output.display(), bytes, "PIT saved");
        }
        // The device leaves download mode once these are acknowledged and
        // would not answer a session-end.
        Cmd::Reboot => {
            client.reboot()?;
            client.release_session();
            return Ok(());
        }
        Cmd::Shutdown => {
            client.shutdown()?;
            client.release_session();
            return Ok(());
        }
        Cmd::RebootDownload => {
            client.reboot_to_download_mode()?;
            client.release_session();
            return Ok(());
        }
        Cmd::WriteConfig { .. } => unreachable!("handled before opening the device"),
    }

    client.end_session()?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting Odin tool (nusb backend)...");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
