use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fastboot_core::{
    DeviceHandle, FastbootSession, NusbBackend, NusbTransport, TransportConfig, find_device,
    find_devices,
};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fastboot Protocol Tool (Pure Rust)", long_about = None)]
struct Args {
    /// Serial number of the device to use
    #[arg(short, long, global = true)]
    serial: Option<String>,

    /// Path to a TOML transport configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List connected Fastboot devices
    Devices,
    /// Read a bootloader variable
    Getvar { name: String },
    /// Download a file to the device buffer
    Download { file: PathBuf },
    /// Download a file and write it to a partition
    Flash { partition: String, file: PathBuf },
    /// Download an image and boot it
    Boot { file: PathBuf },
    /// Erase a partition
    Erase { partition: String },
    /// Reboot the device
    Reboot,
    /// Continue the normal boot process
    Continue,
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

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => TransportConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TransportConfig::default(),
    };
    let backend = NusbBackend::new(config);

    if let Commands::Devices = args.command {
        for handle in find_devices(&backend)? {
            println!("{}\tfastboot", handle.serial());
            handle.close()?;
        }
        return Ok(());
    }

    // Load images before claiming the device.
    let image = load_image(&args.command)?;

    let handle = open_device(&backend, args.serial.as_deref())?;
    let mut session = FastbootSession::new(handle);

    let result = match &args.command {
        Commands::Devices => Ok(()),
        Commands::Getvar { name } => session.get_variable(name).map(|value| {
            println!("{}: {}", name, value);
        }),
        Commands::Download { .. } => session.download(&image),
        Commands::Flash { partition, .. } => session.flash(partition, &image),
        Commands::Boot { .. } => session.boot_image(&image),
        Commands::Erase { partition } => session.erase(partition),
        Commands::Reboot => session.reboot(),
        Commands::Continue => session.continue_boot(),
    };

    if let Err(e) = session.close() {
        warn!(error = %e, "Failed to release device");
    }
    result?;
    info!("OKAY");
    Ok(())
}

/// Pick the device named by `serial`, or the only one attached.
fn open_device(
    backend: &NusbBackend,
    serial: Option<&str>,
) -> Result<DeviceHandle<NusbTransport>> {
    if let Some(serial) = serial {
        return Ok(find_device(backend, serial)?);
    }

    let mut handles = find_devices(backend)?;
    match handles.len() {
        0 => bail!("no Fastboot device found"),
        1 => Ok(handles.remove(0)),
        n => {
            for handle in handles {
                handle.close()?;
            }
            bail!("{} Fastboot devices found, select one with --serial", n)
        }
    }
}

/// Read the image a command transfers, or nothing for commands without one.
fn load_image(command: &Commands) -> Result<Vec<u8>> {
    match command {
        Commands::Download { file } | Commands::Flash { file, .. } | Commands::Boot { file } => {
            read_file(file)
        }
        _ => Ok(Vec::new()),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    info!(path = %path.display(), "Loading image");
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_image_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("boot.img");
        std::fs::write(&path, b"kernel").unwrap();

        let image = load_image(&Commands::Flash {
            partition: "boot".into(),
            file: path,
        })
        .unwrap();
        assert_eq!(image, b"kernel".to_vec());
    }

    #[test]
    fn test_load_image_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_image(&Commands::Boot {
            file: dir.path().join("missing.img"),
        })
        .unwrap_err();
        assert!(err.to_string().contains("missing.img"));
    }

    #[test]
    fn test_load_image_without_file() {
        assert!(load_image(&Commands::Reboot).unwrap().is_empty());
    }
}
