//! # mkid_readout_cli
//!
//! Part of the mkid_readout crate family.
//!
//! This is the CLI application that runs the MKID readout ingest pipeline.
//!
//! ## Use
//!
//! To run the pipeline against the detector network:
//!
//! ```bash
//! mkid_readout_cli -p/--path <your_configuration.yaml>
//! ```
//!
//! To generate a configuration template file use
//!
//! ```bash
//! mkid_readout_cli -p/--path <your_configuration.yaml> new
//! ```
//!
//! To run against a synthetic packet source (no hardware required) use
//!
//! ```bash
//! mkid_readout_cli -p/--path <your_configuration.yaml> simulate
//! ```
//!
//! ## Operation
//!
//! The pipeline is driven by control files on the configured ramdisk: write
//! a `START` file containing a destination directory to begin a bulk
//! capture, `STOP` to end it, and `QUIT` to shut the whole pipeline down.

use clap::{Arg, Command};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libmkid_readout::config::Config;
use libmkid_readout::supervisor::{self, Source};

fn make_template_config(path: &Path) {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config).unwrap();
    let mut file = File::create(path).expect("Could create template config file!");
    file.write_all(yaml_str.as_bytes())
        .expect("Failed to write yaml data to file!");
}

fn main() {
    // Create a cli
    let matches = Command::new("mkid_readout_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("simulate").about("Run the pipeline with a synthetic packet source"),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Setup logging to a file alongside the terminal
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./mkid_readout.log"))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()
            .unwrap(),
    );
    let logger = spdlog::default_logger()
        .fork_with(|new| {
            new.sinks_mut().push(file_sink);
            new.set_flush_level_filter(spdlog::LevelFilter::All);
            Ok(())
        })
        .expect("Could not create logger!");
    spdlog::set_default_logger(logger);

    // Parse the cli
    let config_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    if let Some(("new", _)) = matches.subcommand() {
        spdlog::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        spdlog::info!("Done.");
        return;
    }

    // Load our config
    spdlog::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            spdlog::error!("{e}");
            return;
        }
    };
    spdlog::info!("Config successfully loaded.");
    spdlog::info!("Ramdisk Path: {}", config.ramdisk_path.to_string_lossy());
    spdlog::info!("UDP Port: {}", config.port);
    spdlog::info!(
        "Receive Buffer: {}",
        human_bytes::human_bytes(config.recv_buffer_bytes as f64)
    );
    match &config.renderer_path {
        Some(path) => spdlog::info!("Renderer: {}", path.to_string_lossy()),
        None => spdlog::info!("Renderer: disabled"),
    }

    let source = match matches.subcommand() {
        Some(("simulate", _)) => {
            spdlog::info!("Using the synthetic packet source");
            Source::Synthetic
        }
        _ => Source::Udp,
    };

    match supervisor::run(&config, source) {
        Ok(()) => spdlog::info!("Done."),
        Err(e) => spdlog::error!("Pipeline failed with error: {e}"),
    }
}
