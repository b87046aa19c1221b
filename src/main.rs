mod cli;

use convertible::config;
use convertible_ffmpeg::{
    check_tools, Bitrate, Convertible, Destination, FfmpegFactory, ScreenshotSpec,
    TranscodeAdapter, TranscodeOptions, TranscodeRequest,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, TranscodeArgs};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "convertible=debug,convertible_ffmpeg=debug".to_string()
        } else {
            "convertible=info,convertible_ffmpeg=info".to_string()
        }
    });

    // Logs go to stderr; stdout may carry the transcoded stream.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transcode(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(transcode_file(args, cli.config.as_deref()))
        }
        Commands::Presets => list_presets(cli.config.as_deref()),
        Commands::CheckTools => check_external_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("convertible {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn transcode_file(args: TranscodeArgs, config_path: Option<&Path>) -> Result<()> {
    let request = build_request(args);
    // Report request mistakes before looking for ffmpeg.
    request.validate()?;

    let config = config::load_config_or_default(config_path)?;
    let presets = config::preset_table(&config)?;
    let factory = FfmpegFactory::discover(&config.tools)?.with_presets(presets);

    let mut convertible = Convertible::new();
    convertible.use_strategy(TranscodeAdapter::new(factory));

    tracing::info!(
        "Transcoding {:?} -> {:?}",
        request.source.as_deref().unwrap_or(Path::new("")),
        request.destination
    );

    let (tx, rx) = tokio::sync::oneshot::channel();
    convertible.transcode(
        request,
        Some(Box::new(move |result| {
            let _ = tx.send(result);
        })),
    )?;

    rx.await
        .context("Transcode finished without reporting a result")??;
    Ok(())
}

fn build_request(args: TranscodeArgs) -> TranscodeRequest {
    let destination = if args.output == "-" {
        Destination::sink(tokio::io::stdout())
    } else {
        Destination::Path(PathBuf::from(&args.output))
    };

    let screenshots = (args.screenshots.is_some() || !args.timemarks.is_empty()).then(|| {
        ScreenshotSpec {
            count: args.screenshots,
            timemarks: args.timemarks,
            filename: args.screenshot_filename,
            folder: args.screenshot_folder,
            size: args.screenshot_size,
        }
    });

    TranscodeRequest {
        source: Some(args.input),
        destination: Some(destination),
        preset: args.preset,
        options: TranscodeOptions {
            audio_codec: args.audio_codec,
            audio_bitrate: args.audio_bitrate.map(Bitrate::from),
            audio_channels: args.audio_channels,
            audio_frequency: args.audio_frequency,
            video_codec: args.video_codec,
            video_bitrate: args.video_bitrate.map(Bitrate::from),
            frame_rate: args.fps,
            width: args.width,
            height: args.height,
            aspect_ratio: args.aspect,
            screenshots,
            output_format: args.format,
        },
    }
}

fn list_presets(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let table = config::preset_table(&config)?;

    for (name, description) in table.list() {
        match description {
            Some(description) => println!("{:<12} {}", name, description),
            None => println!("{}", name),
        }
    }

    Ok(())
}

fn check_external_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = check_tools(&config.tools);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. ffmpeg is required; ffprobe enables percentage screenshots.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!(
                "  ffmpeg: {}",
                config
                    .tools
                    .ffmpeg_path
                    .as_deref()
                    .map_or_else(|| "PATH".to_string(), |p| p.display().to_string())
            );
            println!(
                "  ffprobe: {}",
                config
                    .tools
                    .ffprobe_path
                    .as_deref()
                    .map_or_else(|| "PATH".to_string(), |p| p.display().to_string())
            );
            match config.tools.timeout() {
                Some(timeout) => println!("  Timeout: {}s", timeout.as_secs()),
                None => println!("  Timeout: none"),
            }
            println!("  Custom presets: {}", config.presets.len());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Custom presets: {}", config.presets.len());
        }
    }

    Ok(())
}
