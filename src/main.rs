//! Live VTL Simulator - edit JSON data and a Velocity template side by side.
//!
//! # Usage
//!
//! ```bash
//! livevtl
//! livevtl --data people.json --template report.vtl --watch
//! livevtl --data people.json --template report.vtl --print --format json
//! ```

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use livevtl::app::{App, read_source};
use livevtl::config::{
    ConfigFlags, ThemeMode, background_is_dark, clear_config_flags, global_config_path,
    load_config_flags, local_override_path, parse_flag_tokens, save_config_flags,
};
use livevtl::pipeline::{self, RenderResult};
use livevtl::samples;
use livevtl::vtl::{EngineOptions, Velocity};

/// Live-render a Velocity template against JSON data
#[derive(Parser, Debug)]
#[command(name = "livevtl", version, about, long_about = None)]
struct Cli {
    /// Seed the data.json buffer from this file
    #[arg(long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Seed the template.vtl buffer from this file
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Reload the seeded files when they change on disk
    #[arg(short, long)]
    watch: bool,

    /// Initial light or dark display
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,

    /// Fail on undefined references, unknown methods and unknown macros
    #[arg(long)]
    strict: bool,

    /// Render once to stdout instead of starting the editor
    #[arg(long)]
    print: bool,

    /// Output encoding for --print
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Write log events to a file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn detect_dark_background() -> Option<bool> {
    let value = std::env::var("COLORFGBG").ok()?;
    let dark = background_is_dark(&value);
    tracing::debug!(colorfgbg = %value, ?dark, "detected terminal background");
    dark
}

fn print_once(effective: &ConfigFlags, engine: &Velocity, format: OutputFormat) -> Result<ExitCode> {
    let data = read_source(effective.data.as_deref(), samples::DEFAULT_DATA)?;
    let template = read_source(effective.template.as_deref(), samples::DEFAULT_TEMPLATE)?;
    let result = pipeline::render_with(engine, &data, &template);
    write_result(&mut std::io::stdout().lock(), &result, format)?;
    Ok(if result.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn write_result(out: &mut impl Write, result: &RenderResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if result.is_error() {
                writeln!(out, "{}", result.title())?;
            }
            out.write_all(result.text().as_bytes())?;
            if result.is_error() && !result.text().ends_with('\n') {
                writeln!(out)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)?;
        }
    }
    out.flush().context("Failed to write output")
}

fn main() -> Result<ExitCode> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    init_logging(effective.log_file.as_deref())?;
    tracing::debug!(?effective, "effective flags");

    let engine = Velocity::new(EngineOptions::default().with_strict(effective.strict));

    if cli.print {
        return print_once(&effective, &engine, cli.format);
    }

    let dark = effective
        .theme
        .unwrap_or(ThemeMode::Auto)
        .is_dark(detect_dark_background);

    let mut app = App::new()
        .with_data_path(effective.data.clone())
        .with_template_path(effective.template.clone())
        .with_watch(effective.watch)
        .with_dark_mode(dark)
        .with_engine(engine)
        .with_config_paths(
            Some(global_path.clone()),
            if local_path.exists() {
                Some(local_path.clone())
            } else {
                None
            },
        );

    app.run().context("Application error")?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(result: &RenderResult, format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_result(&mut out, result, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cli_parses_print_flags() {
        let cli = Cli::parse_from([
            "livevtl",
            "--data",
            "a.json",
            "--print",
            "--format",
            "json",
            "--theme",
            "dark",
        ]);
        assert!(cli.print);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.theme, Some(ThemeMode::Dark));
        assert_eq!(cli.data, Some(PathBuf::from("a.json")));
    }

    #[test]
    fn test_text_output_is_raw_on_success() {
        let result = RenderResult::success("Hello, World!");
        assert_eq!(written(&result, OutputFormat::Text), "Hello, World!");
    }

    #[test]
    fn test_text_output_prefixes_title_on_error() {
        let result = RenderResult::decode_failure("Unexpected end of JSON input");
        assert_eq!(
            written(&result, OutputFormat::Text),
            "JSON Parse Error\nUnexpected end of JSON input\n"
        );
    }

    #[test]
    fn test_json_output_serializes_result() {
        let result = RenderResult::success("hi");
        let value: serde_json::Value =
            serde_json::from_str(&written(&result, OutputFormat::Json)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "text": "hi", "title": "Result", "isError": false })
        );
    }
}
