//! annorm command line entry point.
//!
//! ```text
//! annorm [--config FILE] convert <format> <export> <output> [--dataset NAME] [--task TASK]
//! annorm [--config FILE] validate <vector|pixel|video|document> <file.json>...
//! annorm formats
//! annorm init [FILE]
//! ```
//!
//! Without `--config`, `annorm.json` in the working directory is used when present.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use annorm::color_utils::Palette;
use annorm::{
    ConversionTask, ConvertOptions, Converter, EngineConfig, FormatRegistry, MediaType, Validator,
};

const USAGE: &str = "usage:
  annorm [--config FILE] convert <format> <export> <output> [--dataset NAME] [--task TASK]
  annorm [--config FILE] validate <vector|pixel|video|document> <file.json>...
  annorm formats
  annorm init [FILE]";

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = take_option(&mut args, "--config").map(PathBuf::from);

    let config_path = config_path.or_else(|| {
        let local = PathBuf::from(EngineConfig::default_filename());
        local.is_file().then_some(local)
    });
    let config = match config_path {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let mut rest: Vec<String> = args.iter().skip(1).cloned().collect();
    let result = match args.first().map(String::as_str) {
        Some("convert") => convert(&config, &mut rest),
        Some("validate") => validate(&rest),
        Some("init") => init(&rest),
        Some("formats") => {
            for format in FormatRegistry::new().all() {
                println!("{:<12} {}", format.id(), format.display_name());
            }
            Ok(true)
        }
        _ => Err(USAGE.to_string()),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

/// Remove `--name VALUE` from the arguments and return the value.
fn take_option(args: &mut Vec<String>, name: &str) -> Option<String> {
    let index = args.iter().position(|a| a == name)?;
    if index + 1 >= args.len() {
        args.remove(index);
        return None;
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Some(value)
}

fn convert(config: &EngineConfig, args: &mut Vec<String>) -> Result<bool, String> {
    let dataset = take_option(args, "--dataset");
    let task = take_option(args, "--task")
        .map(|t| t.parse::<ConversionTask>())
        .transpose()?;
    let [format, export, output] = args.as_slice() else {
        return Err(USAGE.to_string());
    };

    let palette = match config.conversion.color_seed {
        Some(seed) => Palette::seeded(seed),
        None => Palette::from_entropy(),
    };
    let converter = Converter::new(FormatRegistry::new(), ConvertOptions::from(&config.conversion))
        .with_palette(palette);

    let summary = converter
        .convert_path(format, Path::new(export), Path::new(output), dataset.as_deref(), task)
        .map_err(|e| e.to_string())?;

    println!(
        "{} classes, {} attribute groups, {} items, {} instances",
        summary.classes_created,
        summary.attribute_groups_created,
        summary.items_converted,
        summary.instances_converted
    );
    for skipped in &summary.skipped {
        println!(
            "skipped {}: {}",
            skipped.item.as_deref().unwrap_or("-"),
            skipped.reason
        );
    }
    for invalid in &summary.invalid_outputs {
        println!("invalid output {} ({} errors)", invalid.item, invalid.errors.len());
    }
    Ok(summary.invalid_outputs.is_empty())
}

/// Write a default configuration file.
fn init(args: &[String]) -> Result<bool, String> {
    let path = match args {
        [] => PathBuf::from(EngineConfig::default_filename()),
        [path] => PathBuf::from(path),
        _ => return Err(USAGE.to_string()),
    };
    if path.exists() {
        return Err(format!("{} already exists", path.display()));
    }
    EngineConfig::default().save(&path).map_err(|e| e.to_string())?;
    println!("Wrote {}", path.display());
    Ok(true)
}

fn validate(args: &[String]) -> Result<bool, String> {
    let [media_type, files @ ..] = args else {
        return Err(USAGE.to_string());
    };
    if files.is_empty() {
        return Err(USAGE.to_string());
    }
    let media_type = media_type.parse::<MediaType>().map_err(|e| e.to_string())?;
    let validator = Validator::new();

    let mut all_valid = true;
    for file in files {
        let text = std::fs::read_to_string(file).map_err(|e| format!("{}: {}", file, e))?;
        let document: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| format!("{}: {}", file, e))?;

        let result = validator.validate(&document, media_type);
        if result.is_valid() {
            println!("{}: valid", file);
        } else {
            all_valid = false;
            println!("{}: {} errors\n{}", file, result.errors.len(), result.report());
        }
    }
    Ok(all_valid)
}
