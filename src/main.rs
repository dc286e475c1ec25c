use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use vbump::{
    arguments::{Arguments, Format},
    config::{Config, EXAMPLE_CONFIG},
    render::render,
    updater::{self, LinePattern, UpdateError, WriteOptions},
    version::{self, VersionRecord},
};

fn main() -> Result<()> {
    let args = Arguments::parse();
    pretty_env_logger::env_logger::builder()
        .filter_level(args.log_level())
        .format_timestamp(None)
        .init();
    debug!("{:?}", args);

    if args.init {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let mut config = Config::load(&args.config)?;
    let mut record = config.current_version.clone();

    if let Some(format) = args.current_version {
        let rendered = render(config.syntax.write_pattern(format), &record)?;
        println!("{rendered}");
    }

    if args.bump.is_some() {
        record = bump(&args, &mut config)?;
    }

    if let Some(format) = args.write {
        write(&args, &config, &record, format)?;
    }

    Ok(())
}

/// Bumps the requested field and saves the config unless this is a dry run.
fn bump(args: &Arguments, config: &mut Config) -> Result<VersionRecord> {
    let current = config.current_version.clone();
    let field = args.bump_field(&current.field_names());
    let outcome = version::bump(&current, &config.policy, field);
    if let Some(unrecognized) = &outcome.unrecognized {
        warn!("{unrecognized}");
    }

    let write_dev = config.syntax.write_pattern(Format::Dev);
    let current_dev = render(write_dev, &current)?;
    let next_dev = render(write_dev, &outcome.record)?;
    info!("Current version (dev format): {current_dev}");
    info!("New version     (dev format): {next_dev}");
    debug!("Changed fields: {:?}", outcome.changed_fields(&current));

    if args.dry_run {
        info!("Dry run, version info not saved to '{}'", config.path().display());
    } else if config.set_current_version(&outcome.record) {
        config.save()?;
        info!("Updated version info saved to '{}'", config.path().display());
    }

    Ok(outcome.record)
}

/// Writes `record` into every target file listed in the config.
///
/// A missing target file is reported and skipped.
fn write(args: &Arguments, config: &Config, record: &VersionRecord, format: Format) -> Result<()> {
    info!("Updating output files, format [{format}]");
    let pattern = LinePattern::new(&config.syntax.read_regex)?;
    let replacement = render(config.syntax.write_pattern(format), record)?;
    let options = WriteOptions {
        dry_run: args.dry_run,
        backup: config.backup,
    };

    if config.files.is_empty() {
        warn!("No files listed in the [write] section of '{}'", config.path().display());
    }

    for path in &config.files {
        info!("Processing file: '{}'", path.display());
        match updater::update_file(path, &pattern, &replacement, &options) {
            Ok(update) => {
                info!("Lines modified: {}", update.lines_modified);
                if let Some(backup) = &update.backup {
                    debug!("Original kept at '{}'", backup.display());
                }
                if options.dry_run && update.lines_modified > 0 {
                    info!("Dry run, '{}' not rewritten", path.display());
                }
            }
            Err(UpdateError::NotFound(path)) => {
                warn!("File not found: '{}', skipping", path.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to update '{}'", path.display()));
            }
        }
    }

    Ok(())
}
