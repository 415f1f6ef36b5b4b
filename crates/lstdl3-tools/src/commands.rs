//! Subcommand implementations. Each returns the text printed on stdout.

use std::path::Path;

use anyhow::{Context, Result};
use lstdl3::{
    create_event_list, create_obs_hdu_index, dl3_file_name, scan_dir, write_dl3_file, Dl2Events,
    Dl3Config, IrfHdus, RunInfo, SkyCoord,
};
use lstdl3_fits::FitsFile;
use tracing::info;

use crate::cli::{Command, CreateDl3Args, IndexArgs, InfoArgs};
use crate::info::format_fits_info;

fn load_config(path: Option<&Path>) -> Result<Dl3Config> {
    match path {
        Some(path) => Dl3Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(Dl3Config::default()),
    }
}

pub fn create_dl3(args: &CreateDl3Args) -> Result<String> {
    let mut config = load_config(args.config.as_deref())?;
    if args.gzip {
        config.output.gzip = true;
    }
    if !(-90.0..=90.0).contains(&args.source_dec) {
        anyhow::bail!("source declination {} is outside [-90, 90]", args.source_dec);
    }

    let dl2 = Dl2Events::read(&args.input)
        .with_context(|| format!("failed to read DL2 events from {}", args.input.display()))?;
    info!(events = dl2.len(), input = %args.input.display(), "loaded DL2 events");

    let run = RunInfo {
        run: args.run,
        source_name: args.source_name.clone(),
        obs_mode: args.mode.clone(),
        source: SkyCoord::new(args.source_ra.rem_euclid(360.0), args.source_dec),
    };
    let list = create_event_list(&dl2, &run, &config)?;

    let irf = match &args.irf {
        Some(path) => Some(
            IrfHdus::read(path)
                .with_context(|| format!("failed to read IRFs from {}", path.display()))?,
        ),
        None => None,
    };

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    let target = args
        .output_dir
        .join(dl3_file_name(args.run, config.output.gzip));
    let written = write_dl3_file(&list, irf.as_ref(), &target, args.overwrite)?;
    Ok(format!("{}\n", written.display()))
}

pub fn index(args: &IndexArgs) -> Result<String> {
    let config = load_config(args.config.as_deref())?;
    let files = scan_dir(&args.dir, &args.prefix)
        .with_context(|| format!("failed to list {}", args.dir.display()))?;
    let summary = create_obs_hdu_index(&files, &args.dir, &config)?;

    let mut out = format!(
        "Indexed {} observations ({} HDUs)\n",
        summary.observations, summary.hdu_rows
    );
    for name in &summary.skipped {
        out.push_str(&format!("Skipped {name}\n"));
    }
    out.push_str(&format!("{}\n{}\n", summary.hdu_index.display(), summary.obs_index.display()));
    Ok(out)
}

pub fn info(args: &InfoArgs) -> Result<String> {
    let file = FitsFile::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    Ok(format_fits_info(&file, args.long))
}

pub fn run(command: &Command) -> Result<String> {
    match command {
        Command::CreateDl3(args) => create_dl3(args),
        Command::Index(args) => index(args),
        Command::Info(args) => info(args),
    }
}
