// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use reid_dataset::{
    Error, JobConfig, JobKind, Progress, Subsample, Summary, TransferMode, run_classify,
    run_partition, run_split, run_subsample,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file layered over the job defaults.  When omitted the
    /// platform config directory is searched for reid-dataset.toml.
    #[clap(long, global = true, env = "REID_DATASET_CONFIG")]
    config: Option<PathBuf>,

    /// Write the run summary as JSON to this file.
    #[clap(long, global = true)]
    report: Option<PathBuf>,

    /// Dataset Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Print the tool version.
    Version,
    /// Partition a nested group/subject/setting/camera image tree into
    /// subject-and-outfit disjoint partitions.  Records whose capture mode is
    /// invalid are deleted from the source tree.
    Partition {
        /// Root of the image tree
        source: PathBuf,

        /// Root of the annotation tree mirroring the image tree
        labels: PathBuf,

        /// Output directory receiving the partition folders
        output: PathBuf,

        /// Number of partitions
        #[clap(long, short = 'n')]
        partitions: Option<usize>,

        /// Seed for a reproducible group shuffle
        #[clap(long)]
        seed: Option<u64>,

        /// Capture mode marking a record for deletion
        #[clap(long)]
        invalid_mode: Option<String>,

        /// Positions kept per image folder: even, odd or all
        #[clap(long)]
        subsample: Option<Subsample>,

        /// Top-level group folders to ignore (comma separated)
        #[clap(long = "skip-group", value_delimiter = ',')]
        skip_groups: Vec<String>,

        /// Move files instead of copying them
        #[clap(long = "move")]
        move_files: bool,
    },
    /// Split a flat label directory and its image directory into partitions
    /// holding labels and images sub-folders.
    Split {
        /// Directory of XML annotations
        labels: PathBuf,

        /// Directory of images named by the annotations
        images: PathBuf,

        /// Output directory receiving the part folders
        output: PathBuf,

        /// Number of partitions
        #[clap(long, short = 'n')]
        partitions: Option<usize>,

        /// Seed for a reproducible group shuffle
        #[clap(long)]
        seed: Option<u64>,

        /// Move files instead of copying them
        #[clap(long = "move")]
        move_files: bool,
    },
    /// Copy every second image/annotation pair of each part folder into a
    /// sibling "<part>_odd_files" folder.
    Subsample {
        /// Part folders holding images and labels sub-folders
        #[clap(required = true)]
        parts: Vec<PathBuf>,

        /// Positions copied: odd, even or all
        #[clap(long)]
        parity: Option<Subsample>,

        /// Name of the annotation sub-folder
        #[clap(long)]
        label_subdir: Option<String>,

        /// Name of the image sub-folder
        #[clap(long)]
        image_subdir: Option<String>,

        /// Suffix of the output folder name
        #[clap(long)]
        suffix: Option<String>,
    },
    /// Group the images and annotations of each folder into per-group
    /// sub-folders, in place.
    Classify {
        /// Folders holding images and labels sub-folders
        #[clap(required = true)]
        dirs: Vec<PathBuf>,

        /// Copy files instead of moving them
        #[clap(long)]
        copy: bool,

        /// Name of the annotation sub-folder
        #[clap(long)]
        label_subdir: Option<String>,

        /// Name of the image sub-folder
        #[clap(long)]
        image_subdir: Option<String>,
    },
}

fn progress_bar(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message(message);
    bar
}

fn update_bar(bar: &ProgressBar, progress: Progress) {
    if progress.total > 0 {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.current as u64);
    }
}

fn finish(job: &str, summary: &Summary, report: Option<&Path>) -> Result<(), Error> {
    println!("{}", summary);
    if let Some(report) = report {
        summary.write_json(job, report)?;
        info!("Summary written to {}", report.display());
    }
    Ok(())
}

fn handle_version() -> Result<(), Error> {
    println!("reid-dataset {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_partition(
    config_path: Option<&Path>,
    report: Option<&Path>,
    source: PathBuf,
    labels: PathBuf,
    output: PathBuf,
    partitions: Option<usize>,
    seed: Option<u64>,
    invalid_mode: Option<String>,
    subsample: Option<Subsample>,
    skip_groups: Vec<String>,
    move_files: bool,
) -> Result<(), Error> {
    let mut config = JobConfig::load(JobKind::Partition, config_path)?;
    config.source_root = source;
    config.label_root = labels;
    config.output_root = output;
    if let Some(partitions) = partitions {
        config.partitions = partitions;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    if let Some(invalid_mode) = invalid_mode {
        config.invalid_mode = invalid_mode;
    }
    if let Some(subsample) = subsample {
        config.subsample = subsample;
    }
    if !skip_groups.is_empty() {
        config.skip_groups = skip_groups;
    }
    if move_files {
        config.transfer = TransferMode::Move;
    }

    let bar = progress_bar("Writing partitions");
    let summary = run_partition(&config, Some(&|p| update_bar(&bar, p)))?;
    bar.finish_and_clear();
    finish("partition", &summary, report)
}

#[allow(clippy::too_many_arguments)]
fn handle_split(
    config_path: Option<&Path>,
    report: Option<&Path>,
    labels: PathBuf,
    images: PathBuf,
    output: PathBuf,
    partitions: Option<usize>,
    seed: Option<u64>,
    move_files: bool,
) -> Result<(), Error> {
    let mut config = JobConfig::load(JobKind::Split, config_path)?;
    config.label_root = labels;
    config.source_root = images;
    config.output_root = output;
    if let Some(partitions) = partitions {
        config.partitions = partitions;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    if move_files {
        config.transfer = TransferMode::Move;
    }

    let bar = progress_bar("Writing parts");
    let summary = run_split(&config, Some(&|p| update_bar(&bar, p)))?;
    bar.finish_and_clear();
    finish("split", &summary, report)
}

fn handle_subsample(
    config_path: Option<&Path>,
    report: Option<&Path>,
    parts: Vec<PathBuf>,
    parity: Option<Subsample>,
    label_subdir: Option<String>,
    image_subdir: Option<String>,
    suffix: Option<String>,
) -> Result<(), Error> {
    let mut config = JobConfig::load(JobKind::Subsample, config_path)?;
    if let Some(parity) = parity {
        config.subsample = parity;
    }
    if let Some(label_subdir) = label_subdir {
        config.label_subdir = label_subdir;
    }
    if let Some(image_subdir) = image_subdir {
        config.image_subdir = image_subdir;
    }
    if let Some(suffix) = suffix {
        config.odd_suffix = suffix;
    }

    let summary = run_subsample(&parts, &config)?;
    finish("subsample", &summary, report)
}

fn handle_classify(
    config_path: Option<&Path>,
    report: Option<&Path>,
    dirs: Vec<PathBuf>,
    copy: bool,
    label_subdir: Option<String>,
    image_subdir: Option<String>,
) -> Result<(), Error> {
    let mut config = JobConfig::load(JobKind::Classify, config_path)?;
    if copy {
        config.transfer = TransferMode::Copy;
    }
    if let Some(label_subdir) = label_subdir {
        config.label_subdir = label_subdir;
    }
    if let Some(image_subdir) = image_subdir {
        config.image_subdir = image_subdir;
    }

    let bar = progress_bar("Classifying");
    let summary = run_classify(&dirs, &config, Some(&|p| update_bar(&bar, p)))?;
    bar.finish_and_clear();
    finish("classify", &summary, report)
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config.as_deref();
    let report = args.report.as_deref();

    match args.cmd {
        Command::Version => handle_version(),
        Command::Partition {
            source,
            labels,
            output,
            partitions,
            seed,
            invalid_mode,
            subsample,
            skip_groups,
            move_files,
        } => handle_partition(
            config,
            report,
            source,
            labels,
            output,
            partitions,
            seed,
            invalid_mode,
            subsample,
            skip_groups,
            move_files,
        ),
        Command::Split {
            labels,
            images,
            output,
            partitions,
            seed,
            move_files,
        } => handle_split(
            config, report, labels, images, output, partitions, seed, move_files,
        ),
        Command::Subsample {
            parts,
            parity,
            label_subdir,
            image_subdir,
            suffix,
        } => handle_subsample(
            config,
            report,
            parts,
            parity,
            label_subdir,
            image_subdir,
            suffix,
        ),
        Command::Classify {
            dirs,
            copy,
            label_subdir,
            image_subdir,
        } => handle_classify(config, report, dirs, copy, label_subdir, image_subdir),
    }
}
