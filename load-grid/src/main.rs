use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};

use load_grid::batch::{read_boxes, run_batch, BatchPlan};
use load_grid::heatmap::Colormap;
use load_grid::output::NcFlavor;
use load_grid::reader::FileGridReader;
use load_grid::run::run;
use load_grid::RunConfig;

#[derive(clap::Parser)]
#[command(version, about = "Generate custom surface-load grids")]
struct ClArgs {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Stamp a single bounding box
    Run(ConfigArgs),
    /// Stamp every box of a CSV table at every load height
    Batch(BatchArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Format {
    Nc,
    Txt,
    Gmt,
    Png,
}

/// Settings shared by both subcommands; each one overrides the config file.
#[derive(clap::Args)]
struct ConfigArgs {
    /// JSON run configuration to start from
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    west: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    east: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    south: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    north: Option<f64>,

    /// Load height (m)
    #[arg(long, allow_negative_numbers = true)]
    amp: Option<f64>,

    /// Load phase (deg)
    #[arg(long, allow_negative_numbers = true)]
    pha: Option<f64>,

    /// Wrap longitudes >= 180 before classifying (box in [-180,180])
    #[arg(long)]
    pm_correct: bool,

    /// Also stamp the points outside the box
    #[arg(long)]
    set_outside: bool,

    /// Leave the points inside the box untouched
    #[arg(long)]
    no_inside: bool,

    /// Spacing of the generated grid (deg)
    #[arg(long)]
    spacing: Option<f64>,

    /// Start from an existing grid (.nc, text or gzipped text)
    #[arg(long)]
    initial_grid: Option<PathBuf>,

    /// The initial grid is not a full lat x lon mesh
    #[arg(long)]
    irregular: bool,

    /// Base name of the output files
    #[arg(short, long)]
    outfile: Option<String>,

    /// Directory receiving the GMT, nc, text and PNG trees
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Files to write
    #[arg(long, value_enum, value_delimiter = ',')]
    formats: Vec<Format>,

    /// Gzip the text outputs
    #[arg(long)]
    gzip_text: bool,

    /// Colormap of the PNG preview
    #[arg(long, value_enum)]
    colormap: Option<Colormap>,

    /// NetCDF format (default: netcdf4-classic when built with libnetcdf)
    #[arg(long, value_enum)]
    nc_flavor: Option<NcFlavor>,
}

#[derive(clap::Args)]
struct BatchArgs {
    /// CSV table with columns id,west,east,south,north[,type]
    #[arg(long)]
    boxes: PathBuf,

    /// Load heights (m), comma separated
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [8.41, 8.47, 10.71, 10.87, 10.56, 9.4, 6.93, 5.05, 4.31, 4.28, 4.93, 5.26]
    )]
    heights: Vec<f64>,

    /// Leading part of every output name
    #[arg(long, default_value = "MR_load_BRregion")]
    prefix: String,

    /// Only use rows of this type; empty for all rows
    #[arg(long, default_value = "square")]
    kind: String,

    /// Added to the west and east bounds of every row
    #[arg(long, default_value_t = 360.0, allow_negative_numbers = true)]
    lon_offset: f64,

    #[command(flatten)]
    base: ConfigArgs,
}

impl ConfigArgs {
    fn into_config(self) -> load_grid::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        let bbox = &mut config.bbox;
        bbox.west = self.west.unwrap_or(bbox.west);
        bbox.east = self.east.unwrap_or(bbox.east);
        bbox.south = self.south.unwrap_or(bbox.south);
        bbox.north = self.north.unwrap_or(bbox.north);

        let stamp = &mut config.stamp;
        stamp.amplitude = self.amp.unwrap_or(stamp.amplitude);
        stamp.phase = self.pha.unwrap_or(stamp.phase);
        stamp.set_outside |= self.set_outside;
        if self.no_inside {
            stamp.set_inside = false;
        }

        config.pm_correct |= self.pm_correct;
        if let Some(spacing) = self.spacing {
            config.grid.spacing = spacing;
        }
        if self.initial_grid.is_some() {
            config.initial_grid = self.initial_grid;
        }
        if self.irregular {
            config.regular_grid = false;
        }
        if let Some(outfile) = self.outfile {
            config.outfile = outfile;
        }
        if let Some(root) = self.output_root {
            config.output_root = root;
        }

        let outputs = &mut config.outputs;
        if !self.formats.is_empty() {
            outputs.nc = self.formats.contains(&Format::Nc);
            outputs.txt = self.formats.contains(&Format::Txt);
            outputs.gmt = self.formats.contains(&Format::Gmt);
            outputs.png = self.formats.contains(&Format::Png);
        }
        outputs.gzip_text |= self.gzip_text;
        if let Some(colormap) = self.colormap {
            outputs.colormap = colormap;
        }
        if let Some(flavor) = self.nc_flavor {
            outputs.nc_flavor = flavor;
        }
        Ok(config)
    }
}

fn execute(command: Command) -> load_grid::Result<()> {
    match command {
        Command::Run(args) => {
            let config = args.into_config()?;
            let report = run(&config, &FileGridReader)?;
            info!(
                "Done: {} points, {} inside, {} outside, {} file(s) written",
                report.points,
                report.inside,
                report.outside,
                report.files.len()
            );
        }
        Command::Batch(args) => {
            let base = args.base.into_config()?;
            let plan = BatchPlan {
                heights: args.heights,
                prefix: args.prefix,
                kind: Some(args.kind).filter(|k| !k.is_empty()),
                lon_offset: args.lon_offset,
            };
            let rows = read_boxes(&args.boxes)?;
            let reports = run_batch(&base, &plan, &rows, &FileGridReader)?;
            let files: usize = reports.iter().map(|r| r.files.len()).sum();
            info!("Done: {} run(s), {} file(s) written", reports.len(), files);
        }
    }
    Ok(())
}

fn main() {
    let args = ClArgs::parse();

    let level = match args.verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    if let Err(e) = execute(args.command) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use load_grid::geometry::BoundingBox;

    fn run_config(args: &[&str]) -> RunConfig {
        let cl = ClArgs::try_parse_from(args).unwrap();
        match cl.command {
            Command::Run(args) => args.into_config().unwrap(),
            Command::Batch(_) => panic!("expected the run subcommand"),
        }
    }

    #[test]
    fn no_flags_keep_defaults() {
        assert_eq!(run_config(&["load-grid", "run"]), RunConfig::default());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("run.json");
        std::fs::write(
            &json,
            r#"{ "outfile": "from_file", "stamp": { "amplitude": 1.0, "phase": 5.0 },
                 "outputs": { "nc": true, "txt": true, "colormap": "viridis" } }"#,
        )
        .unwrap();

        let config = run_config(&[
            "load-grid",
            "-vv",
            "run",
            "--config",
            json.to_str().unwrap(),
            "--west",
            "-1.5",
            "--east",
            "2",
            "--amp",
            "10.71",
            "--pm-correct",
            "--no-inside",
            "--set-outside",
            "--formats",
            "gmt,png",
            "--nc-flavor",
            "offset64",
        ]);

        assert_eq!(config.outfile, "from_file");
        assert_eq!(config.bbox.west, -1.5);
        assert_eq!(config.bbox.east, 2.0);
        assert_eq!(config.bbox.south, RunConfig::default().bbox.south);
        assert_eq!(config.stamp.amplitude, 10.71);
        assert_eq!(config.stamp.phase, 5.0);
        assert!(config.pm_correct);
        assert!(!config.stamp.set_inside);
        assert!(config.stamp.set_outside);

        // the format list replaces the file's selection entirely
        let outputs = config.outputs;
        assert!(!outputs.nc && !outputs.txt);
        assert!(outputs.gmt && outputs.png);
        assert_eq!(outputs.colormap, Colormap::Viridis);
        assert_eq!(outputs.nc_flavor, NcFlavor::Offset64);
    }

    #[test]
    fn batch_arguments() {
        let cl = ClArgs::try_parse_from([
            "load-grid",
            "batch",
            "--boxes",
            "boxes.csv",
            "--heights",
            "8.41,10",
            "--kind",
            "",
            "--initial-grid",
            "start.txt.gz",
            "--irregular",
        ])
        .unwrap();
        let Command::Batch(args) = cl.command else {
            panic!("expected the batch subcommand");
        };
        assert_eq!(args.heights, vec![8.41, 10.0]);
        assert_eq!(args.prefix, "MR_load_BRregion");
        assert_eq!(args.lon_offset, 360.0);
        assert!(args.kind.is_empty());

        let config = args.base.into_config().unwrap();
        assert_eq!(config.initial_grid.as_deref(), Some(std::path::Path::new("start.txt.gz")));
        assert!(!config.regular_grid);
        assert_eq!(config.bbox, BoundingBox::new(
            360.0 - 91.2277957,
            360.0 - 91.2172368,
            30.3089489,
            30.31811,
        ));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(ClArgs::try_parse_from(["load-grid", "run", "--formats", "hdf"]).is_err());
    }
}
