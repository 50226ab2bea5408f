//! A single load-grid run: build or load the grid, stamp the box, write files.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::classify::{classify_with_correction, Classification};
use crate::config::RunConfig;
use crate::error::Result;
use crate::heatmap::save_heatmap_to_png;
use crate::output::{self, OutputLayout};
use crate::points::PointSet;
use crate::reader::GridReader;

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub points: usize,
    pub inside: usize,
    pub outside: usize,
    pub files: Vec<PathBuf>,
}

/// Validate, create the output tree, generate the stamped grid and write
/// every selected file.
pub fn run(config: &RunConfig, reader: &dyn GridReader) -> Result<RunReport> {
    config.validate()?;

    let layout = OutputLayout::new(&config.output_root);
    layout.create_dirs(config.outputs.png)?;

    let (points, classes) = generate(config, reader)?;
    let files = write_outputs(config, &layout, &points)?;

    Ok(RunReport {
        points: points.len(),
        inside: classes.inside.len(),
        outside: classes.outside.len(),
        files,
    })
}

/// The in-memory part of a run: obtain the points, classify them against the
/// box (with the meridian correction if configured) and stamp the values.
/// Only reads from disk, and only when an initial grid is configured.
pub fn generate(config: &RunConfig, reader: &dyn GridReader) -> Result<(PointSet, Classification)> {
    let mut points = match &config.initial_grid {
        Some(path) => reader.read_grid(path, config.regular_grid)?,
        None => config.grid.build()?,
    };
    info!("Grid has {} points", points.len());

    let bbox = &config.bbox;
    if !config.pm_correct && bbox.west > bbox.east {
        warn!("West bound lies east of the east bound; no point can be inside {}", bbox);
    }

    let classes = classify_with_correction(&mut points, bbox, config.pm_correct)?;
    let boundary = classes.boundary().len();
    if boundary > 0 {
        debug!("{} points lie on the box edge and count as inside and outside", boundary);
    }
    config.stamp.apply(&mut points, &classes);
    info!(
        "{} points inside {}, {} outside",
        classes.inside.len(),
        bbox,
        classes.outside.len()
    );
    Ok((points, classes))
}

fn write_outputs(config: &RunConfig, layout: &OutputLayout, points: &PointSet) -> Result<Vec<PathBuf>> {
    let sel = &config.outputs;
    let name = config.outfile.as_str();
    let mut files = Vec::new();

    if sel.gmt {
        let path = layout.gmt_path(name, sel.gzip_text);
        output::write_gmt(&path, points, sel.gzip_text)?;
        files.push(path);
    }
    if sel.nc {
        let path = layout.nc_path(name);
        output::write_nc(&path, points, sel.nc_flavor)?;
        files.push(path);
    }
    if sel.txt {
        let path = layout.text_path(name, sel.gzip_text);
        output::write_txt(&path, points, sel.gzip_text)?;
        files.push(path);
    }
    if sel.png {
        match points.to_regular() {
            Ok(grid) => {
                let path = layout.png_path(name);
                save_heatmap_to_png(&grid.amp, &path, sel.colormap)?;
                files.push(path);
            }
            Err(e) => warn!("Skipping amplitude preview: {}", e),
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputSelection;
    use crate::error::GridError;
    use crate::geometry::BoundingBox;
    use crate::grid::GridSpec;
    use crate::reader::FileGridReader;
    use crate::stamp::Stamp;
    use std::path::Path;

    fn small_config(root: &Path) -> RunConfig {
        RunConfig {
            bbox: BoundingBox::new(268.3, 268.6, 30.2, 30.45),
            grid: GridSpec { spacing: 0.05, ..GridSpec::default() },
            output_root: root.join("Grid_Files"),
            outfile: "test_area1".to_string(),
            ..RunConfig::default()
        }
    }

    /// Reader that must never be consulted.
    struct NoReader;

    impl GridReader for NoReader {
        fn read_grid(&self, path: &Path, _regular: bool) -> Result<PointSet> {
            panic!("unexpected read of {}", path.display());
        }
    }

    #[test]
    fn gmt_only_run_stamps_inside() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.outputs = OutputSelection { nc: false, gmt: true, ..OutputSelection::default() };

        let report = run(&config, &NoReader).unwrap();
        assert_eq!(report.points, 400);
        assert_eq!(report.files.len(), 1);

        let text = std::fs::read_to_string(&report.files[0]).unwrap();
        let rows: Vec<Vec<f64>> = text
            .lines()
            .map(|l| l.split(' ').map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows.len(), report.points);
        let mut stamped = 0;
        for row in &rows {
            assert_eq!(row.len(), 3);
            let inside = config.bbox.contains(&crate::geometry::CoordGeo {
                latitude: row[1],
                longitude: row[0],
            });
            if inside {
                assert_eq!(row[2], 8.41);
                stamped += 1;
            } else {
                assert_eq!(row[2], 0.0);
            }
        }
        assert_eq!(stamped, report.inside);
        assert!(stamped > 0);
    }

    #[test]
    fn no_output_fails_before_touching_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.outputs = OutputSelection { nc: false, txt: false, gmt: false, ..Default::default() };
        assert!(matches!(run(&config, &NoReader), Err(GridError::Config(_))));
        assert!(!config.output_root.exists());
    }

    #[test]
    fn bad_meridian_bounds_fail_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.pm_correct = true;
        assert!(matches!(run(&config, &NoReader), Err(GridError::Config(_))));
        assert!(!config.output_root.exists());
    }

    #[test]
    fn all_outputs_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.outputs =
            OutputSelection { nc: true, txt: true, gmt: true, png: true, ..Default::default() };
        let report = run(&config, &NoReader).unwrap();
        assert_eq!(report.files.len(), 4);
        for f in &report.files {
            assert!(f.is_file(), "{} missing", f.display());
        }
        assert!(report.files[3].ends_with("PNG/Custom/height-anomaly_test_area1.png"));
    }

    #[test]
    fn outside_stamp_with_inside_winning_on_edges() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.stamp = Stamp { amplitude: 1.0, phase: 10.0, set_inside: false, set_outside: true };
        let (points, classes) = generate(&config, &NoReader).unwrap();
        for &i in &classes.outside {
            assert_eq!(points.amp()[i], 1.0);
        }
        let untouched = points.amp().iter().filter(|&&a| a == 0.0).count();
        assert_eq!(untouched, points.len() - classes.outside.len());
    }

    #[test]
    fn initial_grid_is_read_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let start = dir.path().join("start.txt");
        std::fs::write(&start, "30.0 359.5 0.0 0.0\n30.0 0.5 0.0 0.0\n30.0 10.0 2.0 5.0\n").unwrap();

        let mut config = small_config(dir.path());
        config.initial_grid = Some(start);
        config.regular_grid = false;
        config.pm_correct = true;
        config.bbox = BoundingBox::new(-1.0, 1.0, 29.0, 31.0);
        config.stamp = Stamp { amplitude: 3.0, ..Stamp::default() };

        let (points, classes) = generate(&config, &FileGridReader).unwrap();
        assert_eq!(classes.inside, vec![0, 1]);
        assert_eq!(points.amp(), &[3.0, 3.0, 2.0]);
        assert_eq!(points.pha(), &[0.0, 0.0, 5.0]);
        assert_eq!(points.lon(), &[359.5, 0.5, 10.0]);
    }

    #[test]
    fn reference_box_on_production_grid() {
        let config = RunConfig {
            bbox: BoundingBox::new(268.77, 268.78, 30.31, 30.32),
            stamp: Stamp { amplitude: 8.41, ..Stamp::default() },
            ..RunConfig::default()
        };
        let (points, _) = generate(&config, &NoReader).unwrap();
        assert_eq!(points.len(), 4_000_000);

        let expected = points.coords().filter(|p| config.bbox.contains(p)).count();
        let nonzero = points.amp().iter().filter(|&&a| a != 0.0).count();
        assert_eq!(nonzero, expected);
        assert!(expected > 0);
    }
}
