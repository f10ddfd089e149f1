//! Snapshot exporters.
//!
//! The runner calls every enabled [`Exporter`] at the export steps with a
//! read-only [`PopulationSnapshot`]. Calls are synchronous.

use crate::error::{IoError, Result};
use crate::last_state::{save_last_state, state_of};
use crate::naming::RunFiles;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use superboids_data::{CellId, ForceVector, PopulationSnapshot};

pub trait Exporter: Send {
    fn name(&self) -> &'static str;

    fn export(&mut self, snapshot: &PopulationSnapshot) -> Result<()>;

    /// Flushes buffered output; called once after the last export.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .map_err(|e| IoError::from(e).with_context(format!("creating {}", path.display())))?;
    Ok(BufWriter::new(file))
}

/// Rewrites the restartable last-state file on every export.
pub struct LastStateExporter {
    path: PathBuf,
}

impl LastStateExporter {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Exporter for LastStateExporter {
    fn name(&self) -> &'static str {
        "last-state"
    }

    fn export(&mut self, snapshot: &PopulationSnapshot) -> Result<()> {
        save_last_state(&state_of(snapshot), &self.path)
    }
}

/// Mean, minimum and maximum of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    #[must_use]
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

/// Shape statistics of one cell type at one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStats {
    pub cells: usize,
    pub area: Summary,
    pub perimeter: Summary,
    pub shape_index: Summary,
    pub mean_radius: f64,
    pub mean_radius2: f64,
}

impl ShapeStats {
    #[must_use]
    pub fn of_type(snapshot: &PopulationSnapshot, cell_type: usize) -> Option<Self> {
        let cells: Vec<_> = snapshot.cells.iter().filter(|c| c.cell_type == cell_type).collect();
        let count = cells.len() as f64;
        Some(Self {
            cells: cells.len(),
            area: Summary::of(cells.iter().map(|c| c.area))?,
            perimeter: Summary::of(cells.iter().map(|c| c.perimeter))?,
            shape_index: Summary::of(cells.iter().map(|c| c.shape_index()))?,
            mean_radius: cells.iter().map(|c| c.mean_radius).sum::<f64>() / count,
            mean_radius2: cells.iter().map(|c| c.mean_radius2).sum::<f64>() / count,
        })
    }
}

/// Tab-separated shape statistics per step and type.
pub struct ShapeExporter {
    out: BufWriter<File>,
}

impl ShapeExporter {
    pub fn create(path: &Path) -> Result<Self> {
        let mut out = create(path)?;
        writeln!(
            out,
            "#step\ttype\tcells\tmean_p0\tmin_p0\tmax_p0\tmean_area\tmin_area\tmax_area\t\
             mean_perimeter\tmin_perimeter\tmax_perimeter\tmean_radius\tmean_radius2"
        )?;
        Ok(Self { out })
    }
}

impl Exporter for ShapeExporter {
    fn name(&self) -> &'static str {
        "shape"
    }

    fn export(&mut self, snapshot: &PopulationSnapshot) -> Result<()> {
        for t in 0..snapshot.types {
            let Some(s) = ShapeStats::of_type(snapshot, t) else {
                continue;
            };
            writeln!(
                self.out,
                "{}\t{t}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
                snapshot.step,
                s.cells,
                s.shape_index.mean,
                s.shape_index.min,
                s.shape_index.max,
                s.area.mean,
                s.area.min,
                s.area.max,
                s.perimeter.mean,
                s.perimeter.min,
                s.perimeter.max,
                s.mean_radius,
                s.mean_radius2,
            )?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(self.out.flush()?)
    }
}

/// Order parameter and per-type segregation series.
pub struct OrderExporter {
    out: BufWriter<File>,
}

impl OrderExporter {
    pub fn create(path: &Path, types: usize) -> Result<Self> {
        let mut out = create(path)?;
        write!(out, "#step\tphi")?;
        for t in 0..types {
            write!(out, "\tgamma_{t}")?;
        }
        writeln!(out)?;
        Ok(Self { out })
    }
}

impl Exporter for OrderExporter {
    fn name(&self) -> &'static str {
        "order"
    }

    fn export(&mut self, snapshot: &PopulationSnapshot) -> Result<()> {
        write!(self.out, "{}\t{:.8}", snapshot.step, snapshot.order_parameter())?;
        for t in 0..snapshot.types {
            match snapshot.mean_gamma(t) {
                Some(gamma) => write!(self.out, "\t{gamma:.8}")?,
                None => write!(self.out, "\tnan")?,
            }
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(self.out.flush()?)
    }
}

#[derive(Serialize)]
struct ForceLine<'a> {
    step: u64,
    cell: CellId,
    hard_core: &'a [ForceVector],
    invasion: &'a [ForceVector],
}

/// Hard-core and invasion force vectors, one JSON line per cell that felt
/// either.
pub struct ForceExporter {
    out: BufWriter<File>,
}

impl ForceExporter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self { out: create(path)? })
    }
}

impl Exporter for ForceExporter {
    fn name(&self) -> &'static str {
        "forces"
    }

    fn export(&mut self, snapshot: &PopulationSnapshot) -> Result<()> {
        for cell in &snapshot.cells {
            if cell.hard_core_vectors.is_empty() && cell.invasion_vectors.is_empty() {
                continue;
            }
            let line = ForceLine {
                step: snapshot.step,
                cell: cell.id,
                hard_core: &cell.hard_core_vectors,
                invasion: &cell.invasion_vectors,
            };
            serde_json::to_writer(&mut self.out, &line)?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(self.out.flush()?)
    }
}

/// Full snapshots as gzip-compressed JSON lines.
pub struct TrajectoryExporter {
    out: Option<GzEncoder<BufWriter<File>>>,
}

impl TrajectoryExporter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            out: Some(GzEncoder::new(create(path)?, Compression::default())),
        })
    }
}

impl Exporter for TrajectoryExporter {
    fn name(&self) -> &'static str {
        "trajectory"
    }

    fn export(&mut self, snapshot: &PopulationSnapshot) -> Result<()> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| IoError::invalid_state("trajectory already finished"))?;
        let json = snapshot
            .to_json()
            .map_err(|e| IoError::encoding(e.to_string()))?;
        out.write_all(json.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(encoder) = self.out.take() {
            encoder.finish()?.flush()?;
        }
        Ok(())
    }
}

/// Which exporters a run enables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSelection {
    pub last_state: bool,
    pub shape: bool,
    pub order: bool,
    pub forces: bool,
    pub trajectory: bool,
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self {
            last_state: true,
            shape: true,
            order: true,
            forces: false,
            trajectory: false,
        }
    }
}

/// Opens the selected exporters under the run's file prefix.
pub fn open_exporters(
    files: &RunFiles,
    selection: ExportSelection,
    types: usize,
) -> Result<Vec<Box<dyn Exporter>>> {
    let mut exporters: Vec<Box<dyn Exporter>> = Vec::new();
    if selection.last_state {
        exporters.push(Box::new(LastStateExporter::new(files.path("last.bin"))));
    }
    if selection.shape {
        exporters.push(Box::new(ShapeExporter::create(&files.path("shape.dat"))?));
    }
    if selection.order {
        exporters.push(Box::new(OrderExporter::create(&files.path("order.dat"), types)?));
    }
    if selection.forces {
        exporters.push(Box::new(ForceExporter::create(&files.path("forces.jsonl"))?));
    }
    if selection.trajectory {
        exporters.push(Box::new(TrajectoryExporter::create(
            &files.path("trajectory.jsonl.gz"),
        )?));
    }
    tracing::info!(
        dir = %files.dir().display(),
        stamp = files.stamp(),
        exporters = ?exporters.iter().map(|e| e.name()).collect::<Vec<_>>(),
        "Exporters ready"
    );
    Ok(exporters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::{BufRead, BufReader};
    use superboids_data::{CellRecord, ParticleRecord, Vec2};

    fn cell(id: CellId, cell_type: usize, area: f64, vectors: usize) -> CellRecord {
        CellRecord {
            id,
            cell_type,
            particles: vec![
                ParticleRecord {
                    position: Vec2::new(0.0, 0.0),
                    velocity: Vec2::new(0.01, 0.0),
                };
                4
            ],
            area,
            perimeter: 4.0,
            mean_radius: 0.5,
            mean_radius2: 0.25,
            contacts: Vec::new(),
            gamma: (cell_type == 0).then_some(0.25),
            hard_core_vectors: vec![
                ForceVector {
                    origin: Vec2::ZERO,
                    direction: Vec2::new(1.0, 0.0),
                };
                vectors
            ],
            invasion_vectors: Vec::new(),
        }
    }

    fn snapshot(step: u64) -> PopulationSnapshot {
        PopulationSnapshot {
            step,
            domain: 100.0,
            types: 2,
            particles_per_cell: 4,
            speeds: vec![0.01, 0.01],
            cells: vec![cell(0, 0, 1.0, 0), cell(1, 0, 3.0, 2), cell(2, 1, 2.0, 0)],
        }
    }

    fn scratch(name: &str) -> RunFiles {
        let dir = std::env::temp_dir().join(format!("superboids_{name}_{}", std::process::id()));
        RunFiles::with_stamp(dir, "test").unwrap()
    }

    #[test]
    fn test_shape_stats_per_type() {
        let stats = ShapeStats::of_type(&snapshot(0), 0).unwrap();
        assert_eq!(stats.cells, 2);
        assert_eq!(stats.area, Summary { mean: 2.0, min: 1.0, max: 3.0 });
        assert!(ShapeStats::of_type(&snapshot(0), 5).is_none());
    }

    #[test]
    fn test_order_series() {
        let files = scratch("order");
        let path = files.path("order.dat");
        let mut exporter = OrderExporter::create(&path, 2).unwrap();
        exporter.export(&snapshot(0)).unwrap();
        exporter.export(&snapshot(10)).unwrap();
        exporter.finish().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "#step\tphi\tgamma_0\tgamma_1");
        assert!(lines[1].starts_with("0\t1.00000000\t0.25000000\tnan"));
        assert_eq!(lines.len(), 3);
        std::fs::remove_dir_all(files.dir()).ok();
    }

    #[test]
    fn test_force_lines_skip_quiet_cells() {
        let files = scratch("forces");
        let path = files.path("forces.jsonl");
        let mut exporter = ForceExporter::create(&path).unwrap();
        exporter.export(&snapshot(4)).unwrap();
        exporter.finish().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["cell"], 1);
        assert_eq!(lines[0]["hard_core"].as_array().unwrap().len(), 2);
        std::fs::remove_dir_all(files.dir()).ok();
    }

    #[test]
    fn test_trajectory_is_gzipped_json_lines() {
        let files = scratch("trajectory");
        let path = files.path("trajectory.jsonl.gz");
        let mut exporter = TrajectoryExporter::create(&path).unwrap();
        exporter.export(&snapshot(1)).unwrap();
        exporter.export(&snapshot(2)).unwrap();
        exporter.finish().unwrap();
        assert!(exporter.export(&snapshot(3)).is_err());

        let reader = BufReader::new(GzDecoder::new(File::open(&path).unwrap()));
        let steps: Vec<u64> = reader
            .lines()
            .map(|l| serde_json::from_str::<PopulationSnapshot>(&l.unwrap()).unwrap().step)
            .collect();
        assert_eq!(steps, vec![1, 2]);
        std::fs::remove_dir_all(files.dir()).ok();
    }

    #[test]
    fn test_open_default_selection() {
        let files = scratch("open");
        let exporters = open_exporters(&files, ExportSelection::default(), 1).unwrap();
        let names: Vec<_> = exporters.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["last-state", "shape", "order"]);
        assert!(files.path("shape.dat").exists());
        std::fs::remove_dir_all(files.dir()).ok();
    }
}
