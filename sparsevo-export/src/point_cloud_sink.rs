use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};

use sparsevo_core::PointCoordinates;

/// Ordered, append-only text destination for exported world points.
///
/// Writes are best-effort: once the underlying stream becomes unusable the
/// sink latches closed and silently drops everything after, so a broken
/// export can never abort tracking. The latch never reopens.
pub struct PointCloudSink {
    writer: Option<BufWriter<File>>,
    enabled: bool,
    closed: bool,
    points_written: usize,
}

impl PointCloudSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("cannot create point cloud file {}", path.display()))?;

        log::info!("writing point cloud to {}", path.display());

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            enabled: true,
            closed: false,
            points_written: 0,
        })
    }

    /// Serializes one world point, scaled by 10, as a whitespace-separated
    /// decimal line. No-op while closed or disabled.
    pub fn write(&mut self, point: &PointCoordinates) {
        if self.closed || !self.enabled {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        let record = writeln!(
            writer,
            "{} {} {}",
            point.x * 10.0,
            point.y * 10.0,
            point.z * 10.0
        );
        if let Err(err) = record {
            log::warn!("point cloud stream became unusable, closing: {err}");
            self.flush_and_close();
            return;
        }

        log::debug!(
            "[{}] point cloud coordinate> x: {:.2}, y: {:.2}, z: {:.2}",
            self.points_written,
            point.x,
            point.y,
            point.z
        );
        self.points_written += 1;
    }

    /// Flushes buffered output and releases the file. Idempotent; afterwards
    /// the sink stays closed and later writes are dropped. Owners call this
    /// at shutdown, buffered lines may be lost otherwise.
    pub fn flush_and_close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(err) = writer.flush() {
                log::warn!("flushing point cloud file failed: {err}");
            }
        }
        self.closed = true;
    }

    /// Manual on/off switch, independent of the closed latch.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of points written so far, monotonically increasing.
    pub fn points_written(&self) -> usize {
        self.points_written
    }
}
