use std::io::{self, Write};

/// Output size between two progress reports: 8 MiB
pub const REPORT_STEP: u64 = 8 * 1024 * 1024;

/// Output sink that reports how many bytes have gone through it.
///
/// `report` receives the running total the first time it reaches each
/// multiple of the step. A write that jumps over several multiples gives a
/// single report.
pub struct ProgressWriter<W, F> {
    inner: W,
    report: F,
    step: u64,
    written: u64,
    next_report: u64,
}

impl<W: Write, F: FnMut(u64)> ProgressWriter<W, F> {
    pub fn new(inner: W, report: F) -> Self {
        Self::with_step(inner, REPORT_STEP, report)
    }

    /// A zero `step` falls back to `REPORT_STEP`.
    pub fn with_step(inner: W, step: u64, report: F) -> Self {
        let step = if step == 0 { REPORT_STEP } else { step };
        Self { inner, report, step, written: 0, next_report: step }
    }
}

impl<W: Write, F: FnMut(u64)> Write for ProgressWriter<W, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if self.written >= self.next_report {
            (self.report)(self.written);
            self.next_report = (self.written / self.step + 1) * self.step;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_running_totals() {
        let mut totals = Vec::new();
        let mut out = Vec::new();
        {
            let mut writer = ProgressWriter::with_step(&mut out, 1000, |n| totals.push(n));
            for _ in 0..10 {
                writer.write_all(&[7u8; 300]).unwrap();
            }
        }
        assert_eq!(out.len(), 3000);
        assert_eq!(totals, vec![1200, 2100, 3000]);
    }

    #[test]
    fn large_write_reports_once() {
        let mut totals = Vec::new();
        let mut writer = ProgressWriter::with_step(io::sink(), 10, |n| totals.push(n));
        writer.write_all(&[0u8; 35]).unwrap();
        writer.write_all(&[0u8; 4]).unwrap();
        writer.write_all(&[0u8; 1]).unwrap();
        drop(writer);
        assert_eq!(totals, vec![35, 40]);
    }

    #[test]
    fn zero_step_uses_default() {
        let mut totals = Vec::new();
        let mut writer = ProgressWriter::with_step(io::sink(), 0, |n| totals.push(n));
        writer.write_all(&vec![0u8; REPORT_STEP as usize - 1]).unwrap();
        writer.write_all(&[0u8]).unwrap();
        drop(writer);
        assert_eq!(totals, vec![REPORT_STEP]);
    }
}
