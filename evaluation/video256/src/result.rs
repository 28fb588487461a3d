//! 评估结果.

use forest_tile::eval::VideoReport;
use forest_tile::Scores;
use std::io::{self, Write};

/// 将 `scores` 写进 `w` 中.
fn describe_into<W: Write>(name: &str, s: &Scores, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Scores `{name}`:")?;
    for (metric, v) in s.named() {
        writeln!(w, "{S4}{metric}: {v:.6}")?;
    }
    Ok(())
}

/// 时间序列评估最终结果.
pub struct VideoResult {
    threshold: f32,
    report: VideoReport,
}

impl VideoResult {
    pub fn new(threshold: f32, report: VideoReport) -> Self {
        Self { threshold, report }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        println!(
            "Threshold: {}, evaluated samples: {}, skipped: {}",
            self.threshold, self.report.samples, self.report.failed
        );
        utils::sep();

        let mut buf = Vec::with_capacity(512);
        let per_year = self
            .report
            .per_year
            .iter()
            .map(|(year, s)| (year.to_string(), s));
        for (name, scores) in per_year.chain([("overall".to_string(), &self.report.overall)]) {
            describe_into(&name, scores, &mut buf).unwrap();
            print!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            utils::sep();
        }
    }
}
