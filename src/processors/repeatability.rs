//! Golden-vs-uut repeatability runs.
//!
//! A [`ProbePair`] holds two reduced probes sharing one column mapping.
//! [`AeroRepeatability`] compares them channel by channel, writing a CSV
//! report and (optionally) a PNG plot for each.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use thiserror::Error;

use super::comparison::{self, ComparisonError, ComparisonResult, ToleranceBand, Verdict};
use super::reduction::{self, Channel, ReducedProfile, ReductionError};
use super::resolver;
use crate::config::ToleranceConfig;
use crate::core::angle::AngleParser;
use crate::core::loaders::{self, LoaderError, RawTable};
use crate::core::schema::{ColumnMapping, SchemaError};
use crate::core::writers::{self, WriteError};
use crate::visualization::{ComparisonPlot, PlotSurface, VisualizationError};

/// Errors raised while loading probes or processing a channel.
#[derive(Debug, Error)]
pub enum RepeatabilityError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Reduction(#[from] ReductionError),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Visualization(#[from] VisualizationError),
}

pub type Result<T> = std::result::Result<T, RepeatabilityError>;

/// One reduced probe file.
#[derive(Debug, Clone)]
pub struct Probe {
    source_path: PathBuf,
    mapping: ColumnMapping,
    profile: ReducedProfile,
}

impl Probe {
    /// Load and reduce `path` with a mapping that is already known.
    pub fn load<P: AsRef<Path>>(
        path: P,
        mapping: &ColumnMapping,
        parser: &dyn AngleParser,
    ) -> Result<Self> {
        let path = path.as_ref();
        let table = loaders::load_raw_table(path)?;
        Self::from_table(path, &table, mapping, parser)
    }

    /// Reduce an already loaded table.
    pub fn from_table<P: AsRef<Path>>(
        path: P,
        table: &RawTable,
        mapping: &ColumnMapping,
        parser: &dyn AngleParser,
    ) -> Result<Self> {
        let mapping = resolver::resolve_known(table, mapping)?;
        let profile = reduction::reduce(table, &mapping, parser)?;
        log::debug!("Loaded probe {}", path.as_ref().display());

        Ok(Self {
            source_path: path.as_ref().to_path_buf(),
            mapping,
            profile,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn profile(&self) -> &ReducedProfile {
        &self.profile
    }
}

/// Golden and uut probes reduced with the same mapping.
#[derive(Debug, Clone)]
pub struct ProbePair {
    golden: Probe,
    uut: Probe,
}

impl ProbePair {
    /// Load the uut at `uut_path` using the golden probe's mapping.
    pub fn with_golden<P: AsRef<Path>>(
        golden: Probe,
        uut_path: P,
        parser: &dyn AngleParser,
    ) -> Result<Self> {
        let uut_path = uut_path.as_ref();
        let uut_table = loaders::load_raw_table(uut_path)?;
        Self::with_golden_table(golden, uut_path, &uut_table, parser)
    }

    /// Reduce an already loaded uut table using the golden probe's mapping.
    pub fn with_golden_table<P: AsRef<Path>>(
        golden: Probe,
        uut_path: P,
        uut_table: &RawTable,
        parser: &dyn AngleParser,
    ) -> Result<Self> {
        let uut = Probe::from_table(uut_path, uut_table, golden.mapping(), parser)?;
        Ok(Self { golden, uut })
    }

    /// Load both files with an explicit shared mapping.
    pub fn load<G: AsRef<Path>, U: AsRef<Path>>(
        golden_path: G,
        uut_path: U,
        mapping: &ColumnMapping,
        parser: &dyn AngleParser,
    ) -> Result<Self> {
        let golden = Probe::load(golden_path, mapping, parser)?;
        Self::with_golden(golden, uut_path, parser)
    }

    pub fn golden(&self) -> &Probe {
        &self.golden
    }

    pub fn uut(&self) -> &Probe {
        &self.uut
    }
}

/// Artifacts produced for one channel.
#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    pub result: ComparisonResult,
    pub report_path: PathBuf,
    pub plot_path: Option<PathBuf>,
}

impl ChannelOutcome {
    pub fn verdict(&self) -> Verdict {
        self.result.verdict()
    }
}

/// Per-channel outcomes of a full run, in channel order.
#[derive(Debug)]
pub struct RepeatabilityReport {
    pub channels: Vec<(Channel, Result<ChannelOutcome>)>,
}

impl RepeatabilityReport {
    /// Channels that could not be processed.
    pub fn errors(&self) -> impl Iterator<Item = (Channel, &RepeatabilityError)> {
        self.channels
            .iter()
            .filter_map(|(c, r)| r.as_ref().err().map(|e| (*c, e)))
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// `Fail` if any processed channel failed its band.
    pub fn verdict(&self) -> Verdict {
        let failed = self
            .channels
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .any(|o| o.verdict() == Verdict::Fail);
        if failed {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }
}

/// `<uut file name>-<channel tag>-<YYYY-MM-DD>`
pub fn artifact_stem(uut_path: &Path, channel: Channel, date: NaiveDate) -> String {
    let name = uut_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}-{}-{}", name, channel.tag(), date.format("%Y-%m-%d"))
}

/// Repeatability run over a [`ProbePair`].
pub struct AeroRepeatability<'a> {
    tolerance: ToleranceConfig,
    output_dir: PathBuf,
    date: NaiveDate,
    plotter: Option<&'a dyn PlotSurface>,
}

impl<'a> AeroRepeatability<'a> {
    pub fn new<P: AsRef<Path>>(tolerance: ToleranceConfig, output_dir: P) -> Self {
        Self {
            tolerance,
            output_dir: output_dir.as_ref().to_path_buf(),
            date: Local::now().date_naive(),
            plotter: None,
        }
    }

    /// Date stamped into artifact names.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_plotter(mut self, plotter: &'a dyn PlotSurface) -> Self {
        self.plotter = Some(plotter);
        self
    }

    pub fn band(&self, channel: Channel) -> ToleranceBand {
        ToleranceBand::for_channel(channel, &self.tolerance)
    }

    /// Compare one channel and write its artifacts.
    pub fn compare_channel(&self, pair: &ProbePair, channel: Channel) -> Result<ChannelOutcome> {
        let result = comparison::compare(
            pair.golden().profile(),
            pair.uut().profile(),
            channel,
            self.band(channel),
        )?;

        let stem = artifact_stem(pair.uut().source_path(), channel, self.date);
        let report_path = self.output_dir.join(format!("{}.csv", stem));
        writers::write_comparison_report(&report_path, &result)?;

        let plot_path = match self.plotter {
            Some(plotter) => {
                let path = self.output_dir.join(format!("{}.png", stem));
                plotter.render(&path, &ComparisonPlot::from_result(&result))?;
                Some(path)
            }
            None => None,
        };

        log::info!(
            "{}: {} ({})",
            channel.title(),
            result.verdict(),
            report_path.display()
        );

        Ok(ChannelOutcome {
            result,
            report_path,
            plot_path,
        })
    }

    /// Compare every channel. A failing channel does not stop the others.
    pub fn run(&self, pair: &ProbePair) -> RepeatabilityReport {
        let channels = Channel::ALL
            .into_iter()
            .map(|channel| {
                let outcome = self.compare_channel(pair, channel);
                if let Err(e) = &outcome {
                    log::warn!("{} skipped: {}", channel.title(), e);
                }
                (channel, outcome)
            })
            .collect();

        RepeatabilityReport { channels }
    }
}
