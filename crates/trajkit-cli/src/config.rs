use std::fs;
use std::path::{Path, PathBuf};

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};

use trajkit_core::error::{TrajError, TrajResult};
use trajkit_engine::SvdBackend;

pub const DEFAULT_SELECTION: &str = "name CA";
pub const DEFAULT_PRECISION: usize = 2;

/// Everything one `rmsds` invocation needs. Read from an optional JSON/YAML
/// file, then overridden by command-line flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub model1: Option<PathBuf>,
    #[serde(default)]
    pub traj1: Option<PathBuf>,
    #[serde(default)]
    pub model2: Option<PathBuf>,
    #[serde(default)]
    pub traj2: Option<PathBuf>,
    #[serde(default = "default_selection")]
    pub sel1: String,
    #[serde(default = "default_selection")]
    pub sel2: String,
    #[serde(default)]
    pub skip1: usize,
    #[serde(default)]
    pub skip2: usize,
    #[serde(default)]
    pub range1: Option<String>,
    #[serde(default)]
    pub range2: Option<String>,
    #[serde(default)]
    pub noout: bool,
    #[serde(default = "default_true")]
    pub cache: bool,
    /// Worker threads for the comparison loop; 0 means one per core.
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_precision")]
    pub precision: usize,
    #[serde(default)]
    pub proper_rotation: bool,
    #[serde(default = "default_svd")]
    pub svd: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub verbosity: u8,
}

fn default_selection() -> String {
    DEFAULT_SELECTION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_threads() -> usize {
    1
}

fn default_precision() -> usize {
    DEFAULT_PRECISION
}

fn default_svd() -> String {
    "nalgebra".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model1: None,
            traj1: None,
            model2: None,
            traj2: None,
            sel1: default_selection(),
            sel2: default_selection(),
            skip1: 0,
            skip2: 0,
            range1: None,
            range2: None,
            noout: false,
            cache: true,
            threads: default_threads(),
            precision: DEFAULT_PRECISION,
            proper_rotation: false,
            svd: default_svd(),
            stream: false,
            verbosity: 0,
        }
    }
}

/// One model/trajectory pair with its frame choice.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemSpec {
    pub model: PathBuf,
    pub traj: PathBuf,
    pub selection: String,
    pub skip: usize,
    pub range: Option<String>,
}

impl RunConfig {
    /// Checks the inputs are complete and consistent.
    pub fn validate(&self) -> TrajResult<()> {
        if self.model1.is_none() || self.traj1.is_none() {
            return Err(TrajError::Invalid(
                "a model and a trajectory are required".into(),
            ));
        }
        if self.model2.is_some() != self.traj2.is_some() {
            return Err(TrajError::Invalid(
                "the second system needs both a model and a trajectory".into(),
            ));
        }
        if self.precision > 17 {
            return Err(TrajError::Invalid(format!(
                "precision {} is beyond f64 resolution",
                self.precision
            )));
        }
        SvdBackend::parse(&self.svd)?;
        Ok(())
    }

    pub fn first(&self) -> TrajResult<SystemSpec> {
        match (&self.model1, &self.traj1) {
            (Some(model), Some(traj)) => Ok(SystemSpec {
                model: model.clone(),
                traj: traj.clone(),
                selection: self.sel1.clone(),
                skip: self.skip1,
                range: self.range1.clone(),
            }),
            _ => Err(TrajError::Invalid(
                "a model and a trajectory are required".into(),
            )),
        }
    }

    pub fn second(&self) -> Option<SystemSpec> {
        match (&self.model2, &self.traj2) {
            (Some(model), Some(traj)) => Some(SystemSpec {
                model: model.clone(),
                traj: traj.clone(),
                selection: self.sel2.clone(),
                skip: self.skip2,
                range: self.range2.clone(),
            }),
            _ => None,
        }
    }

    /// Log filter for `env_logger` when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        log_filter(self.verbosity)
    }

    /// Option summary for the provenance header.
    pub fn summary(&self) -> String {
        format!(
            "noout={},sel1='{}',skip1={},range1='{}',sel2='{}',skip2={},range2='{}',cache={},svd={},proper_rotation={}",
            self.noout as u8,
            self.sel1,
            self.skip1,
            self.range1.as_deref().unwrap_or(""),
            self.sel2,
            self.skip2,
            self.range2.as_deref().unwrap_or(""),
            self.cache as u8,
            self.svd,
            self.proper_rotation as u8,
        )
    }
}

/// `env_logger` filter for a `-v` count: warn, info, debug, then trace.
pub fn log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn load_config(path: &Path) -> TrajResult<RunConfig> {
    let content = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext == "yaml" || ext == "yml" {
        serde_yaml::from_str(&content)
            .map_err(|e| TrajError::Parse(format!("yaml parse error: {e}")))
    } else {
        serde_json::from_str(&content)
            .map_err(|e| TrajError::Parse(format!("json parse error: {e}")))
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "rmsds",
    version,
    about = "Pair-wise RMSD between the frames of one trajectory or two",
    override_usage = "rmsds [OPTIONS] <MODEL1> <TRAJ1> [MODEL2 TRAJ2]"
)]
pub struct Cli {
    /// model1 traj1 [model2 traj2]
    #[arg(value_name = "FILES", num_args = 0..=4)]
    pub files: Vec<PathBuf>,
    /// JSON or YAML run configuration; flags given here override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Atom selection for the first system
    #[arg(long)]
    pub sel1: Option<String>,
    /// Atom selection for the second system
    #[arg(long)]
    pub sel2: Option<String>,
    /// Skip the first n frames of the first trajectory
    #[arg(long)]
    pub skip1: Option<usize>,
    /// Skip the first n frames of the second trajectory
    #[arg(long)]
    pub skip2: Option<usize>,
    /// Matlab-style frame range for the first trajectory (e.g. 0:10,20:2:40)
    #[arg(long)]
    pub range1: Option<String>,
    /// Matlab-style frame range for the second trajectory
    #[arg(long)]
    pub range2: Option<String>,
    /// Do not print the matrix, only summary statistics
    #[arg(short = 'N', long, action = ArgAction::SetTrue)]
    pub noout: bool,
    /// Cache the selected coordinates in memory (0 re-reads frames per comparison)
    #[arg(long, value_parser = BoolishValueParser::new())]
    pub cache: Option<bool>,
    /// Worker threads for the comparison loop (0 = all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
    /// Decimal places in the printed matrix
    #[arg(short, long)]
    pub precision: Option<usize>,
    /// Exclude reflections from the superposition
    #[arg(long, action = ArgAction::SetTrue)]
    pub proper_rotation: bool,
    /// SVD backend: nalgebra or jacobi
    #[arg(long)]
    pub svd: Option<String>,
    /// Emit NDJSON progress events on stderr
    #[arg(long, action = ArgAction::SetTrue)]
    pub stream: bool,
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolves the final configuration: file values first, then flags.
    pub fn into_config(self) -> TrajResult<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => load_config(path)?,
            None => RunConfig::default(),
        };
        match self.files.len() {
            0 => {}
            2 | 4 => {
                let mut files = self.files.into_iter();
                cfg.model1 = files.next();
                cfg.traj1 = files.next();
                if let (Some(model), Some(traj)) = (files.next(), files.next()) {
                    cfg.model2 = Some(model);
                    cfg.traj2 = Some(traj);
                }
            }
            n => {
                return Err(TrajError::Invalid(format!(
                    "expected model1 traj1 [model2 traj2], got {n} files"
                )))
            }
        }
        if let Some(sel) = self.sel1 {
            cfg.sel1 = sel;
        }
        if let Some(sel) = self.sel2 {
            cfg.sel2 = sel;
        }
        if let Some(skip) = self.skip1 {
            cfg.skip1 = skip;
        }
        if let Some(skip) = self.skip2 {
            cfg.skip2 = skip;
        }
        if self.range1.is_some() {
            cfg.range1 = self.range1;
        }
        if self.range2.is_some() {
            cfg.range2 = self.range2;
        }
        cfg.noout |= self.noout;
        if let Some(cache) = self.cache {
            cfg.cache = cache;
        }
        if let Some(threads) = self.threads {
            cfg.threads = threads;
        }
        if let Some(precision) = self.precision {
            cfg.precision = precision;
        }
        cfg.proper_rotation |= self.proper_rotation;
        if let Some(svd) = self.svd {
            cfg.svd = svd;
        }
        cfg.stream |= self.stream;
        cfg.verbosity = cfg.verbosity.max(self.verbose);
        cfg.validate()?;
        Ok(cfg)
    }
}
