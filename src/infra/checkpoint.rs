// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores network weights using Burn's CompactRecorder.
//
// What lives in a checkpoint directory:
//   1. Network weights (.mpk.gz), one file per checkpoint
//   2. checkpoints.json  — retained checkpoint names, oldest first
//   3. train_config.json — run configuration, needed to rebuild
//                          the network and encoder for inference
//
// File naming convention:
//   checkpoints/
//     AlexNet-EPOCH-1.mpk.gz    ← weights after epoch 1
//     AlexNet-STEP-500.mpk.gz   ← weights after optimizer step 500
//     checkpoints.json          ← ["AlexNet-EPOCH-1", "AlexNet-STEP-500"]
//     train_config.json
//
// Retention: once more than `keep` checkpoints exist the oldest
// ones are deleted from disk and dropped from the manifest.
// `keep == 0` keeps everything.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::ports::NeuralModule;

const MANIFEST: &str = "checkpoints.json";
const CONFIG: &str   = "train_config.json";
/// Extension CompactRecorder appends to every record
const EXTENSION: &str = "mpk.gz";

/// When a checkpoint was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointTag {
    Epoch(usize),
    Step(usize),
}

impl fmt::Display for CheckpointTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointTag::Epoch(n) => write!(f, "EPOCH-{n}"),
            CheckpointTag::Step(n)  => write!(f, "STEP-{n}"),
        }
    }
}

pub struct CheckpointManager {
    dir:      PathBuf,
    keep:     usize,
    /// Retained checkpoint names, oldest first
    retained: Vec<String>,
}

impl CheckpointManager {
    /// Open (or create) a checkpoint directory, picking up the
    /// manifest of a previous run if there is one.
    pub fn new(dir: impl Into<PathBuf>, keep: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;

        let retained = read_manifest(&dir)?;
        Ok(Self { dir, keep, retained })
    }

    /// Open an existing checkpoint directory without creating it.
    /// Nothing is saved through the returned manager, so retention
    /// is disabled.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(anyhow!(
                "Checkpoint directory '{}' does not exist. Have you run 'train' first?",
                dir.display()
            ));
        }

        let retained = read_manifest(&dir)?;
        Ok(Self { dir, keep: 0, retained })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Retained checkpoint names, oldest first.
    pub fn retained(&self) -> &[String] {
        &self.retained
    }

    pub fn latest(&self) -> Option<&str> {
        self.retained.last().map(String::as_str)
    }

    /// Full path of a checkpoint file, including the recorder's extension.
    pub fn file_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    /// Record the network under `<NAME>-<tag>` and apply retention.
    pub fn save<B, M>(&mut self, model: &M, tag: CheckpointTag) -> Result<PathBuf>
    where
        B: Backend,
        M: Module<B> + NeuralModule,
    {
        let name = format!("{}-{}", M::NAME, tag);
        CompactRecorder::new()
            .record(model.clone().into_record(), self.dir.join(&name))
            .with_context(|| format!("Failed to save checkpoint '{name}'"))?;

        self.retained.retain(|n| n != &name);
        self.retained.push(name.clone());

        if self.keep > 0 {
            while self.retained.len() > self.keep {
                let old  = self.retained.remove(0);
                let file = self.file_for(&old);
                if let Err(e) = fs::remove_file(&file) {
                    tracing::warn!("Could not remove old checkpoint '{}': {}", file.display(), e);
                }
                tracing::debug!("Dropped checkpoint {}", old);
            }
        }

        self.write_manifest()?;
        tracing::info!("Saved checkpoint {}", name);
        Ok(self.file_for(&name))
    }

    /// Load the most recent checkpoint into `model`.
    pub fn load_latest<B, M>(&self, model: M, device: &B::Device) -> Result<M>
    where
        B: Backend,
        M: Module<B>,
    {
        let name = self
            .latest()
            .ok_or_else(|| anyhow!("No checkpoint in '{}'. Have you run 'train' first?", self.dir.display()))?;

        let record = CompactRecorder::new()
            .load(self.dir.join(name), device)
            .with_context(|| format!("Cannot load checkpoint '{name}'"))?;

        tracing::info!("Restored checkpoint {}", name);
        Ok(model.load_record(record))
    }

    /// Like `load_latest`, but when `strict` is false a failed
    /// restore is logged and the freshly initialised model is
    /// returned unchanged.
    pub fn restore<B, M>(&self, model: M, device: &B::Device, strict: bool) -> Result<M>
    where
        B: Backend,
        M: Module<B>,
    {
        let fresh = model.clone();
        match self.load_latest(model, device) {
            Ok(restored) => Ok(restored),
            Err(e) if strict => Err(e.context("Strict restore failed")),
            Err(e) => {
                tracing::warn!("{:#}; continuing with freshly initialised parameters", e);
                Ok(fresh)
            }
        }
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'infer'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    fn write_manifest(&self) -> Result<()> {
        let path = self.dir.join(MANIFEST);
        fs::write(&path, serde_json::to_string_pretty(&self.retained)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))
    }
}

fn read_manifest(dir: &Path) -> Result<Vec<String>> {
    let manifest = dir.join(MANIFEST);
    if !manifest.exists() {
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(&manifest)
        .with_context(|| format!("Cannot read '{}'", manifest.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Malformed manifest '{}'", manifest.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::alexnet::{AlexNet, AlexNetConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny() -> AlexNet<TestBackend> {
        AlexNetConfig::new(1, 3).with_hidden_width(4).init(&Default::default()).unwrap()
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(CheckpointTag::Epoch(3).to_string(), "EPOCH-3");
        assert_eq!(CheckpointTag::Step(120).to_string(), "STEP-120");
    }

    #[test]
    fn test_retention_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let mut ckpt = CheckpointManager::new(dir.path(), 2).unwrap();
        let model = tiny();

        for epoch in 1..=3 {
            ckpt.save(&model, CheckpointTag::Epoch(epoch)).unwrap();
        }

        assert_eq!(ckpt.retained(), ["AlexNet-EPOCH-2", "AlexNet-EPOCH-3"]);
        assert!(!ckpt.file_for("AlexNet-EPOCH-1").exists());
        assert!(ckpt.file_for("AlexNet-EPOCH-2").exists());
        assert!(dir.path().join("AlexNet-EPOCH-3.mpk.gz").exists());

        // a new manager picks up the manifest
        let reopened = CheckpointManager::new(dir.path(), 2).unwrap();
        assert_eq!(reopened.latest(), Some("AlexNet-EPOCH-3"));
    }

    #[test]
    fn test_restore_round_trips_weights() {
        let dir = tempfile::tempdir().unwrap();
        let mut ckpt = CheckpointManager::new(dir.path(), 0).unwrap();
        let trained = tiny();
        ckpt.save(&trained, CheckpointTag::Step(10)).unwrap();

        let restored = ckpt.restore(tiny(), &Default::default(), true).unwrap();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 64, 64], &Default::default());
        trained
            .forward(input.clone())
            .into_data()
            .assert_approx_eq(&restored.forward(input).into_data(), 2);
    }

    #[test]
    fn test_strict_restore_aborts_without_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path(), 1).unwrap();

        assert!(ckpt.restore(tiny(), &Default::default(), true).is_err());
        assert!(ckpt.restore(tiny(), &Default::default(), false).is_ok());
    }

    #[test]
    fn test_open_never_creates_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("chekpoints");
        assert!(CheckpointManager::open(&missing).is_err());
        assert!(!missing.exists());

        let mut ckpt = CheckpointManager::new(dir.path(), 0).unwrap();
        ckpt.save(&tiny(), CheckpointTag::Epoch(1)).unwrap();
        let opened = CheckpointManager::open(dir.path()).unwrap();
        assert_eq!(opened.dir(), dir.path());
        assert_eq!(opened.latest(), Some("AlexNet-EPOCH-1"));
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path(), 1).unwrap();
        assert!(ckpt.load_config().is_err());

        let cfg = TrainConfig { epochs: 7, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap().epochs, 7);
    }
}
