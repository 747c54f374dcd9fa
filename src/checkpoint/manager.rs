use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ai::DqnAgent;
use crate::checkpoint::metadata::{CheckpointMetadata, CheckpointMetrics};
use crate::env::EnvConfig;
use crate::error::CheckpointError;

const POLICY_FILE: &str = "policy_network";
const TRAINING_STATE_FILE: &str = "training_state.json";
const METADATA_FILE: &str = "metadata.json";
const LATEST: &str = "latest";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// A checkpoint read back from disk. Weights stay on disk until
/// [`CheckpointData::restore`] is called.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub training_state_json: String,
}

impl CheckpointData {
    /// Path of the saved policy network (without the recorder extension).
    pub fn policy_path(&self) -> PathBuf {
        self.path.join(POLICY_FILE)
    }

    /// Load weights and training state into `agent`.
    pub fn restore(&self, agent: &mut DqnAgent) -> Result<(), CheckpointError> {
        agent.load(&self.policy_path())?;
        agent.restore_training_state_json(&self.training_state_json)?;
        Ok(())
    }
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        if let Err(e) = fs::create_dir_all(&config.checkpoint_dir) {
            tracing::warn!(
                dir = %config.checkpoint_dir.display(),
                error = %e,
                "could not create checkpoint directory"
            );
        }
        CheckpointManager { config }
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Save the agent's policy network, training state and metadata.
    pub fn save_checkpoint(
        &self,
        agent: &DqnAgent,
        env_config: &EnvConfig,
        metrics: &CheckpointMetrics,
        episode: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", episode);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;

        agent.save(&tmp_dir.join(POLICY_FILE))?;
        fs::write(tmp_dir.join(TRAINING_STATE_FILE), agent.training_state_json()?)?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let metadata = CheckpointMetadata {
            episode,
            timestamp,
            algorithm: "DQN".to_string(),
            metrics: metrics.clone(),
            hyperparameters: agent.config().clone(),
            env: env_config.clone(),
        };
        fs::write(
            tmp_dir.join(METADATA_FILE),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_pointer(&dir_name)?;
        self.prune_old_checkpoints()?;

        tracing::debug!(path = %final_dir.display(), episode, "checkpoint written");
        Ok(final_dir)
    }

    /// Read a checkpoint's metadata and training state.
    pub fn load_checkpoint(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }
        let metadata = read_metadata(&dir.join(METADATA_FILE))?;

        let ts_path = dir.join(TRAINING_STATE_FILE);
        let training_state_json =
            fs::read_to_string(&ts_path).map_err(|e| CheckpointError::MetadataRead {
                path: ts_path,
                source: e,
            })?;

        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
            training_state_json,
        })
    }

    /// Read the checkpoint the `latest` pointer refers to.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join(LATEST);
        if latest_link.symlink_metadata().is_err() {
            return Err(CheckpointError::NoLatestSymlink(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let resolved = read_latest_pointer(&latest_link)?;
        let target = if resolved.is_relative() {
            self.config.checkpoint_dir.join(resolved)
        } else {
            resolved
        };
        self.load_checkpoint(&target)
    }

    /// List all checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(
        &self,
    ) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join(METADATA_FILE);
            if meta_path.exists() {
                let metadata = read_metadata(&meta_path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.episode);
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and best N by
    /// evaluation score.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_score: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.eval_score))
            .collect();
        by_score.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        for (i, _) in by_score.iter().take(self.config.keep_best_n) {
            keep.insert(*i);
        }

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }

    /// Point `latest` at the given checkpoint directory name.
    fn update_latest_pointer(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join(LATEST);
        if link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        #[cfg(not(unix))]
        fs::write(&link_path, dir_name)?;
        Ok(())
    }
}

fn read_metadata(path: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_latest_pointer(link: &Path) -> Result<PathBuf, CheckpointError> {
    match fs::read_link(link) {
        Ok(target) => Ok(target),
        Err(_) => Ok(PathBuf::from(fs::read_to_string(link)?.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::DqnConfig;
    use crate::env::StateVector;

    fn test_metrics() -> CheckpointMetrics {
        CheckpointMetrics {
            eval_score: 4.0,
            average_score: 3.5,
            best_score: 9,
            average_reward: 12.0,
            current_loss: 0.05,
            training_steps: 1000,
            epsilon: 0.2,
        }
    }

    fn manager(dir: &Path, keep_last_n: usize, keep_best_n: usize) -> CheckpointManager {
        CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.to_path_buf(),
            keep_last_n,
            keep_best_n,
        })
    }

    fn probe() -> StateVector {
        StateVector::from_array([0.45, 0.1, 0.6, 0.02, 0.17])
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let mut agent = DqnAgent::from_seed(DqnConfig::default(), 1);
        agent.set_epsilon(0.3);

        let path = manager
            .save_checkpoint(&agent, &EnvConfig::default(), &test_metrics(), 1000)
            .unwrap();
        assert!(path.exists());
        assert!(path.join("metadata.json").exists());
        assert!(path.join("training_state.json").exists());
        assert!(path.join("policy_network.mpk").exists());

        let data = manager.load_checkpoint(&path).unwrap();
        assert_eq!(data.metadata.episode, 1000);
        assert_eq!(data.metadata.algorithm, "DQN");
        assert_eq!(data.metadata.hyperparameters, DqnConfig::default());
        assert_eq!(data.metadata.env, EnvConfig::default());

        let mut restored = DqnAgent::from_seed(DqnConfig::default(), 2);
        data.restore(&mut restored).unwrap();
        assert_eq!(restored.q_values(&probe()), agent.q_values(&probe()));
        assert!((restored.epsilon() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_latest_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let agent = DqnAgent::from_seed(DqnConfig::default(), 0);

        for ep in [100, 200] {
            manager
                .save_checkpoint(&agent, &EnvConfig::default(), &test_metrics(), ep)
                .unwrap();
        }

        let latest = manager.load_latest().unwrap();
        assert_eq!(latest.metadata.episode, 200);
    }

    #[test]
    fn test_list_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10, 10);
        let agent = DqnAgent::from_seed(DqnConfig::default(), 0);

        for ep in [300, 100, 200] {
            manager
                .save_checkpoint(&agent, &EnvConfig::default(), &test_metrics(), ep)
                .unwrap();
        }

        let list = manager.list_checkpoints().unwrap();
        let episodes: Vec<usize> = list.iter().map(|(_, m)| m.episode).collect();
        assert_eq!(episodes, vec![100, 200, 300]);
    }

    #[test]
    fn test_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 2, 1);
        let agent = DqnAgent::from_seed(DqnConfig::default(), 0);

        let scores = [1.0, 9.0, 0.5, 2.0, 3.0];
        for (i, &score) in scores.iter().enumerate() {
            let mut metrics = test_metrics();
            metrics.eval_score = score;
            manager
                .save_checkpoint(&agent, &EnvConfig::default(), &metrics, (i + 1) * 100)
                .unwrap();
        }

        // last 2 (400, 500) + best 1 (200)
        let list = manager.list_checkpoints().unwrap();
        let episodes: Vec<usize> = list.iter().map(|(_, m)| m.episode).collect();
        assert_eq!(episodes, vec![200, 400, 500]);
    }

    #[test]
    fn test_load_latest_without_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);

        let err = manager.load_latest().unwrap_err();
        assert!(
            matches!(err, CheckpointError::NoLatestSymlink(_)),
            "expected NoLatestSymlink, got: {err}"
        );
    }

    #[test]
    fn test_load_missing_checkpoint_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let err = manager
            .load_checkpoint(&dir.path().join("checkpoint_0000042"))
            .unwrap_err();
        assert!(matches!(err, CheckpointError::DirNotFound(_)), "got: {err}");
    }

    #[test]
    fn test_restore_reports_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let agent = DqnAgent::from_seed(DqnConfig::default(), 0);
        let path = manager
            .save_checkpoint(&agent, &EnvConfig::default(), &test_metrics(), 10)
            .unwrap();
        fs::remove_file(path.join("policy_network.mpk")).unwrap();

        let data = manager.load_checkpoint(&path).unwrap();
        let mut other = DqnAgent::from_seed(DqnConfig::default(), 1);
        let err = data.restore(&mut other).unwrap_err();
        assert!(
            matches!(err, CheckpointError::Model(crate::error::ModelError::ModelNotFound(_))),
            "got: {err}"
        );
    }

    #[test]
    fn test_metadata_without_env_section_deserializes() {
        let json = r#"{
            "episode": 100,
            "timestamp": 1700000000,
            "algorithm": "DQN",
            "metrics": {
                "eval_score": 2.0,
                "average_score": 1.5,
                "best_score": 4,
                "average_reward": 10.0,
                "current_loss": 0.1,
                "training_steps": 500,
                "epsilon": 0.5
            },
            "hyperparameters": {
                "learning_rate": 0.0005,
                "gamma": 0.99
            }
        }"#;

        let meta: CheckpointMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.episode, 100);
        assert_eq!(meta.env, EnvConfig::default());
        assert_eq!(meta.hyperparameters.replay_capacity, 50_000);
    }
}
