/// Best-model checkpointing with safetensors
///
/// One fixed destination path; every save fully overwrites the previous
/// snapshot. There is no rotation and no versioning: the file always holds
/// the parameters of the best-scoring epoch seen so far.
use std::path::{Path, PathBuf};

use candle_nn::VarMap;

/// Default checkpoint destination
pub const DEFAULT_CHECKPOINT_PATH: &str = "model/model_best.safetensors";

/// Persists the full model parameter state to a fixed path
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store writing to the given path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Checkpoint destination
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot every variable in the map, overwriting prior content
    ///
    /// A write failure propagates and aborts the run; there is no retry.
    pub fn save(&self, varmap: &VarMap) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        varmap.save(&self.path)?;
        log::info!("Saved checkpoint to {}", self.path.display());
        Ok(())
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;

    fn varmap_with_weight(value: f64) -> VarMap {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let _w = vb
            .get_with_hints((3, 3), "w", candle_nn::Init::Const(value))
            .unwrap();
        varmap
    }

    #[test]
    fn test_save_creates_file_and_parent_dir() {
        let dir = std::env::temp_dir().join("quadtune_ckpt_test");
        let path = dir.join("model_best.safetensors");
        std::fs::remove_dir_all(&dir).ok();

        let store = CheckpointStore::new(&path);
        store.save(&varmap_with_weight(0.0)).unwrap();
        assert!(path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let path = std::env::temp_dir().join("quadtune_ckpt_overwrite.safetensors");
        std::fs::remove_file(&path).ok();

        let store = CheckpointStore::new(&path);
        store.save(&varmap_with_weight(1.0)).unwrap();
        store.save(&varmap_with_weight(2.0)).unwrap();

        // the surviving snapshot is the second one
        let mut varmap = varmap_with_weight(0.0);
        varmap.load(&path).unwrap();
        let w = varmap.all_vars()[0].as_tensor().to_vec2::<f32>().unwrap();
        assert!(w.iter().flatten().all(|&v| (v - 2.0).abs() < 1e-6));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_default_path() {
        let store = CheckpointStore::default();
        assert_eq!(store.path(), Path::new(DEFAULT_CHECKPOINT_PATH));
    }
}
