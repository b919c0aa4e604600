/// Pretrained weight loading from safetensors files
use std::path::Path;

use candle_nn::VarMap;

/// Load pretrained weights into an already-built model's `VarMap`
///
/// Every variable registered in the map must be present in the file with a
/// matching shape; a partial or mismatched snapshot is an error.
pub fn load_pretrained<P: AsRef<Path>>(varmap: &mut VarMap, path: P) -> crate::Result<()> {
    let path = path.as_ref();
    log::info!("Loading pretrained weights from {}", path.display());
    varmap.load(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;

    #[test]
    fn test_load_roundtrip() {
        let device = Device::Cpu;
        let path = std::env::temp_dir().join("quadtune_loader_test.safetensors");

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let _w = vb.get_with_hints((4, 4), "w", candle_nn::init::ZERO).unwrap();
        varmap.save(&path).unwrap();

        let mut fresh = VarMap::new();
        let vb = VarBuilder::from_varmap(&fresh, DType::F32, &device);
        let _w = vb
            .get_with_hints((4, 4), "w", candle_nn::Init::Const(1.0))
            .unwrap();
        load_pretrained(&mut fresh, &path).unwrap();

        let restored = fresh.all_vars()[0].as_tensor().to_vec2::<f32>().unwrap();
        assert!(restored.iter().flatten().all(|&v| v == 0.0));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let _w = vb.get_with_hints((2, 2), "w", candle_nn::init::ZERO).unwrap();

        assert!(load_pretrained(&mut varmap, "does/not/exist.safetensors").is_err());
    }
}
