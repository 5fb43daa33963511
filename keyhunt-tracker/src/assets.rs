/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! The key renderable.
//!
//! A binary glTF model is used when one can be found; otherwise a
//! procedurally built placeholder key stands in. Neither path is fatal.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::TrackerError;

/// Search order for the key model, relative to the working directory.
pub const DEFAULT_MODEL_PATHS: &[&str] = &[
    "assets/models/key.glb",
    "public/assets/models/key.glb",
    "models/key.glb",
];

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const GLB_SCALE: f64 = 0.1;
const PLACEHOLDER_SCALE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cylinder { height: f64, diameter: f64 },
    Cuboid { width: f64, height: f64, depth: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub name: String,
    pub primitive: Primitive,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub diffuse: [f32; 3],
    pub emissive: [f32; 3],
    pub specular: [f32; 3],
}

impl Material {
    pub fn gold() -> Self {
        Self {
            diffuse: [1.0, 0.8, 0.0],
            emissive: [0.4, 0.3, 0.0],
            specular: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Gltf { path: PathBuf, byte_len: u64 },
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyModel {
    pub source: ModelSource,
    /// Empty for glTF models; the renderer loads the file itself.
    pub parts: Vec<MeshPart>,
    pub material: Material,
    /// Applied by the backend underneath the per-frame distance scale.
    pub base_scale: f64,
}

impl KeyModel {
    /// First loadable candidate, or the placeholder.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for candidate in candidates {
            match Self::from_glb(candidate.as_ref()) {
                Ok(model) => {
                    info!("loaded key model from {}", candidate.as_ref().display());
                    return model;
                }
                Err(e) => debug!("{e}"),
            }
        }
        warn!("no key model found, using placeholder");
        Self::placeholder()
    }

    pub fn load_default() -> Self {
        Self::load(DEFAULT_MODEL_PATHS)
    }

    /// Accepts a binary glTF 2.0 file after checking its header.
    pub fn from_glb(path: &Path) -> Result<Self, TrackerError> {
        let asset_err = |reason: String| TrackerError::Asset(format!("{}: {reason}", path.display()));

        let mut file = File::open(path).map_err(|e| asset_err(e.to_string()))?;
        let byte_len = file.metadata().map_err(|e| asset_err(e.to_string()))?.len();
        let mut header = [0u8; 12];
        file.read_exact(&mut header)
            .map_err(|_| asset_err("shorter than a glTF header".to_string()))?;

        if &header[0..4] != GLB_MAGIC {
            return Err(asset_err("not a binary glTF file".to_string()));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != GLB_VERSION {
            return Err(asset_err(format!("unsupported glTF version {version}")));
        }
        let declared = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as u64;
        if declared > byte_len {
            return Err(asset_err(format!(
                "header declares {declared} bytes, file has {byte_len}"
            )));
        }

        Ok(Self {
            source: ModelSource::Gltf {
                path: path.to_path_buf(),
                byte_len,
            },
            parts: Vec::new(),
            material: Material::gold(),
            base_scale: GLB_SCALE,
        })
    }

    /// Shaft, head and two teeth in gold.
    pub fn placeholder() -> Self {
        let part = |name: &str, primitive: Primitive, position: [f64; 3]| MeshPart {
            name: name.to_string(),
            primitive,
            position,
        };
        Self {
            source: ModelSource::Placeholder,
            parts: vec![
                part(
                    "shaft",
                    Primitive::Cylinder {
                        height: 1.0,
                        diameter: 0.2,
                    },
                    [0.0, -0.5, 0.0],
                ),
                part(
                    "head",
                    Primitive::Cuboid {
                        width: 0.6,
                        height: 0.4,
                        depth: 0.2,
                    },
                    [0.0, 0.2, 0.0],
                ),
                part(
                    "tooth-1",
                    Primitive::Cuboid {
                        width: 0.15,
                        height: 0.25,
                        depth: 0.2,
                    },
                    [-0.2, -1.0, 0.0],
                ),
                part(
                    "tooth-2",
                    Primitive::Cuboid {
                        width: 0.15,
                        height: 0.35,
                        depth: 0.2,
                    },
                    [0.0, -1.0, 0.0],
                ),
            ],
            material: Material::gold(),
            base_scale: PLACEHOLDER_SCALE,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == ModelSource::Placeholder
    }
}
