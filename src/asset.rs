//! Overlay assets, loaded once per view and shared read-only across frames.

use crate::{config::AssetConfig, utils::image_conversion::to_bgra, Error, Result};
use nalgebra::Vector3;
use opencv::{core::Mat, imgcodecs, prelude::*};
use std::collections::HashMap;
use std::path::Path;

/// Store key of the 2D eyewear image
pub const EYEWEAR_IMAGE: &str = "eyewear";
/// Store key of the 2D garment image
pub const GARMENT_IMAGE: &str = "garment";
/// Store key of the 3D eyewear model
pub const EYEWEAR_MODEL: &str = "eyewear_model";
/// Store key of the 3D garment model
pub const GARMENT_MODEL: &str = "garment_model";

/// A decoded image with alpha, in BGRA
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub pixels: Mat,
    pub width: i32,
    pub height: i32,
}

impl ImageAsset {
    /// Decode an image file, keeping its alpha channel
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::AssetError(format!("Non UTF-8 asset path: {}", path.display())))?;

        let image = imgcodecs::imread(path_str, imgcodecs::IMREAD_UNCHANGED)?;
        if image.empty() {
            return Err(Error::AssetError(format!("Failed to load image: {path_str}")));
        }
        Self::from_mat(&image)
    }

    /// Wrap an in-memory image
    ///
    /// # Errors
    ///
    /// Returns an error if the image is empty or has an unsupported format
    pub fn from_mat(image: &Mat) -> Result<Self> {
        if image.empty() {
            return Err(Error::AssetError("Empty image".to_string()));
        }
        let pixels = to_bgra(image)?;
        Ok(Self {
            width: pixels.cols(),
            height: pixels.rows(),
            pixels,
        })
    }

    /// Intrinsic size `(width, height)` in pixels
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn natural_size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// A model rendered as a textured billboard sized by its bounding box
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub texture: ImageAsset,
    pub extent: Vector3<f32>,
}

impl ModelAsset {
    /// # Errors
    ///
    /// Returns an error if the extent has no positive width and height
    pub fn new(texture: ImageAsset, extent: Vector3<f32>) -> Result<Self> {
        if !(extent.x > 0.0 && extent.y > 0.0) {
            return Err(Error::AssetError(format!(
                "Model extent must be positive, got {:?}",
                extent.as_slice()
            )));
        }
        Ok(Self { texture, extent })
    }

    /// Width over height of the bounding box
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.extent.x / self.extent.y
    }
}

#[derive(Debug, Clone)]
pub enum OverlayAsset {
    Image(ImageAsset),
    Model(ModelAsset),
}

/// Assets by key
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    assets: HashMap<String, OverlayAsset>,
}

impl AssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured asset
    ///
    /// An asset that fails to load is logged and left out; overlays that need
    /// it stay idle.
    #[must_use]
    pub fn load_from_config(config: &AssetConfig) -> Self {
        let mut store = Self::new();

        for (key, path) in [(EYEWEAR_IMAGE, &config.eyewear_image), (GARMENT_IMAGE, &config.garment_image)] {
            match ImageAsset::load(path) {
                Ok(image) => store.insert(key, OverlayAsset::Image(image)),
                Err(e) => log::error!("Failed to load asset '{key}' from {}: {e}", path.display()),
            }
        }

        for (key, path, extent) in [
            (EYEWEAR_MODEL, &config.eyewear_model, config.eyewear_model_extent),
            (GARMENT_MODEL, &config.garment_model, config.garment_model_extent),
        ] {
            let model = ImageAsset::load(path).and_then(|texture| ModelAsset::new(texture, Vector3::from(extent)));
            match model {
                Ok(model) => store.insert(key, OverlayAsset::Model(model)),
                Err(e) => log::error!("Failed to load model '{key}' from {}: {e}", path.display()),
            }
        }

        log::info!("Loaded {} overlay assets", store.len());
        store
    }

    pub fn insert(&mut self, key: &str, asset: OverlayAsset) {
        self.assets.insert(key.to_string(), asset);
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.assets.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OverlayAsset> {
        self.assets.get(key)
    }

    /// Image asset by key; `None` if missing or not an image
    #[must_use]
    pub fn image(&self, key: &str) -> Option<&ImageAsset> {
        match self.assets.get(key)? {
            OverlayAsset::Image(image) => Some(image),
            OverlayAsset::Model(_) => None,
        }
    }

    /// Model asset by key; `None` if missing or not a model
    #[must_use]
    pub fn model(&self, key: &str) -> Option<&ModelAsset> {
        match self.assets.get(key)? {
            OverlayAsset::Model(model) => Some(model),
            OverlayAsset::Image(_) => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
