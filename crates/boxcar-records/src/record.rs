use crate::error::{RecordError, RecordResult};
use serde::{Deserialize, Serialize};

/// Largest image payload accepted, in bytes.
pub const MAX_IMAGE_LEN: u64 = 1 << 30;

/// `height * width * channels`, or `None` when the product does not fit in a `u64`.
#[must_use]
pub fn pixel_count(height: u32, width: u32, channels: u32) -> Option<u64> {
    u64::from(height).checked_mul(u64::from(width))?.checked_mul(u64::from(channels))
}

/// Fixed shape of every image in a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
    /// Labels must fall in `0..num_classes`.
    pub num_classes: u32,
}

impl ImageGeometry {
    /// CIFAR-10: 32x32 RGB, 10 classes.
    pub const CIFAR10: Self = Self { height: 32, width: 32, channels: 3, num_classes: 10 };

    /// Number of pixel bytes in one image. Saturates for a geometry that fails `validate`.
    #[must_use]
    pub fn image_len(&self) -> usize {
        pixel_count(self.height, self.width, self.channels)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX)
    }

    /// Size of one record inside a raw batch file (label byte + pixels).
    #[must_use]
    pub fn batch_record_len(&self) -> usize {
        self.image_len().saturating_add(1)
    }

    /// Reject empty dimensions, zero classes and images larger than `MAX_IMAGE_LEN`.
    pub fn validate(&self) -> RecordResult<()> {
        let invalid = |reason: String| Err(RecordError::InvalidGeometry(reason));
        if self.height == 0 || self.width == 0 || self.channels == 0 {
            return invalid(format!("{}x{}x{} has an empty dimension", self.height, self.width, self.channels));
        }
        if self.num_classes == 0 {
            return invalid("num_classes must be at least 1".to_string());
        }
        match pixel_count(self.height, self.width, self.channels) {
            Some(n) if n <= MAX_IMAGE_LEN => Ok(()),
            _ => invalid(format!(
                "{}x{}x{} exceeds the {MAX_IMAGE_LEN} byte image limit",
                self.height, self.width, self.channels
            )),
        }
    }
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self::CIFAR10
    }
}

/// One labeled image. Pixels are stored channel-major, each plane row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub label: u32,
    pub height: u32,
    pub width: u32,
    pub channels: u32,
    pub image: Vec<u8>,
}

impl Record {
    #[must_use]
    pub fn new(label: u32, geometry: &ImageGeometry, image: Vec<u8>) -> Self {
        Self {
            label,
            height: geometry.height,
            width: geometry.width,
            channels: geometry.channels,
            image,
        }
    }

    /// Byte count implied by the record's dimensions, `None` on overflow.
    #[must_use]
    pub fn declared_len(&self) -> Option<u64> {
        pixel_count(self.height, self.width, self.channels)
    }

    /// Check the payload against the declared dimensions and return its length.
    ///
    /// Failures carry no batch position; see `RecordError::at_position`.
    pub fn validate(&self) -> RecordResult<u64> {
        let invalid = |reason: String| Err(RecordError::InvalidRecord { reason });
        let Some(declared) = self.declared_len() else {
            return invalid(format!("{}x{}x{} overflows", self.height, self.width, self.channels));
        };
        if declared > MAX_IMAGE_LEN {
            return invalid(format!("{declared} byte payload exceeds the {MAX_IMAGE_LEN} byte limit"));
        }
        if self.image.len() as u64 != declared {
            return invalid(format!(
                "payload is {} bytes but {}x{}x{} declares {declared}",
                self.image.len(),
                self.height,
                self.width,
                self.channels
            ));
        }
        Ok(declared)
    }
}
