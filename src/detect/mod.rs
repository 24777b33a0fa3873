mod adjust;
mod backend;
pub mod backends;
mod grouping;
mod mode;
mod model;
mod multiscale;
mod params;
mod pyramid;
mod result;

pub use adjust::adjust_box;
pub use backend::{ScanParams, WindowClassifier, WindowHit};
pub use backends::HogSvmClassifier;
pub use grouping::{group_meanshift, group_rectangles};
pub use mode::{DetectorMode, ModeSelector};
pub use model::{DetectorModel, HogLayout};
pub use multiscale::MultiScaleDetector;
pub use params::{DetectionParams, GroupingPolicy, GROUP_EPS, MAX_PYRAMID_LEVELS};
pub use pyramid::{level_scales, level_size, scale_image};
pub use result::{Detection, DetectionBox};
