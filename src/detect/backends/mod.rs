pub mod hog;

pub use hog::HogSvmClassifier;
