/// Decode results
pub mod detection;
/// Camera frames
pub mod frame;
/// Points and bounding boxes
pub mod point;
/// Supported symbologies
pub mod symbology;

pub use detection::{Detection, ScanResult};
pub use frame::{Frame, PixelFormat};
pub use point::{Bounds, Point};
pub use symbology::{Symbology, UnknownSymbology};
