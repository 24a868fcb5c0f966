pub mod f32;
pub mod io;
pub mod resize;

pub use self::f32::ImageF32;
pub use self::resize::resize_bicubic;
