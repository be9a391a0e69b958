//! Format strategy implementations.

pub(crate) mod common;
mod dataloop;
mod google_cloud;
mod labelbox;
mod supervisely;
mod vgg;
mod voc;
mod vott;
mod yolo;

#[cfg(test)]
mod tests;

pub use dataloop::DataloopFormat;
pub use google_cloud::GoogleCloudFormat;
pub use labelbox::LabelboxFormat;
pub use supervisely::SuperviselyFormat;
pub use vgg::VggFormat;
pub use voc::VocFormat;
pub use vott::VottFormat;
pub use yolo::YoloFormat;
