//! Testing utilities and fixtures for Fabric-RS

pub mod builder;
pub mod components;
pub mod delegate;
pub mod runtime;

pub use builder::Element;
pub use components::{
    component_registry, image_descriptor, view_descriptor, ImageProps, ImageState, ViewProps,
    IMAGE_COMPONENT_NAME, VIEW_COMPONENT_NAME,
};
pub use delegate::RecordingSchedulerDelegate;
pub use runtime::{
    FunctionCall, ImmediateRuntimeExecutor, ManualBeats, ManualEventBeat, RecordingScriptRuntime,
};

pub mod prelude {
    pub use crate::builder::*;
    pub use crate::components::*;
    pub use crate::delegate::*;
    pub use crate::runtime::*;
    pub use crate::init_logging;
}

/// Routes `log` output through the test harness. Safe to call from every
/// test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
