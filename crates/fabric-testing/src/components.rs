//! Sample components: a flattenable `View` and an `Image` carrying state.

use std::any::Any;
use std::sync::Arc;

use fabric_core::{
    props_as, BaseProps, ComponentDescriptor, ComponentDescriptorRegistry,
    ConcreteComponentDescriptor, ConcreteProps, Props, RawProps, SharedProps, State,
};

pub const VIEW_COMPONENT_NAME: &str = "View";
pub const IMAGE_COMPONENT_NAME: &str = "Image";

/// Props of a `View`. A view without visible or identifying props is
/// flattened out of the mounted hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ViewProps {
    base: BaseProps,
    pub background_color: String,
}

impl ViewProps {
    fn has_background(&self) -> bool {
        !self.background_color.is_empty() && self.background_color != "transparent"
    }
}

impl Props for ViewProps {
    fn base(&self) -> &BaseProps {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn forms_view(&self) -> bool {
        self.base.forms_view() || self.has_background()
    }

    fn forms_stacking_context(&self) -> bool {
        self.base.forms_stacking_context()
    }
}

impl ConcreteProps for ViewProps {
    fn from_raw(source: &Self, raw: &RawProps) -> Self {
        Self {
            base: BaseProps::from_raw(&source.base, raw),
            background_color: raw.string_or("backgroundColor", &source.background_color),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageProps {
    base: BaseProps,
    pub source: String,
    pub blur_radius: f32,
}

impl Props for ImageProps {
    fn base(&self) -> &BaseProps {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ConcreteProps for ImageProps {
    fn from_raw(source: &Self, raw: &RawProps) -> Self {
        Self {
            base: BaseProps::from_raw(&source.base, raw),
            source: raw.string_or("source", &source.source),
            blur_radius: raw.f32_or("blurRadius", source.blur_radius),
        }
    }
}

/// What the platform reports back about a loaded image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageState {
    pub source: String,
    pub loaded: bool,
    pub width: f32,
    pub height: f32,
}

impl ImageState {
    fn from_props(props: &SharedProps) -> Self {
        Self {
            source: props_as::<ImageProps>(props)
                .map(|props| props.source.clone())
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn loaded(&self, width: f32, height: f32) -> Self {
        Self {
            source: self.source.clone(),
            loaded: true,
            width,
            height,
        }
    }
}

pub fn view_descriptor() -> Arc<dyn ComponentDescriptor> {
    Arc::new(ConcreteComponentDescriptor::<ViewProps>::new(VIEW_COMPONENT_NAME))
}

pub fn image_descriptor() -> Arc<dyn ComponentDescriptor> {
    Arc::new(
        ConcreteComponentDescriptor::<ImageProps>::new(IMAGE_COMPONENT_NAME)
            .with_initial_state(|props, family| State::new(ImageState::from_props(props), family)),
    )
}

/// Registry knowing `RootView`, `View` and `Image`.
pub fn component_registry() -> Arc<ComponentDescriptorRegistry> {
    let registry = ComponentDescriptorRegistry::new();
    registry.add(view_descriptor());
    registry.add(image_descriptor());
    Arc::new(registry)
}
