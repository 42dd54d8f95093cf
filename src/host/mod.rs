pub mod capabilities;
pub mod events;
pub mod local;

pub use capabilities::{
    ScriptInjector, SurfaceHandle, SurfaceLauncher, TabDirectory, TabHandle, TabId,
};
pub use events::HostEvent;
pub use local::{ExtensionHost, HostOptions, HostServices, PageHandle, SurfaceSupport};
