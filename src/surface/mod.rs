pub mod controller;
pub mod selection;
pub mod state;

pub use controller::{ResultSurface, SurfaceView};
pub use selection::{classify_address, selection_from_active_tab, AddressClass, RESTRICTED_SCHEMES};
pub use state::{SurfaceState, SurfaceStatus};
