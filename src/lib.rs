pub mod config;
pub mod controller;
pub mod error;
pub mod pane;
pub mod widget;

pub use config::PaneConfig;
pub use controller::{ActionRequest, PaneAction, PaneController, PaneEvent};
pub use error::PaneError;
pub use pane::{Orientation, PaneId, PaneLayoutState, PaneTree};
pub use widget::{Readiness, WidgetFactory, WidgetRegistry};
