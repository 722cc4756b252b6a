pub mod analytics;
pub mod notification;
pub mod policy;
pub mod request;
pub mod resource;
pub mod timestamp;
pub mod user;

pub use notification::{Notification, NotificationKind};
pub use policy::{Policy, PolicyTable};
pub use request::{NewRequest, Priority, Request, RequestStatus, RequestTransition};
pub use resource::{Resource, ResourceStatus};
pub use user::{Role, User};
