pub mod delivery;
pub mod headless;
pub mod protocol;
pub mod traits;

pub use delivery::{Deliverer, DeliveryPolicy};
pub use headless::HeadlessHost;
pub use protocol::{ControllerRequest, MessageResponse, PageRequest, TabId};
pub use traits::{PageTransport, TabDirectory, TabInfo};
