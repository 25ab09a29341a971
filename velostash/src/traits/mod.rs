mod clock;
mod notifier;
mod quota;
mod store;

pub use clock::*;
pub use notifier::*;
pub use quota::*;
pub use store::*;
