mod disaster;
mod economy;
mod trade;

pub use disaster::{DisasterRecord, DisasterSystem};
pub use economy::EconomySystem;
pub use trade::{Cart, TradeSystem, Transfer};
