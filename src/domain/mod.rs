pub mod battery;
pub mod dispatch;
pub mod error;
pub mod run;
pub mod site;
pub mod tariff;
pub mod timeseries;

pub use battery::*;
pub use dispatch::*;
pub use error::*;
pub use run::*;
pub use site::*;
pub use tariff::*;
pub use timeseries::*;
