//! Balance control
//!
//! - **angle**: arm heading and the two-branch error wrap
//! - **balance**: PD controller carrying the previous error between ticks
//! - **gains**: fixed and slider-backed gain providers

pub mod angle;
pub mod balance;
pub mod gains;

pub use angle::{heading_angle, wrap_error};
pub use balance::{BalanceController, Centering, ControlOutput};
pub use gains::{FixedGains, GainProvider, GainSlider, SliderGains};
