pub mod alerts;
pub mod analysis;
pub mod payout;
pub mod risk;
pub mod sweeper;
pub mod wxm;
