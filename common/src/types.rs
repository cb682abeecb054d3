// Core type definitions shared across the ladder crate

pub type OrderId = u64;

/// Represents the side of an order (buy or sell)
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy = 1,
    Sell = -1,
}
