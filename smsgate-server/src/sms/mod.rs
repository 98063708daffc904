//! SMS surface: inbound and outbound message handling plus STOP tracking.

pub mod inbound;
pub mod outbound;
pub mod stoplist;
