//! Shared value and object model: the value universe and its handles,
//! classes with their method tables, comparators, and the output context
//! through which evaluation reaches the outside world.
pub mod class;
pub mod compare;
pub mod context;
pub mod error;
pub mod object;
