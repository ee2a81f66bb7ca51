//! Feed inventory domain

mod entity;

pub use entity::{
    validate_cost, validate_non_negative, validate_quantity, FeedId, FeedItem, FeedKind,
    FeedMovement, FeedMovementId, MovementKind,
};
