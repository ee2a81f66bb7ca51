//! Notification domain: delivery of alerts through channels

mod channel;
mod entity;

pub use channel::NotificationChannel;
#[cfg(test)]
pub use channel::MockNotificationChannel;
pub use entity::{
    Notification, NotificationId, NotificationQuery, NotificationStatus, RetryPolicy,
};
