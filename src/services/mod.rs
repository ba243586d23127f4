pub mod badges;
pub mod notifications;
pub mod tickets;
