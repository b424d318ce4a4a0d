/// User accounts and account deletion
pub mod account;
/// Cart mutations and the checkout snapshot
pub mod cart;
/// Product creation, lookup and seeding
pub mod catalog;
/// The checkout unit of work
pub mod checkout;
/// Order history reconstruction and admin listing
pub mod history;
/// License key generation and issuance
pub mod license;
