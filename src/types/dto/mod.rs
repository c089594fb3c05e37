pub mod google;
pub mod search;
