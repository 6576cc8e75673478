pub mod health;
pub mod provisioners;
