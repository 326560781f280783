pub mod backend;
pub mod poller;
pub mod presenter;
pub mod proxy;
pub mod serialize;
pub mod session;
pub mod types;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;
