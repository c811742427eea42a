pub mod snap;
