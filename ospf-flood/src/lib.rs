pub mod ospf;

pub mod sim;
