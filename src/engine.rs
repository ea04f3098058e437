pub mod host_link;
