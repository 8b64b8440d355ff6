//! The protocol layers above the wire format.
//!
//! Only TCP is terminated here. Everything below it, the IPv4 header included, is handled by the
//! [`wire`](../wire/index.html) module and the device, which hands us whole IP datagrams.
pub mod tcp;
