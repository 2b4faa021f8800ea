pub mod client;
pub mod error;
pub mod server;
pub mod wire;

pub use client::RpcClient;
pub use error::{GridError, Result};
pub use server::{RpcHandler, RpcServer};
pub use wire::{encode_frame, read_frame, write_frame, Request, Response, MAX_MESSAGE_SIZE};
