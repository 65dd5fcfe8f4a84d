// Interface adapters: wire protocol and network handling.

pub mod http;
pub mod ids;
pub mod net;
pub mod protocol;
pub mod state;
