pub mod err;
pub mod net;
pub mod read;
pub mod write;

pub use net::Transport;
pub use read::BuffReader;
pub use write::BuffWriter;
