pub use self::codec::Http1Codec;
pub(crate) use self::decode::Decoder;
pub(crate) use self::io::{Buffered, MemRead};

mod codec;
mod decode;
mod io;
mod role;
