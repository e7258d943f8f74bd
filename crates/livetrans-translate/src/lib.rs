pub mod echo;
pub mod mymemory;
pub mod reliable;

pub mod mock;

pub use echo::EchoTranslator;
pub use mock::{MockReply, MockTranslator};
pub use mymemory::{MyMemoryConfig, MyMemoryTranslator};
pub use reliable::{ReliableConfig, ReliableTranslator};
