pub mod fake;

pub use fake::FakeStream;
