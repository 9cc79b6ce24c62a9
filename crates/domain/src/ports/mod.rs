pub mod dispatch_source;

pub use dispatch_source::DispatchSource;
