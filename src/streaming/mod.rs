//! Consumption of SSE-style streaming text responses.

mod consumer;

pub use consumer::{
    ExtractContentFn, StreamCallbacks, StreamOutcome, StreamRequest,
};

pub(crate) use consumer::execute_stream;
