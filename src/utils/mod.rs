mod timestamp;
pub use timestamp::*;

mod bin_coder;
pub use bin_coder::*;

mod format;
pub use format::*;
