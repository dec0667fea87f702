// Exit codes for scripted callers
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
/// Neither split mode can tile the convolution on this platform.
pub const EXIT_INFEASIBLE: i32 = 2;
