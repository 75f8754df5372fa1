//! Exit code constants for the quill binary.
//!
//! - 0: Success (server shut down cleanly)
//! - 1: User error (bad flags, invalid config file)
//! - 2: Server failure (bind or serve error)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or an invalid configuration file.
pub const USER_ERROR: i32 = 1;

/// Server failure: the listener could not be bound or the server crashed.
pub const SERVER_FAILURE: i32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, SERVER_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
