////////////////////////////////////////////// ParseOptions ////////////////////////////////////////

/// Limits applied while parsing untrusted input.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "command_line", derive(arrrg_derive::CommandLine))]
pub struct ParseOptions {
    /// The deepest nesting of messages and groups a parse will follow.
    #[cfg_attr(
        feature = "command_line",
        arrrg(optional, "Deepest nesting of messages and groups to parse.")
    )]
    pub recursion_limit: usize,
    /// The largest input, in bytes, a parse will accept.
    #[cfg_attr(
        feature = "command_line",
        arrrg(optional, "Largest message, in bytes, to parse.")
    )]
    pub max_message_size: usize,
}

impl ParseOptions {
    pub fn recursion_limit(mut self, recursion_limit: usize) -> Self {
        self.recursion_limit = recursion_limit;
        self
    }

    pub fn max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
            max_message_size: 64 << 20,
        }
    }
}
