pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

pub mod session {
    pub const FILE_NAME: &str = "session.json";
}

pub mod notifications {
    use std::time::Duration;

    pub const ERROR_DURATION: Duration = Duration::from_millis(5000);

    pub const SUCCESS_DURATION: Duration = Duration::from_millis(3000);

    pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again.";
}

pub mod tokens {
    /// Rough average for English text under BPE tokenizers.
    pub const CHARS_PER_TOKEN: usize = 4;
}

pub mod limits {
    pub const MAX_TITLE_CHARS: usize = 200;

    pub const PREVIEW_CHARS: usize = 60;
}
