//! MOTD accumulation
//!
//! The server streams the message of the day in chunks that may break
//! anywhere. Complete lines are released as soon as their newline arrives.

#[derive(Debug, Default)]
pub struct MotdBuffer {
    text: String,
}

impl MotdBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unescaped chunk and return the non-empty lines it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.text.push_str(chunk);

        let Some(last_newline) = self.text.rfind('\n') else {
            return Vec::new();
        };

        let lines = self.text[..last_newline]
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        self.text.drain(..=last_newline);
        lines
    }

    pub fn pending(&self) -> &str {
        &self.text
    }

    pub fn reset(&mut self) {
        self.text.clear();
    }
}
