//! Terminal confirmation for destructive commands.

use std::cell::Cell;

use dialoguer::Confirm;
use vision_flow_history::Confirmer;

/// Confirms through an interactive terminal prompt.
///
/// A prompt that cannot be shown (no terminal, closed input) counts as a
/// refusal and is recorded so the caller can report it.
#[derive(Debug, Default)]
pub struct PromptConfirmer {
    failed: Cell<bool>,
}

impl PromptConfirmer {
    /// Creates a confirmer with no recorded failure.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once a prompt failed to read an answer.
    pub fn failed(&self) -> bool {
        self.failed.get()
    }

    fn settle(&self, answer: Result<bool, dialoguer::Error>) -> bool {
        match answer {
            Ok(accepted) => accepted,
            Err(error) => {
                log::warn!("stage=cli action=confirm_failed error={error}");
                self.failed.set(true);
                false
            }
        }
    }
}

impl Confirmer for PromptConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        self.settle(
            Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact(),
        )
    }
}

/// Accepts every prompt; used with `--yes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_prompt_refuses_and_is_recorded() {
        let confirmer = PromptConfirmer::new();
        let answer = Err(dialoguer::Error::IO(std::io::Error::other("not a terminal")));

        assert!(!confirmer.settle(answer));
        assert!(confirmer.failed());
    }

    #[test]
    fn explicit_answers_pass_through() {
        let confirmer = PromptConfirmer::new();

        assert!(confirmer.settle(Ok(true)));
        assert!(!confirmer.settle(Ok(false)));
        assert!(!confirmer.failed());
    }
}
