//! A `SessionDriver` that replays a fixed list of user intents.

use std::collections::VecDeque;

use attestor_contracts::error::AttestError;
use attestor_core::{AttestationSession, GateIntent, SessionDriver};

/// Plays a user at the attestation screen.
///
/// Intents are consumed in order. When the script runs out the user walks
/// away: the driver asks to cancel and confirms, so a gate can never spin
/// forever on an exhausted script.
pub struct ScriptedDriver {
    intents: VecDeque<GateIntent>,
    confirmations: VecDeque<bool>,
    /// Every notification the gate surfaced, as displayed.
    pub notices: Vec<String>,
    /// Every prompt shown for abandonment.
    pub prompts: Vec<String>,
    echo: bool,
}

impl ScriptedDriver {
    pub fn new(intents: impl IntoIterator<Item = GateIntent>) -> Self {
        Self {
            intents: intents.into_iter().collect(),
            confirmations: VecDeque::new(),
            notices: Vec::new(),
            prompts: Vec::new(),
            echo: false,
        }
    }

    /// Answers to the cancel prompt, in order. Missing answers confirm.
    pub fn with_confirmations(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirmations = answers.into_iter().collect();
        self
    }

    /// Print each intent, notice and prompt as it happens.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }
}

impl SessionDriver for ScriptedDriver {
    fn next_intent(&mut self, session: &AttestationSession) -> GateIntent {
        let intent = self.intents.pop_front().unwrap_or(GateIntent::Cancel);
        if self.echo {
            println!("    [{}] user: {:?}", session.state().name(), intent);
        }
        intent
    }

    fn notify(&mut self, error: &AttestError) {
        if self.echo {
            println!("    notice: {}", error);
        }
        self.notices.push(error.to_string());
    }

    fn confirm_abandon(&mut self, prompt: &str) -> bool {
        let answer = self.confirmations.pop_front().unwrap_or(true);
        if self.echo {
            println!("    prompt: \"{}\" -> {}", prompt, if answer { "yes" } else { "no" });
        }
        self.prompts.push(prompt.to_string());
        answer
    }
}
