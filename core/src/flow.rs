//! Call Flow Controller.
//!
//! Welcome → LanguageMenu → QueryPrompt → Dispatch → Poll(attempt) → Play →
//! (QueryPrompt again) … → Terminated.
//!
//! There is no session object. Each method turns one callback's parameters
//! into the next call-control document, and everything the following request
//! needs is encoded in that document's links. Nothing here waits for
//! synthesis: dispatch hands the job off and the caller's platform does the
//! waiting by following poll redirects.

use crate::artifact::{ArtifactName, ArtifactStore, AudioFormat};
use crate::document::{CallDocument, Gather, GatherInput, Verb};
use crate::job::{JobSink, SynthesisJob};
use crate::language::LanguageMap;
use crate::links::Links;
use crate::poll::{PollDecision, PollPolicy};
use crate::responder::{Responder, NO_INPUT};
use crate::Result;
use tracing::{info, warn};

/// Fixed phrases spoken by the controller
#[derive(Clone, Debug)]
struct Messages {
    no_menu_input: String,
    invalid_selection: String,
    ask_question: String,
    no_speech: String,
    respond_now: String,
    audio_failed: String,
    responder_fallback: String,
    rejected_link: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            no_menu_input: "Sorry, we didn't get any input. Goodbye.".into(),
            invalid_selection: "Invalid selection. Goodbye.".into(),
            ask_question: "Please ask your question now.".into(),
            no_speech: "Sorry, I didn't hear anything. Goodbye.".into(),
            respond_now: "Please respond now.".into(),
            audio_failed:
                "Sorry, I couldn't prepare the audio right now. Please try again later.".into(),
            responder_fallback: "Sorry, I could not find an answer right now. Please ask again."
                .into(),
            rejected_link: "Sorry, this call could not be continued. Goodbye.".into(),
        }
    }
}

pub struct CallFlow {
    languages: LanguageMap,
    links: Links,
    policy: PollPolicy,
    store: ArtifactStore,
    format: AudioFormat,
    messages: Messages,
}

impl CallFlow {
    pub fn new(
        languages: LanguageMap,
        links: Links,
        policy: PollPolicy,
        store: ArtifactStore,
        format: AudioFormat,
    ) -> Self {
        Self {
            languages,
            links,
            policy,
            store,
            format,
            messages: Messages::default(),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    fn default_language(&self) -> &str {
        &self.languages.default_language
    }

    /// Speak a final message and end the call
    pub fn terminate(&self, message: &str) -> CallDocument {
        CallDocument::new()
            .say(message, self.default_language())
            .hangup()
    }

    /// Entry: language menu collecting one digit
    pub fn welcome(&self) -> Result<CallDocument> {
        let lang = self.default_language();
        Ok(CallDocument::new()
            .gather(Gather {
                input: GatherInput::Digits { num_digits: 1 },
                action: self.links.set_language()?,
                method: "POST".into(),
                language: None,
                action_on_empty_result: false,
                prompts: vec![Verb::Say {
                    text: self.languages.menu_prompt(),
                    language: Some(lang.to_string()),
                }],
            })
            .say(&self.messages.no_menu_input, lang)
            .hangup())
    }

    /// Language menu: mapped digit → query prompt, anything else ends the call
    pub fn select_language(&self, digit: Option<&str>) -> Result<CallDocument> {
        match digit.and_then(|d| self.languages.language_for_digit(d)) {
            Some(lang) => {
                info!(target = "callflow", digit = ?digit, language = %lang, "Language selected");
                Ok(CallDocument::new().redirect(self.links.ask_query(lang)?))
            }
            None => {
                info!(target = "callflow", digit = ?digit, "Invalid language selection");
                Ok(self.terminate(&self.messages.invalid_selection))
            }
        }
    }

    fn checked_language<'a>(&'a self, lang: Option<&'a str>, sig: Option<&str>) -> Option<&'a str> {
        let lang = lang.unwrap_or(self.default_language());
        if !self.links.verify_lang(lang, sig) {
            warn!(target = "callflow", language = %lang, "Rejected unsigned or tampered link");
            return None;
        }
        if !self.languages.is_known(lang) {
            warn!(target = "callflow", language = %lang, "Rejected link for unmapped language");
            return None;
        }
        Some(lang)
    }

    /// Query prompt: collect one utterance in the selected language
    pub fn query_prompt(&self, lang: Option<&str>, sig: Option<&str>) -> Result<CallDocument> {
        let Some(lang) = self.checked_language(lang, sig) else {
            return Ok(self.terminate(&self.messages.rejected_link));
        };
        Ok(CallDocument::new()
            .gather(Gather {
                input: GatherInput::Speech,
                action: self.links.process(lang)?,
                method: "POST".into(),
                language: Some(lang.to_string()),
                action_on_empty_result: false,
                prompts: vec![Verb::Say {
                    text: self.messages.ask_question.clone(),
                    language: Some(lang.to_string()),
                }],
            })
            .pause(2)
            .say(&self.messages.no_speech, lang)
            .hangup())
    }

    /// Dispatch: get the reply text, hand synthesis off, start polling at attempt 0
    pub async fn process_turn(
        &self,
        lang: Option<&str>,
        sig: Option<&str>,
        speech: Option<&str>,
        responder: &dyn Responder,
        jobs: &dyn JobSink,
    ) -> Result<CallDocument> {
        let Some(lang) = self.checked_language(lang, sig) else {
            return Ok(self.terminate(&self.messages.rejected_link));
        };
        let text = speech
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_INPUT);
        info!(target = "callflow", language = %lang, user = %text, "Caller turn");

        let artifact = ArtifactName::generate(self.format);
        let reply = match responder.reply(text, lang).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => self.messages.responder_fallback.clone(),
            Err(e) => {
                warn!(target = "callflow", error = %e, "Responder failed; using fallback reply");
                self.messages.responder_fallback.clone()
            }
        };

        let job = SynthesisJob {
            text: reply,
            language: lang.to_string(),
            voice: self.languages.voice_for(lang).to_string(),
            artifact: artifact.clone(),
        };
        if let Err(e) = jobs.dispatch(job) {
            warn!(target = "callflow", file = %artifact, error = %e, "Synthesis job rejected");
            if self.policy.fail_fast {
                if let Err(e) = self.store.mark_failed(&artifact).await {
                    warn!(target = "callflow", file = %artifact, error = %e, "Failed to write failure marker");
                }
            }
        }

        Ok(CallDocument::new()
            .pause(self.policy.initial_pause_secs)
            .redirect(self.links.play(&artifact, lang, 0)?))
    }

    /// Poll: play when ready, otherwise wait one unit and poll again, up to the bound
    pub async fn poll(
        &self,
        file: &str,
        lang: Option<&str>,
        attempt: u32,
        sig: Option<&str>,
    ) -> Result<CallDocument> {
        let lang = lang.unwrap_or(self.default_language());
        if !self.links.verify_poll(file, lang, attempt, sig) {
            warn!(target = "poll", file = %file, attempt, "Rejected unsigned or tampered poll");
            return Ok(self.terminate(&self.messages.rejected_link));
        }
        if !self.languages.is_known(lang) {
            warn!(target = "poll", language = %lang, "Poll for unmapped language");
            return Ok(self.terminate(&self.messages.rejected_link));
        }
        let artifact: ArtifactName = match file.parse() {
            Ok(name) => name,
            Err(e) => {
                warn!(target = "poll", file = %file, error = %e, "Poll for invalid artifact name");
                return Ok(self.terminate(&self.messages.audio_failed));
            }
        };

        let state = self.store.state(&artifact).await;
        match self.policy.decide(state, attempt) {
            PollDecision::Play => {
                info!(target = "poll", file = %artifact, attempt, "Artifact ready");
                self.play(&artifact, lang)
            }
            PollDecision::Retry { next_attempt } => {
                info!(target = "poll", file = %artifact, attempt, "Artifact not ready; retrying");
                Ok(CallDocument::new()
                    .pause(self.policy.delay_secs)
                    .redirect(self.links.play(&artifact, lang, next_attempt)?))
            }
            PollDecision::Failed => {
                warn!(target = "poll", file = %artifact, attempt, "Synthesis failed");
                Ok(self.terminate(&self.messages.audio_failed))
            }
            PollDecision::GiveUp => {
                warn!(
                    target = "poll",
                    file = %artifact,
                    max_attempts = self.policy.max_attempts,
                    "Artifact not ready after max attempts"
                );
                Ok(self.terminate(&self.messages.audio_failed))
            }
        }
    }

    /// Play the reply, then collect the next utterance
    fn play(&self, artifact: &ArtifactName, lang: &str) -> Result<CallDocument> {
        Ok(CallDocument::new()
            .play(self.links.media(artifact)?)
            .gather(Gather {
                input: GatherInput::Speech,
                action: self.links.process(lang)?,
                method: "POST".into(),
                language: Some(self.languages.recognition_language(lang).to_string()),
                action_on_empty_result: true,
                prompts: vec![Verb::Say {
                    text: self.messages.respond_now.clone(),
                    language: Some(self.default_language().to_string()),
                }],
            }))
    }
}
