//! Phishing triage over fetched messages.
//!
//! The models themselves live outside this crate. A [`Classifier`] turns the
//! text input and the feature row of one message into probabilities, and a
//! [`MailboxMover`] performs the remote actions on messages judged phishy.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PhishError, Result};
use crate::extract::Assembler;
use crate::features::{FeaturePipeline, TextConcat};
use crate::model::fields::EmailFieldSet;
use crate::model::message::RawMessage;
use crate::parser::decode_mime_words;

/// Default probability at or above which a message is treated as phishy.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Mailbox scanned when none is configured.
pub const DEFAULT_MAILBOX: &str = "INBOX";

static UID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+ \(UID (?P<uid>\d+)\)").expect("valid UID regex")
});

/// External model producing phishing probabilities.
pub trait Classifier {
    /// Probability from the sequence model for the concatenated text input.
    fn text_probability(&self, text: &str) -> Result<f64>;

    /// Probability from the feature model for one feature row.
    fn feature_probability(&self, features: &[f64]) -> Result<f64>;
}

/// Remote mailbox operations used to move a phishy message away.
pub trait MailboxMover {
    fn copy(&mut self, uid: &str, destination: &str) -> Result<()>;
    fn flag_deleted(&mut self, uid: &str) -> Result<()>;
    fn expunge(&mut self) -> Result<()>;
}

/// A message as fetched from a remote mailbox.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub uid: String,
    pub mailbox: String,
    pub message: RawMessage,
}

impl FetchedMessage {
    /// Build from the fetch response line (`"<seq> (UID <uid>)"`) and the raw
    /// RFC 822 bytes.
    pub fn from_fetch(response: &str, mailbox: impl Into<String>, raw: &[u8]) -> Self {
        Self {
            uid: parse_uid(response),
            mailbox: mailbox.into(),
            message: crate::parser::parse_raw_message(raw),
        }
    }
}

/// Outcome of the relocation attempt for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum Relocation {
    /// Below the threshold, left in place.
    Kept,
    Moved(String),
    Failed(String),
}

/// Classification result for one message.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub uid: String,
    pub mailbox: String,
    /// Decoded subject, or `"No subject"`.
    pub subject: String,
    pub from: String,
    pub probability: f64,
    pub is_phishy: bool,
    pub relocation: Relocation,
}

/// Extract the UID from a fetch response line. Returns an empty string when
/// the line has no UID.
pub fn parse_uid(response: &str) -> String {
    UID_REGEX
        .captures(response)
        .and_then(|caps| caps.name("uid"))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Mean of the available probabilities. `None` only when both are missing.
pub fn combine_probabilities(text: Option<f64>, features: Option<f64>) -> Option<f64> {
    match (text, features) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(p), None) | (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

/// Decides which messages are phishy and moves them to the spam mailbox.
#[derive(Debug, Clone)]
pub struct Triage {
    assembler: Assembler,
    text: TextConcat,
    features: FeaturePipeline,
    threshold: f64,
    spam_box: String,
    mailboxes: Vec<String>,
}

impl Triage {
    pub fn new(
        text: TextConcat,
        features: FeaturePipeline,
        threshold: f64,
        spam_box: impl Into<String>,
    ) -> Self {
        Self {
            assembler: Assembler::new(),
            text,
            features,
            threshold,
            spam_box: spam_box.into(),
            mailboxes: vec![DEFAULT_MAILBOX.to_string()],
        }
    }

    /// Mailboxes the caller fetches unseen messages from.
    pub fn with_mailboxes(mut self, mailboxes: Vec<String>) -> Self {
        self.mailboxes = mailboxes;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn spam_box(&self) -> &str {
        &self.spam_box
    }

    pub fn mailboxes(&self) -> &[String] {
        &self.mailboxes
    }

    /// Classify every message of the batch and relocate the phishy ones.
    ///
    /// Classifier errors abort the batch. Relocation errors are recorded in
    /// the message's verdict and processing continues.
    pub fn run<C, M>(
        &self,
        classifier: &C,
        mover: &mut M,
        messages: &[FetchedMessage],
    ) -> Result<Vec<Verdict>>
    where
        C: Classifier,
        M: MailboxMover,
    {
        let raw: Vec<RawMessage> = messages.iter().map(|m| m.message.clone()).collect();
        let fields = self.assembler.assemble_batch(&raw);
        let probabilities = self.predict(classifier, &fields)?;

        let mut verdicts = Vec::with_capacity(messages.len());
        for ((fetched, fields), probability) in messages.iter().zip(&fields).zip(probabilities) {
            let is_phishy = probability >= self.threshold;
            let relocation = if is_phishy {
                match self.relocate(mover, &fetched.uid) {
                    Ok(()) => Relocation::Moved(self.spam_box.clone()),
                    Err(e) => {
                        warn!(uid = %fetched.uid, error = %e, "Relocation failed");
                        Relocation::Failed(e.to_string())
                    }
                }
            } else {
                Relocation::Kept
            };

            verdicts.push(Verdict {
                uid: fetched.uid.clone(),
                mailbox: fetched.mailbox.clone(),
                subject: display_subject(&fields.subject),
                from: fields.from.clone(),
                probability,
                is_phishy,
                relocation,
            });
        }

        info!(
            messages = verdicts.len(),
            phishy = verdicts.iter().filter(|v| v.is_phishy).count(),
            "Triage complete"
        );
        Ok(verdicts)
    }

    /// One fused probability per field-set.
    pub fn predict<C: Classifier>(
        &self,
        classifier: &C,
        fields: &[EmailFieldSet],
    ) -> Result<Vec<f64>> {
        let texts = self.text.transform_batch(fields)?;
        let matrix = self.features.fit_transform(fields)?;

        fields
            .iter()
            .zip(&texts)
            .zip(&matrix.rows)
            .map(|((f, text), row)| {
                let text_proba = if f.subject.is_empty() && f.extracted_text.is_empty() {
                    debug!("No text input, skipping sequence model");
                    None
                } else {
                    Some(classifier.text_probability(text)?)
                };
                let feature_proba = classifier.feature_probability(row)?;
                Ok(combine_probabilities(text_proba, Some(feature_proba))
                    .unwrap_or(feature_proba))
            })
            .collect()
    }

    fn relocate<M: MailboxMover>(&self, mover: &mut M, uid: &str) -> Result<()> {
        let wrap = |e: PhishError| match e {
            PhishError::Relocation { .. } => e,
            other => PhishError::Relocation {
                uid: uid.to_string(),
                destination: self.spam_box.clone(),
                reason: other.to_string(),
            },
        };
        mover.copy(uid, &self.spam_box).map_err(wrap)?;
        mover.flag_deleted(uid).map_err(wrap)?;
        mover.expunge().map_err(wrap)
    }
}

fn display_subject(subject: &str) -> String {
    if subject.is_empty() {
        "No subject".to_string()
    } else {
        decode_mime_words(subject)
    }
}
