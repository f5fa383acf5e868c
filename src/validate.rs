//! Input validation for the birth-data intake prompts.

use chrono::{NaiveDate, NaiveTime};

use crate::agent::{AgentError, AgentResult};
use crate::transport::Transport;

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%I:%M %p";

/// Sent once per rejected reply before asking again.
pub const RETRY_MESSAGE: &str = "Invalid input. Please try again.";

/// Day-first calendar date. chrono accepts unpadded day and month here,
/// so "1/4/1998" passes along with "01/04/1998".
pub fn validate_date(input: &str) -> bool {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).is_ok()
}

/// 12-hour clock time with an AM/PM marker, any case.
pub fn validate_time(input: &str) -> bool {
    NaiveTime::parse_from_str(&input.trim().to_uppercase(), TIME_FORMAT).is_ok()
}

pub fn validate_place(input: &str) -> bool {
    !input.trim().is_empty()
}

/// Ask until the validator accepts a reply.
///
/// `max_attempts: None` retries forever; `Some(n)` gives up with a
/// validation error after n rejected replies. Never returns a value the
/// validator rejected.
pub async fn validate_input(
    transport: &dyn Transport,
    prompt: &str,
    is_valid: impl Fn(&str) -> bool,
    max_attempts: Option<usize>,
) -> AgentResult<String> {
    let mut rejected = 0usize;
    loop {
        let reply = transport
            .ask_user(prompt)
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        if is_valid(&reply) {
            return Ok(reply.trim().to_string());
        }

        rejected += 1;
        if let Some(limit) = max_attempts {
            if rejected >= limit {
                return Err(AgentError::Validation(format!(
                    "no valid reply after {} attempts",
                    limit
                )));
            }
        }

        transport
            .send_message(None, RETRY_MESSAGE)
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    use crate::persona::Persona;
    use crate::transport::MessageStream;

    struct ScriptedTransport {
        replies: Mutex<VecDeque<String>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn register_persona(&self, _persona: &Persona) -> Result<()> {
            Ok(())
        }

        async fn send_message(&self, _author: Option<&str>, content: &str) -> Result<()> {
            self.sent.lock().await.push(content.to_string());
            Ok(())
        }

        async fn open_stream(&self, _author: &str) -> Result<Box<dyn MessageStream>> {
            anyhow::bail!("no streaming in this test")
        }

        async fn ask_user(&self, _question: &str) -> Result<String> {
            self.replies
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    #[test]
    fn date_acceptance_table() {
        assert!(validate_date("12/04/1998"));
        assert!(validate_date("1/4/1998"));
        assert!(validate_date(" 12/04/1998 "));
        assert!(!validate_date("1998-04-12"));
        assert!(!validate_date("12-04-1998"));
        assert!(!validate_date("31/02/2000"));
        assert!(!validate_date("99/99/9999"));
        assert!(!validate_date(""));
    }

    #[test]
    fn time_acceptance_table() {
        assert!(validate_time("08:20 AM"));
        assert!(validate_time("8:20 pm"));
        assert!(validate_time("12:00 AM"));
        assert!(!validate_time("25:00"));
        assert!(!validate_time("08:20"));
        assert!(!validate_time("late morning"));
        assert!(!validate_time(""));
    }

    #[test]
    fn place_acceptance_table() {
        assert!(validate_place("Simferopol"));
        assert!(validate_place("Paris, France"));
        assert!(!validate_place(""));
        assert!(!validate_place("   "));
    }

    #[tokio::test]
    async fn retries_until_a_valid_reply_arrives() {
        let transport = ScriptedTransport::new(vec!["1998-04-12", "bogus", "12/04/1998"]);

        let value = validate_input(&transport, "What's your birth date?", validate_date, None)
            .await
            .unwrap();

        assert_eq!(value, "12/04/1998");
        let sent = transport.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m == RETRY_MESSAGE));
    }

    #[tokio::test]
    async fn bounded_retries_give_up_with_a_validation_error() {
        let transport = ScriptedTransport::new(vec!["nope", "still nope", "12/04/1998"]);

        let err = validate_input(&transport, "prompt", validate_date, Some(2))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Validation(_)));
        // The second rejection ends the loop before a third ask.
        assert_eq!(transport.replies.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn accepted_reply_is_trimmed() {
        let transport = ScriptedTransport::new(vec!["  Simferopol  "]);

        let value = validate_input(&transport, "Where were you born?", validate_place, None)
            .await
            .unwrap();

        assert_eq!(value, "Simferopol");
    }
}
