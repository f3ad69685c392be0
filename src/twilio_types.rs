use crate::types::{NextStep, Reply};

pub const VOICE_PATH: &str = "/twilio/voice";
pub const SPEECH_LANGUAGE: &str = "en-US";

pub fn wrap_twiml(twiml: String) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{twiml}")
}

/// Answers to prompt `seq` post back here.
pub fn voice_action(seq: u32) -> String {
    format!("{VOICE_PATH}?seq={seq}")
}

/// Render a call-flow reply.  A gather that hears nothing falls through to the redirect, which
/// posts the same sequence number back without a `SpeechResult`.
pub fn render_reply(reply: &Reply) -> String {
    let say = SayAction {
        text: reply.say.clone(),
        language: Some(SPEECH_LANGUAGE.to_string()),
        ..Default::default()
    };
    let actions = match reply.next {
        NextStep::Gather { seq } => vec![
            ResponseAction::Gather(GatherAction {
                input: "speech".to_string(),
                action: voice_action(seq),
                method: Some("POST".to_string()),
                speech_timeout: Some("auto".to_string()),
                timeout: Some(6),
                language: Some(SPEECH_LANGUAGE.to_string()),
                prompts: vec![say],
            }),
            ResponseAction::Redirect(RedirectAction {
                url: voice_action(seq),
                method: Some("POST".to_string()),
            }),
        ],
        // The call ends when the document runs out.
        NextStep::Hangup => vec![ResponseAction::Say(say)],
    };
    wrap_twiml(xmlserde::xml_serialize(Response { actions }))
}

mod twiml {
    use xmlserde_derives::XmlSerialize;

    #[derive(PartialEq, Eq, XmlSerialize)]
    #[xmlserde(root = b"Response")]
    pub struct Response {
        #[xmlserde(ty = "untag")]
        pub actions: Vec<ResponseAction>,
    }

    #[derive(PartialEq, Eq, XmlSerialize)]
    pub enum ResponseAction {
        #[xmlserde(name = b"Say")]
        Say(SayAction),
        #[xmlserde(name = b"Gather")]
        Gather(GatherAction),
        #[xmlserde(name = b"Redirect")]
        Redirect(RedirectAction),
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct SayAction {
        #[xmlserde(ty = "text")]
        pub text: String,
        #[xmlserde(name = b"voice", ty = "attr")]
        pub voice: Option<String>,
        #[xmlserde(name = b"loop", ty = "attr")]
        pub lp: Option<u16>,
        #[xmlserde(name = b"language", ty = "attr")]
        pub language: Option<String>,
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct GatherAction {
        #[xmlserde(name = b"input", ty = "attr")]
        pub input: String,
        #[xmlserde(name = b"action", ty = "attr")]
        pub action: String,
        #[xmlserde(name = b"method", ty = "attr")]
        pub method: Option<String>,
        #[xmlserde(name = b"speechTimeout", ty = "attr")]
        pub speech_timeout: Option<String>,
        #[xmlserde(name = b"timeout", ty = "attr")]
        pub timeout: Option<u16>,
        #[xmlserde(name = b"language", ty = "attr")]
        pub language: Option<String>,
        #[xmlserde(name = b"Say", ty = "child")]
        pub prompts: Vec<SayAction>,
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct RedirectAction {
        #[xmlserde(ty = "text")]
        pub url: String,
        #[xmlserde(name = b"method", ty = "attr")]
        pub method: Option<String>,
    }
}
pub use twiml::*;

mod webhook {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "kebab-case")]
    pub enum CallStatus {
        Queued,
        Ringing,
        InProgress,
        Completed,
        Busy,
        Failed,
        NoAnswer,
        Canceled,
    }

    impl CallStatus {
        /// The call is over from the caller's side.
        pub fn is_finished(self) -> bool {
            matches!(
                self,
                CallStatus::Completed
                    | CallStatus::Busy
                    | CallStatus::Failed
                    | CallStatus::NoAnswer
                    | CallStatus::Canceled
            )
        }
    }

    /// Form body of the voice webhook, both on call start and on every gather result.
    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct TwilioVoicePayload {
        pub call_sid: String,
        pub from: Option<String>,
        pub to: Option<String>,
        pub call_status: Option<CallStatus>,
        pub speech_result: Option<String>,
        pub confidence: Option<f32>,
    }

    /// Form body of the call status callback.
    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct TwilioStatusPayload {
        pub call_sid: String,
        pub call_status: CallStatus,
    }
}
pub use webhook::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallState, TurnOutcome};

    #[test]
    fn gather_reply_posts_back_its_sequence() {
        let reply = Reply {
            say: "May I have your full name, please?".to_string(),
            next: NextStep::Gather { seq: 1 },
            state: Some(CallState::CollectName),
            outcome: TurnOutcome::Advanced,
        };
        let twiml = render_reply(&reply);
        assert!(twiml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>"));
        let gather = twiml.find("<Gather").unwrap();
        let say = twiml.find("May I have your full name, please?").unwrap();
        let redirect = twiml.find("<Redirect").unwrap();
        assert!(gather < say && say < redirect);
        assert!(twiml.contains("input=\"speech\""));
        assert!(twiml.contains("action=\"/twilio/voice?seq=1\""));
        assert!(twiml.contains(">/twilio/voice?seq=1</Redirect>"));
    }

    #[test]
    fn hangup_reply_only_speaks() {
        let reply = Reply {
            say: "Goodbye.".to_string(),
            next: NextStep::Hangup,
            state: Some(CallState::Booked),
            outcome: TurnOutcome::Advanced,
        };
        let twiml = render_reply(&reply);
        assert!(twiml.contains("Goodbye.</Say></Response>"));
        assert!(!twiml.contains("<Gather"));
        assert!(!twiml.contains("<Redirect"));
    }

    #[test]
    fn parses_gather_webhook() {
        let body = "CallSid=CA123&From=%2B14165551234&To=%2B18005550100&CallStatus=in-progress\
                    &SpeechResult=John+Smith&Confidence=0.92&AccountSid=AC1";
        let payload = serde_urlencoded::from_str::<TwilioVoicePayload>(body).unwrap();
        assert_eq!(payload.call_sid, "CA123");
        assert_eq!(payload.from.as_deref(), Some("+14165551234"));
        assert_eq!(payload.call_status, Some(CallStatus::InProgress));
        assert_eq!(payload.speech_result.as_deref(), Some("John Smith"));

        let status = serde_urlencoded::from_str::<TwilioStatusPayload>(
            "CallSid=CA123&CallStatus=no-answer",
        )
        .unwrap();
        assert!(status.call_status.is_finished());
    }
}
