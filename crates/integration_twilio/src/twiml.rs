//! TwiML voice response builder
//!
//! Renders the document returned to Twilio's incoming-call webhook. The
//! relay only needs `<Say>`, `<Pause>` and `<Connect><Stream>`.

use std::fmt::Write as _;

/// One TwiML verb
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verb {
    Say(String),
    Pause(u32),
    ConnectStream(String),
}

/// A `<Response>` document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    /// Empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `text` to the caller; blank text is skipped
    #[must_use]
    pub fn say(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.verbs.push(Verb::Say(text));
        }
        self
    }

    /// Wait `seconds`; zero is skipped
    #[must_use]
    pub fn pause(mut self, seconds: u32) -> Self {
        if seconds > 0 {
            self.verbs.push(Verb::Pause(seconds));
        }
        self
    }

    /// Bridge the call audio to a bidirectional media stream
    #[must_use]
    pub fn connect_stream(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::ConnectStream(url.into()));
        self
    }

    /// Render the XML document
    pub fn render(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => {
                    let _ = write!(xml, "<Say>{}</Say>", escape_xml(text));
                },
                Verb::Pause(seconds) => {
                    let _ = write!(xml, "<Pause length=\"{seconds}\"/>");
                },
                Verb::ConnectStream(url) => {
                    let _ = write!(
                        xml,
                        "<Connect><Stream url=\"{}\"/></Connect>",
                        escape_xml(url)
                    );
                },
            }
        }
        xml.push_str("</Response>");
        xml
    }
}

/// `wss://` URL of the media stream endpoint on `host`
pub fn stream_url(host: &str, path: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if path.starts_with('/') {
        format!("wss://{host}{path}")
    } else {
        format!("wss://{host}/{path}")
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
