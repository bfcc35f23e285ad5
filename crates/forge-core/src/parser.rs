//! Streaming tag parser
//!
//! Turns chunks of model output into [`ParseEvent`]s while the response is
//! still arriving. Tag boundaries may be split across chunks at any byte:
//! input that could still turn into a recognized tag is held back until
//! the next `feed` decides it.
//!
//! ```text
//! OUTSIDE --<artifact>--> IN_ARTIFACT --<action>--> IN_ACTION
//!    ^                        |  ^                      |
//!    +------</artifact>-------+  +------</action>-------+
//! ```
//!
//! Action bodies are opaque: the first matching close tag ends the body,
//! even if it was meant as literal text inside generated code.

use crate::payload;
use crate::types::{ForgeConfig, DEFAULT_ACTION_TAG, DEFAULT_ARTIFACT_TAG};
use forge_types::{ActionKind, ArtifactMeta, ParseError, ParseEvent, ParsedAction};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern")
});

/// Element names the parser recognizes
#[derive(Debug, Clone)]
struct TagSet {
    artifact: String,
    action: String,
    artifact_open: String,
    artifact_close: String,
    action_open: String,
    action_close: String,
}

impl TagSet {
    fn new(artifact: &str, action: &str) -> Self {
        Self {
            artifact: artifact.to_string(),
            action: action.to_string(),
            artifact_open: format!("<{}", artifact),
            artifact_close: format!("</{}>", artifact),
            action_open: format!("<{}", action),
            action_close: format!("</{}>", action),
        }
    }
}

/// How the text at a `<` relates to a candidate tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagMatch {
    /// The candidate is present; holds the byte length of the whole tag
    Full(usize),
    /// The candidate starts here but its attributes never close properly;
    /// holds the byte length to discard
    Malformed(usize),
    /// More input is needed to decide
    Partial,
    No,
}

struct ArtifactFrame {
    /// `None` while skipping a malformed artifact
    meta: Option<ArtifactMeta>,
    next_action: usize,
}

struct ActionFrame {
    id: String,
    /// `None` while skipping a malformed action
    action: Option<ParsedAction>,
    raw: String,
    last_update: Option<String>,
}

enum State {
    Outside,
    InArtifact(ArtifactFrame),
    InAction(ArtifactFrame, ActionFrame),
}

/// Events produced by one `feed` or `finish` call.
///
/// The events for a chunk are computed eagerly when the chunk is fed; this
/// only hands them out in order.
#[derive(Debug)]
pub struct ParseEvents {
    inner: std::vec::IntoIter<ParseEvent>,
}

impl Iterator for ParseEvents {
    type Item = ParseEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ParseEvents {}

/// Incremental parser for one model response.
///
/// Not restartable: replaying a chunk appends it again. Use a fresh parser
/// per response.
pub struct StreamingParser {
    tags: TagSet,
    buffer: String,
    state: State,
}

impl Default for StreamingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingParser {
    /// Parser for the default `boltArtifact` / `boltAction` vocabulary
    pub fn new() -> Self {
        Self::with_tags(DEFAULT_ARTIFACT_TAG, DEFAULT_ACTION_TAG)
    }

    pub fn with_tags(artifact_tag: &str, action_tag: &str) -> Self {
        Self {
            tags: TagSet::new(artifact_tag, action_tag),
            buffer: String::new(),
            state: State::Outside,
        }
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        Self::with_tags(&config.artifact_tag, &config.action_tag)
    }

    /// True while inside an artifact element
    pub fn in_artifact(&self) -> bool {
        !matches!(self.state, State::Outside)
    }

    /// Consume one chunk and return the events it completes
    pub fn feed(&mut self, chunk: &str) -> ParseEvents {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        loop {
            let progressed = match self.state {
                State::Outside => self.step_outside(&mut events),
                State::InArtifact(_) => self.step_artifact(&mut events),
                State::InAction(_, _) => self.step_action(&mut events),
            };
            if !progressed {
                break;
            }
        }

        ParseEvents {
            inner: events.into_iter(),
        }
    }

    /// Signal end of stream.
    ///
    /// Held-back narrative text is flushed. An artifact or action left open
    /// stays as it last reported; no close events are synthesized.
    pub fn finish(&mut self) -> ParseEvents {
        let mut events = Vec::new();
        match &self.state {
            State::Outside => {
                if !self.buffer.is_empty() {
                    events.push(ParseEvent::Text {
                        text: std::mem::take(&mut self.buffer),
                    });
                }
            }
            State::InArtifact(frame) | State::InAction(frame, _) => {
                debug!(
                    "Stream ended inside artifact {:?}",
                    frame.meta.as_ref().map(|m| m.id.as_str())
                );
                self.buffer.clear();
            }
        }
        ParseEvents {
            inner: events.into_iter(),
        }
    }

    fn step_outside(&mut self, events: &mut Vec<ParseEvent>) -> bool {
        let Some(lt) = self.buffer.find('<') else {
            if self.buffer.is_empty() {
                return false;
            }
            events.push(ParseEvent::Text {
                text: std::mem::take(&mut self.buffer),
            });
            return true;
        };

        if lt > 0 {
            let text: String = self.buffer.drain(..lt).collect();
            events.push(ParseEvent::Text { text });
            return true;
        }

        let open = open_tag(&self.buffer, &self.tags.artifact_open);
        let stray = [
            close_tag(&self.buffer, &self.tags.artifact_close),
            close_tag(&self.buffer, &self.tags.action_close),
        ];

        let opened = match open {
            TagMatch::Full(len) => {
                let tag: String = self.buffer.drain(..len).collect();
                Some(self.artifact_meta(&parse_attributes(&tag[self.tags.artifact_open.len()..])))
            }
            TagMatch::Malformed(len) => {
                self.buffer.drain(..len);
                Some(Err(ParseError::MalformedTag {
                    element: self.tags.artifact.clone(),
                }))
            }
            _ => None,
        };

        if let Some(meta) = opened {
            match &meta {
                Ok(meta) => {
                    debug!("Artifact opened: {} ({})", meta.id, meta.title);
                    events.push(ParseEvent::ArtifactOpen {
                        artifact: meta.clone(),
                    });
                }
                Err(error) => {
                    warn!("Malformed artifact: {}", error);
                    events.push(ParseEvent::Error {
                        error: error.clone(),
                    });
                }
            }
            self.state = State::InArtifact(ArtifactFrame {
                meta: meta.ok(),
                next_action: 0,
            });
            return true;
        }

        if let Some(len) = stray.iter().find_map(full_len) {
            debug!("Ignoring close tag without a matching open tag");
            self.buffer.drain(..len);
            return true;
        }

        if open == TagMatch::Partial || stray.contains(&TagMatch::Partial) {
            return false;
        }

        // an ordinary '<' in narrative text
        let end = self.buffer[1..].find('<').map_or(self.buffer.len(), |i| i + 1);
        let text: String = self.buffer.drain(..end).collect();
        events.push(ParseEvent::Text { text });
        true
    }

    fn step_artifact(&mut self, events: &mut Vec<ParseEvent>) -> bool {
        let Some(lt) = self.buffer.find('<') else {
            // text between actions is not part of any action
            self.buffer.clear();
            return false;
        };

        if lt > 0 {
            self.buffer.drain(..lt);
            return true;
        }

        let open = open_tag(&self.buffer, &self.tags.action_open);
        let close = close_tag(&self.buffer, &self.tags.artifact_close);
        let stray = close_tag(&self.buffer, &self.tags.action_close);

        let opened = match open {
            TagMatch::Full(len) => {
                let tag: String = self.buffer.drain(..len).collect();
                Some(self.parsed_action(&parse_attributes(&tag[self.tags.action_open.len()..])))
            }
            TagMatch::Malformed(len) => {
                self.buffer.drain(..len);
                Some(Err(ParseError::MalformedTag {
                    element: self.tags.action.clone(),
                }))
            }
            _ => None,
        };

        if let Some(parsed) = opened {
            let State::InArtifact(mut frame) = std::mem::replace(&mut self.state, State::Outside)
            else {
                return false;
            };

            let id = frame.next_action.to_string();
            frame.next_action += 1;

            let action = match &frame.meta {
                Some(meta) => match parsed {
                    Ok(action) => {
                        debug!("Action {} opened in artifact {}", id, meta.id);
                        events.push(ParseEvent::ActionOpen {
                            artifact_id: meta.id.clone(),
                            action_id: id.clone(),
                            action: action.clone(),
                        });
                        Some(action)
                    }
                    Err(error) => {
                        warn!("Malformed action {} in artifact {}: {}", id, meta.id, error);
                        events.push(ParseEvent::Error { error });
                        None
                    }
                },
                None => None,
            };

            self.state = State::InAction(
                frame,
                ActionFrame {
                    id,
                    action,
                    raw: String::new(),
                    last_update: None,
                },
            );
            return true;
        }

        if let TagMatch::Full(len) = close {
            self.buffer.drain(..len);
            if let State::InArtifact(frame) = std::mem::replace(&mut self.state, State::Outside) {
                if let Some(meta) = frame.meta {
                    debug!("Artifact closed: {}", meta.id);
                    events.push(ParseEvent::ArtifactClose {
                        artifact_id: meta.id,
                    });
                }
            }
            return true;
        }

        if let TagMatch::Full(len) = stray {
            debug!("Ignoring close tag without a matching open tag");
            self.buffer.drain(..len);
            return true;
        }

        if [open, close, stray].contains(&TagMatch::Partial) {
            return false;
        }

        self.buffer.drain(..1);
        true
    }

    fn step_action(&mut self, events: &mut Vec<ParseEvent>) -> bool {
        let close_len = self.tags.action_close.len();

        if let Some(end) = self.buffer.find(&self.tags.action_close) {
            let body: String = self.buffer.drain(..end).collect();
            self.buffer.drain(..close_len);

            let State::InAction(frame, mut action) =
                std::mem::replace(&mut self.state, State::Outside)
            else {
                return false;
            };
            action.raw.push_str(&body);

            if let (Some(meta), Some(mut parsed)) = (&frame.meta, action.action) {
                let content = payload::clean(&action.raw, parsed.kind());
                if !body.is_empty() || action.last_update.as_deref() != Some(content.as_str()) {
                    events.push(ParseEvent::ActionUpdate {
                        artifact_id: meta.id.clone(),
                        action_id: action.id.clone(),
                        content: content.clone(),
                    });
                }
                parsed.set_content(content);
                debug!(
                    "Action {} closed in artifact {} ({} bytes)",
                    action.id,
                    meta.id,
                    parsed.content().len()
                );
                events.push(ParseEvent::ActionClose {
                    artifact_id: meta.id.clone(),
                    action_id: action.id,
                    action: parsed,
                });
            }

            self.state = State::InArtifact(frame);
            return true;
        }

        // hold back a suffix that may be the start of the close tag
        let held = partial_suffix(&self.buffer, &self.tags.action_close);
        let safe = self.buffer.len() - held;
        if safe == 0 {
            return false;
        }

        let body: String = self.buffer.drain(..safe).collect();
        if let State::InAction(frame, action) = &mut self.state {
            action.raw.push_str(&body);
            if let (Some(meta), Some(_)) = (&frame.meta, &action.action) {
                let content = payload::clean_streaming(&action.raw);
                action.last_update = Some(content.clone());
                events.push(ParseEvent::ActionUpdate {
                    artifact_id: meta.id.clone(),
                    action_id: action.id.clone(),
                    content,
                });
            }
        }
        false
    }

    fn artifact_meta(
        &self,
        attributes: &HashMap<String, String>,
    ) -> Result<ArtifactMeta, ParseError> {
        let id = self.required(&self.tags.artifact, attributes, "id")?;
        let title = self.required(&self.tags.artifact, attributes, "title")?;
        Ok(ArtifactMeta { id, title })
    }

    fn parsed_action(
        &self,
        attributes: &HashMap<String, String>,
    ) -> Result<ParsedAction, ParseError> {
        let value = self.required(&self.tags.action, attributes, "type")?;
        match ActionKind::parse(&value) {
            Some(ActionKind::File) => {
                let file_path = self.required(&self.tags.action, attributes, "filePath")?;
                Ok(ParsedAction::file(file_path, String::new()))
            }
            Some(ActionKind::Shell) => Ok(ParsedAction::shell(String::new())),
            None => Err(ParseError::InvalidActionType {
                element: self.tags.action.clone(),
                value,
            }),
        }
    }

    fn required(
        &self,
        element: &str,
        attributes: &HashMap<String, String>,
        name: &str,
    ) -> Result<String, ParseError> {
        attributes
            .get(name)
            .cloned()
            .ok_or_else(|| ParseError::MissingAttribute {
                element: element.to_string(),
                attribute: name.to_string(),
            })
    }
}

fn full_len(m: &TagMatch) -> Option<usize> {
    match m {
        TagMatch::Full(len) => Some(*len),
        _ => None,
    }
}

/// Match an opening tag (`<name` followed by attributes and `>`) at the
/// start of `input`.
fn open_tag(input: &str, open: &str) -> TagMatch {
    if input.len() <= open.len() {
        return if open.starts_with(input) {
            TagMatch::Partial
        } else {
            TagMatch::No
        };
    }
    if !input.starts_with(open) {
        return TagMatch::No;
    }
    let after = input[open.len()..].chars().next();
    if !matches!(after, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
        return TagMatch::No;
    }
    match find_tag_end(&input[open.len()..]) {
        TagEnd::Closed(end) => TagMatch::Full(open.len() + end + 1),
        TagEnd::Malformed(len) => TagMatch::Malformed(open.len() + len),
        TagEnd::Incomplete => TagMatch::Partial,
    }
}

/// Match a literal close tag at the start of `input`
fn close_tag(input: &str, close: &str) -> TagMatch {
    if input.starts_with(close) {
        TagMatch::Full(close.len())
    } else if close.starts_with(input) {
        TagMatch::Partial
    } else {
        TagMatch::No
    }
}

/// Longest open tag body the parser waits for
const MAX_TAG_LEN: usize = 4096;

enum TagEnd {
    /// Byte offset of the closing `>`
    Closed(usize),
    /// Byte length of a broken tag body
    Malformed(usize),
    Incomplete,
}

/// Find the `>` ending a tag body, skipping quoted attribute values.
///
/// A quote still open at a `<` or newline, or a body longer than
/// [`MAX_TAG_LEN`], makes the tag malformed. It then ends at its first raw
/// `>`, or just before the offending character.
fn find_tag_end(input: &str) -> TagEnd {
    let mut quote: Option<char> = None;
    for (idx, c) in input.char_indices() {
        if idx >= MAX_TAG_LEN {
            return TagEnd::Malformed(broken_tag_len(input, idx));
        }
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), '<') | (Some(_), '\n') => {
                return TagEnd::Malformed(broken_tag_len(input, idx))
            }
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return TagEnd::Closed(idx),
            (None, _) => {}
        }
    }
    TagEnd::Incomplete
}

fn broken_tag_len(input: &str, limit: usize) -> usize {
    input[..limit].find('>').map_or(limit, |i| i + 1)
}

/// Length of the longest suffix of `input` that is a proper prefix of `tag`
fn partial_suffix(input: &str, tag: &str) -> usize {
    let max = input.len().min(tag.len() - 1);
    (1..=max)
        .rev()
        .find(|&len| input.is_char_boundary(input.len() - len) && tag.starts_with(&input[input.len() - len..]))
        .unwrap_or(0)
}

fn parse_attributes(tag_body: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(tag_body)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((name, value))
        })
        .collect()
}
