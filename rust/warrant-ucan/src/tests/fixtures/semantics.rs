use crate::capability::{Ability, CapabilitySemantics, Scope};
use anyhow::{anyhow, Result};
use std::fmt;
use url::Url;

/// Toy semantics for tests: `chat:<room>` rooms with post and moderate
/// abilities, where moderation implies posting.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChatRoom(pub String);

impl Scope for ChatRoom {
    fn contains(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for ChatRoom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "chat:{}", self.0)
    }
}

impl TryFrom<Url> for ChatRoom {
    type Error = anyhow::Error;

    fn try_from(value: Url) -> Result<Self> {
        match value.scheme() {
            "chat" => Ok(ChatRoom(String::from(value.path()))),
            _ => Err(anyhow!("not a chat room: {value}")),
        }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum ChatAction {
    Post,
    Moderate,
}

impl Ability for ChatAction {}

impl fmt::Display for ChatAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ChatAction::Post => "chat/post",
                ChatAction::Moderate => "chat/moderate",
            }
        )
    }
}

impl TryFrom<String> for ChatAction {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "chat/post" => Ok(ChatAction::Post),
            "chat/moderate" => Ok(ChatAction::Moderate),
            _ => Err(anyhow!("unrecognized chat action: {value}")),
        }
    }
}

pub struct ChatSemantics {}

impl CapabilitySemantics<ChatRoom, ChatAction> for ChatSemantics {}

pub const CHAT_SEMANTICS: ChatSemantics = ChatSemantics {};
