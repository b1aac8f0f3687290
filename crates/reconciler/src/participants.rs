use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::payloads::{Participant, RequestedReviewer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&Participant> for User {
    fn from(participant: &Participant) -> Self {
        Self {
            login: participant.login.clone(),
            name: participant.name.clone(),
            avatar_url: participant.avatar_url.clone(),
        }
    }
}

impl User {
    /// `None` when the reviewer resolves to neither a user nor a team login.
    pub fn from_reviewer(reviewer: &RequestedReviewer) -> Option<Self> {
        Some(Self {
            login: reviewer.login()?.to_string(),
            name: reviewer.name().map(str::to_string),
            avatar_url: reviewer.avatar_url().map(str::to_string),
        })
    }
}

/// Users involved in an item, unique by login, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participants {
    users: Vec<User>,
    index: HashMap<String, usize>,
}

impl Participants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and leaves the set untouched if the login is present.
    pub fn insert(&mut self, user: User) -> bool {
        if self.index.contains_key(&user.login) {
            return false;
        }
        self.index.insert(user.login.clone(), self.users.len());
        self.users.push(user);
        true
    }

    pub fn get(&self, login: &str) -> Option<&User> {
        self.index.get(login).map(|&slot| &self.users[slot])
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, User> {
        self.users.iter()
    }
}

impl Extend<User> for Participants {
    fn extend<I: IntoIterator<Item = User>>(&mut self, iter: I) {
        for user in iter {
            self.insert(user);
        }
    }
}

impl FromIterator<User> for Participants {
    fn from_iter<I: IntoIterator<Item = User>>(iter: I) -> Self {
        let mut participants = Participants::new();
        participants.extend(iter);
        participants
    }
}

impl<'a> IntoIterator for &'a Participants {
    type Item = &'a User;
    type IntoIter = std::slice::Iter<'a, User>;

    fn into_iter(self) -> Self::IntoIter {
        self.users.iter()
    }
}

impl Serialize for Participants {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.users)
    }
}

impl<'de> Deserialize<'de> for Participants {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let users = Option::<Vec<User>>::deserialize(deserializer)?;
        Ok(users.unwrap_or_default().into_iter().collect())
    }
}
