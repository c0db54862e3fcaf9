use serde::{Deserialize, Serialize};

use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
/// String-keyed map of string-encoded values with bool/int coercion helpers.
///
/// Keys are expected to be lowercase; values keep their original casing so
/// free-text entries (names, nicknames) survive verbatim.
pub struct ValueMap {
    entries: HashMap<String, String>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return true if the key holds any value.
    ///
    /// Because writing `"false"` or `"0"` removes the key, this doubles as
    /// the boolean read: a held key is true, a missing key is false.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Return the stored value, or `None` if the key was never set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|value| value.as_str())
    }

    /// Return the stored value as an integer, or `0` if missing or unusable.
    ///
    /// Boolean values count as `1` and `0`.
    pub fn get_int(&self, key: &str) -> i32 {
        match self.entries.get(key) {
            Some(value) => match value.parse::<i32>() {
                Ok(int_value) => int_value,
                Err(_) => match value.parse::<bool>() {
                    Ok(bool_value) => bool_value as i32,
                    Err(_) => 0,
                },
            },
            None => 0,
        }
    }

    /// Store a value under the key, trimmed.
    ///
    /// Setting `""`, `"false"` or `"0"` removes the key instead.
    pub fn set(&mut self, key: &str, value: &str) {
        let value = value.trim();

        if value.is_empty() || value == "false" || value == "0" {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_string(), value.to_string());
        }
    }

    pub fn set_int(&mut self, key: &str, value: i32) {
        self.set(key, &value.to_string());
    }

    /// Add `amount` to the stored integer, creating the key if needed.
    ///
    /// Values stored as booleans are treated as `1`/`0` before adding.
    pub fn increment(&mut self, key: &str, amount: i32) {
        let value = self.get_int(key) + amount;
        self.set_int(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all keys currently held.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|key| key.as_str())
    }
}
