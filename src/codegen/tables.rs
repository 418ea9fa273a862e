use std::collections::HashMap;

pub fn variable_label(name: &str) -> String {
    format!("var_{name}")
}

fn string_label(id: usize) -> String {
    format!("msg_{id}")
}

/// Every `let`-bound variable with its data-section initializer, in
/// first-declaration order.
#[derive(Debug, Default)]
pub struct Variables {
    slots: Vec<(String, i32)>,
    index: HashMap<String, usize>,
}

impl Variables {
    /// Records `name`. A name that is already declared keeps its first
    /// initializer.
    pub fn declare(&mut self, name: &str, initial: i32) {
        if self.index.contains_key(name) {
            return;
        }
        self.index.insert(name.to_string(), self.slots.len());
        self.slots.push((name.to_string(), initial));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn initial_value(&self, name: &str) -> Option<i32> {
        self.index.get(name).map(|&i| self.slots[i].1)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.slots.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

/// Printed string literals. Labels are handed out in first-registration
/// order and a repeated literal reuses its label.
#[derive(Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
    index: HashMap<String, usize>,
}

impl StringTable {
    pub fn register(&mut self, s: &str) -> String {
        if let Some(&id) = self.index.get(s) {
            return string_label(id);
        }
        let id = self.strings.len();
        self.index.insert(s.to_string(), id);
        self.strings.push(s.to_string());
        string_label(id)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// `(label, literal)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(id, s)| (string_label(id), s.as_str()))
    }
}
